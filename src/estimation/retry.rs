//! Provider calls with retry on throttling.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use regex::Regex;

use crate::config::EstimationConfig;
use crate::error::{EstimationError, LlmError};
use crate::llm::{CompletionRequest, FinishReason, LlmProvider};

/// Characters of each raw response written to the debug log.
const LOG_EXCERPT_CHARS: usize = 500;

/// How throttled calls are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay used when the provider gives no usable hint.
    pub default_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            default_delay: Duration::from_secs(5),
        }
    }
}

impl From<&EstimationConfig> for RetryPolicy {
    fn from(config: &EstimationConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            default_delay: config.default_retry_delay,
        }
    }
}

/// Whether `err` signals provider throttling (rate limit or exhausted quota).
pub fn is_throttling(err: &LlmError) -> bool {
    if matches!(err, LlmError::RateLimited { .. }) {
        return true;
    }
    let text = err.to_string();
    text.contains("429") || text.contains("quota") || text.contains("Quota exceeded")
}

/// Delay before the next attempt.
///
/// Best effort: a "retry in <N>s" hint in the error text wins, then the
/// provider's `Retry-After` header, then `default`. Seconds are converted to
/// whole milliseconds, rounding up.
pub fn retry_delay(error_text: &str, header_hint: Option<Duration>, default: Duration) -> Duration {
    static RETRY_IN: OnceLock<Regex> = OnceLock::new();
    let re = RETRY_IN.get_or_init(|| {
        Regex::new(r"(?i)retry in ([\d.]+)s").expect("retry hint pattern is valid")
    });

    re.captures(error_text)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| Duration::from_millis((secs * 1000.0).ceil() as u64))
        .or(header_hint)
        .unwrap_or(default)
}

/// Sends prompts to the provider, retrying while it throttles.
#[derive(Clone)]
pub struct RetryingClient {
    provider: Arc<dyn LlmProvider>,
    policy: RetryPolicy,
}

impl RetryingClient {
    pub fn new(provider: Arc<dyn LlmProvider>, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Send `prompt` and return the raw response text.
    ///
    /// Throttling is retried up to `max_retries` times and then reported as
    /// `QuotaExceeded`. Any other provider error is returned at once as
    /// `TransportFailure`.
    pub async fn estimate(&self, prompt: &str) -> Result<String, EstimationError> {
        let max_retries = self.policy.max_retries;
        let mut retries = 0u32;
        let mut last_error: Option<String> = None;

        loop {
            let request = CompletionRequest::from_prompt(prompt);
            match self.provider.complete(request).await {
                Ok(response) => {
                    tracing::debug!(
                        len = response.content.len(),
                        input_tokens = response.input_tokens,
                        output_tokens = response.output_tokens,
                        finish_reason = ?response.finish_reason,
                        excerpt = %response.content.chars().take(LOG_EXCERPT_CHARS).collect::<String>(),
                        "Estimation response received"
                    );
                    if response.finish_reason == FinishReason::Length {
                        tracing::warn!(
                            output_tokens = response.output_tokens,
                            "Estimation response was truncated at the token limit"
                        );
                    }
                    if response.content.trim().is_empty() {
                        return Err(EstimationError::EstimationFailed { last_error });
                    }
                    return Ok(response.content);
                }
                Err(err) if is_throttling(&err) => {
                    if retries >= max_retries {
                        tracing::error!(attempts = retries + 1, error = %err, "Retry budget exhausted");
                        return Err(EstimationError::QuotaExceeded {
                            attempts: retries + 1,
                        });
                    }
                    retries += 1;

                    let header_hint = match &err {
                        LlmError::RateLimited { retry_after, .. } => *retry_after,
                        _ => None,
                    };
                    let text = err.to_string();
                    let delay = retry_delay(&text, header_hint, self.policy.default_delay);

                    tracing::warn!(
                        retry = retries,
                        max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Quota exceeded, retrying"
                    );
                    last_error = Some(text);
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    tracing::error!(error = %err, "Estimation request failed");
                    return Err(EstimationError::TransportFailure(err.to_string()));
                }
            }
        }
    }
}
