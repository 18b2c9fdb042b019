//! Google Gemini provider over the OpenAI-compatible chat completions API.
//!
//! Authenticates with an AI Studio API key.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::GoogleConfig;
use crate::error::LlmError;
use crate::llm::provider::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};

const PROVIDER: &str = "google";

/// Per-request transport timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Google Gemini chat completions provider.
pub struct GoogleGeminiProvider {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl GoogleGeminiProvider {
    /// Create a provider. Fails with `AuthFailed` if no API key is configured.
    pub fn new(config: GoogleConfig) -> Result<Self, LlmError> {
        let Some(api_key) = config.api_key else {
            return Err(LlmError::AuthFailed {
                provider: PROVIDER.to_string(),
            });
        };

        tracing::info!(
            key_len = api_key.expose_secret().len(),
            model = %config.model,
            "Google Gemini API key loaded"
        );

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Ok(Self {
            client,
            api_key,
            model: config.model,
            base_url: config.base_url,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn send_request(
        &self,
        body: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, LlmError> {
        let url = self.api_url("chat/completions");

        tracing::debug!(url = %url, model = %self.model, "Sending request to Google Gemini");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Google Gemini request failed: {}", e);
                LlmError::RequestFailed {
                    provider: PROVIDER.to_string(),
                    reason: e.to_string(),
                }
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);
        let response_text = response.text().await.unwrap_or_default();

        tracing::debug!(%status, "Google Gemini response received");

        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), retry_after, response_text));
        }

        serde_json::from_str(&response_text).map_err(|e| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: format!("JSON parse error: {}. Raw: {}", e, response_text),
        })
    }
}

/// Map a non-success HTTP status to a provider error. The body is kept in the
/// error so that retry hints embedded in it stay visible to the caller.
fn classify_failure(status: u16, retry_after: Option<Duration>, body: String) -> LlmError {
    match status {
        401 | 403 => LlmError::AuthFailed {
            provider: PROVIDER.to_string(),
        },
        429 => LlmError::RateLimited {
            provider: PROVIDER.to_string(),
            retry_after,
            detail: format!("HTTP 429: {}", body),
        },
        _ => LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: format!("HTTP {}: {}", status, body),
        },
    }
}

#[async_trait]
impl LlmProvider for GoogleGeminiProvider {
    async fn complete(&self, req: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatCompletionMessage::user(req.prompt)],
        };

        let response = self.send_request(&request).await?;

        let choice =
            response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| LlmError::InvalidResponse {
                    provider: PROVIDER.to_string(),
                    reason: "No choices in response".to_string(),
                })?;

        let finish_reason = match choice.finish_reason.as_deref() {
            Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Unknown,
        };
        let usage = response.usage.unwrap_or_default();

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            finish_reason,
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// OpenAI-compatible Chat Completions API types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatCompletionMessage>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionMessage {
    role: &'static str,
    content: String,
}

impl ChatCompletionMessage {
    fn user(content: String) -> Self {
        Self {
            role: "user",
            content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    #[serde(default)]
    usage: Option<ChatCompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatCompletionUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_api_key() {
        let result = GoogleGeminiProvider::new(GoogleConfig::default());
        assert!(matches!(result, Err(LlmError::AuthFailed { .. })));
    }

    #[test]
    fn test_api_url_joins_cleanly() {
        let config = GoogleConfig {
            api_key: Some(SecretString::from("k".to_string())),
            base_url: "https://example.test/v1beta/openai/".to_string(),
            ..GoogleConfig::default()
        };
        let provider = GoogleGeminiProvider::new(config).unwrap();
        assert_eq!(
            provider.api_url("/chat/completions"),
            "https://example.test/v1beta/openai/chat/completions"
        );
    }

    #[test]
    fn test_classify_rate_limit_keeps_body() {
        let err = classify_failure(
            429,
            Some(Duration::from_secs(7)),
            "Quota exceeded. Please retry in 12.5s.".to_string(),
        );
        match err {
            LlmError::RateLimited {
                retry_after,
                detail,
                ..
            } => {
                assert_eq!(retry_after, Some(Duration::from_secs(7)));
                assert!(detail.contains("retry in 12.5s"));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_other_failures() {
        assert!(matches!(
            classify_failure(401, None, String::new()),
            LlmError::AuthFailed { .. }
        ));
        assert!(matches!(
            classify_failure(500, None, "boom".to_string()),
            LlmError::RequestFailed { .. }
        ));
    }

    #[test]
    fn test_response_deserializes_without_usage() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"{\"cac\":1}"},"finish_reason":"stop"}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.usage.is_none());
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("{\"cac\":1}"));
    }

    #[test]
    fn test_request_is_single_user_turn() {
        let request = ChatCompletionRequest {
            model: "gemini-1.5-flash".to_string(),
            messages: vec![ChatCompletionMessage::user("Product name: mug".to_string())],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "gemini-1.5-flash",
                "messages": [{"role": "user", "content": "Product name: mug"}]
            })
        );
    }
}
