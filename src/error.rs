//! Error types for every layer of the crate.

use std::time::Duration;

/// Configuration errors raised while reading the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from the HTTP server lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {addr}: {reason}")]
    BindFailed { addr: String, reason: String },
}

/// Errors from an LLM provider.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Request to {provider} failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    /// The provider throttled the call. `detail` keeps the raw error body,
    /// which may contain a "retry in Ns" hint.
    #[error("Rate limited by {provider}: {detail}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
        detail: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for {provider}")]
    AuthFailed { provider: String },
}

/// Errors from the estimation pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EstimationError {
    /// Empty product name or unknown metric kind. Raised before any network call.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A batch request that contained no usable product names.
    #[error("No product names to estimate")]
    NoInput,

    /// No API credential configured for the provider.
    #[error("API key is not configured")]
    ConfigurationMissing { hint: String },

    /// Throttling persisted past the retry budget.
    #[error("API quota exceeded after {attempts} attempts, try again later")]
    QuotaExceeded { attempts: u32 },

    /// The model's reply is not a JSON object, even after fence stripping.
    #[error("Failed to parse JSON: {reason}. First 200 characters: {excerpt}")]
    MalformedResponse { reason: String, excerpt: String },

    /// The JSON object lacks a field or carries a non-numeric value.
    #[error("Response field '{field}' is invalid: {reason}")]
    InvalidResponseShape { field: String, reason: String },

    /// Any other provider or network error. Never retried.
    #[error("Estimation request failed: {0}")]
    TransportFailure(String),

    /// The provider answered without usable text.
    #[error("Estimation produced no response text{}", cause_suffix(.last_error))]
    EstimationFailed { last_error: Option<String> },

    /// The whole pipeline for one item exceeded its time budget.
    #[error("Estimation timed out after {0:?}")]
    Timeout(Duration),
}

impl EstimationError {
    /// Whether a caller may reasonably retry the same request later.
    pub fn is_retryable_later(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. } | Self::Timeout(_))
    }
}

fn cause_suffix(last_error: &Option<String>) -> String {
    last_error
        .as_ref()
        .map(|e| format!(": {e}"))
        .unwrap_or_default()
}

/// Precondition violations in the derived-metric calculators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalcError {
    #[error("Invalid input: {constraint}")]
    InvalidInput { constraint: &'static str },
}

impl CalcError {
    pub(crate) fn violated(constraint: &'static str) -> Self {
        Self::InvalidInput { constraint }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimation_failed_message() {
        let bare = EstimationError::EstimationFailed { last_error: None };
        assert_eq!(bare.to_string(), "Estimation produced no response text");

        let with_cause = EstimationError::EstimationFailed {
            last_error: Some("socket closed".to_string()),
        };
        assert_eq!(
            with_cause.to_string(),
            "Estimation produced no response text: socket closed"
        );
    }

    #[test]
    fn test_retryable_later() {
        assert!(EstimationError::QuotaExceeded { attempts: 4 }.is_retryable_later());
        assert!(EstimationError::Timeout(Duration::from_secs(1)).is_retryable_later());
        assert!(!EstimationError::NoInput.is_retryable_later());
        assert!(!EstimationError::TransportFailure("boom".into()).is_retryable_later());
    }

    #[test]
    fn test_calc_error_names_constraint() {
        let err = CalcError::violated("cost must be less than selling price");
        assert!(err.to_string().contains("cost must be less than selling price"));
    }
}
