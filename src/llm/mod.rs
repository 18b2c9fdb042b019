//! LLM integration.
//!
//! Estimation only needs plain text completions, so the surface is a single
//! [`LlmProvider`] trait with a Google Gemini implementation.

mod google;
mod provider;

pub use google::GoogleGeminiProvider;
pub use provider::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};

use std::sync::Arc;

use crate::config::GoogleConfig;
use crate::error::LlmError;

/// Create the configured LLM provider.
///
/// Returns `Ok(None)` when no API key is configured, so the service can still
/// start and answer estimation requests with a remediation hint.
pub fn create_llm_provider(
    config: &GoogleConfig,
) -> Result<Option<Arc<dyn LlmProvider>>, LlmError> {
    if config.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; estimation is disabled");
        return Ok(None);
    }

    tracing::info!(model = %config.model, "Using direct Google Gemini API (AI Studio)");
    Ok(Some(Arc::new(GoogleGeminiProvider::new(config.clone())?)))
}
