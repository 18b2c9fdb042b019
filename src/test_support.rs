//! Scripted provider and helpers shared by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::estimation::RetryPolicy;
use crate::llm::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};

type Responder = dyn Fn(usize, &str) -> Result<String, LlmError> + Send + Sync;

/// An `LlmProvider` whose replies come from a closure of (call index, prompt).
pub(crate) struct ScriptedProvider {
    responder: Box<Responder>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub(crate) fn new(
        responder: impl Fn(usize, &str) -> Result<String, LlmError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
        })
    }

    /// Replies in order; panics if called more often than scripted.
    pub(crate) fn sequence(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
        let replies = Mutex::new(VecDeque::from(replies));
        Self::new(move |call, _| {
            replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("unscripted call #{call}"))
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, req: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let content = (self.responder)(call, &req.prompt)?;
        Ok(CompletionResponse {
            content,
            finish_reason: FinishReason::Stop,
            input_tokens: 0,
            output_tokens: 0,
        })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// A throttling error without a retry hint.
pub(crate) fn throttled() -> LlmError {
    LlmError::RateLimited {
        provider: "test".to_string(),
        retry_after: None,
        detail: "HTTP 429: Resource has been exhausted".to_string(),
    }
}

/// Default retry budget with no waiting between attempts.
pub(crate) fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        default_delay: Duration::ZERO,
    }
}
