//! Completion requester: a composed prompt to the provider's verbatim reply

use crate::completion::{ChatMessage, CompletionProvider};
use crate::errors::{AppError, Result};
use crate::metrics;
use std::sync::Arc;
use std::time::Instant;
use tracing::{instrument, warn};

/// Sends the fixed system instruction followed by the user prompt
#[derive(Clone)]
pub struct Synthesizer {
    provider: Arc<dyn CompletionProvider>,
    system_prompt: String,
}

impl Synthesizer {
    pub fn new(provider: Arc<dyn CompletionProvider>, system_prompt: impl Into<String>) -> Self {
        Self {
            provider,
            system_prompt: system_prompt.into(),
        }
    }

    /// The two-message exchange sent for a prompt
    pub fn messages(&self, prompt: &str) -> [ChatMessage; 2] {
        [
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user(prompt),
        ]
    }

    /// Provider failures surface as `CompletionFailed`; nothing is retried.
    #[instrument(skip(self, prompt), fields(model = %self.provider.model_name()))]
    pub async fn synthesize(&self, prompt: &str) -> Result<String> {
        let start = Instant::now();
        let result = self
            .provider
            .complete(&self.messages(prompt))
            .await
            .map_err(|e| match e {
                AppError::CompletionFailed { .. } => e,
                other => AppError::CompletionFailed {
                    message: other.to_string(),
                },
            });

        metrics::record_completion(
            start.elapsed().as_secs_f64(),
            self.provider.model_name(),
            result.is_ok(),
        );
        if let Err(e) = &result {
            warn!(error = %e, "Completion request failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{Role, ScriptedCompletion};

    #[tokio::test]
    async fn test_two_message_exchange() {
        let provider = Arc::new(ScriptedCompletion::replying("  verbatim reply\n"));
        let synthesizer = Synthesizer::new(provider.clone(), crate::DEFAULT_SYSTEM_PROMPT);

        let reply = synthesizer.synthesize("Context: a\n\nQuestion: b").await.unwrap();
        assert_eq!(reply, "  verbatim reply\n");

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 2);
        assert_eq!(calls[0][0].role, Role::System);
        assert_eq!(
            calls[0][0].content,
            "You are a helpful Assistant that Answers User Queries."
        );
        assert_eq!(calls[0][1].role, Role::User);
        assert_eq!(calls[0][1].content, "Context: a\n\nQuestion: b");
    }

    #[tokio::test]
    async fn test_failure_propagates() {
        let provider = Arc::new(ScriptedCompletion::failing("401 unauthorized"));
        let synthesizer = Synthesizer::new(provider, "sys");
        let err = synthesizer.synthesize("p").await.unwrap_err();
        assert!(matches!(err, AppError::CompletionFailed { .. }));
        assert!(err.to_string().contains("401 unauthorized"));
    }
}
