//! Retrieval & answer pipeline
//!
//! `QueryIssuer -> compose -> Synthesizer`: the question is matched against
//! the collection, the best body is wrapped into a prompt, and the prompt is
//! sent to the completion provider. With no match the completion is skipped
//! and a fixed apology is returned.

mod composer;
mod retriever;
mod synthesizer;

pub use composer::{compose, compose_prompt, Composition, NO_MATCH_ANSWER};
pub use retriever::QueryIssuer;
pub use synthesizer::Synthesizer;

use crate::errors::Result;
use crate::store::ScoredRecord;
use serde::Serialize;
use tracing::{info, instrument};

/// Final answer for one question
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// Text returned to the user
    pub response: String,
    /// The match the answer was grounded on, if any
    pub retrieved: Option<ScoredRecord>,
    /// Whether the completion provider was called
    pub completed: bool,
}

/// Answers questions against the collection
#[derive(Clone)]
pub struct AnswerService {
    issuer: QueryIssuer,
    synthesizer: Synthesizer,
}

impl AnswerService {
    pub fn new(issuer: QueryIssuer, synthesizer: Synthesizer) -> Self {
        Self { issuer, synthesizer }
    }

    #[instrument(skip(self, question))]
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let retrieved = self.issuer.best_match(question).await?;

        match compose(retrieved.as_ref().map(|r| r.body.as_str()), question) {
            Composition::Answer(response) => {
                info!("No relevant chunk found");
                Ok(Answer {
                    response,
                    retrieved: None,
                    completed: false,
                })
            }
            Composition::Prompt(prompt) => {
                let response = self.synthesizer.synthesize(&prompt).await?;
                Ok(Answer {
                    response,
                    retrieved,
                    completed: true,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::ScriptedCompletion;
    use crate::errors::AppError;
    use crate::store::{Collection, CollectionSchema, InMemoryStore, StoredRecord};
    use std::sync::Arc;
    use uuid::Uuid;

    async fn service(
        bodies: &[&str],
        provider: Arc<ScriptedCompletion>,
    ) -> (Arc<InMemoryStore>, AnswerService) {
        let store = Arc::new(InMemoryStore::new());
        let collection = Collection::new(store.clone(), CollectionSchema::documents("HR_doc", None));
        collection.ensure_exists().await.unwrap();
        let records: Vec<StoredRecord> = bodies
            .iter()
            .enumerate()
            .map(|(i, body)| StoredRecord {
                id: Uuid::from_u128(i as u128),
                body: body.to_string(),
            })
            .collect();
        collection.insert_many(&records).await.unwrap();

        let service = AnswerService::new(
            QueryIssuer::new(collection),
            Synthesizer::new(provider, crate::DEFAULT_SYSTEM_PROMPT),
        );
        (store, service)
    }

    #[tokio::test]
    async fn test_no_match_bypasses_completion() {
        let provider = Arc::new(ScriptedCompletion::replying("should not be used"));
        let (_store, service) = service(&[], provider.clone()).await;

        let answer = service.answer("vacation policy").await.unwrap();
        assert_eq!(answer.response, NO_MATCH_ANSWER);
        assert!(!answer.completed);
        assert!(answer.retrieved.is_none());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_match_is_sent_with_question() {
        let provider = Arc::new(ScriptedCompletion::replying("You get 25 days."));
        let (_store, service) = service(
            &[
                "Remote work requires manager approval.",
                "Annual leave is 25 days per calendar year.",
            ],
            provider.clone(),
        )
        .await;

        let answer = service.answer("annual leave").await.unwrap();
        assert_eq!(answer.response, "You get 25 days.");
        assert!(answer.completed);
        assert_eq!(
            answer.retrieved.unwrap().body,
            "Annual leave is 25 days per calendar year."
        );

        let calls = provider.calls();
        assert_eq!(
            calls[0][1].content,
            "Context: Annual leave is 25 days per calendar year.\n\nQuestion: annual leave"
        );
    }

    #[tokio::test]
    async fn test_blank_question_is_no_match() {
        let provider = Arc::new(ScriptedCompletion::replying("unused"));
        let (_store, service) = service(&["anything"], provider.clone()).await;

        let answer = service.answer("   ").await.unwrap();
        assert_eq!(answer.response, NO_MATCH_ANSWER);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_completion_failure_propagates() {
        let provider = Arc::new(ScriptedCompletion::failing("quota exceeded"));
        let (_store, service) = service(&["Annual leave is 25 days."], provider).await;

        let err = service.answer("annual leave").await.unwrap_err();
        assert!(matches!(err, AppError::CompletionFailed { .. }));
    }
}
