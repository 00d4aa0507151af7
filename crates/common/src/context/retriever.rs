//! Query issuer: free-text question to the single best stored match

use crate::errors::{AppError, Result};
use crate::metrics::{self, RetrievalOutcome};
use crate::store::{Collection, ScoredRecord};
use std::time::Instant;
use tracing::{debug, instrument};

/// Issues top-1 nearest-match queries against the collection
#[derive(Clone)]
pub struct QueryIssuer {
    collection: Collection,
}

impl QueryIssuer {
    pub fn new(collection: Collection) -> Self {
        Self { collection }
    }

    /// Best match with its score, or `None`.
    ///
    /// Store failures surface as `RetrievalFailed`.
    #[instrument(skip(self, question), fields(collection = %self.collection.name()))]
    pub async fn best_match(&self, question: &str) -> Result<Option<ScoredRecord>> {
        if question.trim().is_empty() {
            debug!("Blank question, skipping store query");
            metrics::record_retrieval(0.0, RetrievalOutcome::Miss);
            return Ok(None);
        }

        let start = Instant::now();
        let result = self.collection.nearest(question).await.map_err(|e| match e {
            AppError::RetrievalFailed { .. } => e,
            other => AppError::RetrievalFailed {
                message: other.to_string(),
            },
        });
        let elapsed = start.elapsed().as_secs_f64();

        let outcome = match &result {
            Ok(Some(_)) => RetrievalOutcome::Hit,
            Ok(None) => RetrievalOutcome::Miss,
            Err(_) => RetrievalOutcome::Error,
        };
        metrics::record_retrieval(elapsed, outcome);

        if let Ok(Some(record)) = &result {
            debug!(score = record.score, chars = record.body.chars().count(), "Retrieved match");
        }
        result
    }
}
