//! Client-held conversation history
//!
//! The server never stores turns. Form front ends round-trip the history
//! as an opaque JSON field and the server only decodes and re-encodes it.

use serde::{Deserialize, Serialize};

/// One question and its answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
}

/// Ordered list of turns, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History(Vec<ConversationTurn>);

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a round-tripped history; anything malformed starts a fresh one
    pub fn decode(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::new();
        }
        serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Discarding malformed conversation history");
            Self::new()
        })
    }

    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn push(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.0.push(ConversationTurn {
            question: question.into(),
            answer: answer.into(),
        });
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
