//! Deterministic identifiers for documents and chunk records

use crate::chunker::TextChunk;
use lumina_common::config::IdStrategy;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Hex SHA-256 of the uploaded bytes
pub fn document_id(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// UUIDv5 of the decimal sequence index.
///
/// Two uploads share ids, so a second upload overwrites the first one's
/// records position by position.
pub fn positional_id(sequence_index: usize) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, sequence_index.to_string().as_bytes())
}

/// UUIDv5 over the document identity, position and body
pub fn content_id(document_id: &str, sequence_index: usize, body: &str) -> Uuid {
    let name = format!("{}:{}:{}", document_id, sequence_index, body);
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, name.as_bytes())
}

/// Assigns record ids to the chunks of one document
#[derive(Debug, Clone)]
pub struct Identifier {
    strategy: IdStrategy,
    document_id: String,
}

impl Identifier {
    pub fn new(strategy: IdStrategy, document_id: impl Into<String>) -> Self {
        Self {
            strategy,
            document_id: document_id.into(),
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn record_id(&self, chunk: &TextChunk) -> Uuid {
        match self.strategy {
            IdStrategy::Positional => positional_id(chunk.sequence_index),
            IdStrategy::ContentAddressed => {
                content_id(&self.document_id, chunk.sequence_index, &chunk.body)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(sequence_index: usize, body: &str) -> TextChunk {
        TextChunk {
            body: body.to_string(),
            sequence_index,
            start: 0,
            end: body.len(),
        }
    }

    #[test]
    fn test_document_id_is_sha256_hex() {
        assert_eq!(
            document_id(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(document_id(b"policy"), document_id(b"policy"));
        assert_ne!(document_id(b"policy v1"), document_id(b"policy v2"));
    }

    #[test]
    fn test_positional_ids_match_known_values() {
        assert_eq!(
            positional_id(0).to_string(),
            "6af613b6-569c-5c22-9c37-2ed93f31d3af"
        );
        assert_eq!(
            positional_id(1).to_string(),
            "b04965e6-a9bb-591f-8f8a-1adcb2c8dc39"
        );
    }

    #[test]
    fn test_positional_ignores_document() {
        let a = Identifier::new(IdStrategy::Positional, document_id(b"first upload"));
        let b = Identifier::new(IdStrategy::Positional, document_id(b"second upload"));
        assert_eq!(a.record_id(&chunk(3, "x")), b.record_id(&chunk(3, "y")));
    }

    #[test]
    fn test_content_addressed_ids_are_distinct() {
        let doc = document_id(b"handbook");
        let ids = Identifier::new(IdStrategy::ContentAddressed, doc.clone());
        let other = Identifier::new(IdStrategy::ContentAddressed, document_id(b"other"));

        let first = ids.record_id(&chunk(0, "Leave is 25 days."));
        assert_eq!(first, ids.record_id(&chunk(0, "Leave is 25 days.")));
        assert_ne!(first, ids.record_id(&chunk(1, "Leave is 25 days.")));
        assert_ne!(first, other.record_id(&chunk(0, "Leave is 25 days.")));
        assert_eq!(ids.document_id(), doc);
    }
}
