//! Vector store abstraction
//!
//! The store is an external collaborator: it owns embedding, similarity
//! scoring and persistence. This module defines what the pipelines need
//! from it and binds a store to the deployment's single collection.
//!
//! Implementations:
//! - `WeaviateStore` (REST + GraphQL)
//! - `InMemoryStore` (lexical test double)

mod memory;
mod weaviate;

pub use memory::InMemoryStore;
pub use weaviate::{WeaviateSettings, WeaviateStore};

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// The one text property every chunk record carries
pub const BODY_PROPERTY: &str = "body";

/// The persisted unit: one per chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: Uuid,
    pub body: String,
}

/// A record returned by a nearest-match query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub id: Option<Uuid>,
    pub body: String,
    /// Relevance score as reported by the store (higher is closer)
    pub score: f32,
}

/// Property data types the schema uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Text,
}

/// Property definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySpec {
    pub name: String,
    pub data_type: DataType,
}

/// Vectorizer attached to a collection at creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizerSpec {
    pub module: String,
    pub model: String,
}

/// Collection schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,
    pub properties: Vec<PropertySpec>,
    pub vectorizer: Option<VectorizerSpec>,
}

impl CollectionSchema {
    /// The chunk collection: a single `body` text property
    pub fn documents(name: impl Into<String>, vectorizer: Option<VectorizerSpec>) -> Self {
        Self {
            name: name.into(),
            properties: vec![PropertySpec {
                name: BODY_PROPERTY.to_string(),
                data_type: DataType::Text,
            }],
            vectorizer,
        }
    }
}

/// Operations consumed from the external vector store
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Whether the named collection exists
    async fn collection_exists(&self, name: &str) -> Result<bool>;

    /// Create a collection with the given schema
    async fn create_collection(&self, schema: &CollectionSchema) -> Result<()>;

    /// Delete a collection and every record in it
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Bulk insert; the whole call fails if any record is rejected
    async fn insert_many(&self, collection: &str, records: &[StoredRecord]) -> Result<()>;

    /// Nearest-match text query, best match first
    async fn near_text(&self, collection: &str, query: &str, limit: usize)
        -> Result<Vec<ScoredRecord>>;

    /// Check that the store is reachable
    async fn ping(&self) -> Result<()>;

    /// Short backend name for logs
    fn backend(&self) -> &'static str;
}

/// Handle to the deployment's single collection.
///
/// Cheap to clone; passed into the ingestion and answer pipelines.
#[derive(Clone)]
pub struct Collection {
    store: Arc<dyn VectorStore>,
    schema: Arc<CollectionSchema>,
}

impl Collection {
    pub fn new(store: Arc<dyn VectorStore>, schema: CollectionSchema) -> Self {
        Self {
            store,
            schema: Arc::new(schema),
        }
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Create the collection only if absent. Returns true when created.
    #[instrument(skip(self), fields(collection = %self.name()))]
    pub async fn ensure_exists(&self) -> Result<bool> {
        if self.store.collection_exists(self.name()).await? {
            return Ok(false);
        }
        self.store.create_collection(&self.schema).await?;
        info!(backend = self.store.backend(), "Collection created");
        Ok(true)
    }

    /// Delete the collection and all records.
    ///
    /// An absent collection yields `CollectionAlreadyAbsent`.
    #[instrument(skip(self), fields(collection = %self.name()))]
    pub async fn delete(&self) -> Result<()> {
        if !self.store.collection_exists(self.name()).await? {
            return Err(AppError::CollectionAlreadyAbsent {
                collection: self.name().to_string(),
            });
        }
        self.store.delete_collection(self.name()).await?;
        info!(backend = self.store.backend(), "Collection deleted");
        Ok(())
    }

    /// Submit one ingestion call's records as a single bulk insert
    pub async fn insert_many(&self, records: &[StoredRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        self.store.insert_many(self.name(), records).await
    }

    /// The single best match for a query, if any
    pub async fn nearest(&self, query: &str) -> Result<Option<ScoredRecord>> {
        let mut matches = self.store.near_text(self.name(), query, 1).await?;
        if matches.is_empty() {
            return Ok(None);
        }
        Ok(Some(matches.swap_remove(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection() -> (Arc<InMemoryStore>, Collection) {
        let store = Arc::new(InMemoryStore::new());
        let collection = Collection::new(store.clone(), CollectionSchema::documents("HR_doc", None));
        (store, collection)
    }

    #[test]
    fn test_documents_schema_has_body_property() {
        let schema = CollectionSchema::documents("HR_doc", None);
        assert_eq!(schema.properties.len(), 1);
        assert_eq!(schema.properties[0].name, "body");
        assert_eq!(schema.properties[0].data_type, DataType::Text);
    }

    #[tokio::test]
    async fn test_ensure_exists_is_idempotent() {
        let (store, collection) = collection();
        assert!(collection.ensure_exists().await.unwrap());
        assert!(!collection.ensure_exists().await.unwrap());
        assert!(store.collection_exists("HR_doc").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_absent_collection_is_reported() {
        let (_store, collection) = collection();
        let err = collection.delete().await.unwrap_err();
        assert!(matches!(err, AppError::CollectionAlreadyAbsent { .. }));
        assert!(err.is_informational());
    }

    #[tokio::test]
    async fn test_delete_removes_records() {
        let (store, collection) = collection();
        collection.ensure_exists().await.unwrap();
        collection
            .insert_many(&[StoredRecord {
                id: Uuid::nil(),
                body: "annual leave".into(),
            }])
            .await
            .unwrap();

        collection.delete().await.unwrap();
        assert!(!store.collection_exists("HR_doc").await.unwrap());
        assert!(collection.nearest("annual leave").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_nearest_on_empty_collection_is_none() {
        let (_store, collection) = collection();
        collection.ensure_exists().await.unwrap();
        assert!(collection.nearest("vacation policy").await.unwrap().is_none());
    }
}
