//! In-memory vector store
//!
//! Test double with Weaviate-like semantics: inserts upsert by id,
//! queries against an absent collection return no matches. Relevance is
//! naive lexical overlap, not embedding similarity.

use super::{CollectionSchema, ScoredRecord, StoredRecord, VectorStore};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Debug)]
struct MemoryCollection {
    schema: CollectionSchema,
    records: Vec<StoredRecord>,
}

/// In-memory store for tests and local development
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, MemoryCollection>>,
    fail_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent insert fail with `StoreWriteFailed`
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of a collection's records in insertion order
    pub async fn records(&self, collection: &str) -> Vec<StoredRecord> {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.records.clone())
            .unwrap_or_default()
    }

    /// Schema a collection was created with
    pub async fn schema(&self, collection: &str) -> Option<CollectionSchema> {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.schema.clone())
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Verbatim containment scores 1.0, otherwise the share of query terms present.
fn lexical_score(query: &str, body: &str) -> f32 {
    let query = query.trim();
    if query.is_empty() {
        return 0.0;
    }
    if body.to_lowercase().contains(&query.to_lowercase()) {
        return 1.0;
    }
    let query_terms = terms(query);
    if query_terms.is_empty() {
        return 0.0;
    }
    let body_terms = terms(body);
    let shared = query_terms.intersection(&body_terms).count();
    // Stay below the verbatim score
    0.99 * shared as f32 / query_terms.len() as f32
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<()> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(&schema.name) {
            return Err(AppError::StoreUnavailable {
                message: format!("collection '{}' already exists", schema.name),
            });
        }
        collections.insert(
            schema.name.clone(),
            MemoryCollection {
                schema: schema.clone(),
                records: Vec::new(),
            },
        );
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.collections.write().await.remove(name);
        Ok(())
    }

    async fn insert_many(&self, collection: &str, records: &[StoredRecord]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::StoreWriteFailed {
                message: "in-memory store configured to reject writes".to_string(),
            });
        }

        let mut collections = self.collections.write().await;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| AppError::StoreWriteFailed {
                message: format!("collection '{}' not found", collection),
            })?;

        for record in records {
            match target.records.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => existing.body = record.body.clone(),
                None => target.records.push(record.clone()),
            }
        }
        Ok(())
    }

    async fn near_text(
        &self,
        collection: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredRecord>> {
        let collections = self.collections.read().await;
        let Some(target) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<ScoredRecord> = target
            .records
            .iter()
            .map(|r| ScoredRecord {
                id: Some(r.id),
                body: r.body.clone(),
                score: lexical_score(query, &r.body),
            })
            .filter(|r| r.score > 0.0)
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
