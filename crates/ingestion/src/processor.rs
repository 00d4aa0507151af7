//! Ingestion processor
//!
//! Core logic for one upload: PDF extraction, chunking, identification and
//! a single bulk insert into the collection.

use crate::chunker::{Chunker, ChunkingConfig, TextChunk};
use crate::identifier::{document_id, Identifier};
use crate::pdf::{extract_text_from_pdf, Extraction, PageReport};
use lumina_common::config::{AppConfig, IdStrategy};
use lumina_common::metrics;
use lumina_common::store::StoredRecord;
use lumina_common::{AppError, Collection, Result};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Summary of one ingested document
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    /// Hex SHA-256 of the source bytes
    pub document_id: String,
    pub pages: Vec<PageReport>,
    pub chunks_stored: usize,
}

/// Ingestion processor
pub struct IngestionProcessor {
    collection: Collection,
    chunker: Chunker,
    id_strategy: IdStrategy,
}

impl IngestionProcessor {
    pub fn new(collection: Collection, chunking: ChunkingConfig, id_strategy: IdStrategy) -> Result<Self> {
        Ok(Self {
            collection,
            chunker: Chunker::new(chunking)?,
            id_strategy,
        })
    }

    pub fn from_config(collection: Collection, config: &AppConfig) -> Result<Self> {
        Self::new(
            collection,
            ChunkingConfig::from(&config.chunking),
            config.chunking.id_strategy,
        )
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Ingest an uploaded PDF.
    ///
    /// A document without a text layer stores nothing and still succeeds.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn ingest_pdf(&self, bytes: Vec<u8>) -> Result<IngestionReport> {
        let start = Instant::now();
        let document_id = document_id(&bytes);
        info!(document_id = %document_id, "Extracting text from PDF");

        let extraction = tokio::task::spawn_blocking(move || extract_text_from_pdf(&bytes))
            .await
            .map_err(|e| AppError::Internal {
                message: format!("Extraction task failed: {}", e),
            })??;

        if extraction.is_empty() {
            warn!(document_id = %document_id, "No text content extracted from PDF");
        }

        let Extraction { text, pages } = extraction;
        let chunks_stored = self.store_text(&document_id, &text).await?;

        metrics::record_ingestion(start.elapsed().as_secs_f64(), chunks_stored);

        Ok(IngestionReport {
            document_id,
            pages,
            chunks_stored,
        })
    }

    /// Ingest already extracted text under a caller-supplied document id
    #[instrument(skip(self, text), fields(document_id = %document_id))]
    pub async fn ingest_text(&self, document_id: &str, text: &str) -> Result<usize> {
        let start = Instant::now();
        let stored = self.store_text(document_id, text).await?;
        metrics::record_ingestion(start.elapsed().as_secs_f64(), stored);
        Ok(stored)
    }

    /// Read and ingest a PDF from disk
    pub async fn ingest_path(&self, path: &Path) -> Result<IngestionReport> {
        let bytes = tokio::fs::read(path).await?;
        self.ingest_pdf(bytes).await
    }

    /// Turn chunks into records, in chunk order
    pub fn records(&self, document_id: &str, chunks: &[TextChunk]) -> Vec<StoredRecord> {
        let identifier = Identifier::new(self.id_strategy, document_id);
        chunks
            .iter()
            .map(|chunk| StoredRecord {
                id: identifier.record_id(chunk),
                body: chunk.body.clone(),
            })
            .collect()
    }

    async fn store_text(&self, document_id: &str, text: &str) -> Result<usize> {
        let chunks = self.chunker.chunk(text);
        info!(chunk_count = chunks.len(), "Text chunked");

        if chunks.is_empty() {
            return Ok(0);
        }

        self.collection.ensure_exists().await?;

        let records = self.records(document_id, &chunks);
        self.collection
            .insert_many(&records)
            .await
            .map_err(|e| match e {
                AppError::StoreWriteFailed { .. } => e,
                other => AppError::StoreWriteFailed {
                    message: other.to_string(),
                },
            })?;

        info!(
            collection = %self.collection.name(),
            records = records.len(),
            "Chunks stored"
        );
        Ok(records.len())
    }
}
