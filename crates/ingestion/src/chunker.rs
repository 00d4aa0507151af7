//! Text chunking module
//!
//! Splits extracted text into overlapping chunks, preferring paragraph,
//! then sentence, then word boundaries. Sizes are counted in characters.

use lumina_common::config::ChunkingSettings;
use lumina_common::{AppError, Result};
use text_splitter::{ChunkConfig, Characters, TextSplitter};
use tracing::debug;

/// Configuration for text chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl From<&ChunkingSettings> for ChunkingConfig {
    fn from(settings: &ChunkingSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
        }
    }
}

/// A text chunk with its position in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// The chunk content
    pub body: String,
    /// Zero-based position of this chunk in the document
    pub sequence_index: usize,
    /// Byte offset where the chunk starts in the source text
    pub start: usize,
    /// Byte offset one past the chunk end
    pub end: usize,
}

/// Boundary-aware splitter
pub struct Chunker {
    config: ChunkingConfig,
    splitter: TextSplitter<Characters>,
}

impl Chunker {
    /// Fails when the size is zero or the overlap is not smaller than the size
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(AppError::Configuration {
                message: "chunk_size must be greater than zero".to_string(),
            });
        }

        let chunk_config = ChunkConfig::new(config.chunk_size)
            .with_overlap(config.chunk_overlap)
            .map_err(|e| AppError::Configuration {
                message: format!("Invalid chunking configuration: {}", e),
            })?;

        Ok(Self {
            config,
            splitter: TextSplitter::new(chunk_config),
        })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    /// Split text into ordered chunks; blank input yields none
    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let chunks: Vec<TextChunk> = self
            .splitter
            .chunk_indices(text)
            .filter(|(_, chunk)| !chunk.trim().is_empty())
            .enumerate()
            .map(|(sequence_index, (start, chunk))| TextChunk {
                body: chunk.to_string(),
                sequence_index,
                start,
                end: start + chunk.len(),
            })
            .collect();

        debug!(
            input_len = text.len(),
            chunk_count = chunks.len(),
            chunk_size = self.config.chunk_size,
            chunk_overlap = self.config.chunk_overlap,
            "Text chunked"
        );

        chunks
    }
}
