//! Lumina Ingestion
//!
//! Turns an uploaded PDF into records of the shared collection:
//! 1. Extracts the text layer page by page
//! 2. Splits the text into overlapping chunks
//! 3. Derives a deterministic id per chunk
//! 4. Bulk-inserts the chunks in one call

pub mod chunker;
pub mod identifier;
pub mod pdf;
pub mod processor;

pub use chunker::{Chunker, ChunkingConfig, TextChunk};
pub use pdf::{extract_text_from_pdf, Extraction, PageOutcome, PageReport};
pub use processor::{IngestionProcessor, IngestionReport};
