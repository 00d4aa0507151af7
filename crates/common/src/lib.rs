//! Lumina Common Library
//!
//! Shared code for the Lumina gateway and ingestion tools including:
//! - Configuration management
//! - Error types and handling
//! - Vector store abstraction (Weaviate client, in-memory double)
//! - Completion provider abstraction
//! - Retrieval & answer pipeline
//! - Metrics and observability

pub mod completion;
pub mod config;
pub mod context;
pub mod conversation;
pub mod errors;
pub mod metrics;
pub mod store;

// Re-export commonly used types
pub use completion::CompletionProvider;
pub use config::AppConfig;
pub use context::{Answer, AnswerService};
pub use errors::{AppError, Result};
pub use store::{Collection, CollectionSchema, VectorStore, VectorizerSpec};

use std::sync::Arc;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Collection holding every chunk record of the deployment
pub const DEFAULT_COLLECTION: &str = "HR_doc";

/// System instruction sent ahead of every composed prompt
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful Assistant that Answers User Queries.";

/// Bind a store to the configured collection and its schema
pub fn collection_from_config(store: Arc<dyn VectorStore>, config: &AppConfig) -> Collection {
    let vectorizer = config.vectorizer.model.as_ref().map(|model| VectorizerSpec {
        module: config.vectorizer.module.clone(),
        model: model.clone(),
    });
    Collection::new(
        store,
        CollectionSchema::documents(config.store.collection.clone(), vectorizer),
    )
}

/// Wire the answer pipeline from a collection and a completion provider
pub fn answer_service(
    collection: Collection,
    provider: Arc<dyn CompletionProvider>,
    config: &AppConfig,
) -> AnswerService {
    AnswerService::new(
        context::QueryIssuer::new(collection),
        context::Synthesizer::new(provider, config.completion.system_prompt.clone()),
    )
}
