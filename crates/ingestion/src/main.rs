//! Lumina Ingestion CLI
//!
//! Ingests PDFs from disk into the configured collection, the same way the
//! gateway's upload endpoint does:
//!
//! ```text
//! ingest handbook.pdf benefits.pdf
//! ```

use lumina_common::config::AppConfig;
use lumina_common::store::{WeaviateSettings, WeaviateStore};
use lumina_common::{collection_from_config, VERSION};
use lumina_ingestion::IngestionProcessor;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    if config.observability.json_logging {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(true).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
    }

    let paths: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        anyhow::bail!("usage: ingest <file.pdf>...");
    }

    info!(
        service = %config.observability.service_name,
        "Starting Lumina ingestion v{}", VERSION
    );

    let store = WeaviateStore::new(WeaviateSettings::from_config(&config)?)?;
    let collection = collection_from_config(Arc::new(store), &config);
    let processor = IngestionProcessor::from_config(collection, &config)?;

    let mut failures = 0;
    for path in &paths {
        match processor.ingest_path(path).await {
            Ok(report) => info!(
                path = %path.display(),
                document_id = %report.document_id,
                pages = report.pages.len(),
                chunks = report.chunks_stored,
                "PDF processed and data stored"
            ),
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to process PDF");
                failures += 1;
            }
        }
    }

    info!(total = paths.len(), failures, "Ingestion complete");

    if failures > 0 {
        anyhow::bail!("{} of {} documents failed", failures, paths.len());
    }
    Ok(())
}
