//! Lumina API Gateway
//!
//! The HTTP entry point for the HR policy assistant.
//! Handles:
//! - Document upload and ingestion
//! - Chat over the stored document
//! - Ending a chat (dropping the collection)
//! - The server-rendered form UI
//! - Observability (logging, metrics, tracing)

mod handlers;
mod middleware;

#[cfg(test)]
mod tests;

use axum::{
    body::Body,
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    http::Request,
    routing::{get, post},
    Router,
};
use lumina_common::{
    completion::{ChatCompletionClient, CompletionProvider},
    config::{AppConfig, ObservabilityConfig},
    metrics,
    store::{VectorStore, WeaviateSettings, WeaviateStore},
    AnswerService, Collection,
};
use lumina_ingestion::IngestionProcessor;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use tokio::signal;
use tower::{timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub collection: Collection,
    pub ingestion: Arc<IngestionProcessor>,
    pub answers: AnswerService,
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire both pipelines over one store and one completion provider
    pub fn new(
        config: AppConfig,
        store: Arc<dyn VectorStore>,
        provider: Arc<dyn CompletionProvider>,
        prometheus: Option<PrometheusHandle>,
    ) -> lumina_common::Result<Self> {
        let collection = lumina_common::collection_from_config(store, &config);
        let ingestion = IngestionProcessor::from_config(collection.clone(), &config)?;
        let answers = lumina_common::answer_service(collection.clone(), provider, &config);

        Ok(Self {
            config: Arc::new(config),
            collection,
            ingestion: Arc::new(ingestion),
            answers,
            prometheus,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    init_tracing(&config.observability);

    info!(
        service = %config.observability.service_name,
        "Starting Lumina API Gateway v{}", lumina_common::VERSION
    );

    config.validate().map_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        e
    })?;

    // Initialize metrics
    let prometheus = PrometheusBuilder::new()
        .set_buckets(metrics::EXTERNAL_CALL_BUCKETS)?
        .install_recorder()?;
    metrics::register_metrics();

    let store = WeaviateStore::new(WeaviateSettings::from_config(&config)?)?;
    info!(cluster = %store.base_url(), "Connecting to vector store...");
    let provider = ChatCompletionClient::from_config(&config)?;

    let addr = config.bind_address();
    let state = AppState::new(config, Arc::new(store), Arc::new(provider), Some(prometheus))?;

    // Uploads recreate the collection on demand, so a failure here is not fatal
    match state.collection.ensure_exists().await {
        Ok(true) => info!(collection = %state.collection.name(), "Collection created"),
        Ok(false) => info!(collection = %state.collection.name(), "Collection already exists"),
        Err(e) => warn!(error = %e, "Could not verify collection at startup"),
    }

    let app = create_router(state);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(observability: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&observability.log_level));

    if observability.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let body_limit = DefaultBodyLimit::max(state.config.server.max_upload_bytes);
    let timeout = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(middleware::handle_timeout))
        .layer(TimeoutLayer::new(state.config.request_timeout()));

    // Every request span carries the service name
    let service = state.config.observability.service_name.clone();
    let trace = TraceLayer::new_for_http().make_span_with(move |request: &Request<Body>| {
        tracing::info_span!(
            "request",
            service = %service,
            method = %request.method(),
            uri = %request.uri()
        )
    });

    Router::new()
        // Pipeline endpoints
        .route("/upload", post(handlers::upload::upload))
        .route("/chat", post(handlers::chat::chat))
        .route("/end_chat", post(handlers::sessions::end_chat))
        // Form UI
        .route("/", get(handlers::ui::index))
        .route("/ui/upload", post(handlers::ui::upload))
        .route("/ui/chat", post(handlers::ui::chat))
        .route("/ui/end_chat", post(handlers::ui::end_chat))
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::health::metrics))
        .layer(body_limit)
        .layer(axum::middleware::from_fn(middleware::track_metrics))
        .layer(timeout)
        .layer(trace)
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
