//! Request metrics and timeout middleware

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
    BoxError,
};
use lumina_common::{metrics::RequestMetrics, AppError};

/// Record count and latency per route and status
pub async fn track_metrics(request: Request, next: Next) -> Response {
    // Label by route template so unknown paths do not create new series
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_string());

    let tracker = RequestMetrics::start(request.method().as_str(), &endpoint);
    let response = next.run(request).await;
    tracker.finish(response.status().as_u16());

    response
}

/// Turn a layer error into the API's error body; elapsed requests become 504
pub async fn handle_timeout(err: BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        AppError::RequestTimeout
    } else {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}
