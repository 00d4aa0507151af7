//! Error types for Lumina services
//!
//! Provides:
//! - One error enum covering every pipeline stage
//! - Machine-readable error codes for logs
//! - HTTP status code mapping
//! - The `{"message"}` / `{"error"}` response bodies the API contract uses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Client input (1xxx)
    ValidationError,
    MissingFile,
    EmptyFilename,
    PayloadTooLarge,

    // Collection lifecycle (4xxx)
    CollectionAlreadyAbsent,

    // Pipeline stages (8xxx)
    DocumentUnreadable,
    StoreWriteFailed,
    RetrievalFailed,
    CompletionFailed,
    StoreUnavailable,

    // Internal (9xxx)
    ConfigurationMissing,
    ConfigurationError,
    SerializationError,
    InternalError,
    RequestTimeout,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingFile => 1002,
            ErrorCode::EmptyFilename => 1003,
            ErrorCode::PayloadTooLarge => 1004,

            ErrorCode::CollectionAlreadyAbsent => 4001,

            ErrorCode::DocumentUnreadable => 8001,
            ErrorCode::StoreWriteFailed => 8002,
            ErrorCode::RetrievalFailed => 8003,
            ErrorCode::CompletionFailed => 8004,
            ErrorCode::StoreUnavailable => 8005,

            ErrorCode::ConfigurationMissing => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
            ErrorCode::InternalError => 9004,
            ErrorCode::RequestTimeout => 9005,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Client input
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("No file part")]
    MissingFile,

    #[error("No selected file")]
    EmptyFilename,

    #[error("Payload too large: upload exceeds limit of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    // Pipeline stages
    #[error("Document unreadable: {message}")]
    DocumentUnreadable { message: String },

    #[error("Store write failed: {message}")]
    StoreWriteFailed { message: String },

    #[error("Retrieval failed: {message}")]
    RetrievalFailed { message: String },

    #[error("Completion failed: {message}")]
    CompletionFailed { message: String },

    #[error("Vector store unavailable: {message}")]
    StoreUnavailable { message: String },

    /// Informational: the collection was already gone when deletion was requested
    #[error("Collection '{collection}' does not exist.")]
    CollectionAlreadyAbsent { collection: String },

    // Configuration
    #[error("Missing required configuration: {key}")]
    ConfigurationMissing { key: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // Internal errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Request timed out")]
    RequestTimeout,
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingFile => ErrorCode::MissingFile,
            AppError::EmptyFilename => ErrorCode::EmptyFilename,
            AppError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            AppError::DocumentUnreadable { .. } => ErrorCode::DocumentUnreadable,
            AppError::StoreWriteFailed { .. } => ErrorCode::StoreWriteFailed,
            AppError::RetrievalFailed { .. } => ErrorCode::RetrievalFailed,
            AppError::CompletionFailed { .. } => ErrorCode::CompletionFailed,
            AppError::StoreUnavailable { .. } => ErrorCode::StoreUnavailable,
            AppError::CollectionAlreadyAbsent { .. } => ErrorCode::CollectionAlreadyAbsent,
            AppError::ConfigurationMissing { .. } => ErrorCode::ConfigurationMissing,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::RequestTimeout => ErrorCode::RequestTimeout,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } | AppError::MissingFile | AppError::EmptyFilename => {
                StatusCode::BAD_REQUEST
            }

            // 404 Not Found
            AppError::CollectionAlreadyAbsent { .. } => StatusCode::NOT_FOUND,

            // 413 Payload Too Large
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            // 504 Gateway Timeout
            AppError::RequestTimeout => StatusCode::GATEWAY_TIMEOUT,

            // 500 Internal Server Error
            AppError::DocumentUnreadable { .. }
            | AppError::StoreWriteFailed { .. }
            | AppError::RetrievalFailed { .. }
            | AppError::CompletionFailed { .. }
            | AppError::StoreUnavailable { .. }
            | AppError::ConfigurationMissing { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Outcomes reported through the error channel that are not failures
    pub fn is_informational(&self) -> bool {
        matches!(self, AppError::CollectionAlreadyAbsent { .. })
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Failure body returned by every API operation.
///
/// Client errors carry `message`, server errors carry `error`.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorResponse {
    pub fn for_status(status: StatusCode, text: String) -> Self {
        if status.is_server_error() {
            Self { message: None, error: Some(text) }
        } else {
            Self { message: Some(text), error: None }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_informational() {
            tracing::info!(code = ?code, status = status.as_u16(), "{}", message);
        } else if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        (status, Json(ErrorResponse::for_status(status, message))).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}
