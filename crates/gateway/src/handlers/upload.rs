//! Document upload handler

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use tracing::{debug, info};

use super::MessageResponse;
use crate::AppState;
use lumina_common::errors::{AppError, Result};

pub const UPLOAD_SUCCESS: &str = "PDF processed and data stored successfully.";

const FILE_FIELD: &str = "file";
const HISTORY_FIELD: &str = "history";

/// Parts of an upload form
#[derive(Debug, Default)]
pub struct UploadForm {
    document: Option<Vec<u8>>,
    empty_filename: bool,
    /// Round-tripped conversation history, UI uploads only
    pub history: String,
}

impl UploadForm {
    /// Read every part of the form.
    ///
    /// Only a `file` part carrying a filename counts as the document.
    pub async fn read(mut multipart: Multipart, limit: usize) -> Result<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, limit))?
        {
            let name = field.name().map(str::to_owned);
            let filename = field.file_name().map(str::to_owned);

            match (name.as_deref(), filename.as_deref()) {
                (Some(FILE_FIELD), Some("")) => form.empty_filename = true,
                (Some(FILE_FIELD), Some(filename)) => {
                    debug!(filename, "Receiving document");
                    let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
                    form.document = Some(bytes.to_vec());
                }
                (Some(HISTORY_FIELD), _) => {
                    form.history = field.text().await.map_err(|e| multipart_error(e, limit))?;
                }
                _ => {}
            }
        }

        Ok(form)
    }

    pub fn document(self) -> Result<Vec<u8>> {
        match self.document {
            Some(document) => Ok(document),
            None if self.empty_filename => Err(AppError::EmptyFilename),
            None => Err(AppError::MissingFile),
        }
    }
}

fn multipart_error(err: MultipartError, limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { limit }
    } else {
        AppError::Validation {
            message: err.body_text(),
            field: Some(FILE_FIELD.to_string()),
        }
    }
}

/// Ingest an uploaded PDF into the collection
pub async fn upload(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<MessageResponse>> {
    // A request that is not multipart has no file part either
    let multipart = multipart.map_err(|e| {
        debug!(error = %e, "Upload is not a multipart request");
        AppError::MissingFile
    })?;

    let limit = state.config.server.max_upload_bytes;
    let document = UploadForm::read(multipart, limit).await?.document()?;

    let report = state.ingestion.ingest_pdf(document).await?;
    info!(
        document_id = %report.document_id,
        pages = report.pages.len(),
        chunks = report.chunks_stored,
        "PDF processed and data stored"
    );

    Ok(Json(MessageResponse::new(UPLOAD_SUCCESS)))
}
