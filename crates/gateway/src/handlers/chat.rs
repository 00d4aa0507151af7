//! Chat handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use lumina_common::errors::{AppError, Result};

/// Chat request; a missing query is treated as empty
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Answer one question from the stored document
pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    // An unparseable body is an unexpected failure, not a client input error
    let Json(request) = payload.map_err(|e| AppError::Internal {
        message: e.body_text(),
    })?;

    let answer = state.answers.answer(&request.query).await?;

    Ok(Json(ChatResponse {
        response: answer.response,
    }))
}
