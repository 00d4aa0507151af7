//! Chat session lifecycle
//!
//! Ending a chat drops the whole collection; the next upload recreates it.

use axum::{extract::State, Json};
use tracing::info;

use super::MessageResponse;
use crate::AppState;
use lumina_common::errors::Result;

/// Delete the collection and every stored chunk
pub async fn end_chat(State(state): State<AppState>) -> Result<Json<MessageResponse>> {
    let collection = &state.collection;
    collection.delete().await?;

    info!(collection = %collection.name(), "Chat ended");
    Ok(Json(MessageResponse::new(deleted_message(collection.name()))))
}

pub fn deleted_message(collection: &str) -> String {
    format!("Collection '{}' deleted successfully.", collection)
}
