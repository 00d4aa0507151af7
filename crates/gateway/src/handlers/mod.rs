//! API handlers module

pub mod chat;
pub mod health;
pub mod sessions;
pub mod ui;
pub mod upload;

use serde::Serialize;

/// `{"message": ...}` body shared by the success responses
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
