pub mod auth;
pub mod sharing;
pub mod timeline;

use serde::Serialize;

/// Message response for simple operations.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
