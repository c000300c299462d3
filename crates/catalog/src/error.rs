//! Error types for the catalog crate.

use thiserror::Error;

/// Errors that can occur when reading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request to the knowledge base failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Knowledge base answered with a non-success status.
    #[error("knowledge base returned {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading the local catalog file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A row could not be turned into a typed record.
    #[error("invalid {kind} row: {reason}")]
    InvalidRow { kind: &'static str, reason: String },
}
