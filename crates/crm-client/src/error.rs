//! Error types for crm-client.

use thiserror::Error;

/// Errors that can occur when talking to the CRM.
#[derive(Debug, Error)]
pub enum CrmError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// CRM answered with a non-success status. `body` is truncated.
    #[error("CRM returned {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A create call succeeded but the response carried no id.
    #[error("no id in CRM response: {0}")]
    MissingId(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}
