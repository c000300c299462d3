//! Error types for orchestrator operations.

use std::path::PathBuf;

use database::DatabaseError;
use thiserror::Error;

/// Errors that can occur while processing a customer message.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The message was already processed.
    #[error("duplicate message from {customer_id}")]
    DuplicateMessage { customer_id: String },

    /// A collaborator could not be reached and has no fallback for this operation.
    #[error("{dependency} unavailable: {reason}")]
    DependencyUnavailable {
        dependency: &'static str,
        reason: String,
    },

    /// The CRM push failed at the given stage.
    #[error("CRM push failed at {stage}: {reason}")]
    CrmPushFailed { stage: PushStage, reason: String },

    /// The stored order is no longer in the `new` state.
    #[error("order {order_id} already pushed (status {status})")]
    AlreadyPushed { order_id: i64, status: String },

    /// Store operation failed.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Outbound message could not be delivered.
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Which half of the CRM push failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushStage {
    Client,
    Sale,
}

impl std::fmt::Display for PushStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PushStage::Client => "client",
            PushStage::Sale => "sale",
        })
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configured file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A variable holds a value that cannot be parsed.
    #[error("invalid {name}: {value}")]
    Invalid { name: &'static str, value: String },

    /// A JSON file could not be parsed.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
