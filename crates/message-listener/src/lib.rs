//! Message listener for the storefront assistant.
//!
//! This crate drives the [`orchestrator::Orchestrator`] from a polling loop
//! and provides [`HttpBridgeSource`], the transport that talks to the
//! external channel bridge.
//!
//! # Example
//!
//! ```rust,ignore
//! use message_listener::{BridgeConfig, EventProcessor, HttpBridgeSource, ProcessorConfig};
//!
//! let source = HttpBridgeSource::new(BridgeConfig::from_env())?;
//! let orchestrator = Orchestrator::new(config, db, brain, catalog, dispatcher, source);
//!
//! let processor = EventProcessor::new(orchestrator, ProcessorConfig::from_env());
//! let stats = processor.run_until_stopped().await;
//! println!("handled {} messages", stats.handled);
//! ```

pub mod bridge;
pub mod processor;

use thiserror::Error;

pub use bridge::{BridgeConfig, HttpBridgeSource, DEFAULT_BRIDGE_URL};
pub use processor::{EventProcessor, ProcessorConfig, ProcessorStats};

/// Errors that can occur while talking to the channel bridge.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The bridge answered with an error status.
    #[error("bridge returned {status}: {body}")]
    Bridge { status: u16, body: String },

    /// The bridge sent malformed JSON.
    #[error("invalid bridge payload: {0}")]
    Json(#[from] serde_json::Error),
}
