//! Gemini-based implementation of [`brain_core::Brain`].
//!
//! The binding owns everything specific to the hosted API:
//!
//! - Maps `assistant` turns to the API's `model` role
//! - Sends images inline as base64 parts
//! - Converts HTTP status codes into typed [`BrainError`] kinds
//! - Configurable via environment variables
//!
//! # Usage
//!
//! ```rust,no_run
//! use gemini_brain::{GeminiBrain, GeminiBrainConfig};
//! use brain_core::{Brain, ChatTurn, GenerationRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let brain = GeminiBrain::new(GeminiBrainConfig::from_env()?)?;
//!     let request = GenerationRequest::new("Ти консультант магазину.")
//!         .with_turn(ChatTurn::user("Є сукні розміру M?"));
//!     let reply = brain.generate(request).await?;
//!     println!("{}", reply);
//!     Ok(())
//! }
//! ```

mod api_types;
mod brain;
mod config;

pub use brain::GeminiBrain;
pub use config::{GeminiBrainConfig, GeminiBrainConfigBuilder};

// Re-export brain-core types for convenience
pub use brain_core::{async_trait, Brain, BrainError, BrainErrorKind, GenerationRequest};
