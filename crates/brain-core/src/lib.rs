//! Core trait and types for reply generation.
//!
//! This crate provides the shared interface between the conversation core
//! and the generation API bindings. It defines:
//!
//! - [`Brain`] - The trait that every generation backend implements
//! - [`GenerationRequest`] / [`ChatTurn`] - System instructions plus role-tagged turns
//! - [`BrainError`] / [`BrainErrorKind`] - Typed failures with an explicit kind
//! - [`fingerprint`] - Stable prompt fingerprints for version tracking
//!
//! # Example
//!
//! ```rust
//! use brain_core::{Brain, BrainError, GenerationRequest};
//! use async_trait::async_trait;
//!
//! struct FixedBrain;
//!
//! #[async_trait]
//! impl Brain for FixedBrain {
//!     async fn generate(&self, _request: GenerationRequest) -> Result<String, BrainError> {
//!         Ok("Вітаю!".to_string())
//!     }
//!
//!     fn name(&self) -> &str {
//!         "FixedBrain"
//!     }
//! }
//! ```

mod error;
mod prompt;
mod trait_def;
mod turn;

pub use error::{BrainError, BrainErrorKind};
pub use prompt::{fingerprint, short_fingerprint};
pub use trait_def::Brain;
pub use turn::{ChatTurn, GenerationRequest, ImageInput, TurnRole};

// Re-export async_trait for convenience
pub use async_trait::async_trait;
