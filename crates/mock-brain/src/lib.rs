//! Test doubles for [`brain_core::Brain`].
//!
//! - `ScriptedBrain` - Replays queued replies or errors and records every request
//! - `EchoBrain` - Echoes the last customer turn back
//! - `DelayedBrain` - Wraps another brain with artificial delay
//!
//! # Example
//!
//! ```rust
//! use mock_brain::{Brain, ChatTurn, GenerationRequest, ScriptedBrain};
//!
//! #[tokio::main]
//! async fn main() {
//!     let brain = ScriptedBrain::new().with_reply("Вітаю!");
//!     let request = GenerationRequest::new("sys").with_turn(ChatTurn::user("Привіт"));
//!
//!     assert_eq!(brain.generate(request).await.unwrap(), "Вітаю!");
//!     assert_eq!(brain.call_count(), 1);
//! }
//! ```

mod delayed;
mod echo;
mod scripted;

// Re-export brain-core types for convenience
pub use brain_core::{
    async_trait, Brain, BrainError, BrainErrorKind, ChatTurn, GenerationRequest, ImageInput,
    TurnRole,
};

pub use delayed::DelayedBrain;
pub use echo::EchoBrain;
pub use scripted::ScriptedBrain;
