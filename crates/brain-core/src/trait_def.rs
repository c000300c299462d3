//! The Brain trait definition.

use async_trait::async_trait;

use crate::error::BrainError;
use crate::turn::GenerationRequest;

/// A backend that turns assembled conversation context into reply text.
///
/// Implementations range from HTTP bindings of a hosted model to scripted
/// test doubles. The trait is object-safe and is usually held as
/// `Arc<dyn Brain>`.
#[async_trait]
pub trait Brain: Send + Sync {
    /// Generate a reply for the given request.
    ///
    /// Failures must carry an explicit [`BrainErrorKind`](crate::BrainErrorKind)
    /// so callers can classify them without inspecting message text.
    async fn generate(&self, request: GenerationRequest) -> Result<String, BrainError>;

    /// Get a human-readable name for this backend.
    fn name(&self) -> &str;

    /// Check if the backend is ready to serve requests.
    ///
    /// Default implementation always returns true.
    async fn is_ready(&self) -> bool {
        true
    }
}
