//! Echo brain implementation - echoes the customer's last turn back.

use brain_core::{async_trait, Brain, BrainError, GenerationRequest};

/// A brain that answers with the text of the last user turn.
///
/// Useful for testing the message flow without any AI processing.
#[derive(Debug, Clone, Default)]
pub struct EchoBrain {
    /// Optional prefix to add before the echo.
    prefix: Option<String>,
}

impl EchoBrain {
    /// Create a new EchoBrain with no prefix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new EchoBrain with a custom prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }
}

#[async_trait]
impl Brain for EchoBrain {
    async fn generate(&self, request: GenerationRequest) -> Result<String, BrainError> {
        let text = request.last_user_text().ok_or(BrainError::EmptyResponse)?;

        Ok(match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, text),
            None => text.to_string(),
        })
    }

    fn name(&self) -> &str {
        "EchoBrain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brain_core::ChatTurn;

    #[tokio::test]
    async fn test_echo_no_prefix() {
        let brain = EchoBrain::new();
        let request = GenerationRequest::new("sys").with_turn(ChatTurn::user("Привіт"));
        assert_eq!(brain.generate(request).await.unwrap(), "Привіт");
    }

    #[tokio::test]
    async fn test_echo_with_prefix() {
        let brain = EchoBrain::with_prefix("Echo: ");
        let request = GenerationRequest::new("sys").with_turn(ChatTurn::user("Hello!"));
        assert_eq!(brain.generate(request).await.unwrap(), "Echo: Hello!");
    }

    #[tokio::test]
    async fn test_echo_without_user_turn() {
        let brain = EchoBrain::new();
        let result = brain.generate(GenerationRequest::new("sys")).await;
        assert!(matches!(result, Err(BrainError::EmptyResponse)));
    }
}
