//! Request types passed to a [`Brain`](crate::Brain).

use serde::{Deserialize, Serialize};

/// Who produced a turn.
///
/// Bindings map [`TurnRole::Assistant`] to whatever their API calls the
/// model role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    /// Parse a stored transcript role. Anything other than "assistant" is a user turn.
    pub fn from_stored(role: &str) -> Self {
        if role.eq_ignore_ascii_case("assistant") {
            TurnRole::Assistant
        } else {
            TurnRole::User
        }
    }
}

/// Raw image bytes attached to a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    /// MIME type, e.g. "image/jpeg".
    pub mime_type: String,
    /// Image bytes.
    pub data: Vec<u8>,
}

impl ImageInput {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }
}

/// One role-tagged turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub text: String,
    pub image: Option<ImageInput>,
}

impl ChatTurn {
    /// Create a text-only user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
            image: None,
        }
    }

    /// Create a user turn carrying an image.
    pub fn user_with_image(text: impl Into<String>, image: ImageInput) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
            image: Some(image),
        }
    }

    /// Create an assistant turn.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.into(),
            image: None,
        }
    }
}

/// Everything a backend needs for one generation call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationRequest {
    /// System instructions (prompt plus assembled context).
    pub system_instruction: String,
    /// Chronological turns, the current customer turn last.
    pub turns: Vec<ChatTurn>,
    /// Optional sampling temperature override.
    pub temperature: Option<f32>,
    /// Optional output token limit override.
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            ..Default::default()
        }
    }

    /// Append a turn (builder style).
    pub fn with_turn(mut self, turn: ChatTurn) -> Self {
        self.turns.push(turn);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Text of the last user turn, if any.
    pub fn last_user_text(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|turn| turn.role == TurnRole::User)
            .map(|turn| turn.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_stored() {
        assert_eq!(TurnRole::from_stored("assistant"), TurnRole::Assistant);
        assert_eq!(TurnRole::from_stored("user"), TurnRole::User);
        assert_eq!(TurnRole::from_stored("anything"), TurnRole::User);
    }

    #[test]
    fn test_last_user_text() {
        let request = GenerationRequest::new("system")
            .with_turn(ChatTurn::user("перше"))
            .with_turn(ChatTurn::assistant("відповідь"))
            .with_turn(ChatTurn::user("друге"));

        assert_eq!(request.last_user_text(), Some("друге"));
        assert_eq!(GenerationRequest::new("system").last_user_text(), None);
    }
}
