//! The channel seam: where inbound events come from and replies go.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use brain_core::ImageInput;
use serde::{Deserialize, Serialize};

use crate::error::OrchestratorError;

/// What the customer sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    #[default]
    Text,
    Image,
    Voice,
    StoryReply,
    PostShare,
}

impl EventKind {
    /// Annotation prefixed to the stored and generated user turn.
    pub fn annotation(&self) -> Option<&'static str> {
        match self {
            EventKind::Text => None,
            EventKind::Image => Some("[Фото]"),
            EventKind::Voice => Some("[Голосове повідомлення]"),
            EventKind::StoryReply => Some("[Відповідь на сторіс]"),
            EventKind::PostShare => Some("[Поширений допис]"),
        }
    }
}

/// One inbound customer event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub customer_id: String,
    pub display_name: Option<String>,
    pub text: String,
    pub media: Option<ImageInput>,
    pub channel_timestamp: Option<String>,
    pub kind: EventKind,
}

impl InboundEvent {
    /// A plain text event.
    pub fn text(customer_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            display_name: None,
            text: text.into(),
            media: None,
            channel_timestamp: None,
            kind: EventKind::Text,
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.channel_timestamp = Some(timestamp.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_kind(mut self, kind: EventKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_image(mut self, image: ImageInput) -> Self {
        self.media = Some(image);
        if self.kind == EventKind::Text {
            self.kind = EventKind::Image;
        }
        self
    }

    /// Text as recorded in the transcript: the kind annotation, then the text.
    pub fn rendered_text(&self) -> String {
        let text = self.text.trim();
        match self.kind.annotation() {
            Some(annotation) if text.is_empty() => annotation.to_string(),
            Some(annotation) => format!("{} {}", annotation, text),
            None => text.to_string(),
        }
    }
}

/// Transport that yields inbound events and delivers replies.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// The next pending event, or `None` if nothing is waiting.
    async fn next_event(&self) -> Result<Option<InboundEvent>, OrchestratorError>;

    /// Deliver a reply to a customer.
    async fn send_text(&self, customer_id: &str, text: &str) -> Result<(), OrchestratorError>;
}

/// In-memory source for tests: queued events in, recorded replies out.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    inbound: Arc<Mutex<VecDeque<InboundEvent>>>,
    sent: Arc<Mutex<Vec<(String, String)>>>,
    fail_sends: bool,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose sends always fail (replies are still recorded).
    pub fn failing_sends() -> Self {
        Self {
            fail_sends: true,
            ..Self::default()
        }
    }

    pub fn push(&self, event: InboundEvent) {
        if let Ok(mut inbound) = self.inbound.lock() {
            inbound.push_back(event);
        }
    }

    /// Every `(customer_id, text)` sent so far.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn pending(&self) -> usize {
        self.inbound.lock().map(|i| i.len()).unwrap_or(0)
    }
}

#[async_trait]
impl MessageSource for MemorySource {
    async fn next_event(&self) -> Result<Option<InboundEvent>, OrchestratorError> {
        Ok(self.inbound.lock().ok().and_then(|mut i| i.pop_front()))
    }

    async fn send_text(&self, customer_id: &str, text: &str) -> Result<(), OrchestratorError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((customer_id.to_string(), text.to_string()));
        }
        if self.fail_sends {
            return Err(OrchestratorError::SendFailed("memory source set to fail".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl<T: MessageSource + ?Sized> MessageSource for Arc<T> {
    async fn next_event(&self) -> Result<Option<InboundEvent>, OrchestratorError> {
        (**self).next_event().await
    }

    async fn send_text(&self, customer_id: &str, text: &str) -> Result<(), OrchestratorError> {
        (**self).send_text(customer_id, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_text_annotations() {
        let story = InboundEvent::text("a", "Яка ціна?").with_kind(EventKind::StoryReply);
        assert_eq!(story.rendered_text(), "[Відповідь на сторіс] Яка ціна?");

        let voice = InboundEvent::text("a", "  ").with_kind(EventKind::Voice);
        assert_eq!(voice.rendered_text(), "[Голосове повідомлення]");

        assert_eq!(InboundEvent::text("a", " Привіт ").rendered_text(), "Привіт");
    }

    #[test]
    fn test_image_sets_kind() {
        let event = InboundEvent::text("a", "Таке є?").with_image(ImageInput::new("image/jpeg", vec![1]));
        assert_eq!(event.kind, EventKind::Image);
        assert_eq!(event.rendered_text(), "[Фото] Таке є?");
    }

    #[tokio::test]
    async fn test_memory_source_fifo() {
        let source = MemorySource::new();
        source.push(InboundEvent::text("a", "1"));
        source.push(InboundEvent::text("a", "2"));

        assert_eq!(source.next_event().await.unwrap().unwrap().text, "1");
        assert_eq!(source.pending(), 1);
        source.send_text("a", "reply").await.unwrap();
        assert_eq!(source.sent(), vec![("a".to_string(), "reply".to_string())]);
    }
}
