//! HTTP transport to the external channel bridge.
//!
//! The bridge owns the browser session with the messaging channel. It
//! exposes a queue of inbound events and accepts outbound text:
//!
//! - `GET {base}/events/next` returns one event as JSON, or `204` when idle
//! - `POST {base}/messages` with `{"customer_id", "text"}` delivers a reply

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use brain_core::ImageInput;
use orchestrator::{EventKind, InboundEvent, MessageSource, OrchestratorError};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ListenerError;

/// Default bridge address.
pub const DEFAULT_BRIDGE_URL: &str = "http://127.0.0.1:8090";

/// Characters of an error body kept in error messages.
const BODY_PREVIEW_CHARS: usize = 300;

/// Bridge connection settings.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BRIDGE_URL)
    }
}

impl BridgeConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `BRIDGE_URL`, falling back to the default address.
    pub fn from_env() -> Self {
        match env::var("BRIDGE_URL") {
            Ok(url) if !url.trim().is_empty() => Self::new(url.trim()),
            _ => Self::default(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// Media attached to a bridge event.
#[derive(Debug, Clone, Deserialize)]
struct BridgeMedia {
    mime_type: String,
    /// Base64-encoded bytes.
    data: String,
}

/// Event as the bridge serializes it.
#[derive(Debug, Clone, Deserialize)]
struct BridgeEvent {
    customer_id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    kind: EventKind,
    #[serde(default)]
    media: Option<BridgeMedia>,
}

impl BridgeEvent {
    fn into_inbound(self) -> InboundEvent {
        let mut event = InboundEvent::text(self.customer_id, self.text.unwrap_or_default())
            .with_kind(self.kind);
        event.display_name = self.display_name.filter(|n| !n.trim().is_empty());
        event.channel_timestamp = self.timestamp.filter(|t| !t.trim().is_empty());

        if let Some(media) = self.media {
            match BASE64.decode(media.data.as_bytes()) {
                Ok(bytes) => event = event.with_image(ImageInput::new(media.mime_type, bytes)),
                Err(e) => warn!(customer_id = %event.customer_id, "Dropping undecodable media: {}", e),
            }
        }
        event
    }
}

#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    customer_id: &'a str,
    text: &'a str,
}

/// [`MessageSource`] backed by the channel bridge's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpBridgeSource {
    http: Client,
    config: BridgeConfig,
}

impl HttpBridgeSource {
    pub fn new(config: BridgeConfig) -> Result<Self, ListenerError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    async fn fetch_next(&self) -> Result<Option<InboundEvent>, ListenerError> {
        let resp = self.http.get(self.config.url("events/next")).send().await?;
        let status = resp.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ListenerError::Bridge {
                status: status.as_u16(),
                body: preview(&body),
            });
        }

        let event: BridgeEvent = serde_json::from_str(&body)?;
        debug!(customer_id = %event.customer_id, kind = ?event.kind, "Bridge event received");
        Ok(Some(event.into_inbound()))
    }

    async fn post_message(&self, customer_id: &str, text: &str) -> Result<(), ListenerError> {
        let resp = self
            .http
            .post(self.config.url("messages"))
            .json(&OutboundMessage { customer_id, text })
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ListenerError::Bridge {
                status: status.as_u16(),
                body: preview(&body),
            });
        }
        debug!(customer_id = %customer_id, "Reply handed to bridge");
        Ok(())
    }
}

#[async_trait]
impl MessageSource for HttpBridgeSource {
    async fn next_event(&self) -> Result<Option<InboundEvent>, OrchestratorError> {
        self.fetch_next()
            .await
            .map_err(|e| OrchestratorError::DependencyUnavailable {
                dependency: "bridge",
                reason: e.to_string(),
            })
    }

    async fn send_text(&self, customer_id: &str, text: &str) -> Result<(), OrchestratorError> {
        self.post_message(customer_id, text)
            .await
            .map_err(|e| OrchestratorError::SendFailed(e.to_string()))
    }
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}
