//! Operator channel over the Telegram Bot API.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::alert::Alert;
use crate::{Notifier, NotifyError};

const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Configuration for [`TelegramNotifier`].
#[derive(Clone)]
pub struct TelegramConfig {
    pub api_url: String,
    pub bot_token: String,
    pub chat_id: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("api_url", &self.api_url)
            .field("bot_token", &"[REDACTED]")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Load from `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID`; `None` if either is unset.
    pub fn from_env() -> Option<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN").ok().filter(|t| !t.trim().is_empty())?;
        let chat_id = env::var("TELEGRAM_CHAT_ID").ok().filter(|c| !c.trim().is_empty())?;
        Some(Self::new(token, chat_id))
    }

    fn send_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.bot_token)
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

/// Delivers alerts to an operator chat.
#[derive(Clone)]
pub struct TelegramNotifier {
    http: Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self, NotifyError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn deliver(&self, alert: &Alert) -> Result<(), NotifyError> {
        let text = alert.render();
        debug!(kind = %alert.kind, chat_id = %self.config.chat_id, "Sending operator alert");

        let resp = self
            .http
            .post(self.config.send_url())
            .json(&SendMessage {
                chat_id: &self.config.chat_id,
                text: &text,
                disable_web_page_preview: true,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body: body.chars().take(300).collect(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "telegram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AlertKind;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_deliver_posts_rendered_alert() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/botTOKEN/sendMessage")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "chat_id": "-100",
                "text": "🆕 Новий лід\n👤 Клієнт: maria\nТелефон: +380671234567"
            })))
            .with_status(200)
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let notifier =
            TelegramNotifier::new(TelegramConfig::new("TOKEN", "-100").with_api_url(server.url()))
                .unwrap();
        let alert = Alert::new(AlertKind::NewLead, "maria").field("Телефон", "+380671234567");
        notifier.deliver(&alert).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_delivery() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/botTOKEN/sendMessage")
            .with_status(403)
            .with_body(r#"{"ok": false, "description": "bot was blocked"}"#)
            .create_async()
            .await;

        let notifier =
            TelegramNotifier::new(TelegramConfig::new("TOKEN", "-100").with_api_url(server.url()))
                .unwrap();
        let result = notifier.deliver(&Alert::new(AlertKind::Error, "x")).await;
        assert!(matches!(result, Err(NotifyError::Rejected { status: 403, .. })));
    }
}
