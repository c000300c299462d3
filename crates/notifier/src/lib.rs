//! Operator notifications for the storefront assistant.
//!
//! Alerts are templated ([`Alert`]) and delivered through a [`Notifier`].
//! The [`Dispatcher`] wraps a notifier so delivery is fire-and-forget:
//! failures are logged and never reach the caller.
//!
//! # Example
//!
//! ```no_run
//! use notifier::{Alert, AlertKind, Dispatcher, TelegramConfig, TelegramNotifier};
//!
//! # async fn example() -> Result<(), notifier::NotifyError> {
//! let config = TelegramConfig::new("BOT_TOKEN", "-1001234567890");
//! let dispatcher = Dispatcher::new(TelegramNotifier::new(config)?);
//!
//! dispatcher
//!     .notify(Alert::new(AlertKind::Escalation, "maria").field("Причина", "менеджер"))
//!     .await;
//! # Ok(())
//! # }
//! ```

pub mod alert;
pub mod telegram;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

pub use alert::{Alert, AlertKind};
pub use telegram::{TelegramConfig, TelegramNotifier};

/// Errors that can occur while delivering an alert.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The channel refused the message.
    #[error("delivery rejected with {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Delivery failed for another reason.
    #[error("delivery failed: {0}")]
    Failed(String),
}

/// A delivery channel for operator alerts.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, alert: &Alert) -> Result<(), NotifyError>;

    fn name(&self) -> &str;
}

/// Writes alerts to the log only. Used when no operator channel is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, alert: &Alert) -> Result<(), NotifyError> {
        info!(kind = %alert.kind, customer_id = %alert.customer_id, "{}", alert.render());
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Records alerts in memory. Optionally fails every delivery after recording it.
#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    alerts: Arc<Mutex<Vec<Alert>>>,
    failing: bool,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose deliveries are recorded but reported as failed.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn of_kind(&self, kind: AlertKind) -> Vec<Alert> {
        self.alerts()
            .into_iter()
            .filter(|a| a.kind == kind)
            .collect()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn deliver(&self, alert: &Alert) -> Result<(), NotifyError> {
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.push(alert.clone());
        }
        if self.failing {
            return Err(NotifyError::Failed("memory notifier set to fail".into()));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Fire-and-forget front for a [`Notifier`].
#[derive(Clone)]
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(notifier: impl Notifier + 'static) -> Self {
        Self {
            notifier: Arc::new(notifier),
        }
    }

    pub fn from_arc(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Deliver an alert, logging (never returning) any failure.
    pub async fn notify(&self, alert: Alert) {
        if let Err(e) = self.notifier.deliver(&alert).await {
            warn!(
                kind = %alert.kind,
                customer_id = %alert.customer_id,
                notifier = self.notifier.name(),
                "Alert delivery failed: {}",
                e
            );
        }
    }

    pub fn notifier_name(&self) -> &str {
        self.notifier.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatcher_swallows_failures() {
        let memory = MemoryNotifier::failing();
        let dispatcher = Dispatcher::new(memory.clone());

        dispatcher.notify(Alert::new(AlertKind::Error, "maria")).await;

        assert_eq!(memory.of_kind(AlertKind::Error).len(), 1);
    }

    #[tokio::test]
    async fn test_memory_notifier_filters_by_kind() {
        let memory = MemoryNotifier::new();
        let dispatcher = Dispatcher::new(memory.clone());
        dispatcher.notify(Alert::new(AlertKind::NewLead, "a")).await;
        dispatcher.notify(Alert::new(AlertKind::NewOrder, "a")).await;

        assert_eq!(memory.alerts().len(), 2);
        assert_eq!(memory.of_kind(AlertKind::NewOrder).len(), 1);
        assert_eq!(dispatcher.notifier_name(), "memory");
    }
}
