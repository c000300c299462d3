//! Polling loop that feeds inbound events through the orchestrator.

use std::env;
use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use orchestrator::{MessageSource, Orchestrator, ProcessOutcome};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Default pause between polls when the source is idle.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Configuration for the event processor.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Pause after a poll that returned nothing.
    pub poll_interval: Duration,

    /// File that receives the current UNIX time after every iteration,
    /// for an external watchdog.
    pub heartbeat_file: Option<PathBuf>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            heartbeat_file: None,
        }
    }
}

impl ProcessorConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_heartbeat_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.heartbeat_file = Some(path.into());
        self
    }

    /// Read `POLL_INTERVAL_MS` and `HEARTBEAT_FILE`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = env::var("POLL_INTERVAL_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.poll_interval = Duration::from_millis(ms),
                Err(_) => warn!("Ignoring invalid POLL_INTERVAL_MS: {}", raw),
            }
        }
        if let Ok(path) = env::var("HEARTBEAT_FILE") {
            if !path.trim().is_empty() {
                config.heartbeat_file = Some(PathBuf::from(path.trim()));
            }
        }
        config
    }
}

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessorStats {
    pub handled: u64,
    pub duplicates: u64,
    pub errors: u64,
}

/// Runs the orchestrator against its source until shutdown.
pub struct EventProcessor<S: MessageSource> {
    orchestrator: Orchestrator<S>,
    config: ProcessorConfig,
}

impl<S: MessageSource> EventProcessor<S> {
    pub fn new(orchestrator: Orchestrator<S>, config: ProcessorConfig) -> Self {
        Self {
            orchestrator,
            config,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator<S> {
        &self.orchestrator
    }

    /// Run until the shutdown signal completes.
    ///
    /// Shutdown is only observed between events, so a message already being
    /// handled finishes first. Processing errors are logged and the loop
    /// continues.
    pub async fn run_with_shutdown<F>(self, shutdown_signal: F) -> ProcessorStats
    where
        F: Future<Output = ()> + Send,
    {
        info!(
            poll_ms = self.config.poll_interval.as_millis() as u64,
            crm = self.orchestrator.has_order_pipeline(),
            "Starting event processor"
        );

        let mut stats = ProcessorStats::default();
        let mut delay = Duration::ZERO;
        tokio::pin!(shutdown_signal);

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown_signal => {
                    info!(
                        handled = stats.handled,
                        duplicates = stats.duplicates,
                        errors = stats.errors,
                        "Shutdown signal received, stopping event processor"
                    );
                    return stats;
                }

                _ = sleep(delay) => {}
            }

            delay = match self.orchestrator.poll_once().await {
                Ok(Some(ProcessOutcome::Replied(exchange))) => {
                    stats.handled += 1;
                    debug!(route = ?exchange.route, delivered = exchange.delivered, "Message handled");
                    Duration::ZERO
                }
                Ok(Some(ProcessOutcome::Duplicate)) => {
                    stats.duplicates += 1;
                    Duration::ZERO
                }
                Ok(None) => self.config.poll_interval,
                Err(e) => {
                    stats.errors += 1;
                    error!("Error processing event: {}", e);
                    self.config.poll_interval
                }
            };

            self.beat().await;
        }
    }

    /// Run until Ctrl+C is pressed.
    #[cfg(feature = "signal")]
    pub async fn run_until_stopped(self) -> ProcessorStats {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
        };
        self.run_with_shutdown(shutdown).await
    }

    async fn beat(&self) {
        let Some(path) = &self.config.heartbeat_file else {
            return;
        };
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        if let Err(e) = tokio::fs::write(path, now.to_string()).await {
            warn!(path = %path.display(), "Failed to write heartbeat: {}", e);
        }
    }
}
