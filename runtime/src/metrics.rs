//! Prometheus metrics for the lottery engine.
//!
//! Counters cover:
//! - Committed draws and the entrants they moved, per operation
//! - Notification outcomes, per category
//! - Per-entrant directory failures
//! - Optimistic concurrency conflicts on the event record store
//!
//! # Example
//!
//! ```rust,no_run
//! use waitlist_lottery_runtime::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut recorder = MetricsRecorder::new();
//! recorder.install()?;
//! let scrape = recorder.render();
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use waitlist_lottery_core::notification::NotificationCategory;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Global Prometheus recorder.
///
/// Only installs the recorder and renders scrape text; serving it is left to
/// whatever HTTP surface embeds the engine.
#[derive(Default)]
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl MetricsRecorder {
    /// Recorder that has not been installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Register descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., by another test), this
    /// logs a warning and succeeds without a handle.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Lottery metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the recorder was not installed by this value.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "lottery_draws_total",
        "Total number of committed draws, by operation"
    );
    describe_counter!(
        "lottery_entrants_drawn_total",
        "Total number of entrants moved from a waitlist to selected, by operation"
    );
    describe_counter!(
        "lottery_notifications_total",
        "Notification outcomes (sent, skipped, failed), by category"
    );
    describe_counter!(
        "lottery_directory_failures_total",
        "Per-entrant directory updates that failed, by operation"
    );
    describe_counter!(
        "lottery_concurrency_conflicts_total",
        "Event record commits rejected by the store's version check"
    );
    describe_histogram!(
        "lottery_dispatch_duration_seconds",
        "Time taken to dispatch one batch of notifications"
    );
}

/// Engine operation a metric or log line refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Capacity-bounded lottery round
    Lottery,
    /// Single-entrant draw after a decline
    Replacement,
    /// Organizer-initiated exact-count draw
    Redraw,
    /// Join, leave, accept or cancel
    Membership,
}

impl Operation {
    /// Metric label value
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Lottery => "lottery",
            Self::Replacement => "replacement",
            Self::Redraw => "redraw",
            Self::Membership => "membership",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What happened to one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Accepted by the channel
    Sent,
    /// Recipient not eligible or unknown
    Skipped,
    /// Refused by the channel
    Failed,
}

impl DeliveryOutcome {
    const fn label(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

/// Lottery metrics recorder.
pub struct LotteryMetrics;

impl LotteryMetrics {
    /// Record a committed draw that moved `drawn` entrants.
    pub fn record_draw(operation: Operation, drawn: usize) {
        counter!("lottery_draws_total", "operation" => operation.label()).increment(1);
        counter!("lottery_entrants_drawn_total", "operation" => operation.label())
            .increment(drawn as u64);
    }

    /// Record one notification outcome.
    pub fn record_notification(category: NotificationCategory, outcome: DeliveryOutcome) {
        counter!(
            "lottery_notifications_total",
            "category" => category.tag(),
            "outcome" => outcome.label()
        )
        .increment(1);
    }

    /// Record a failed per-entrant directory update.
    pub fn record_directory_failure(operation: Operation) {
        counter!("lottery_directory_failures_total", "operation" => operation.label()).increment(1);
    }

    /// Record a commit rejected by the store's version check.
    pub fn record_conflict(operation: Operation) {
        counter!("lottery_concurrency_conflicts_total", "operation" => operation.label())
            .increment(1);
    }

    /// Record how long a dispatch batch took.
    pub fn record_dispatch(category: NotificationCategory, duration: Duration) {
        histogram!("lottery_dispatch_duration_seconds", "category" => category.tag())
            .record(duration.as_secs_f64());
    }
}
