//! Prometheus metrics for the booking core.
//!
//! Counters and histograms are recorded through the `metrics` facade from
//! anywhere in the workspace. [`MetricsRegistry`] installs the Prometheus
//! recorder and renders the scrape body served at `GET /metrics`.
//!
//! # Example
//!
//! ```rust,no_run
//! use clubpass_runtime::metrics::{MetricsRegistry, PaymentMetrics};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = MetricsRegistry::install()?;
//! PaymentMetrics::record_order_created();
//! let body = registry.render();
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

pub use metrics::{counter, histogram};

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build the exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install the recorder
    #[error("Failed to install metrics recorder: {0}")]
    Install(String),
}

/// Installed Prometheus recorder.
#[derive(Clone)]
pub struct MetricsRegistry {
    handle: PrometheusHandle,
}

impl MetricsRegistry {
    /// Describe all metrics and install the global recorder.
    ///
    /// A recorder installed earlier in the process (tests build several
    /// routers) is tolerated; the returned registry then renders only what
    /// its own recorder saw.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Build`] if the exporter cannot be configured.
    pub fn install() -> Result<Self, MetricsError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .build_recorder();
        let handle = recorder.handle();

        match metrics::set_global_recorder(recorder) {
            Ok(()) => {
                register_metrics();
                tracing::info!("Prometheus metrics recorder installed");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Metrics recorder already initialized, skipping re-initialization");
            }
        }

        Ok(Self { handle })
    }

    /// Render current metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry").finish_non_exhaustive()
    }
}

fn register_metrics() {
    describe_counter!(
        "clubpass_orders_created_total",
        "Gateway orders created with a pending booking"
    );
    describe_counter!(
        "clubpass_orders_rejected_total",
        "Order requests rejected, labelled by reason"
    );
    describe_counter!(
        "clubpass_verifications_total",
        "Checkout verifications, labelled by outcome"
    );
    describe_counter!(
        "clubpass_webhook_events_total",
        "Webhook deliveries, labelled by event type"
    );
    describe_counter!(
        "clubpass_rate_limit_blocks_total",
        "Clients blocked after exceeding a quota"
    );
    describe_counter!(
        "clubpass_rate_limit_rejections_total",
        "Requests rejected by the rate guard"
    );
    describe_counter!(
        "clubpass_sweep_removed_total",
        "Entries removed by background sweeps, labelled by task"
    );
    describe_counter!(
        "clubpass_orphaned_orders_total",
        "Gateway orders created without a stored booking"
    );
    describe_counter!(
        "clubpass_unreconciled_payments_total",
        "Successful payments received for bookings already failed"
    );
    describe_histogram!(
        "clubpass_gateway_request_duration_seconds",
        "Latency of payment gateway calls"
    );
}

/// Order and payment counters.
pub struct PaymentMetrics;

impl PaymentMetrics {
    /// An order was created and its booking stored.
    pub fn record_order_created() {
        counter!("clubpass_orders_created_total").increment(1);
    }

    /// An order request was rejected.
    pub fn record_order_rejected(reason: &'static str) {
        counter!("clubpass_orders_rejected_total", "reason" => reason).increment(1);
    }

    /// A gateway order exists without a booking row.
    pub fn record_orphaned_order() {
        counter!("clubpass_orphaned_orders_total").increment(1);
    }

    /// A payment succeeded against a failed booking.
    pub fn record_unreconciled_payment() {
        counter!("clubpass_unreconciled_payments_total").increment(1);
    }

    /// A checkout verification finished.
    pub fn record_verification(outcome: &'static str) {
        counter!("clubpass_verifications_total", "outcome" => outcome).increment(1);
    }

    /// A webhook was received.
    pub fn record_webhook(event: &'static str) {
        counter!("clubpass_webhook_events_total", "event" => event).increment(1);
    }

    /// A gateway call completed.
    pub fn record_gateway_call(duration: Duration) {
        histogram!("clubpass_gateway_request_duration_seconds").record(duration.as_secs_f64());
    }
}
