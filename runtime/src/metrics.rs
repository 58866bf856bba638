//! Prometheus metrics for observability and monitoring.
//!
//! Metric collection for the allocation subsystem:
//! - Reservation and release throughput
//! - Lock contention, timeouts, and wait polls
//! - Sweep and draw activity
//!
//! # Example
//!
//! ```rust,no_run
//! use raffle_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

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

/// Prometheus metrics server.
///
/// Exposes metrics on an HTTP endpoint for Prometheus scraping.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address to bind to (e.g., `0.0.0.0:9090`)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Initialize metrics and start the HTTP exporter.
    ///
    /// Must be called from within a Tokio runtime; the exporter is spawned
    /// onto it.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime context.
    ///
    /// # Note
    ///
    /// If a metrics recorder is already installed (e.g., in tests), the
    /// re-initialization is skipped with a warning. In production, ensure
    /// this is only called once.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        let builder = PrometheusBuilder::new().with_http_listener(self.addr);
        let (recorder, exporter) = builder
            .build()
            .map_err(|e| MetricsError::Build(e.to_string()))?;
        let handle = recorder.handle();

        if metrics::set_global_recorder(recorder).is_err() {
            tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
            return Ok(());
        }

        tokio::spawn(async move {
            // ExporterError is opaque (no Display), so log only the event.
            if exporter.await.is_err() {
                tracing::error!("Metrics exporter stopped");
            }
        });
        register_metrics();
        self.handle = Some(handle);
        tracing::info!(
            addr = %self.addr,
            "Metrics server started - available at http://{}/metrics",
            self.addr
        );
        Ok(())
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the server hasn't been started.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Reservation metrics
    describe_counter!(
        "raffle_reservations_total",
        "Total number of successful reservation requests"
    );
    describe_counter!(
        "raffle_tickets_reserved_total",
        "Total number of tickets placed on hold"
    );
    describe_counter!(
        "raffle_reservation_conflicts_total",
        "Reservation requests rejected because a ticket was unavailable"
    );
    describe_counter!(
        "raffle_releases_total",
        "Total number of release requests processed"
    );

    // Lock manager metrics
    describe_counter!(
        "raffle_lock_acquired_total",
        "Reservation locks successfully acquired"
    );
    describe_counter!(
        "raffle_lock_timeouts_total",
        "Lock acquisitions abandoned after the bounded wait"
    );
    describe_counter!(
        "raffle_lock_contention_polls_total",
        "Polls spent waiting on a conflicting hold"
    );

    // Purchase metrics
    describe_counter!(
        "raffle_purchases_total",
        "Total number of committed purchases (entries created)"
    );
    describe_counter!(
        "raffle_tickets_purchased_total",
        "Total number of tickets sold"
    );

    // Sweeper metrics
    describe_counter!("raffle_sweeps_total", "Sweep passes executed");
    describe_counter!(
        "raffle_tickets_swept_total",
        "Expired reservations reclaimed back to available"
    );
    describe_counter!(
        "raffle_sweep_failures_total",
        "Per-ticket reclaim failures (excluding benign races)"
    );

    // Draw metrics
    describe_counter!("raffle_draws_total", "Competitions drawn");
    describe_counter!(
        "raffle_draw_failures_total",
        "Draw attempts that failed during a scanner pass"
    );
}
