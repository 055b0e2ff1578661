//! Observability infrastructure for the console
//!
//! Provides:
//! - Prometheus counters for backend calls, reloads and poll activity
//! - Structured logging of lifecycle events with tracing

use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder,
    HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for backend round-trips (in seconds)
const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ConsoleMetricsInner> = OnceLock::new();

struct ConsoleMetricsInner {
    sync_requests: IntCounterVec,
    sync_latency_seconds: HistogramVec,
    optimistic_reloads: IntCounter,
    poll_ticks: IntCounter,
    stale_results: IntCounter,
}

impl ConsoleMetricsInner {
    fn new() -> Self {
        Self {
            sync_requests: register_int_counter_vec!(
                "console_sync_requests_total",
                "Backend calls issued by the console, by operation and outcome",
                &["operation", "outcome"]
            )
            .expect("Failed to register sync_requests_total"),

            sync_latency_seconds: register_histogram_vec!(
                "console_sync_latency_seconds",
                "Round-trip time of backend calls",
                &["operation"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register sync_latency_seconds"),

            optimistic_reloads: register_int_counter!(
                "console_optimistic_reloads_total",
                "Registry reloads forced by an unconfirmed behavior change"
            )
            .expect("Failed to register optimistic_reloads_total"),

            poll_ticks: register_int_counter!(
                "console_poll_ticks_total",
                "Live metrics refreshes fired by the poll scheduler"
            )
            .expect("Failed to register poll_ticks_total"),

            stale_results: register_int_counter!(
                "console_stale_results_total",
                "Fetch results discarded because a newer request or view superseded them"
            )
            .expect("Failed to register stale_results_total"),
        }
    }
}

/// Console metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct ConsoleMetrics {
    _private: (),
}

impl Default for ConsoleMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ConsoleMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ConsoleMetricsInner {
        GLOBAL_METRICS.get_or_init(ConsoleMetricsInner::new)
    }

    /// Record the outcome and duration of one backend call
    pub fn observe_sync(&self, operation: &str, success: bool, duration_secs: f64) {
        let outcome = if success { "success" } else { "failure" };
        self.inner()
            .sync_requests
            .with_label_values(&[operation, outcome])
            .inc();
        self.inner()
            .sync_latency_seconds
            .with_label_values(&[operation])
            .observe(duration_secs);
    }

    pub fn sync_count(&self, operation: &str, success: bool) -> u64 {
        let outcome = if success { "success" } else { "failure" };
        self.inner()
            .sync_requests
            .with_label_values(&[operation, outcome])
            .get()
    }

    pub fn inc_optimistic_reloads(&self) {
        self.inner().optimistic_reloads.inc();
    }

    pub fn inc_poll_ticks(&self) {
        self.inner().poll_ticks.inc();
    }

    pub fn inc_stale_results(&self) {
        self.inner().stale_results.inc();
    }

    pub fn stale_results(&self) -> u64 {
        self.inner().stale_results.get()
    }

    /// Render every registered metric in the Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Structured logger for console lifecycle events
///
/// Every event carries a fixed `event` field so log pipelines can filter
/// on it regardless of the human-readable message.
#[derive(Clone)]
pub struct StructuredLogger {
    endpoint: String,
}

impl StructuredLogger {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    pub fn log_startup(&self, version: &str) {
        info!(
            event = "console_started",
            endpoint = %self.endpoint,
            version = %version,
            "Control panel console started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "console_shutdown",
            endpoint = %self.endpoint,
            reason = %reason,
            "Control panel console shutting down"
        );
    }

    /// Log a registry load
    pub fn log_registry_loaded(&self, services: usize, unavailable: usize, revision: u64) {
        info!(
            event = "registry_loaded",
            endpoint = %self.endpoint,
            services = services,
            unavailable = unavailable,
            revision = revision,
            "Registry loaded from backend"
        );
    }

    /// Log the outcome of an optimistic behavior change
    pub fn log_behavior_change(&self, path: &str, from: &str, to: &str, confirmed: bool) {
        if confirmed {
            info!(
                event = "behavior_changed",
                endpoint = %self.endpoint,
                method = %path,
                from = %from,
                to = %to,
                "Behavior change confirmed"
            );
        } else {
            warn!(
                event = "behavior_change_failed",
                endpoint = %self.endpoint,
                method = %path,
                from = %from,
                to = %to,
                "Behavior change not confirmed, reloading registry"
            );
        }
    }

    pub fn log_service_reset(&self, service: &str, success: bool) {
        if success {
            info!(
                event = "service_reset",
                endpoint = %self.endpoint,
                service = %service,
                "Service reset to template configuration"
            );
        } else {
            warn!(
                event = "service_reset_failed",
                endpoint = %self.endpoint,
                service = %service,
                "Service reset failed"
            );
        }
    }

    /// Log a change of the viewed (service, range) pair
    pub fn log_view_change(&self, service: Option<&str>, minutes: Option<u32>, generation: u64) {
        info!(
            event = "view_changed",
            endpoint = %self.endpoint,
            service = ?service,
            minutes = ?minutes,
            generation = generation,
            "Metrics view changed"
        );
    }

    pub fn log_discovery(&self, full_refresh: bool, message: &str) {
        info!(
            event = "discovery_triggered",
            endpoint = %self.endpoint,
            full_refresh = full_refresh,
            message = %message,
            "Service discovery triggered"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_metrics_counts_by_outcome() {
        let metrics = ConsoleMetrics::new();
        let before_ok = metrics.sync_count("observability_test", true);
        let before_err = metrics.sync_count("observability_test", false);

        metrics.observe_sync("observability_test", true, 0.01);
        metrics.observe_sync("observability_test", true, 0.02);
        metrics.observe_sync("observability_test", false, 0.5);

        assert_eq!(metrics.sync_count("observability_test", true), before_ok + 2);
        assert_eq!(metrics.sync_count("observability_test", false), before_err + 1);
    }

    #[test]
    fn test_render_contains_registered_metrics() {
        let metrics = ConsoleMetrics::new();
        metrics.inc_poll_ticks();
        metrics.observe_sync("render_test", true, 0.01);

        let text = metrics.render();
        assert!(text.contains("console_poll_ticks_total"));
        assert!(text.contains("console_sync_requests_total"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("http://localhost:8080/api");
        assert_eq!(logger.endpoint, "http://localhost:8080/api");
    }
}
