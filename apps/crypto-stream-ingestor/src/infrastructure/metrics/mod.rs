//! Prometheus Metrics Module
//!
//! Ingest counters and write latency, exposed at `/metrics` on the health
//! server port.
//!
//! # Metrics
//!
//! - `crypto_ingestor_records_received_total{kind}`
//! - `crypto_ingestor_points_written_total{kind}`
//! - `crypto_ingestor_records_dropped_total{kind}`
//! - `crypto_ingestor_write_failures_total{reason}`
//! - `crypto_ingestor_write_seconds`
//! - `crypto_ingestor_feed_connected`
//! - `crypto_ingestor_reconnects_total`
//! - `crypto_ingestor_feed_errors_total`
//! - `crypto_ingestor_messages_rejected_total`

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Later calls return the existing handle.
///
/// # Errors
///
/// Returns an error if another global recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Prometheus handle for rendering, if [`init_metrics`] has run.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

fn register_metrics() {
    describe_counter!(
        "crypto_ingestor_records_received_total",
        "Records received from the crypto feed"
    );
    describe_counter!(
        "crypto_ingestor_points_written_total",
        "Points accepted by InfluxDB"
    );
    describe_counter!(
        "crypto_ingestor_records_dropped_total",
        "Records given up on after a permanent error or exhausted retries"
    );
    describe_counter!(
        "crypto_ingestor_write_failures_total",
        "Failed point write attempts"
    );
    describe_histogram!(
        "crypto_ingestor_write_seconds",
        "Latency of a single point write"
    );
    describe_gauge!(
        "crypto_ingestor_feed_connected",
        "1 while the crypto feed is authenticated"
    );
    describe_counter!(
        "crypto_ingestor_reconnects_total",
        "WebSocket reconnection attempts"
    );
    describe_counter!(
        "crypto_ingestor_feed_errors_total",
        "Errors reported by the crypto feed"
    );
    describe_counter!(
        "crypto_ingestor_messages_rejected_total",
        "Feed messages or frames that could not be decoded"
    );
}

/// Record an inbound record.
pub fn record_received(kind: &'static str) {
    counter!("crypto_ingestor_records_received_total", "kind" => kind).increment(1);
}

/// Record a successful write.
pub fn record_written(kind: &'static str) {
    counter!("crypto_ingestor_points_written_total", "kind" => kind).increment(1);
}

/// Record a dropped record.
pub fn record_dropped(kind: &'static str) {
    counter!("crypto_ingestor_records_dropped_total", "kind" => kind).increment(1);
}

/// Record a failed write attempt.
pub fn record_write_failure(reason: &'static str) {
    counter!("crypto_ingestor_write_failures_total", "reason" => reason).increment(1);
}

/// Record write latency.
pub fn record_write_duration(duration: Duration) {
    histogram!("crypto_ingestor_write_seconds").record(duration.as_secs_f64());
}

/// Update the feed connection gauge.
pub fn set_feed_connected(connected: bool) {
    gauge!("crypto_ingestor_feed_connected").set(if connected { 1.0 } else { 0.0 });
}

/// Record a reconnection attempt.
pub fn record_reconnect() {
    counter!("crypto_ingestor_reconnects_total").increment(1);
}

/// Record an error reported by the feed.
pub fn record_feed_error() {
    counter!("crypto_ingestor_feed_errors_total").increment(1);
}

/// Record a feed message that failed to decode.
pub fn record_rejected_message() {
    counter!("crypto_ingestor_messages_rejected_total").increment(1);
}
