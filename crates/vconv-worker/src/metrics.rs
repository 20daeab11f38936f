//! Prometheus metrics for the worker.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::{WorkerError, WorkerResult};
use crate::processor::JobOutcome;

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_RECEIVED_TOTAL: &str = "vconv_jobs_received_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "vconv_jobs_completed_total";
    pub const JOBS_DUPLICATE_TOTAL: &str = "vconv_jobs_duplicate_total";
    pub const JOBS_FAILED_TOTAL: &str = "vconv_jobs_failed_total";
    pub const BROKER_RECONNECTS_TOTAL: &str = "vconv_broker_reconnects_total";
    pub const TRANSCODE_DURATION_SECONDS: &str = "vconv_transcode_duration_seconds";
}

/// Install the Prometheus recorder with an HTTP listener on `port`.
pub fn install_exporter(port: u16) -> WorkerResult<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::config_error(format!("failed to install metrics exporter: {}", e)))
}

pub fn record_received() {
    counter!(names::JOBS_RECEIVED_TOTAL).increment(1);
}

pub fn record_outcome(outcome: &JobOutcome) {
    match outcome {
        JobOutcome::Completed { .. } => counter!(names::JOBS_COMPLETED_TOTAL).increment(1),
        JobOutcome::Duplicate { .. } => counter!(names::JOBS_DUPLICATE_TOTAL).increment(1),
        JobOutcome::Failed { stage, .. } => {
            counter!(names::JOBS_FAILED_TOTAL, "stage" => *stage).increment(1)
        }
    }
}

pub fn record_reconnect() {
    counter!(names::BROKER_RECONNECTS_TOTAL).increment(1);
}

pub fn record_transcode_duration(elapsed: Duration) {
    histogram!(names::TRANSCODE_DURATION_SECONDS).record(elapsed.as_secs_f64());
}
