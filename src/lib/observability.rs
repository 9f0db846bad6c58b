use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::error::{Result, StoreError};

pub const INDEX_OPERATIONS_TOTAL: &str = "ruscello_index_operations_total";
pub const INDEX_OPERATION_DURATION: &str = "ruscello_index_operation_duration_seconds";
pub const STORE_OPERATIONS_TOTAL: &str = "ruscello_store_operations_total";
pub const STORE_OPERATION_DURATION: &str = "ruscello_store_operation_duration_seconds";

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();
static START_TIME: OnceCell<Instant> = OnceCell::new();

/// Installs the process-wide Prometheus recorder. Safe to call repeatedly.
pub fn init() -> Result<()> {
    if PROMETHEUS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".into()),
            &[0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0],
        )
        .map_err(|err| StoreError::Config(format!("failed to configure metrics: {err}")))?
        .install_recorder()
        .map_err(|err| StoreError::Config(format!("failed to install metrics recorder: {err}")))?;

    describe();
    let _ = PROMETHEUS_HANDLE.set(handle);
    let _ = START_TIME.set(Instant::now());
    Ok(())
}

pub fn describe() {
    describe_counter!(
        INDEX_OPERATIONS_TOTAL,
        "Total number of stream index operations, by operation and status."
    );
    describe_histogram!(
        INDEX_OPERATION_DURATION,
        "Latency of stream index operations."
    );
    describe_counter!(
        STORE_OPERATIONS_TOTAL,
        "Total number of storage engine and event log calls."
    );
    describe_histogram!(
        STORE_OPERATION_DURATION,
        "Latency of storage engine and event log calls."
    );
}

pub fn record_index_op(operation: &'static str, status: &'static str, duration: f64) {
    let labels = [("operation", operation), ("status", status)];
    counter!(INDEX_OPERATIONS_TOTAL, &labels).increment(1);
    histogram!(INDEX_OPERATION_DURATION, &labels).record(duration);
}

pub(crate) fn record_store_op(operation: &'static str, status: &'static str, duration: f64) {
    let labels = [("operation", operation), ("status", status)];
    counter!(STORE_OPERATIONS_TOTAL, &labels).increment(1);
    histogram!(STORE_OPERATION_DURATION, &labels).record(duration);
}

/// Prometheus text exposition of everything recorded so far; empty when
/// [`init`] was never called.
pub fn render_metrics() -> String {
    match PROMETHEUS_HANDLE.get() {
        Some(handle) => {
            let mut body = handle.render();
            if let Some(start) = START_TIME.get() {
                body.push_str(&format!(
                    "ruscello_uptime_seconds {}\n",
                    start.elapsed().as_secs_f64()
                ));
            }
            body
        }
        None => String::new(),
    }
}
