//! Metrics collection and exposition.
//!
//! # Metrics
//! - `netconf_rpc_total` (counter): RPCs by operation and outcome
//! - `netconf_rpc_duration_seconds` (histogram): RPC handling latency
//! - `netconf_active_sessions` (gauge): open sessions
//! - `netconf_lock_events_total` (counter): lock grants, denials, releases
//! - `netconf_commits_total` (counter): trees published per datastore
//!
//! The macros are no-ops until a recorder is installed, so the core can
//! record unconditionally.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::datastore::DatastoreName;

/// Start the Prometheus exporter on `addr`. Must be called inside a Tokio
/// runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_rpc(operation: &'static str, outcome: &'static str, elapsed: Duration) {
    metrics::counter!("netconf_rpc_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
    metrics::histogram!("netconf_rpc_duration_seconds", "operation" => operation)
        .record(elapsed.as_secs_f64());
}

pub fn set_active_sessions(count: usize) {
    metrics::gauge!("netconf_active_sessions").set(count as f64);
}

pub fn record_lock_event(datastore: DatastoreName, event: &'static str) {
    metrics::counter!(
        "netconf_lock_events_total",
        "datastore" => datastore.as_str(),
        "event" => event
    )
    .increment(1);
}

pub fn record_commit(datastore: DatastoreName) {
    metrics::counter!("netconf_commits_total", "datastore" => datastore.as_str()).increment(1);
}
