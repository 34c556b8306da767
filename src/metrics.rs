//! Metrics sink boundary.
//!
//! Every probe outcome produces a latency sample, and every notified state
//! transition produces an availability-changed event. The monitor hands both
//! to a [`MetricsSink`] collaborator; storage and aggregation are somebody
//! else's problem.

use chrono::{DateTime, Utc};

/// Metric category used for all connectivity samples and events.
pub const METRIC_CATEGORY: &str = "connectivity";

/// Sample name for round-trip latency observations.
pub const LATENCY_METRIC: &str = "latency";

/// Event name for availability transitions.
pub const AVAILABILITY_EVENT: &str = "availability";

/// Sink for latency samples and availability events.
///
/// Implementations must be cheap and non-blocking; the monitor calls them on
/// its scheduling path (outside the state lock, but before the next probe is
/// armed).
pub trait MetricsSink: Send + Sync + 'static {
    /// Record one numeric sample at an explicit timestamp.
    fn record_sample(&self, category: &str, name: &str, value: f64, ts: DateTime<Utc>);

    /// Record one discrete event with structured JSON fields.
    fn record_event(&self, category: &str, name: &str, fields: serde_json::Value);
}

/// Default sink that emits samples and events as tracing records.
///
/// Useful as a stand-in when no metrics backend is wired up, and keeps the
/// observations visible in logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn record_sample(&self, category: &str, name: &str, value: f64, ts: DateTime<Utc>) {
        tracing::debug!(category, name, value, ts = %ts, "metric sample");
    }

    fn record_event(&self, category: &str, name: &str, fields: serde_json::Value) {
        tracing::info!(category, name, fields = %fields, "metric event");
    }
}
