//! Metrics collection and reporting

use metrics::{counter, histogram};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Metrics collector for transformation throughput and action outcomes.
///
/// Emits to the `metrics` facade (`actions_applied_total{action,result}`,
/// `transformation_duration_seconds`) and keeps atomic in-process counters
/// for snapshots in tests and embedded callers. Pushes are fire-and-forget.
#[derive(Clone, Default)]
pub struct MetricsCollector {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    records: AtomicU64,
    fields_visited: AtomicU64,
    actions_applied: AtomicU64,
    action_failures: AtomicU64,
    total_duration_us: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one action invocation outcome
    pub fn record_action(&self, action: &str, result: &str) {
        counter!(
            "actions_applied_total",
            "action" => action.to_string(),
            "result" => result.to_string()
        )
        .increment(1);

        self.inner.actions_applied.fetch_add(1, Ordering::Relaxed);
        if result == "failure" {
            self.inner.action_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record one whole-record transformation
    pub fn record_transformation(&self, fields_visited: u64, duration: Duration) {
        histogram!("transformation_duration_seconds").record(duration.as_secs_f64());

        self.inner.records.fetch_add(1, Ordering::Relaxed);
        self.inner
            .fields_visited
            .fetch_add(fields_visited, Ordering::Relaxed);
        self.inner
            .total_duration_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records: self.inner.records.load(Ordering::Relaxed),
            fields_visited: self.inner.fields_visited.load(Ordering::Relaxed),
            actions_applied: self.inner.actions_applied.load(Ordering::Relaxed),
            action_failures: self.inner.action_failures.load(Ordering::Relaxed),
            total_duration_us: self.inner.total_duration_us.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of current metrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records: u64,
    pub fields_visited: u64,
    pub actions_applied: u64,
    pub action_failures: u64,
    pub total_duration_us: u64,
}

impl MetricsSnapshot {
    /// Average transformation latency per record
    pub fn avg_duration_us(&self) -> u64 {
        if self.records == 0 {
            0
        } else {
            self.total_duration_us / self.records
        }
    }

    /// Share of action invocations that failed
    pub fn failure_rate(&self) -> f64 {
        if self.actions_applied == 0 {
            0.0
        } else {
            self.action_failures as f64 / self.actions_applied as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let collector = MetricsCollector::new();

        collector.record_action("mask", "success");
        collector.record_action("tokenize", "failure");
        collector.record_transformation(5, Duration::from_micros(1200));

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.records, 1);
        assert_eq!(snapshot.fields_visited, 5);
        assert_eq!(snapshot.actions_applied, 2);
        assert_eq!(snapshot.action_failures, 1);
        assert_eq!(snapshot.avg_duration_us(), 1200);
        assert_eq!(snapshot.failure_rate(), 0.5);
    }

    #[test]
    fn empty_snapshot_divides_safely() {
        let snapshot = MetricsCollector::new().snapshot();
        assert_eq!(snapshot.avg_duration_us(), 0);
        assert_eq!(snapshot.failure_rate(), 0.0);
    }
}
