use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Counters tracked per task type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTypeMetrics {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    /// Agent invocations that raised, including ones later retried.
    pub attempt_failures: u64,
    /// Wall time from `started_at` to `completed_at`, summed over finished runs.
    pub duration_ms: u64,
}

/// Tracks execution outcomes for every task type.
pub struct ExecutionMonitor {
    metrics: Arc<RwLock<HashMap<String, TaskTypeMetrics>>>,
}

impl ExecutionMonitor {
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn update(&self, task_type: &str, f: impl FnOnce(&mut TaskTypeMetrics)) {
        let mut metrics = self.metrics.write().await;
        f(metrics.entry(task_type.to_string()).or_default());
    }

    pub async fn record_submitted(&self, task_type: &str) {
        self.update(task_type, |m| m.submitted += 1).await;
    }

    pub async fn record_completed(&self, task_type: &str, duration_ms: u64) {
        self.update(task_type, |m| {
            m.completed += 1;
            m.duration_ms += duration_ms;
        })
        .await;
    }

    pub async fn record_failed(&self, task_type: &str, duration_ms: u64) {
        self.update(task_type, |m| {
            m.failed += 1;
            m.duration_ms += duration_ms;
        })
        .await;
    }

    pub async fn record_cancelled(&self, task_type: &str) {
        self.update(task_type, |m| m.cancelled += 1).await;
    }

    pub async fn record_attempt_failure(&self, task_type: &str) {
        self.update(task_type, |m| m.attempt_failures += 1).await;
    }

    /// Metrics for one task type, if anything was recorded for it.
    pub async fn get(&self, task_type: &str) -> Option<TaskTypeMetrics> {
        self.metrics.read().await.get(task_type).cloned()
    }

    /// Snapshot of all task types.
    pub async fn snapshot(&self) -> HashMap<String, TaskTypeMetrics> {
        self.metrics.read().await.clone()
    }

    /// Totals across task types.
    pub async fn aggregate(&self) -> TaskTypeMetrics {
        let metrics = self.metrics.read().await;
        let mut total = TaskTypeMetrics::default();
        for m in metrics.values() {
            total.submitted += m.submitted;
            total.completed += m.completed;
            total.failed += m.failed;
            total.cancelled += m.cancelled;
            total.attempt_failures += m.attempt_failures;
            total.duration_ms += m.duration_ms;
        }
        total
    }

    /// Serialize the current metrics as JSON (for the `/metrics` endpoint).
    pub async fn to_json(&self) -> serde_json::Value {
        let task_types = self.snapshot().await;
        let aggregate = self.aggregate().await;
        serde_json::json!({
            "task_types": task_types,
            "aggregate": aggregate,
        })
    }
}

impl Default for ExecutionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initial_state() {
        let monitor = ExecutionMonitor::new();
        assert!(monitor.snapshot().await.is_empty());
        assert!(monitor.get("echo").await.is_none());
        assert_eq!(monitor.aggregate().await, TaskTypeMetrics::default());
    }

    #[tokio::test]
    async fn test_record_outcomes() {
        let monitor = ExecutionMonitor::new();
        monitor.record_submitted("echo").await;
        monitor.record_submitted("echo").await;
        monitor.record_completed("echo", 120).await;
        monitor.record_attempt_failure("echo").await;
        monitor.record_failed("echo", 30).await;

        let m = monitor.get("echo").await.unwrap();
        assert_eq!(m.submitted, 2);
        assert_eq!(m.completed, 1);
        assert_eq!(m.failed, 1);
        assert_eq!(m.attempt_failures, 1);
        assert_eq!(m.duration_ms, 150);
    }

    #[tokio::test]
    async fn test_aggregate_metrics() {
        let monitor = ExecutionMonitor::new();
        monitor.record_submitted("echo").await;
        monitor.record_submitted("report").await;
        monitor.record_cancelled("report").await;

        let agg = monitor.aggregate().await;
        assert_eq!(agg.submitted, 2);
        assert_eq!(agg.cancelled, 1);
    }

    #[tokio::test]
    async fn test_to_json() {
        let monitor = ExecutionMonitor::new();
        monitor.record_submitted("echo").await;
        let json = monitor.to_json().await;
        assert!(json["task_types"]["echo"].is_object());
        assert_eq!(json["aggregate"]["submitted"], 1);
    }
}
