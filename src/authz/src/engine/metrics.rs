//! Decision metrics with Prometheus text export

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Maximum latency samples kept for percentiles
const MAX_SAMPLES: usize = 10_000;

/// Snapshot of evaluator counters
#[derive(Debug, Clone, Default)]
pub struct DecisionMetrics {
    /// Completed permission checks
    pub checks: u64,

    pub allowed: u64,

    pub denied: u64,

    pub cache_hits: u64,

    pub cache_misses: u64,

    /// Checks that ended in a store or cache error
    pub errors: u64,

    pub latency_p50_ms: f64,
    pub latency_p99_ms: f64,
    pub avg_latency_ms: f64,
}

impl DecisionMetrics {
    /// Calculate cache hit rate
    pub fn cache_hit_rate(&self) -> f64 {
        ratio(self.cache_hits, self.cache_hits + self.cache_misses)
    }

    /// Calculate allow rate
    pub fn allow_rate(&self) -> f64 {
        ratio(self.allowed, self.allowed + self.denied)
    }
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

/// Collects evaluator counters and latency samples
#[derive(Default)]
pub struct MetricsCollector {
    metrics: Arc<RwLock<DecisionMetrics>>,

    /// Recent latency samples in milliseconds, oldest first
    samples: Arc<RwLock<VecDeque<f64>>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_cache_hit(&self) {
        self.metrics.write().await.cache_hits += 1;
    }

    pub async fn record_cache_miss(&self) {
        self.metrics.write().await.cache_misses += 1;
    }

    pub async fn record_error(&self) {
        self.metrics.write().await.errors += 1;
    }

    /// Record a completed check and its latency
    pub async fn record_decision(&self, allowed: bool, latency: Duration) {
        {
            let mut metrics = self.metrics.write().await;
            metrics.checks += 1;
            if allowed {
                metrics.allowed += 1;
            } else {
                metrics.denied += 1;
            }
        }

        let mut samples = self.samples.write().await;
        samples.push_back(latency.as_secs_f64() * 1000.0);
        if samples.len() > MAX_SAMPLES {
            samples.pop_front();
        }
    }

    /// Get current metrics snapshot, with latency figures over the kept samples
    pub async fn snapshot(&self) -> DecisionMetrics {
        let mut metrics = self.metrics.read().await.clone();

        let mut sorted: Vec<f64> = self.samples.read().await.iter().copied().collect();
        if sorted.is_empty() {
            return metrics;
        }
        sorted.sort_by(f64::total_cmp);

        metrics.avg_latency_ms = sorted.iter().sum::<f64>() / sorted.len() as f64;
        metrics.latency_p50_ms = percentile(&sorted, 0.50);
        metrics.latency_p99_ms = percentile(&sorted, 0.99);
        metrics
    }

    /// Reset all metrics
    pub async fn reset(&self) {
        *self.metrics.write().await = DecisionMetrics::default();
        self.samples.write().await.clear();
    }

    /// Export metrics in Prometheus format
    pub async fn export_prometheus(&self) -> String {
        let m = self.snapshot().await;

        format!(
            r#"# HELP authz_checks_total Completed permission checks
# TYPE authz_checks_total counter
authz_checks_total {}

# HELP authz_decisions_total Decisions by outcome
# TYPE authz_decisions_total counter
authz_decisions_total{{outcome="allow"}} {}
authz_decisions_total{{outcome="deny"}} {}

# HELP authz_decision_cache_total Decision cache lookups by result
# TYPE authz_decision_cache_total counter
authz_decision_cache_total{{result="hit"}} {}
authz_decision_cache_total{{result="miss"}} {}

# HELP authz_errors_total Checks failed by store or cache errors
# TYPE authz_errors_total counter
authz_errors_total {}

# HELP authz_check_latency_seconds Check latency percentiles
# TYPE authz_check_latency_seconds summary
authz_check_latency_seconds{{quantile="0.5"}} {}
authz_check_latency_seconds{{quantile="0.99"}} {}
"#,
            m.checks,
            m.allowed,
            m.denied,
            m.cache_hits,
            m.cache_misses,
            m.errors,
            m.latency_p50_ms / 1000.0,
            m.latency_p99_ms / 1000.0,
        )
    }
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    let idx = ((sorted.len() as f64) * p) as usize;
    sorted[idx.min(sorted.len() - 1)]
}
