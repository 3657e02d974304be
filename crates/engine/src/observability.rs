//! Observability infrastructure for the placement engine
//!
//! Provides:
//! - Prometheus metrics (decision latency, scores, cost/power estimates, reservations)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

/// Histogram buckets for decision latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5,
];

const SCORE_BUCKETS: &[f64] = &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];

const COST_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 50.0, 100.0];

const POWER_BUCKETS: &[f64] = &[50.0, 100.0, 200.0, 400.0, 800.0, 1600.0, 3200.0, 6400.0];

static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    decisions_total: IntCounterVec,
    latency_seconds: Histogram,
    score: Histogram,
    estimated_cost_per_hour: Histogram,
    estimated_power_watts: Histogram,
    active_reservations: IntGauge,
    strategy_evaluations_total: IntCounterVec,
    policies: IntGauge,
    collection_errors_total: IntCounter,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            decisions_total: register_int_counter_vec!(
                "placement_decisions_total",
                "Placement decisions by algorithm and outcome",
                &["algorithm", "outcome"]
            )
            .expect("Failed to register placement_decisions_total"),

            latency_seconds: register_histogram!(
                "placement_latency_seconds",
                "Time spent filtering and scoring nodes for one decision",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register placement_latency_seconds"),

            score: register_histogram!(
                "placement_score",
                "Composite score of the selected node",
                SCORE_BUCKETS.to_vec()
            )
            .expect("Failed to register placement_score"),

            estimated_cost_per_hour: register_histogram!(
                "placement_estimated_cost_per_hour",
                "Estimated hourly cost of placed workloads",
                COST_BUCKETS.to_vec()
            )
            .expect("Failed to register placement_estimated_cost_per_hour"),

            estimated_power_watts: register_histogram!(
                "placement_estimated_power_watts",
                "Estimated power draw of placed workloads",
                POWER_BUCKETS.to_vec()
            )
            .expect("Failed to register placement_estimated_power_watts"),

            active_reservations: register_int_gauge!(
                "placement_active_reservations",
                "Reservations currently held in the ledger"
            )
            .expect("Failed to register placement_active_reservations"),

            strategy_evaluations_total: register_int_counter_vec!(
                "placement_strategy_evaluations_total",
                "Optimization strategy executions by strategy and outcome",
                &["strategy", "outcome"]
            )
            .expect("Failed to register placement_strategy_evaluations_total"),

            policies: register_int_gauge!(
                "placement_policies",
                "Number of scheduling policies defined"
            )
            .expect("Failed to register placement_policies"),

            collection_errors_total: register_int_counter!(
                "placement_collection_errors_total",
                "Periodic metrics collection passes that failed"
            )
            .expect("Failed to register placement_collection_errors_total"),
        }
    }
}

/// Handle to the process-wide placement metrics. Clones share one registry entry.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EngineMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EngineMetrics")
    }
}

impl EngineMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new)
    }

    pub fn observe_decision(&self, algorithm: &str, elapsed: Duration, score: f64, cost: f64, power: f64) {
        let inner = self.inner();
        inner
            .decisions_total
            .with_label_values(&[algorithm, "success"])
            .inc();
        inner.latency_seconds.observe(elapsed.as_secs_f64());
        inner.score.observe(score);
        inner.estimated_cost_per_hour.observe(cost);
        inner.estimated_power_watts.observe(power);
    }

    pub fn observe_failure(&self, algorithm: &str, elapsed: Duration) {
        let inner = self.inner();
        inner
            .decisions_total
            .with_label_values(&[algorithm, "failure"])
            .inc();
        inner.latency_seconds.observe(elapsed.as_secs_f64());
    }

    pub fn set_active_reservations(&self, count: usize) {
        self.inner().active_reservations.set(count as i64);
    }

    pub fn inc_strategy_evaluation(&self, strategy: &str, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.inner()
            .strategy_evaluations_total
            .with_label_values(&[strategy, outcome])
            .inc();
    }

    pub fn set_policies(&self, count: usize) {
        self.inner().policies.set(count as i64);
    }

    pub fn inc_collection_errors(&self) {
        self.inner().collection_errors_total.inc();
    }
}

/// Emits the canonical placement events with a stable `event` field
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn log_placement(
        &self,
        workload: &str,
        node: &str,
        algorithm: &str,
        policy: Option<&str>,
        score: f64,
        estimated_cost_per_hour: f64,
        estimated_power_watts: f64,
        elapsed: Duration,
    ) {
        info!(
            event = "placement_decided",
            instance = %self.instance,
            workload = %workload,
            node = %node,
            algorithm = %algorithm,
            policy = policy.unwrap_or("-"),
            score = score,
            estimated_cost_per_hour = estimated_cost_per_hour,
            estimated_power_watts = estimated_power_watts,
            elapsed_us = elapsed.as_micros() as u64,
            "Placement decided"
        );
    }

    pub fn log_placement_failed(&self, workload: &str, algorithm: &str, reason: &str) {
        warn!(
            event = "placement_failed",
            instance = %self.instance,
            workload = %workload,
            algorithm = %algorithm,
            reason = %reason,
            "Placement failed"
        );
    }

    pub fn log_reservation(&self, workload: &str, node: &str, cpu: f64, memory_gib: f64, expires_at: &str) {
        info!(
            event = "reservation_created",
            instance = %self.instance,
            workload = %workload,
            node = %node,
            cpu_cores = cpu,
            memory_gib = memory_gib,
            expires_at = %expires_at,
            "Reserved node capacity"
        );
    }

    pub fn log_reservations_released(&self, count: usize, reason: &str) {
        info!(
            event = "reservation_released",
            instance = %self.instance,
            count = count,
            reason = %reason,
            "Released reservations"
        );
    }

    pub fn log_strategy_selected(&self, workload: &str, strategy: &str, score: f64, confidence: f64) {
        info!(
            event = "strategy_selected",
            instance = %self.instance,
            workload = %workload,
            strategy = %strategy,
            score = score,
            confidence = confidence,
            "Selected optimization strategy"
        );
    }

    pub fn log_policy_changed(&self, policy: &str, action: &str) {
        info!(
            event = "policy_changed",
            instance = %self.instance,
            policy = %policy,
            action = %action,
            "Scheduling policy changed"
        );
    }

    pub fn log_startup(&self, version: &str, policies: usize) {
        info!(
            event = "engine_started",
            instance = %self.instance,
            version = %version,
            policies = policies,
            "Placement engine started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "engine_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Placement engine shutting down"
        );
    }
}
