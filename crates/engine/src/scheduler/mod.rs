//! Placement decisions
//!
//! A decision runs synchronously on the caller's thread: filter the node
//! list, evaluate what remains, let the policy's algorithm pick a winner,
//! then reserve capacity and record the attempt.

pub mod algorithms;
pub mod evaluator;
pub mod filter;
pub mod history;
pub mod reservation;

#[cfg(test)]
mod tests;

pub use algorithms::{node_priority, select_node, Candidate};
pub use evaluator::{NodeEvaluation, NodeEvaluator, ScoreBreakdown, ScoreWeights};
pub use filter::{ConstraintFilter, EffectiveConstraints};
pub use history::{SchedulerStats, SchedulingHistory, DEFAULT_HISTORY_CAPACITY};
pub use reservation::{ReservationLedger, ResourceReservation, DEFAULT_RESERVATION_TTL};

use crate::error::{EngineError, EngineResult};
use crate::metrics::MetricsCollector;
use crate::models::{Node, SchedulingDecision, SchedulingEvent, WorkloadSpec};
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::policy::{builtin, SchedulingAlgorithm, SchedulingPolicy};
use crate::pricing::{CostModel, PowerModel};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub reservation_ttl: Duration,
    pub history_capacity: usize,
    pub weights: ScoreWeights,
    pub cost_model: CostModel,
    pub power_model: PowerModel,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reservation_ttl: DEFAULT_RESERVATION_TTL,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            weights: ScoreWeights::default(),
            cost_model: CostModel::default(),
            power_model: PowerModel::default(),
        }
    }
}

pub struct Scheduler {
    evaluator: NodeEvaluator,
    ledger: ReservationLedger,
    history: RwLock<SchedulingHistory>,
    collector: Option<Arc<MetricsCollector>>,
    metrics: EngineMetrics,
    logger: StructuredLogger,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            evaluator: NodeEvaluator::new(config.cost_model, config.power_model, config.weights),
            ledger: ReservationLedger::new(config.reservation_ttl),
            history: RwLock::new(SchedulingHistory::new(config.history_capacity)),
            collector: None,
            metrics: EngineMetrics::new(),
            logger: StructuredLogger::new("placement-engine"),
        }
    }

    /// Forward every recorded attempt to `collector`
    pub fn with_collector(mut self, collector: Arc<MetricsCollector>) -> Self {
        self.collector = Some(collector);
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn evaluator(&self) -> &NodeEvaluator {
        &self.evaluator
    }

    pub fn ledger(&self) -> &ReservationLedger {
        &self.ledger
    }

    /// Schedule under the built-in balanced policy
    pub fn schedule_balanced(&self, workload: &WorkloadSpec, nodes: &[Node]) -> EngineResult<SchedulingDecision> {
        let policy = SchedulingPolicy::new(builtin::DEFAULT, SchedulingAlgorithm::Balanced);
        self.schedule_with_policy(workload, nodes, &policy)
    }

    /// Place `workload` on one of `nodes` under `policy`
    ///
    /// On success the workload's requested capacity is reserved on the chosen
    /// node. Every attempt, successful or not, is recorded.
    pub fn schedule_with_policy(
        &self,
        workload: &WorkloadSpec,
        nodes: &[Node],
        policy: &SchedulingPolicy,
    ) -> EngineResult<SchedulingDecision> {
        let start = Instant::now();
        let algorithm = policy.algorithm;

        match self.decide(workload, nodes, policy) {
            Ok(decision) => {
                let elapsed = start.elapsed();
                self.reserve(workload, &decision.node_name);
                self.record(SchedulingEvent::success(
                    workload,
                    Some(&policy.name),
                    decision.clone(),
                    elapsed,
                ));

                self.metrics.observe_decision(
                    algorithm.as_str(),
                    elapsed,
                    decision.score,
                    decision.estimated_cost_per_hour,
                    decision.estimated_power_watts,
                );
                self.logger.log_placement(
                    &workload.name,
                    &decision.node_name,
                    algorithm.as_str(),
                    Some(&policy.name),
                    decision.score,
                    decision.estimated_cost_per_hour,
                    decision.estimated_power_watts,
                    elapsed,
                );
                self.check_deadline(workload, policy, elapsed);
                Ok(decision)
            }
            Err(e) => {
                let elapsed = start.elapsed();
                let reason = e.to_string();
                self.record(SchedulingEvent::failure(workload, Some(&policy.name), elapsed, &reason));
                self.metrics.observe_failure(algorithm.as_str(), elapsed);
                self.logger
                    .log_placement_failed(&workload.name, algorithm.as_str(), &reason);
                self.check_deadline(workload, policy, elapsed);
                Err(e)
            }
        }
    }

    fn decide(
        &self,
        workload: &WorkloadSpec,
        nodes: &[Node],
        policy: &SchedulingPolicy,
    ) -> EngineResult<SchedulingDecision> {
        workload.validate()?;

        let constraints = EffectiveConstraints::resolve(workload, policy);
        let reserved = self.ledger.reserved_by_node(Some(&workload.name));
        let filtered = ConstraintFilter::new(&self.evaluator).apply(workload, nodes, &constraints, &reserved)?;

        let candidates: Vec<Candidate> = filtered
            .into_iter()
            .map(|node| {
                let evaluation = self.evaluator.evaluate(workload, &node, &constraints);
                Candidate { node, evaluation }
            })
            .collect();

        let last_used = if policy.algorithm == SchedulingAlgorithm::RoundRobin {
            self.last_used(&candidates)
        } else {
            HashMap::new()
        };

        let chosen = select_node(policy.algorithm, workload, &candidates, &last_used).ok_or_else(|| {
            EngineError::NoSuitableNode {
                workload: workload.name.clone(),
                algorithm: policy.algorithm.to_string(),
                candidates: candidates.len(),
            }
        })?;

        debug!(
            workload = %workload.name,
            node = %chosen.node.name,
            algorithm = %policy.algorithm,
            candidates = candidates.len(),
            "Selected node"
        );

        let evaluation = &chosen.evaluation;
        Ok(SchedulingDecision {
            node_name: chosen.node.name.clone(),
            score: evaluation.score,
            reason: format!("{}: {}", policy.algorithm, evaluation.reason),
            estimated_cost_per_hour: evaluation.estimated_cost_per_hour,
            estimated_power_watts: evaluation.estimated_power_watts,
        })
    }

    fn last_used(&self, candidates: &[Candidate]) -> HashMap<String, chrono::DateTime<chrono::Utc>> {
        let history = self.history.read().unwrap_or_else(PoisonError::into_inner);
        candidates
            .iter()
            .filter_map(|c| history.last_used(&c.node.name).map(|at| (c.node.name.clone(), at)))
            .collect()
    }

    fn reserve(&self, workload: &WorkloadSpec, node: &str) {
        let reservation = self.ledger.reserve(workload, node);
        self.logger.log_reservation(
            &workload.name,
            node,
            reservation.resources.cpu_cores,
            reservation.resources.memory_gib,
            &reservation.expires_at.to_rfc3339(),
        );
        self.metrics.set_active_reservations(self.ledger.len());
    }

    fn record(&self, event: SchedulingEvent) {
        {
            let mut history = self.history.write().unwrap_or_else(PoisonError::into_inner);
            history.push(event.clone());
        }
        if let Some(collector) = &self.collector {
            collector.record_event(&event);
        }
    }

    fn check_deadline(&self, workload: &WorkloadSpec, policy: &SchedulingPolicy, elapsed: Duration) {
        if let Some(limit) = policy.max_scheduling_time() {
            if elapsed > limit {
                warn!(
                    workload = %workload.name,
                    policy = %policy.name,
                    elapsed_ms = elapsed.as_millis() as u64,
                    limit_ms = limit.as_millis() as u64,
                    "Scheduling exceeded the policy's time limit"
                );
            }
        }
    }

    /// Score a single node without placing anything
    pub fn evaluate_node(&self, workload: &WorkloadSpec, node: &Node, policy: &SchedulingPolicy) -> NodeEvaluation {
        let constraints = EffectiveConstraints::resolve(workload, policy);
        self.evaluator.evaluate(workload, node, &constraints)
    }

    /// The last `limit` attempts, oldest first; zero means all retained
    pub fn history(&self, limit: usize) -> Vec<SchedulingEvent> {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .recent(limit)
    }

    pub fn global_metrics(&self) -> SchedulerStats {
        self.history.read().unwrap_or_else(PoisonError::into_inner).stats()
    }

    pub fn reservations(&self) -> Vec<ResourceReservation> {
        self.ledger.list()
    }

    pub fn release_reservation(&self, workload_id: &str) -> Option<ResourceReservation> {
        let released = self.ledger.release(workload_id);
        if released.is_some() {
            self.logger.log_reservations_released(1, "released");
            self.metrics.set_active_reservations(self.ledger.len());
        }
        released
    }

    /// Drop expired reservations; returns how many were removed
    pub fn cleanup_expired_reservations(&self) -> usize {
        let removed = self.ledger.sweep_expired();
        if removed > 0 {
            self.logger.log_reservations_released(removed, "expired");
        }
        self.metrics.set_active_reservations(self.ledger.len());
        removed
    }
}
