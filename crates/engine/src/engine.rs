//! The placement engine facade
//!
//! Owns one instance of every component and wires them together. Each
//! component keeps its own lock; the facade never holds two at once.

use crate::error::EngineResult;
use crate::metrics::{GlobalMetrics, MetricsCollector, NodeMetrics, PolicyMetrics, SchedulingReport, WorkloadMetrics};
use crate::models::{EnvironmentSnapshot, Node, OptimizationStrategyResult, SchedulingDecision, SchedulingEvent, WorkloadSpec};
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::policy::{PolicyManager, PolicyTemplate, PolicyUpdate, SchedulingPolicy};
use crate::scheduler::{ResourceReservation, Scheduler, SchedulerConfig, SchedulerStats};
use crate::strategy::StrategyManager;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name stamped on every structured log event
    pub instance_name: String,
    pub scheduler: SchedulerConfig,
    /// Length of the top node and workload lists in reports
    pub report_top_n: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instance_name: "placement-engine".to_string(),
            scheduler: SchedulerConfig::default(),
            report_top_n: 10,
        }
    }
}

pub struct PlacementEngine {
    policies: PolicyManager,
    scheduler: Scheduler,
    strategies: StrategyManager,
    collector: Arc<MetricsCollector>,
    logger: StructuredLogger,
    metrics: EngineMetrics,
    report_top_n: usize,
}

impl Default for PlacementEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl PlacementEngine {
    pub fn new(config: EngineConfig) -> Self {
        let logger = StructuredLogger::new(config.instance_name.clone());
        let collector = Arc::new(MetricsCollector::new());
        let strategies = StrategyManager::new(
            config.scheduler.cost_model.clone(),
            config.scheduler.power_model.clone(),
        );
        let scheduler = Scheduler::new(config.scheduler)
            .with_collector(collector.clone())
            .with_logger(logger.clone());
        let policies = PolicyManager::new();
        let metrics = EngineMetrics::new();
        metrics.set_policies(policies.len());

        Self {
            policies,
            scheduler,
            strategies,
            collector,
            logger,
            metrics,
            report_top_n: config.report_top_n,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn policies(&self) -> &PolicyManager {
        &self.policies
    }

    pub fn strategies(&self) -> &StrategyManager {
        &self.strategies
    }

    pub fn collector(&self) -> &MetricsCollector {
        &self.collector
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Schedule under the policy resolved for the workload
    pub fn schedule_workload(&self, workload: &WorkloadSpec, nodes: &[Node]) -> EngineResult<SchedulingDecision> {
        let policy = self.policies.policy_for_workload(workload);
        self.scheduler.schedule_with_policy(workload, nodes, &policy)
    }

    pub fn schedule_with_policy(
        &self,
        workload: &WorkloadSpec,
        nodes: &[Node],
        policy: &SchedulingPolicy,
    ) -> EngineResult<SchedulingDecision> {
        self.scheduler.schedule_with_policy(workload, nodes, policy)
    }

    /// Best advisory strategy for the workload; the winner is kept for reports
    pub fn find_best_strategy(
        &self,
        workload: &WorkloadSpec,
        environment: &EnvironmentSnapshot,
    ) -> EngineResult<OptimizationStrategyResult> {
        let result = self.strategies.find_best_strategy(workload, environment)?;
        self.collector.record_strategy_result(&workload.name, &result);
        self.logger
            .log_strategy_selected(&workload.name, &result.strategy_name, result.score, result.confidence);
        Ok(result)
    }

    pub fn create_policy(&self, name: &str, template: &PolicyTemplate) -> EngineResult<SchedulingPolicy> {
        let policy = self.policies.create_policy(name, template)?;
        self.policy_changed(name, "created");
        Ok(policy)
    }

    pub fn update_policy(&self, name: &str, update: PolicyUpdate) -> EngineResult<SchedulingPolicy> {
        let policy = self.policies.update_policy(name, update)?;
        self.policy_changed(name, "updated");
        Ok(policy)
    }

    pub fn delete_policy(&self, name: &str) -> EngineResult<()> {
        self.policies.delete_policy(name)?;
        self.policy_changed(name, "deleted");
        Ok(())
    }

    pub fn assign_policy(&self, workload: &str, policy: &str) -> EngineResult<()> {
        self.policies.assign_policy(workload, policy)?;
        self.logger.log_policy_changed(policy, "assigned");
        Ok(())
    }

    pub fn get_policy(&self, name: &str) -> EngineResult<SchedulingPolicy> {
        self.policies.get_policy(name)
    }

    pub fn list_policies(&self) -> Vec<SchedulingPolicy> {
        self.policies.list_policies()
    }

    pub fn policy_statistics(&self) -> BTreeMap<String, usize> {
        self.policies.policy_statistics()
    }

    fn policy_changed(&self, name: &str, action: &str) {
        self.logger.log_policy_changed(name, action);
        self.metrics.set_policies(self.policies.len());
    }

    /// Record an attempt made outside this engine
    pub fn record_event(&self, event: &SchedulingEvent) {
        self.collector.record_event(event);
    }

    pub fn report(&self, period: Duration) -> SchedulingReport {
        self.collector.report(period, self.report_top_n)
    }

    pub fn node_metrics(&self, node: &str) -> Option<NodeMetrics> {
        self.collector.node_metrics(node)
    }

    pub fn workload_metrics(&self, workload: &str) -> Option<WorkloadMetrics> {
        self.collector.workload_metrics(workload)
    }

    pub fn policy_metrics(&self, policy: &str) -> Option<PolicyMetrics> {
        self.collector.policy_metrics(policy)
    }

    pub fn global_metrics(&self) -> GlobalMetrics {
        self.collector.global_metrics()
    }

    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.global_metrics()
    }

    pub fn history(&self, limit: usize) -> Vec<SchedulingEvent> {
        self.scheduler.history(limit)
    }

    /// Fold a fresh node inventory into the metrics
    pub fn collect_metrics(&self, nodes: &[Node]) {
        let reserved = self.scheduler.ledger().reserved_by_node(None);
        let policy_names: Vec<String> = self.policies.list_policies().into_iter().map(|p| p.name).collect();
        self.collector.collect(nodes, &reserved, &policy_names);
    }

    pub fn reservations(&self) -> Vec<ResourceReservation> {
        self.scheduler.reservations()
    }

    pub fn release_reservation(&self, workload_id: &str) -> Option<ResourceReservation> {
        self.scheduler.release_reservation(workload_id)
    }

    pub fn sweep_expired_reservations(&self) -> usize {
        self.scheduler.cleanup_expired_reservations()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::models::{labels, ResourceVector, WorkloadType};
    use crate::policy::{builtin, SchedulingAlgorithm};

    fn nodes() -> Vec<Node> {
        vec![
            Node::new("spot-a", ResourceVector::new(16.0, 64.0, 2, 0))
                .with_label(labels::LIFECYCLE, labels::SPOT)
                .with_label(labels::COST_PER_HOUR, "low")
                .with_label(labels::POWER_USAGE, "high"),
            Node::new("green-b", ResourceVector::new(16.0, 64.0, 2, 0))
                .with_label(labels::ENERGY_SOURCE, labels::RENEWABLE)
                .with_label(labels::POWER_USAGE, "low"),
        ]
    }

    #[test]
    fn test_policy_inferred_from_workload_type() {
        let engine = PlacementEngine::default();
        let training = WorkloadSpec::new("train", WorkloadType::Training, ResourceVector::new(2.0, 8.0, 1, 0));
        let decision = engine.schedule_workload(&training, &nodes()).unwrap();
        assert_eq!(decision.node_name, "spot-a");
        assert!(decision.reason.starts_with("cost_optimized"));

        let inference = WorkloadSpec::new("infer", WorkloadType::Inference, ResourceVector::new(2.0, 8.0, 1, 0));
        let decision = engine.schedule_workload(&inference, &nodes()).unwrap();
        assert_eq!(decision.node_name, "green-b");
    }

    #[test]
    fn test_assignment_overrides_inference() {
        let engine = PlacementEngine::default();
        let template = PolicyTemplate {
            algorithm: SchedulingAlgorithm::PowerOptimized,
            ..Default::default()
        };
        engine.create_policy("watts", &template).unwrap();
        engine.assign_policy("train", "watts").unwrap();

        let training = WorkloadSpec::new("train", WorkloadType::Training, ResourceVector::new(2.0, 8.0, 0, 0));
        let decision = engine.schedule_workload(&training, &nodes()).unwrap();
        assert_eq!(decision.node_name, "green-b");
        assert_eq!(engine.policy_metrics("watts").unwrap().total_schedules, 1);
        assert_eq!(engine.policy_statistics()["watts"], 1);
    }

    #[test]
    fn test_policy_crud_errors_pass_through() {
        let engine = PlacementEngine::default();
        let err = engine
            .create_policy(builtin::DEFAULT, &PolicyTemplate::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::PolicyAlreadyExists(_)));
        assert!(matches!(engine.delete_policy("missing"), Err(EngineError::PolicyNotFound(_))));
    }

    #[test]
    fn test_strategy_result_lands_in_report() {
        let engine = PlacementEngine::default();
        let workload = WorkloadSpec::new("w", WorkloadType::Batch, ResourceVector::new(2.0, 8.0, 0, 0));
        let environment = EnvironmentSnapshot {
            available_nodes: nodes(),
            assigned_node: None,
        };
        let result = engine.find_best_strategy(&workload, &environment).unwrap();

        let report = engine.report(Duration::ZERO);
        assert_eq!(report.strategy_recommendations.len(), 1);
        assert_eq!(report.strategy_recommendations[0].workload, "w");
        assert_eq!(report.strategy_recommendations[0].result, result);
    }

    #[test]
    fn test_collect_metrics_tracks_utilization() {
        let engine = PlacementEngine::default();
        let workload = WorkloadSpec::new("w", WorkloadType::Unknown, ResourceVector::new(4.0, 8.0, 0, 0));
        let decision = engine.schedule_workload(&workload, &nodes()).unwrap();

        engine.collect_metrics(&nodes());
        let node = engine.node_metrics(&decision.node_name).unwrap();
        assert_eq!(node.utilization, 0.25);
        assert!(engine.policy_metrics(builtin::LOW_LATENCY).is_some());
        assert_eq!(engine.global_metrics().total_schedules, 1);
    }
}
