//! Advisory optimization strategies
//!
//! Strategies never place anything. Each one inspects a workload and its
//! environment and proposes a change with an estimated cost, power draw and
//! score; the manager returns the best-scoring proposal.

mod strategies;

pub use strategies::{node_class_score, node_cost_multiplier, node_power_multiplier, StrategyKind};

use crate::error::{EngineError, EngineResult};
use crate::models::{EnvironmentSnapshot, OptimizationStrategyResult, WorkloadSpec};
use crate::observability::EngineMetrics;
use crate::pricing::{CostModel, PowerModel};
use tracing::{debug, warn};

/// Everything a strategy may look at
pub struct OptimizationContext<'a> {
    pub workload: &'a WorkloadSpec,
    pub environment: &'a EnvironmentSnapshot,
    pub cost_model: &'a CostModel,
    pub power_model: &'a PowerModel,
}

impl OptimizationContext<'_> {
    /// Hourly cost of the workload's current request
    pub fn current_cost(&self) -> f64 {
        self.cost_model.hourly(&self.workload.resources)
    }

    /// Power draw of the workload's current request
    pub fn current_power(&self) -> f64 {
        self.power_model.watts(&self.workload.resources)
    }
}

pub struct StrategyManager {
    strategies: Vec<StrategyKind>,
    cost_model: CostModel,
    power_model: PowerModel,
    metrics: EngineMetrics,
}

impl Default for StrategyManager {
    fn default() -> Self {
        Self::new(CostModel::default(), PowerModel::default())
    }
}

impl StrategyManager {
    pub fn new(cost_model: CostModel, power_model: PowerModel) -> Self {
        Self {
            strategies: StrategyKind::ALL.to_vec(),
            cost_model,
            power_model,
            metrics: EngineMetrics::new(),
        }
    }

    pub fn strategies(&self) -> &[StrategyKind] {
        &self.strategies
    }

    /// Strategies that apply to `workload`, in evaluation order
    pub fn applicable(&self, workload: &WorkloadSpec, environment: &EnvironmentSnapshot) -> Vec<StrategyKind> {
        let ctx = self.context(workload, environment);
        self.strategies
            .iter()
            .copied()
            .filter(|s| s.is_applicable(&ctx))
            .collect()
    }

    /// Run every applicable strategy and return the highest-scoring result
    ///
    /// A failing strategy is logged and skipped. Ties go to the strategy
    /// evaluated first.
    pub fn find_best_strategy(
        &self,
        workload: &WorkloadSpec,
        environment: &EnvironmentSnapshot,
    ) -> EngineResult<OptimizationStrategyResult> {
        let ctx = self.context(workload, environment);
        let applicable: Vec<StrategyKind> = self
            .strategies
            .iter()
            .copied()
            .filter(|s| s.is_applicable(&ctx))
            .collect();
        if applicable.is_empty() {
            return Err(EngineError::NoApplicableStrategy(workload.name.clone()));
        }

        let mut best: Option<OptimizationStrategyResult> = None;
        for strategy in &applicable {
            match strategy.execute(&ctx) {
                Ok(result) => {
                    self.metrics.inc_strategy_evaluation(strategy.name(), true);
                    debug!(
                        workload = %workload.name,
                        strategy = %strategy,
                        score = result.score,
                        confidence = result.confidence,
                        "Strategy evaluated"
                    );
                    if best.as_ref().map_or(true, |b| result.score > b.score) {
                        best = Some(result);
                    }
                }
                Err(e) => {
                    self.metrics.inc_strategy_evaluation(strategy.name(), false);
                    warn!(workload = %workload.name, strategy = %strategy, error = %e, "Strategy execution failed");
                }
            }
        }

        best.ok_or_else(|| EngineError::NoSuccessfulStrategy {
            workload: workload.name.clone(),
            attempted: applicable.len(),
        })
    }

    fn context<'a>(&'a self, workload: &'a WorkloadSpec, environment: &'a EnvironmentSnapshot) -> OptimizationContext<'a> {
        OptimizationContext {
            workload,
            environment,
            cost_model: &self.cost_model,
            power_model: &self.power_model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{labels, AutoScalingSpec, CostPreferences, Node, PowerPreferences, ResourceVector, WorkloadType};

    fn workload(workload_type: WorkloadType) -> WorkloadSpec {
        WorkloadSpec::new("w", workload_type, ResourceVector::new(4.0, 16.0, 2, 0))
    }

    fn env(nodes: Vec<Node>) -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            available_nodes: nodes,
            assigned_node: None,
        }
    }

    #[test]
    fn test_priorities_follow_registration() {
        let manager = StrategyManager::default();
        let priorities: Vec<u8> = manager.strategies().iter().map(|s| s.priority()).collect();
        assert_eq!(priorities, vec![3, 2, 2, 1, 1, 0]);
    }

    #[test]
    fn test_applicability() {
        let manager = StrategyManager::default();
        let plain = workload(WorkloadType::Batch);
        assert_eq!(
            manager.applicable(&plain, &env(vec![])),
            vec![StrategyKind::ResourceOptimization, StrategyKind::NodeSelection]
        );

        let mut rich = workload(WorkloadType::Serving);
        rich.cost = Some(CostPreferences {
            prefer_spot: true,
            ..Default::default()
        });
        rich.power = Some(PowerPreferences::default());
        rich.autoscaling = Some(AutoScalingSpec {
            min_replicas: 1,
            max_replicas: 5,
            metrics: vec![],
        });
        let mut placed = env(vec![]);
        placed.assigned_node = Some("n1".into());
        assert_eq!(manager.applicable(&rich, &placed), StrategyKind::ALL.to_vec());

        placed.assigned_node = Some(String::new());
        assert!(!manager.applicable(&rich, &placed).contains(&StrategyKind::WorkloadMigration));
    }

    #[test]
    fn test_spot_strategy_wins_when_preferred() {
        let manager = StrategyManager::default();
        let mut w = workload(WorkloadType::Training);
        w.cost = Some(CostPreferences {
            prefer_spot: true,
            ..Default::default()
        });
        let best = manager.find_best_strategy(&w, &env(vec![])).unwrap();
        // savings are 30% of the current cost, doubled
        assert_eq!(best.strategy_name, "spot_instance_optimization");
        assert!((best.score - 0.6).abs() < 1e-9);
        assert!((best.estimated_cost - manager.cost_model.hourly(&w.resources) * 0.7).abs() < 1e-9);
        assert_eq!(best.confidence, 0.8);
    }

    #[test]
    fn test_failed_strategy_is_skipped() {
        let manager = StrategyManager::default();
        // node selection fails without nodes; resource right-sizing still answers
        let best = manager
            .find_best_strategy(&workload(WorkloadType::Batch), &env(vec![]))
            .unwrap();
        assert_eq!(best.strategy_name, "resource_optimization");
    }

    #[test]
    fn test_node_selection_scores_labels() {
        let manager = StrategyManager::default();
        let nodes = vec![
            Node::new("plain", ResourceVector::new(8.0, 32.0, 0, 0)),
            Node::new("efficient", ResourceVector::new(8.0, 32.0, 0, 0))
                .with_label(labels::COST_EFFICIENCY, "high")
                .with_label(labels::LIFECYCLE, labels::SPOT)
                .with_label(labels::COST_TIER, "low"),
        ];
        let w = WorkloadSpec::new("w", WorkloadType::Batch, ResourceVector::new(0.1, 0.1, 0, 0));
        let best = manager.find_best_strategy(&w, &env(nodes)).unwrap();
        assert_eq!(best.strategy_name, "node_selection_optimization");
        assert_eq!(best.score, 1.0);
        assert!(best.recommendations[0].contains("efficient"));
        assert!((best.estimated_cost - manager.cost_model.hourly(&w.resources) * 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_right_sizing_floor() {
        let manager = StrategyManager::default();
        let w = WorkloadSpec::new("w", WorkloadType::Batch, ResourceVector::new(0.05, 0.05, 0, 0));
        let environment = env(vec![]);
        let ctx = manager.context(&w, &environment);
        let result = StrategyKind::ResourceOptimization.execute(&ctx).unwrap();
        assert_eq!(result.score, 0.0);
        assert_eq!(result.recommendations, vec!["Current resource allocation is already optimized"]);
    }

    #[test]
    fn test_auto_scaling_bounds_by_type() {
        let manager = StrategyManager::default();
        let environment = env(vec![]);
        let mut w = workload(WorkloadType::Inference);
        w.autoscaling = Some(AutoScalingSpec {
            min_replicas: 3,
            max_replicas: 10,
            metrics: vec![],
        });
        let ctx = manager.context(&w, &environment);
        let result = StrategyKind::AutoScaling.execute(&ctx).unwrap();
        assert_eq!(result.score, 0.9);
        assert_eq!(result.recommendations[1], "Adjust max replicas from 10 to 4");
        assert!((result.estimated_cost - ctx.current_cost() * 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_power_strategy_drops_serving_gpu() {
        let manager = StrategyManager::default();
        let environment = env(vec![]);
        let mut w = workload(WorkloadType::Serving);
        w.power = Some(PowerPreferences::default());
        let ctx = manager.context(&w, &environment);
        let result = StrategyKind::PowerOptimization.execute(&ctx).unwrap();
        assert!(result.score > 0.0);
        assert!(result.estimated_power < ctx.current_power());
        assert_eq!(result.recommendations[1], "Reduce GPU count from 2 to 1");
    }

    #[test]
    fn test_no_applicable_strategy() {
        let manager = StrategyManager {
            strategies: vec![StrategyKind::WorkloadMigration],
            ..StrategyManager::default()
        };
        let err = manager
            .find_best_strategy(&workload(WorkloadType::Batch), &env(vec![]))
            .unwrap_err();
        assert!(matches!(err, EngineError::NoApplicableStrategy(_)));
    }

    #[test]
    fn test_all_strategies_failing() {
        let manager = StrategyManager {
            strategies: vec![StrategyKind::NodeSelection],
            ..StrategyManager::default()
        };
        let err = manager
            .find_best_strategy(&workload(WorkloadType::Batch), &env(vec![]))
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::NoSuccessfulStrategy {
                workload: "w".into(),
                attempted: 1
            }
        );
    }
}
