//! Hard constraint filtering
//!
//! Removes nodes that cannot structurally satisfy a workload under its
//! policy. Nodes that fail any check are excluded and never scored.

use super::evaluator::NodeEvaluator;
use crate::error::{EngineError, EngineResult};
use crate::models::{Node, ResourceVector, WorkloadSpec};
use crate::policy::{ResourceConstraints, SchedulingPolicy};
use std::collections::HashMap;
use tracing::debug;

const HOURS_PER_DAY: f64 = 24.0;
const HOURS_PER_MONTH: f64 = 720.0;

/// Policy constraints merged with the workload's own preferences
///
/// Preference flags are OR-ed; numeric ceilings take the tighter value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectiveConstraints {
    pub resource: Option<ResourceConstraints>,
    pub prefer_spot: bool,
    pub prefer_green: bool,
    pub max_cost_per_hour: Option<f64>,
    pub max_cost_per_day: Option<f64>,
    pub max_cost_per_month: Option<f64>,
    pub max_power_watts: Option<f64>,
}

impl EffectiveConstraints {
    pub fn resolve(workload: &WorkloadSpec, policy: &SchedulingPolicy) -> Self {
        let policy_cost = policy.constraints.cost.as_ref();
        let policy_power = policy.constraints.power.as_ref();
        let workload_cost = workload.cost.as_ref();
        let workload_power = workload.power.as_ref();

        Self {
            resource: policy.constraints.resource.clone(),
            prefer_spot: policy_cost.is_some_and(|c| c.prefer_spot) || workload.prefers_spot(),
            prefer_green: policy_power.is_some_and(|p| p.prefer_green) || workload.prefers_green(),
            max_cost_per_hour: tighter(
                policy_cost.and_then(|c| c.max_cost_per_hour),
                workload_cost.and_then(|c| c.max_cost_per_hour),
            ),
            max_cost_per_day: policy_cost.and_then(|c| c.max_cost_per_day),
            max_cost_per_month: policy_cost.and_then(|c| c.max_cost_per_month),
            max_power_watts: tighter(
                policy_power.and_then(|p| p.max_power_watts),
                workload_power.and_then(|p| p.max_power_watts),
            ),
        }
    }
}

fn tighter(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

pub struct ConstraintFilter<'a> {
    evaluator: &'a NodeEvaluator,
}

impl<'a> ConstraintFilter<'a> {
    pub fn new(evaluator: &'a NodeEvaluator) -> Self {
        Self { evaluator }
    }

    /// Return the eligible nodes with their allocatable capacity reduced by `reserved`
    ///
    /// `reserved` maps node name to capacity already claimed by other workloads.
    pub fn apply(
        &self,
        workload: &WorkloadSpec,
        nodes: &[Node],
        constraints: &EffectiveConstraints,
        reserved: &HashMap<String, ResourceVector>,
    ) -> EngineResult<Vec<Node>> {
        if nodes.is_empty() {
            return Err(EngineError::NoCandidateNodes {
                workload: workload.name.clone(),
                detail: "node list is empty".to_string(),
            });
        }

        let mut eligible = Vec::with_capacity(nodes.len());
        let mut rejections = Vec::new();

        for node in nodes {
            let effective = match reserved.get(&node.name) {
                Some(claimed) => node.with_reserved(claimed),
                None => node.clone(),
            };
            match self.check(workload, &effective, constraints) {
                Ok(()) => eligible.push(effective),
                Err(why) => {
                    debug!(workload = %workload.name, node = %node.name, reason = %why, "Node filtered out");
                    rejections.push(format!("{}: {}", node.name, why));
                }
            }
        }

        if eligible.is_empty() {
            return Err(EngineError::NoCandidateNodes {
                workload: workload.name.clone(),
                detail: rejections.join("; "),
            });
        }
        Ok(eligible)
    }

    fn check(&self, workload: &WorkloadSpec, node: &Node, constraints: &EffectiveConstraints) -> Result<(), String> {
        if !node.ready {
            return Err("not ready".to_string());
        }
        if !workload.resources.fits_within(&node.allocatable) {
            return Err("insufficient unreserved capacity".to_string());
        }
        if let Some(bounds) = &constraints.resource {
            check_resource_bounds(bounds, &node.allocatable)?;
        }

        if constraints.prefer_spot && !node.is_spot() {
            return Err("spot instance required".to_string());
        }
        let any_cost_ceiling = constraints.max_cost_per_hour.is_some()
            || constraints.max_cost_per_day.is_some()
            || constraints.max_cost_per_month.is_some();
        if any_cost_ceiling {
            let hourly = self.evaluator.estimate_cost(workload, node, constraints);
            check_ceiling("hourly cost", hourly, constraints.max_cost_per_hour)?;
            check_ceiling("daily cost", hourly * HOURS_PER_DAY, constraints.max_cost_per_day)?;
            check_ceiling("monthly cost", hourly * HOURS_PER_MONTH, constraints.max_cost_per_month)?;
        }

        if constraints.prefer_green && !node.is_green() {
            return Err("renewable energy source required".to_string());
        }
        if constraints.max_power_watts.is_some() {
            let watts = self.evaluator.estimate_power(workload, node, constraints);
            check_ceiling("power", watts, constraints.max_power_watts)?;
        }
        Ok(())
    }
}

fn check_ceiling(what: &str, value: f64, ceiling: Option<f64>) -> Result<(), String> {
    match ceiling {
        Some(max) if value > max => Err(format!("{what} {value:.2} exceeds {max:.2}")),
        _ => Ok(()),
    }
}

fn check_resource_bounds(bounds: &ResourceConstraints, cap: &ResourceVector) -> Result<(), String> {
    fn below<T: PartialOrd + std::fmt::Display>(what: &str, value: T, min: Option<T>) -> Result<(), String> {
        match min {
            Some(min) if value < min => Err(format!("{what} {value} below minimum {min}")),
            _ => Ok(()),
        }
    }
    fn above<T: PartialOrd + std::fmt::Display>(what: &str, value: T, max: Option<T>) -> Result<(), String> {
        match max {
            Some(max) if value > max => Err(format!("{what} {value} above maximum {max}")),
            _ => Ok(()),
        }
    }

    below("cpu", cap.cpu_cores, bounds.min_cpu)?;
    above("cpu", cap.cpu_cores, bounds.max_cpu)?;
    below("memory", cap.memory_gib, bounds.min_memory_gib)?;
    above("memory", cap.memory_gib, bounds.max_memory_gib)?;
    below("gpu", cap.gpu, bounds.min_gpu)?;
    above("gpu", cap.gpu, bounds.max_gpu)?;
    below("npu", cap.npu, bounds.min_npu)?;
    above("npu", cap.npu, bounds.max_npu)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{labels, CostPreferences, WorkloadType};
    use crate::policy::{CostConstraints, SchedulingAlgorithm};

    fn workload(cpu: f64) -> WorkloadSpec {
        WorkloadSpec::new("w", WorkloadType::Batch, ResourceVector::new(cpu, 2.0, 0, 0))
    }

    fn balanced() -> SchedulingPolicy {
        SchedulingPolicy::new("default", SchedulingAlgorithm::Balanced)
    }

    #[test]
    fn test_empty_node_list() {
        let evaluator = NodeEvaluator::default();
        let filter = ConstraintFilter::new(&evaluator);
        let w = workload(1.0);
        let c = EffectiveConstraints::resolve(&w, &balanced());
        let err = filter.apply(&w, &[], &c, &HashMap::new()).unwrap_err();
        assert!(matches!(err, EngineError::NoCandidateNodes { .. }));
    }

    #[test]
    fn test_preferences_merge() {
        let mut w = workload(1.0);
        w.cost = Some(CostPreferences {
            max_cost_per_hour: Some(8.0),
            prefer_spot: true,
            ..Default::default()
        });
        let policy = balanced().with_cost(CostConstraints {
            max_cost_per_hour: Some(12.0),
            ..Default::default()
        });
        let c = EffectiveConstraints::resolve(&w, &policy);
        assert!(c.prefer_spot);
        assert_eq!(c.max_cost_per_hour, Some(8.0));
        assert!(!c.prefer_green);
    }

    #[test]
    fn test_reservations_reduce_capacity() {
        let evaluator = NodeEvaluator::default();
        let filter = ConstraintFilter::new(&evaluator);
        let w = workload(3.0);
        let c = EffectiveConstraints::resolve(&w, &balanced());
        let nodes = vec![Node::new("a", ResourceVector::new(4.0, 16.0, 0, 0))];

        assert_eq!(filter.apply(&w, &nodes, &c, &HashMap::new()).unwrap().len(), 1);

        let mut reserved = HashMap::new();
        reserved.insert("a".to_string(), ResourceVector::new(2.0, 2.0, 0, 0));
        let err = filter.apply(&w, &nodes, &c, &reserved).unwrap_err();
        match err {
            EngineError::NoCandidateNodes { detail, .. } => assert!(detail.contains("a: insufficient")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_cost_ceilings_per_day_and_month() {
        let evaluator = NodeEvaluator::default();
        let filter = ConstraintFilter::new(&evaluator);
        let w = workload(1.0);
        let nodes = vec![
            Node::new("cheap", ResourceVector::new(4.0, 16.0, 0, 0)).with_label(labels::COST_PER_HOUR, "low"),
            Node::new("pricey", ResourceVector::new(4.0, 16.0, 0, 0)).with_label(labels::COST_PER_HOUR, "high"),
        ];
        let policy = balanced().with_cost(CostConstraints {
            max_cost_per_day: Some(200.0),
            ..Default::default()
        });
        let c = EffectiveConstraints::resolve(&w, &policy);
        let kept = filter.apply(&w, &nodes, &c, &HashMap::new()).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "cheap");

        let policy = balanced().with_cost(CostConstraints {
            max_cost_per_month: Some(3000.0),
            ..Default::default()
        });
        let c = EffectiveConstraints::resolve(&w, &policy);
        assert!(filter.apply(&w, &nodes, &c, &HashMap::new()).is_err());
    }

    #[test]
    fn test_resource_bounds_on_node_capacity() {
        let evaluator = NodeEvaluator::default();
        let filter = ConstraintFilter::new(&evaluator);
        let w = workload(0.5);
        let nodes = vec![
            Node::new("small", ResourceVector::new(1.0, 2.0, 0, 0)),
            Node::new("big", ResourceVector::new(16.0, 64.0, 0, 0)),
        ];
        let policy = balanced().with_resource(ResourceConstraints {
            min_cpu: Some(2.0),
            min_memory_gib: Some(4.0),
            ..Default::default()
        });
        let c = EffectiveConstraints::resolve(&w, &policy);
        let kept = filter.apply(&w, &nodes, &c, &HashMap::new()).unwrap();
        assert_eq!(kept.iter().map(|n| n.name.as_str()).collect::<Vec<_>>(), vec!["big"]);
    }
}
