//! Per-node scoring
//!
//! Scores one (workload, node) pair on four independent axes and estimates
//! the node's cost and power footprint for the workload.

use super::filter::EffectiveConstraints;
use crate::models::{labels, Node, WorkloadSpec};
use crate::pricing::{CostModel, PowerModel};
use serde::{Deserialize, Serialize};

const SPOT_COST_FACTOR: f64 = 0.7;
const GREEN_POWER_FACTOR: f64 = 0.9;

/// Weights of the composite score; they sum to 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub resource: f64,
    pub cost: f64,
    pub power: f64,
    pub placement: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            resource: 0.4,
            cost: 0.3,
            power: 0.2,
            placement: 0.1,
        }
    }
}

/// The four component scores, each in [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub resource: f64,
    pub cost: f64,
    pub power: f64,
    pub placement: f64,
}

impl ScoreBreakdown {
    /// `0.4*cost + 0.3*power + 0.3*resource`
    pub fn balanced(&self) -> f64 {
        0.4 * self.cost + 0.3 * self.power + 0.3 * self.resource
    }
}

/// Result of scoring one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEvaluation {
    pub node_name: String,
    /// False if the node failed the basic requirement check; such nodes score 0
    pub eligible: bool,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub estimated_cost_per_hour: f64,
    pub estimated_power_watts: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct NodeEvaluator {
    cost_model: CostModel,
    power_model: PowerModel,
    weights: ScoreWeights,
}

impl NodeEvaluator {
    pub fn new(cost_model: CostModel, power_model: PowerModel, weights: ScoreWeights) -> Self {
        Self {
            cost_model,
            power_model,
            weights,
        }
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost_model
    }

    pub fn power_model(&self) -> &PowerModel {
        &self.power_model
    }

    pub fn evaluate(
        &self,
        workload: &WorkloadSpec,
        node: &Node,
        constraints: &EffectiveConstraints,
    ) -> NodeEvaluation {
        let estimated_cost_per_hour = self.estimate_cost(workload, node, constraints);
        let estimated_power_watts = self.estimate_power(workload, node, constraints);

        if let Err(why) = check_basic_requirements(workload, node) {
            return NodeEvaluation {
                node_name: node.name.clone(),
                eligible: false,
                score: 0.0,
                breakdown: ScoreBreakdown::default(),
                estimated_cost_per_hour,
                estimated_power_watts,
                reason: why,
            };
        }

        let breakdown = ScoreBreakdown {
            resource: resource_score(workload, node),
            cost: cost_score(node, constraints.prefer_spot),
            power: power_score(node, constraints.prefer_green),
            placement: placement_score(workload, node),
        };
        let score = (self.weights.resource * breakdown.resource
            + self.weights.cost * breakdown.cost
            + self.weights.power * breakdown.power
            + self.weights.placement * breakdown.placement)
            .clamp(0.0, 1.0);

        tracing::debug!(
            node = %node.name,
            workload = %workload.name,
            resource_score = breakdown.resource,
            cost_score = breakdown.cost,
            power_score = breakdown.power,
            placement_score = breakdown.placement,
            score = score,
            "Node evaluation completed"
        );

        NodeEvaluation {
            node_name: node.name.clone(),
            eligible: true,
            score,
            breakdown,
            estimated_cost_per_hour,
            estimated_power_watts,
            reason: explain(&breakdown),
        }
    }

    /// Hourly cost of running the workload on `node`
    ///
    /// Uses the node's `cost-per-hour` label when present, the cost model
    /// otherwise. Spot nodes are discounted when spot is preferred.
    pub fn estimate_cost(&self, workload: &WorkloadSpec, node: &Node, constraints: &EffectiveConstraints) -> f64 {
        let base = node_hourly_price(node).unwrap_or_else(|| self.cost_model.hourly(&workload.resources));
        if constraints.prefer_spot && node.is_spot() {
            base * SPOT_COST_FACTOR
        } else {
            base
        }
    }

    /// Power draw of running the workload on `node`, in watts
    pub fn estimate_power(&self, workload: &WorkloadSpec, node: &Node, constraints: &EffectiveConstraints) -> f64 {
        let base = node_power_draw(node).unwrap_or_else(|| self.power_model.watts(&workload.resources));
        if constraints.prefer_green && node.is_green() {
            base * GREEN_POWER_FACTOR
        } else {
            base
        }
    }
}

/// Price from the `cost-per-hour` label: a tier word or a number
pub fn node_hourly_price(node: &Node) -> Option<f64> {
    tiered_label(node.label(labels::COST_PER_HOUR)?, 5.0, 10.0, 20.0)
}

/// Draw from the `power-usage` label: a tier word or a number of watts
pub fn node_power_draw(node: &Node) -> Option<f64> {
    tiered_label(node.label(labels::POWER_USAGE)?, 100.0, 200.0, 400.0)
}

fn tiered_label(value: &str, low: f64, medium: f64, high: f64) -> Option<f64> {
    match value {
        "low" => Some(low),
        "medium" => Some(medium),
        "high" => Some(high),
        other => other
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0),
    }
}

/// Ready, matches the node selector, and has room for the request
pub fn check_basic_requirements(workload: &WorkloadSpec, node: &Node) -> Result<(), String> {
    if !node.ready {
        return Err("node not ready".to_string());
    }
    if let Some(placement) = &workload.placement {
        let mut selector: Vec<_> = placement.node_selector.iter().collect();
        selector.sort();
        for (key, value) in selector {
            if node.label(key) != Some(value.as_str()) {
                return Err(format!("node selector mismatch on {key}={value}"));
            }
        }
    }
    let req = &workload.resources;
    let cap = &node.allocatable;
    if req.cpu_cores > cap.cpu_cores {
        return Err(format!("insufficient cpu: requested {} of {}", req.cpu_cores, cap.cpu_cores));
    }
    if req.memory_gib > cap.memory_gib {
        return Err(format!(
            "insufficient memory: requested {}Gi of {}Gi",
            req.memory_gib, cap.memory_gib
        ));
    }
    if req.gpu > cap.gpu {
        return Err(format!("insufficient gpu: requested {} of {}", req.gpu, cap.gpu));
    }
    if req.npu > cap.npu {
        return Err(format!("insufficient npu: requested {} of {}", req.npu, cap.npu));
    }
    Ok(())
}

fn utilization(requested: f64, allocatable: f64) -> f64 {
    if allocatable <= 0.0 {
        return if requested > 0.0 { 1.0 } else { 0.0 };
    }
    (requested / allocatable).clamp(0.0, 1.0)
}

/// `1 - utilization`, averaged over CPU and memory
pub fn resource_score(workload: &WorkloadSpec, node: &Node) -> f64 {
    let cpu = utilization(workload.resources.cpu_cores, node.allocatable.cpu_cores);
    let memory = utilization(workload.resources.memory_gib, node.allocatable.memory_gib);
    ((1.0 - cpu) + (1.0 - memory)) / 2.0
}

pub fn cost_score(node: &Node, prefer_spot: bool) -> f64 {
    let mut score = 0.5;
    if prefer_spot && node.is_spot() {
        score += 0.3;
    }
    match node.cost_tier() {
        Some("low") => score += 0.2,
        Some("medium") => score += 0.1,
        _ => {}
    }
    f64::min(score, 1.0)
}

pub fn power_score(node: &Node, prefer_green: bool) -> f64 {
    let mut score = 0.5;
    if prefer_green && node.is_green() {
        score += 0.3;
    }
    match node.label(labels::POWER_EFFICIENCY) {
        Some("high") => score += 0.2,
        Some("medium") => score += 0.1,
        _ => {}
    }
    f64::min(score, 1.0)
}

/// Weighted fraction of matched affinity rules; 0.5 with no rules
pub fn placement_score(workload: &WorkloadSpec, node: &Node) -> f64 {
    let rules = match &workload.placement {
        Some(p) if !p.affinity.is_empty() => &p.affinity,
        _ => return 0.5,
    };
    let (matched, total) = rules.iter().fold((0.0, 0.0), |(matched, total), rule| {
        let weight = rule.effective_weight();
        if node.has_label(&rule.key, &rule.value) {
            (matched + weight, total + weight)
        } else {
            (matched, total + weight)
        }
    });
    if total <= 0.0 {
        0.5
    } else {
        matched / total
    }
}

fn explain(scores: &ScoreBreakdown) -> String {
    let mut reasons = Vec::new();
    if scores.resource > 0.8 {
        reasons.push("excellent resource availability");
    } else if scores.resource > 0.6 {
        reasons.push("good resource availability");
    }
    if scores.cost > 0.8 {
        reasons.push("cost efficient");
    }
    if scores.power > 0.8 {
        reasons.push("power efficient");
    }
    if scores.placement > 0.8 {
        reasons.push("meets placement requirements");
    }
    if reasons.is_empty() {
        "meets basic requirements".to_string()
    } else {
        format!("selected because: {}", reasons.join(", "))
    }
}
