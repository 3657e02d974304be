//! The six built-in optimization strategies

use super::OptimizationContext;
use crate::error::{EngineError, EngineResult};
use crate::models::{labels, Node, OptimizationStrategyResult, ResourceVector, WorkloadType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

const SPOT_PRICE_FACTOR: f64 = 0.7;
const RIGHT_SIZING_FACTOR: f64 = 0.9;
const MIN_RESOURCE_UNIT: f64 = 0.1;
const MIGRATION_COST_FACTOR: f64 = 0.9;
const MIGRATION_POWER_FACTOR: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    SpotInstance,
    ResourceOptimization,
    PowerOptimization,
    AutoScaling,
    NodeSelection,
    WorkloadMigration,
}

impl StrategyKind {
    /// Registration order; evaluation runs in this order
    pub const ALL: [StrategyKind; 6] = [
        StrategyKind::SpotInstance,
        StrategyKind::ResourceOptimization,
        StrategyKind::PowerOptimization,
        StrategyKind::AutoScaling,
        StrategyKind::NodeSelection,
        StrategyKind::WorkloadMigration,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::SpotInstance => "spot_instance_optimization",
            StrategyKind::ResourceOptimization => "resource_optimization",
            StrategyKind::PowerOptimization => "power_optimization",
            StrategyKind::AutoScaling => "auto_scaling_optimization",
            StrategyKind::NodeSelection => "node_selection_optimization",
            StrategyKind::WorkloadMigration => "workload_migration_optimization",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StrategyKind::SpotInstance => "Optimize costs by using spot instances",
            StrategyKind::ResourceOptimization => "Right-size resource requests",
            StrategyKind::PowerOptimization => "Reduce power consumption",
            StrategyKind::AutoScaling => "Tune auto-scaling bounds for the workload type",
            StrategyKind::NodeSelection => "Select the most cost-effective node class",
            StrategyKind::WorkloadMigration => "Migrate the workload to a more efficient node",
        }
    }

    /// Higher runs first; migration is last since it disrupts the workload
    pub fn priority(&self) -> u8 {
        match self {
            StrategyKind::SpotInstance => 3,
            StrategyKind::ResourceOptimization | StrategyKind::PowerOptimization => 2,
            StrategyKind::AutoScaling | StrategyKind::NodeSelection => 1,
            StrategyKind::WorkloadMigration => 0,
        }
    }

    pub fn is_applicable(&self, ctx: &OptimizationContext<'_>) -> bool {
        let workload = ctx.workload;
        match self {
            StrategyKind::SpotInstance => workload.prefers_spot(),
            StrategyKind::ResourceOptimization | StrategyKind::NodeSelection => true,
            StrategyKind::PowerOptimization => workload.power.is_some(),
            StrategyKind::AutoScaling => workload.autoscaling.is_some(),
            StrategyKind::WorkloadMigration => ctx
                .environment
                .assigned_node
                .as_deref()
                .is_some_and(|n| !n.is_empty()),
        }
    }

    pub fn execute(&self, ctx: &OptimizationContext<'_>) -> EngineResult<OptimizationStrategyResult> {
        match self {
            StrategyKind::SpotInstance => Ok(spot_instance(ctx)),
            StrategyKind::ResourceOptimization => Ok(resource_optimization(ctx)),
            StrategyKind::PowerOptimization => Ok(power_optimization(ctx)),
            StrategyKind::AutoScaling => auto_scaling(ctx),
            StrategyKind::NodeSelection => node_selection(ctx),
            StrategyKind::WorkloadMigration => Ok(workload_migration(ctx)),
        }
    }

    fn result(
        &self,
        estimated_cost: f64,
        estimated_power: f64,
        score: f64,
        recommendations: Vec<String>,
        required_actions: &[&str],
        confidence: f64,
        implementation_time: Duration,
    ) -> OptimizationStrategyResult {
        OptimizationStrategyResult {
            strategy_name: self.name().to_string(),
            estimated_cost,
            estimated_power,
            score: score.clamp(0.0, 1.0),
            recommendations,
            required_actions: required_actions.iter().map(|a| a.to_string()).collect(),
            confidence,
            implementation_time,
        }
    }

    fn failed(&self, reason: impl Into<String>) -> EngineError {
        EngineError::StrategyFailed {
            strategy: self.name().to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn minutes(n: u64) -> Duration {
    Duration::from_secs(n * 60)
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

fn spot_instance(ctx: &OptimizationContext<'_>) -> OptimizationStrategyResult {
    let current = ctx.current_cost();
    let spot = current * SPOT_PRICE_FACTOR;
    let savings = current - spot;
    let score = if current > 0.0 {
        f64::min(1.0, savings / current * 2.0)
    } else {
        0.0
    };
    debug!(workload = %ctx.workload.name, current_cost = current, spot_cost = spot, score, "Spot strategy evaluated");

    StrategyKind::SpotInstance.result(
        spot,
        ctx.current_power(),
        score,
        vec![format!(
            "Use spot instances to save ${savings:.2}/hour ({:.1}%)",
            percent(savings, current)
        )],
        &["enable_spot_instances", "configure_interruption_handling"],
        0.8,
        minutes(5),
    )
}

fn resource_optimization(ctx: &OptimizationContext<'_>) -> OptimizationStrategyResult {
    let current = ctx.workload.resources;
    let optimized = ResourceVector {
        cpu_cores: (current.cpu_cores * RIGHT_SIZING_FACTOR).max(MIN_RESOURCE_UNIT),
        memory_gib: (current.memory_gib * RIGHT_SIZING_FACTOR).max(MIN_RESOURCE_UNIT),
        ..current
    };

    let current_cost = ctx.cost_model.hourly(&current);
    let optimized_cost = ctx.cost_model.hourly(&optimized);
    let savings = current_cost - optimized_cost;
    let score = if savings > 0.0 && current_cost > 0.0 {
        f64::min(1.0, savings / current_cost * 3.0)
    } else {
        0.0
    };
    debug!(workload = %ctx.workload.name, current_cost, optimized_cost, score, "Resource strategy evaluated");

    let recommendations = if savings > 0.0 {
        vec![
            format!("Reduce CPU from {:.2} to {:.2} cores", current.cpu_cores, optimized.cpu_cores),
            format!("Reduce memory from {:.2} to {:.2} GiB", current.memory_gib, optimized.memory_gib),
            format!("Save ${savings:.2}/hour ({:.1}%)", percent(savings, current_cost)),
        ]
    } else {
        vec!["Current resource allocation is already optimized".to_string()]
    };

    StrategyKind::ResourceOptimization.result(
        optimized_cost,
        ctx.power_model.watts(&optimized),
        score,
        recommendations,
        &["adjust_resource_requests", "monitor_performance"],
        0.7,
        minutes(2),
    )
}

fn power_optimization(ctx: &OptimizationContext<'_>) -> OptimizationStrategyResult {
    let current = ctx.workload.resources;
    let mut optimized = current;
    if ctx.workload.workload_type == WorkloadType::Serving && current.gpu > 0 {
        optimized.gpu -= 1;
    }

    let current_power = ctx.power_model.watts(&current);
    let optimized_power = ctx.power_model.watts(&optimized);
    let savings = current_power - optimized_power;
    let score = if savings > 0.0 && current_power > 0.0 {
        f64::min(1.0, savings / current_power * 2.0)
    } else {
        0.0
    };
    debug!(workload = %ctx.workload.name, current_power, optimized_power, score, "Power strategy evaluated");

    let recommendations = if savings > 0.0 {
        vec![
            format!(
                "Reduce power consumption by {savings:.2}W ({:.1}%)",
                percent(savings, current_power)
            ),
            format!("Reduce GPU count from {} to {}", current.gpu, optimized.gpu),
        ]
    } else {
        vec!["Current power configuration is already optimized".to_string()]
    };

    StrategyKind::PowerOptimization.result(
        ctx.current_cost(),
        optimized_power,
        score,
        recommendations,
        &["adjust_gpu_allocation", "monitor_power_usage"],
        0.6,
        minutes(3),
    )
}

fn auto_scaling(ctx: &OptimizationContext<'_>) -> EngineResult<OptimizationStrategyResult> {
    let kind = StrategyKind::AutoScaling;
    let scaling = ctx
        .workload
        .autoscaling
        .as_ref()
        .ok_or_else(|| kind.failed("workload has no auto-scaling configuration"))?;
    let (min, max) = (scaling.min_replicas, scaling.max_replicas);

    let (suggested_min, suggested_max, score) = match ctx.workload.workload_type {
        WorkloadType::Serving => (2, max.max(2), 0.8),
        WorkloadType::Training => (1, max.min(8), 0.7),
        WorkloadType::Inference => (1, max.min(4), 0.9),
        _ => (min, max, 0.5),
    };
    let average_replicas = f64::from(suggested_min + suggested_max) / 2.0;
    let cost = ctx.current_cost() * average_replicas;
    let power = ctx.current_power() * average_replicas;

    Ok(kind.result(
        cost,
        power,
        score,
        vec![
            format!("Adjust min replicas from {min} to {suggested_min}"),
            format!("Adjust max replicas from {max} to {suggested_max}"),
            format!("Estimated average cost: ${cost:.2}/hour"),
        ],
        &["update_hpa_config", "configure_metrics"],
        0.8,
        minutes(1),
    ))
}

/// Label-based attractiveness of a node class, in [0.5, 1]
pub fn node_class_score(node: &Node) -> f64 {
    let mut score: f64 = 0.5;
    match node.label(labels::COST_EFFICIENCY) {
        Some("high") => score += 0.3,
        Some("medium") => score += 0.1,
        _ => {}
    }
    if node.is_spot() {
        score += 0.2;
    }
    if node.is_green() {
        score += 0.1;
    }
    score.min(1.0)
}

pub fn node_cost_multiplier(node: &Node) -> f64 {
    match node.label(labels::COST_TIER) {
        Some("low") => 0.7,
        Some("high") => 1.3,
        _ => 1.0,
    }
}

pub fn node_power_multiplier(node: &Node) -> f64 {
    match node.label(labels::POWER_EFFICIENCY) {
        Some("high") => 0.8,
        Some("low") => 1.2,
        _ => 1.0,
    }
}

fn node_selection(ctx: &OptimizationContext<'_>) -> EngineResult<OptimizationStrategyResult> {
    let kind = StrategyKind::NodeSelection;
    let mut best: Option<(&Node, f64)> = None;
    for node in &ctx.environment.available_nodes {
        let score = node_class_score(node);
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((node, score));
        }
    }
    let (node, score) = best.ok_or_else(|| kind.failed("no suitable nodes found"))?;

    let cost_multiplier = node_cost_multiplier(node);
    let cost = ctx.current_cost() * cost_multiplier;
    let power = ctx.current_power() * node_power_multiplier(node);
    debug!(workload = %ctx.workload.name, node = %node.name, node_score = score, "Node selection strategy evaluated");

    Ok(kind.result(
        cost,
        power,
        score,
        vec![
            format!("Select node {} for optimal cost efficiency", node.name),
            format!("Node cost multiplier: {cost_multiplier:.2}"),
            format!("Estimated cost: ${cost:.2}/hour"),
        ],
        &["update_node_selector", "configure_affinity"],
        0.7,
        minutes(2),
    ))
}

fn workload_migration(ctx: &OptimizationContext<'_>) -> OptimizationStrategyResult {
    let current_cost = ctx.current_cost();
    let current_power = ctx.current_power();
    let cost = current_cost * MIGRATION_COST_FACTOR;
    let power = current_power * MIGRATION_POWER_FACTOR;
    let from = ctx.environment.assigned_node.as_deref().unwrap_or_default();

    StrategyKind::WorkloadMigration.result(
        cost,
        power,
        0.6,
        vec![
            format!("Consider migrating off {from} to a more cost-effective node"),
            format!("Potential cost savings: ${:.2}/hour", current_cost - cost),
            format!("Potential power savings: {:.2}W", current_power - power),
        ],
        &["plan_migration", "drain_current_node", "schedule_migration"],
        0.5,
        minutes(10),
    )
}
