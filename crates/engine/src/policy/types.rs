//! Scheduling policy types

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The six node selection rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingAlgorithm {
    RoundRobin,
    LeastLoaded,
    CostOptimized,
    PowerOptimized,
    Balanced,
    PriorityBased,
}

impl SchedulingAlgorithm {
    pub const ALL: [SchedulingAlgorithm; 6] = [
        SchedulingAlgorithm::RoundRobin,
        SchedulingAlgorithm::LeastLoaded,
        SchedulingAlgorithm::CostOptimized,
        SchedulingAlgorithm::PowerOptimized,
        SchedulingAlgorithm::Balanced,
        SchedulingAlgorithm::PriorityBased,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulingAlgorithm::RoundRobin => "round_robin",
            SchedulingAlgorithm::LeastLoaded => "least_loaded",
            SchedulingAlgorithm::CostOptimized => "cost_optimized",
            SchedulingAlgorithm::PowerOptimized => "power_optimized",
            SchedulingAlgorithm::Balanced => "balanced",
            SchedulingAlgorithm::PriorityBased => "priority_based",
        }
    }
}

impl Default for SchedulingAlgorithm {
    fn default() -> Self {
        SchedulingAlgorithm::Balanced
    }
}

impl fmt::Display for SchedulingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounds on a node's allocatable capacity. Unset bounds are unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceConstraints {
    #[serde(default)]
    pub min_cpu: Option<f64>,
    #[serde(default)]
    pub max_cpu: Option<f64>,
    #[serde(default)]
    pub min_memory_gib: Option<f64>,
    #[serde(default)]
    pub max_memory_gib: Option<f64>,
    #[serde(default)]
    pub min_gpu: Option<u32>,
    #[serde(default)]
    pub max_gpu: Option<u32>,
    #[serde(default)]
    pub min_npu: Option<u32>,
    #[serde(default)]
    pub max_npu: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostConstraints {
    #[serde(default)]
    pub max_cost_per_hour: Option<f64>,
    #[serde(default)]
    pub max_cost_per_day: Option<f64>,
    #[serde(default)]
    pub max_cost_per_month: Option<f64>,
    #[serde(default)]
    pub prefer_spot: bool,
    /// [0, 1]
    #[serde(default)]
    pub optimization_weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerConstraints {
    #[serde(default)]
    pub max_power_watts: Option<f64>,
    #[serde(default)]
    pub prefer_green: bool,
    /// [0, 1]
    #[serde(default)]
    pub optimization_weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeConstraints {
    /// Advisory; callers race the decision against it
    #[serde(default)]
    pub max_scheduling_time: Option<Duration>,
}

/// The optional constraint sub-objects of a policy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyConstraints {
    #[serde(default)]
    pub resource: Option<ResourceConstraints>,
    #[serde(default)]
    pub cost: Option<CostConstraints>,
    #[serde(default)]
    pub power: Option<PowerConstraints>,
    #[serde(default)]
    pub time: Option<TimeConstraints>,
}

/// An (algorithm, constraints) pair governing how a workload is scheduled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingPolicy {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub algorithm: SchedulingAlgorithm,
    #[serde(default)]
    pub constraints: PolicyConstraints,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub priority: i32,
}

fn default_enabled() -> bool {
    true
}

/// Input to policy creation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyTemplate {
    #[serde(default)]
    pub description: String,
    pub algorithm: SchedulingAlgorithm,
    #[serde(default)]
    pub constraints: PolicyConstraints,
    #[serde(default)]
    pub priority: i32,
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyUpdate {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub algorithm: Option<SchedulingAlgorithm>,
    #[serde(default)]
    pub resource: Option<ResourceConstraints>,
    #[serde(default)]
    pub cost: Option<CostConstraints>,
    #[serde(default)]
    pub power: Option<PowerConstraints>,
    #[serde(default)]
    pub time: Option<TimeConstraints>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub priority: Option<i32>,
}

impl SchedulingPolicy {
    pub fn new(name: impl Into<String>, algorithm: SchedulingAlgorithm) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            algorithm,
            constraints: PolicyConstraints::default(),
            enabled: true,
            priority: 0,
        }
    }

    pub fn from_template(name: impl Into<String>, template: &PolicyTemplate) -> Self {
        Self {
            name: name.into(),
            description: template.description.clone(),
            algorithm: template.algorithm,
            constraints: template.constraints.clone(),
            enabled: true,
            priority: template.priority,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_resource(mut self, resource: ResourceConstraints) -> Self {
        self.constraints.resource = Some(resource);
        self
    }

    pub fn with_cost(mut self, cost: CostConstraints) -> Self {
        self.constraints.cost = Some(cost);
        self
    }

    pub fn with_power(mut self, power: PowerConstraints) -> Self {
        self.constraints.power = Some(power);
        self
    }

    pub fn with_time(mut self, time: TimeConstraints) -> Self {
        self.constraints.time = Some(time);
        self
    }

    pub fn max_scheduling_time(&self) -> Option<Duration> {
        self.constraints.time.as_ref()?.max_scheduling_time
    }

    pub(crate) fn apply(&mut self, update: PolicyUpdate) {
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(algorithm) = update.algorithm {
            self.algorithm = algorithm;
        }
        if update.resource.is_some() {
            self.constraints.resource = update.resource;
        }
        if update.cost.is_some() {
            self.constraints.cost = update.cost;
        }
        if update.power.is_some() {
            self.constraints.power = update.power;
        }
        if update.time.is_some() {
            self.constraints.time = update.time;
        }
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
    }

    /// Check name, bound ordering, non-negative ceilings and weight ranges
    pub fn validate(&self) -> EngineResult<()> {
        if self.name.trim().is_empty() {
            return Err(EngineError::invalid_policy(&self.name, "name cannot be empty"));
        }
        let invalid = |reason: String| EngineError::invalid_policy(&self.name, reason);

        if let Some(r) = &self.constraints.resource {
            check_bounds("cpu", r.min_cpu, r.max_cpu).map_err(invalid)?;
            check_bounds("memory", r.min_memory_gib, r.max_memory_gib).map_err(invalid)?;
            check_bounds("gpu", r.min_gpu, r.max_gpu).map_err(invalid)?;
            check_bounds("npu", r.min_npu, r.max_npu).map_err(invalid)?;
            for (field, value) in [
                ("min cpu", r.min_cpu),
                ("max cpu", r.max_cpu),
                ("min memory", r.min_memory_gib),
                ("max memory", r.max_memory_gib),
            ] {
                check_non_negative(field, value).map_err(invalid)?;
            }
        }

        if let Some(c) = &self.constraints.cost {
            check_non_negative("max cost per hour", c.max_cost_per_hour).map_err(invalid)?;
            check_non_negative("max cost per day", c.max_cost_per_day).map_err(invalid)?;
            check_non_negative("max cost per month", c.max_cost_per_month).map_err(invalid)?;
            check_weight("cost optimization weight", c.optimization_weight).map_err(invalid)?;
        }

        if let Some(p) = &self.constraints.power {
            check_non_negative("max power", p.max_power_watts).map_err(invalid)?;
            check_weight("power optimization weight", p.optimization_weight).map_err(invalid)?;
        }

        Ok(())
    }
}

fn check_bounds<T: PartialOrd + fmt::Display>(
    what: &str,
    min: Option<T>,
    max: Option<T>,
) -> Result<(), String> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => {
            Err(format!("min {what} {min} cannot be greater than max {what} {max}"))
        }
        _ => Ok(()),
    }
}

fn check_non_negative(what: &str, value: Option<f64>) -> Result<(), String> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(format!("{what} cannot be negative")),
        _ => Ok(()),
    }
}

fn check_weight(what: &str, weight: f64) -> Result<(), String> {
    if (0.0..=1.0).contains(&weight) {
        Ok(())
    } else {
        Err(format!("{what} must be between 0 and 1, got {weight}"))
    }
}
