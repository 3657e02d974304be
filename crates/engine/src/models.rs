//! Core data models for the placement engine

use crate::error::{EngineError, EngineResult};
use crate::resources::{parse_cpu, parse_memory_gib};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Upper bound on GPUs/NPUs a single workload may request
pub const MAX_DEVICES_PER_WORKLOAD: u32 = 16;

/// Upper bound on workload priority
pub const MAX_PRIORITY: u32 = 100;

/// Affinity weight used when a rule leaves it unset
pub const DEFAULT_AFFINITY_WEIGHT: u32 = 50;

/// Well-known node label keys and values
pub mod labels {
    pub const LIFECYCLE: &str = "lifecycle";
    pub const SPOT: &str = "spot";
    pub const ENERGY_SOURCE: &str = "energy-source";
    pub const RENEWABLE: &str = "renewable";
    pub const COST_TIER: &str = "cost-tier";
    pub const COST_PER_HOUR: &str = "cost-per-hour";
    pub const COST_EFFICIENCY: &str = "cost-efficiency";
    pub const POWER_EFFICIENCY: &str = "power-efficiency";
    pub const POWER_USAGE: &str = "power-usage";
    pub const PRIORITY_TIER: &str = "priority-tier";
}

/// Kind of AI/compute workload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadType {
    Training,
    Serving,
    Inference,
    Batch,
    /// Anything the engine does not recognise; scheduled with the default policy
    #[default]
    #[serde(other)]
    Unknown,
}

impl WorkloadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadType::Training => "training",
            WorkloadType::Serving => "serving",
            WorkloadType::Inference => "inference",
            WorkloadType::Batch => "batch",
            WorkloadType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for WorkloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource vector: CPU cores, memory GiB, GPU and NPU counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceVector {
    pub cpu_cores: f64,
    pub memory_gib: f64,
    #[serde(default)]
    pub gpu: u32,
    #[serde(default)]
    pub npu: u32,
}

impl ResourceVector {
    pub fn new(cpu_cores: f64, memory_gib: f64, gpu: u32, npu: u32) -> Self {
        Self {
            cpu_cores,
            memory_gib,
            gpu,
            npu,
        }
    }

    /// Build from quantity strings such as `"500m"` and `"4Gi"`
    pub fn from_quantities(cpu: &str, memory: &str, gpu: u32, npu: u32) -> EngineResult<Self> {
        Ok(Self {
            cpu_cores: parse_cpu(cpu)?,
            memory_gib: parse_memory_gib(memory)?,
            gpu,
            npu,
        })
    }

    pub fn add(&self, other: &ResourceVector) -> ResourceVector {
        ResourceVector {
            cpu_cores: self.cpu_cores + other.cpu_cores,
            memory_gib: self.memory_gib + other.memory_gib,
            gpu: self.gpu + other.gpu,
            npu: self.npu + other.npu,
        }
    }

    /// Component-wise subtraction clamped at zero
    pub fn saturating_sub(&self, other: &ResourceVector) -> ResourceVector {
        ResourceVector {
            cpu_cores: (self.cpu_cores - other.cpu_cores).max(0.0),
            memory_gib: (self.memory_gib - other.memory_gib).max(0.0),
            gpu: self.gpu.saturating_sub(other.gpu),
            npu: self.npu.saturating_sub(other.npu),
        }
    }

    /// True if every component of `self` fits within `capacity`
    pub fn fits_within(&self, capacity: &ResourceVector) -> bool {
        self.cpu_cores <= capacity.cpu_cores
            && self.memory_gib <= capacity.memory_gib
            && self.gpu <= capacity.gpu
            && self.npu <= capacity.npu
    }
}

/// Workload-level cost preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostPreferences {
    #[serde(default)]
    pub max_cost_per_hour: Option<f64>,
    #[serde(default)]
    pub budget_limit: Option<f64>,
    #[serde(default)]
    pub prefer_spot: bool,
}

/// Workload-level power preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerPreferences {
    #[serde(default)]
    pub max_power_watts: Option<f64>,
    #[serde(default)]
    pub prefer_green: bool,
}

/// A single weighted node affinity rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffinityRule {
    pub key: String,
    pub value: String,
    /// 0-100; zero means "unset" and falls back to [`DEFAULT_AFFINITY_WEIGHT`]
    #[serde(default)]
    pub weight: u32,
}

impl AffinityRule {
    pub fn effective_weight(&self) -> f64 {
        if self.weight == 0 {
            f64::from(DEFAULT_AFFINITY_WEIGHT)
        } else {
            f64::from(self.weight)
        }
    }
}

/// Hard node selector plus soft affinity rules
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementPolicy {
    #[serde(default)]
    pub node_selector: HashMap<String, String>,
    #[serde(default)]
    pub affinity: Vec<AffinityRule>,
}

/// Metric driving autoscaling decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalingMetricKind {
    Cost,
    Power,
    Latency,
    Cpu,
    Memory,
    Gpu,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingMetric {
    pub kind: ScalingMetricKind,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoScalingSpec {
    pub min_replicas: u32,
    pub max_replicas: u32,
    #[serde(default)]
    pub metrics: Vec<ScalingMetric>,
}

/// Declared intent of a workload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadSpec {
    /// Workload identity, unique within the engine
    pub name: String,
    pub workload_type: WorkloadType,
    /// 0-100
    #[serde(default)]
    pub priority: u32,
    pub resources: ResourceVector,
    #[serde(default)]
    pub cost: Option<CostPreferences>,
    #[serde(default)]
    pub power: Option<PowerPreferences>,
    #[serde(default)]
    pub placement: Option<PlacementPolicy>,
    #[serde(default)]
    pub autoscaling: Option<AutoScalingSpec>,
}

impl WorkloadSpec {
    pub fn new(name: impl Into<String>, workload_type: WorkloadType, resources: ResourceVector) -> Self {
        Self {
            name: name.into(),
            workload_type,
            priority: 0,
            resources,
            cost: None,
            power: None,
            placement: None,
            autoscaling: None,
        }
    }

    pub fn prefers_spot(&self) -> bool {
        self.cost.as_ref().is_some_and(|c| c.prefer_spot)
    }

    pub fn prefers_green(&self) -> bool {
        self.power.as_ref().is_some_and(|p| p.prefer_green)
    }

    /// Check the structural invariants of a workload
    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |reason: String| EngineError::InvalidWorkload {
            workload: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name cannot be empty".into()));
        }
        if self.priority > MAX_PRIORITY {
            return Err(invalid(format!(
                "priority {} exceeds {}",
                self.priority, MAX_PRIORITY
            )));
        }
        if !self.resources.cpu_cores.is_finite() || self.resources.cpu_cores < 0.0 {
            return Err(invalid("cpu must be a non-negative number".into()));
        }
        if !self.resources.memory_gib.is_finite() || self.resources.memory_gib < 0.0 {
            return Err(invalid("memory must be a non-negative number".into()));
        }
        if self.resources.gpu > MAX_DEVICES_PER_WORKLOAD {
            return Err(invalid(format!(
                "gpu count {} exceeds {}",
                self.resources.gpu, MAX_DEVICES_PER_WORKLOAD
            )));
        }
        if self.resources.npu > MAX_DEVICES_PER_WORKLOAD {
            return Err(invalid(format!(
                "npu count {} exceeds {}",
                self.resources.npu, MAX_DEVICES_PER_WORKLOAD
            )));
        }
        if let Some(scaling) = &self.autoscaling {
            if scaling.min_replicas > scaling.max_replicas {
                return Err(invalid(format!(
                    "min replicas {} greater than max replicas {}",
                    scaling.min_replicas, scaling.max_replicas
                )));
            }
        }
        if let Some(placement) = &self.placement {
            if let Some(rule) = placement.affinity.iter().find(|r| r.weight > 100) {
                return Err(invalid(format!(
                    "affinity weight {} for {} exceeds 100",
                    rule.weight, rule.key
                )));
            }
        }
        Ok(())
    }
}

/// A scheduling target. Read-only input owned by the cluster state provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub allocatable: ResourceVector,
    pub ready: bool,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl Node {
    pub fn new(name: impl Into<String>, allocatable: ResourceVector) -> Self {
        Self {
            name: name.into(),
            allocatable,
            ready: true,
            labels: HashMap::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn has_label(&self, key: &str, value: &str) -> bool {
        self.label(key) == Some(value)
    }

    pub fn is_spot(&self) -> bool {
        self.has_label(labels::LIFECYCLE, labels::SPOT)
    }

    pub fn is_green(&self) -> bool {
        self.has_label(labels::ENERGY_SOURCE, labels::RENEWABLE)
    }

    /// Cost tier word (`low`/`medium`/`high`), from `cost-tier` or a word-valued `cost-per-hour`
    pub fn cost_tier(&self) -> Option<&str> {
        self.label(labels::COST_TIER).or_else(|| {
            self.label(labels::COST_PER_HOUR)
                .filter(|v| matches!(*v, "low" | "medium" | "high"))
        })
    }

    /// The same node with `reserved` capacity removed from its allocatable vector
    pub fn with_reserved(&self, reserved: &ResourceVector) -> Node {
        Node {
            allocatable: self.allocatable.saturating_sub(reserved),
            ..self.clone()
        }
    }
}

/// The engine's answer for one workload. Immutable once produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulingDecision {
    pub node_name: String,
    /// Composite score in [0, 1]
    pub score: f64,
    pub reason: String,
    pub estimated_cost_per_hour: f64,
    pub estimated_power_watts: f64,
}

/// Append-only record of one scheduling attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingEvent {
    pub timestamp: DateTime<Utc>,
    pub workload_id: String,
    pub workload_type: WorkloadType,
    /// Empty when the attempt failed
    pub node_name: String,
    /// Policy that governed the attempt, if known
    pub policy: Option<String>,
    pub decision: SchedulingDecision,
    pub duration: Duration,
    pub success: bool,
    pub reason: String,
}

impl SchedulingEvent {
    pub fn success(
        workload: &WorkloadSpec,
        policy: Option<&str>,
        decision: SchedulingDecision,
        duration: Duration,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            workload_id: workload.name.clone(),
            workload_type: workload.workload_type,
            node_name: decision.node_name.clone(),
            policy: policy.map(str::to_string),
            decision,
            duration,
            success: true,
            reason: "Success".to_string(),
        }
    }

    pub fn failure(
        workload: &WorkloadSpec,
        policy: Option<&str>,
        duration: Duration,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            workload_id: workload.name.clone(),
            workload_type: workload.workload_type,
            node_name: String::new(),
            policy: policy.map(str::to_string),
            decision: SchedulingDecision::default(),
            duration,
            success: false,
            reason: reason.into(),
        }
    }
}

/// What the strategy manager sees of the cluster for one workload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    #[serde(default)]
    pub available_nodes: Vec<Node>,
    /// Node currently hosting the workload, if placed
    #[serde(default)]
    pub assigned_node: Option<String>,
}

/// Outcome of evaluating one optimization strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationStrategyResult {
    pub strategy_name: String,
    pub estimated_cost: f64,
    pub estimated_power: f64,
    /// [0, 1]
    pub score: f64,
    pub recommendations: Vec<String>,
    pub required_actions: Vec<String>,
    /// [0, 1]
    pub confidence: f64,
    pub implementation_time: Duration,
}

/// Quantity-string form of a node, as read from inventory files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeManifest {
    pub name: String,
    #[serde(default = "default_ready")]
    pub ready: bool,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub allocatable: QuantityManifest,
}

/// Quantity-string form of a workload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadManifest {
    pub name: String,
    pub workload_type: WorkloadType,
    #[serde(default)]
    pub priority: u32,
    pub resources: QuantityManifest,
    #[serde(default)]
    pub cost: Option<CostPreferences>,
    #[serde(default)]
    pub power: Option<PowerPreferences>,
    #[serde(default)]
    pub placement: Option<PlacementPolicy>,
    #[serde(default)]
    pub autoscaling: Option<AutoScalingSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantityManifest {
    pub cpu: String,
    pub memory: String,
    #[serde(default)]
    pub gpu: u32,
    #[serde(default)]
    pub npu: u32,
}

fn default_ready() -> bool {
    true
}

impl QuantityManifest {
    pub fn to_vector(&self) -> EngineResult<ResourceVector> {
        ResourceVector::from_quantities(&self.cpu, &self.memory, self.gpu, self.npu)
    }
}

impl TryFrom<NodeManifest> for Node {
    type Error = EngineError;

    fn try_from(manifest: NodeManifest) -> EngineResult<Self> {
        Ok(Node {
            allocatable: manifest.allocatable.to_vector()?,
            name: manifest.name,
            ready: manifest.ready,
            labels: manifest.labels,
        })
    }
}

impl TryFrom<WorkloadManifest> for WorkloadSpec {
    type Error = EngineError;

    fn try_from(manifest: WorkloadManifest) -> EngineResult<Self> {
        let spec = WorkloadSpec {
            resources: manifest.resources.to_vector()?,
            name: manifest.name,
            workload_type: manifest.workload_type,
            priority: manifest.priority,
            cost: manifest.cost,
            power: manifest.power,
            placement: manifest.placement,
            autoscaling: manifest.autoscaling,
        };
        spec.validate()?;
        Ok(spec)
    }
}
