//! Policy management
//!
//! Maps workloads to scheduling policies, either through an explicit
//! assignment or by inference from the workload type, and owns policy CRUD.

mod types;

pub use types::{
    CostConstraints, PolicyConstraints, PolicyTemplate, PolicyUpdate, PowerConstraints,
    ResourceConstraints, SchedulingAlgorithm, SchedulingPolicy, TimeConstraints,
};

use crate::error::{EngineError, EngineResult};
use crate::models::{WorkloadSpec, WorkloadType};
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info};

/// Names of the built-in policies
pub mod builtin {
    pub const DEFAULT: &str = "default";
    pub const COST_OPTIMIZED: &str = "cost-optimized";
    pub const POWER_OPTIMIZED: &str = "power-optimized";
    pub const HIGH_PERFORMANCE: &str = "high-performance";
    pub const LOW_LATENCY: &str = "low-latency";

    pub const ALL: [&str; 5] = [
        DEFAULT,
        COST_OPTIMIZED,
        POWER_OPTIMIZED,
        HIGH_PERFORMANCE,
        LOW_LATENCY,
    ];

    /// Operator-created policies that take precedence over type inference
    pub const TRAINING_OVERRIDE: &str = "training-cost-optimized";
    pub const SERVING_OVERRIDE: &str = "serving-balanced";
    pub const INFERENCE_OVERRIDE: &str = "inference-power-optimized";
    pub const BATCH_OVERRIDE: &str = "batch-least-loaded";
}

#[derive(Default)]
struct PolicyState {
    policies: HashMap<String, SchedulingPolicy>,
    /// workload name -> policy name
    assignments: HashMap<String, String>,
}

/// Owns the policy set and the workload assignments behind one lock
pub struct PolicyManager {
    state: RwLock<PolicyState>,
}

impl Default for PolicyManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyManager {
    /// Create a manager seeded with the five built-in policies
    pub fn new() -> Self {
        let policies = default_policies()
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();
        Self {
            state: RwLock::new(PolicyState {
                policies,
                assignments: HashMap::new(),
            }),
        }
    }

    /// Resolve the policy that governs `workload`
    ///
    /// An explicit, enabled assignment wins; otherwise the policy is inferred
    /// from the workload type.
    pub fn policy_for_workload(&self, workload: &WorkloadSpec) -> SchedulingPolicy {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);

        if let Some(policy) = state
            .assignments
            .get(&workload.name)
            .and_then(|name| state.policies.get(name))
            .filter(|p| p.enabled)
        {
            debug!(workload = %workload.name, policy = %policy.name, "Using assigned policy");
            return policy.clone();
        }

        let policy = infer_policy(&state.policies, workload.workload_type);
        debug!(
            workload = %workload.name,
            workload_type = %workload.workload_type,
            policy = %policy.name,
            algorithm = %policy.algorithm,
            "Inferred policy from workload type"
        );
        policy
    }

    pub fn create_policy(&self, name: &str, template: &PolicyTemplate) -> EngineResult<SchedulingPolicy> {
        let policy = SchedulingPolicy::from_template(name, template);
        policy.validate()?;

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.policies.contains_key(name) {
            return Err(EngineError::PolicyAlreadyExists(name.to_string()));
        }
        state.policies.insert(name.to_string(), policy.clone());

        info!(policy = %name, algorithm = %policy.algorithm, "Created scheduling policy");
        Ok(policy)
    }

    /// Apply a partial update; the stored policy is untouched if the result is invalid
    pub fn update_policy(&self, name: &str, update: PolicyUpdate) -> EngineResult<SchedulingPolicy> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let current = state
            .policies
            .get(name)
            .ok_or_else(|| EngineError::PolicyNotFound(name.to_string()))?;

        let mut updated = current.clone();
        updated.apply(update);
        updated.validate()?;
        state.policies.insert(name.to_string(), updated.clone());

        info!(policy = %name, algorithm = %updated.algorithm, enabled = updated.enabled, "Updated scheduling policy");
        Ok(updated)
    }

    /// Delete a policy and every workload assignment pointing at it
    pub fn delete_policy(&self, name: &str) -> EngineResult<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.policies.remove(name).is_none() {
            return Err(EngineError::PolicyNotFound(name.to_string()));
        }
        let before = state.assignments.len();
        state.assignments.retain(|_, policy| policy != name);

        info!(
            policy = %name,
            cleared_assignments = before - state.assignments.len(),
            "Deleted scheduling policy"
        );
        Ok(())
    }

    pub fn assign_policy(&self, workload: &str, policy: &str) -> EngineResult<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if !state.policies.contains_key(policy) {
            return Err(EngineError::PolicyNotFound(policy.to_string()));
        }
        state
            .assignments
            .insert(workload.to_string(), policy.to_string());

        info!(workload = %workload, policy = %policy, "Assigned policy to workload");
        Ok(())
    }

    pub fn get_policy(&self, name: &str) -> EngineResult<SchedulingPolicy> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .policies
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::PolicyNotFound(name.to_string()))
    }

    /// All policies, highest priority first, then by name
    pub fn list_policies(&self) -> Vec<SchedulingPolicy> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let mut policies: Vec<_> = state.policies.values().cloned().collect();
        policies.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.name.cmp(&b.name)));
        policies
    }

    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .policies
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of workloads explicitly assigned to each policy
    pub fn policy_statistics(&self) -> BTreeMap<String, usize> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let mut stats: BTreeMap<String, usize> =
            state.policies.keys().map(|name| (name.clone(), 0)).collect();
        for policy in state.assignments.values() {
            *stats.entry(policy.clone()).or_default() += 1;
        }
        stats
    }
}

/// The built-in policy set installed at construction
pub fn default_policies() -> Vec<SchedulingPolicy> {
    vec![
        SchedulingPolicy::new(builtin::DEFAULT, SchedulingAlgorithm::Balanced)
            .with_description("Balance cost, power and resource availability"),
        SchedulingPolicy::new(builtin::COST_OPTIMIZED, SchedulingAlgorithm::CostOptimized)
            .with_description("Minimize hourly cost, preferring spot nodes")
            .with_priority(1)
            .with_cost(CostConstraints {
                prefer_spot: true,
                optimization_weight: 0.9,
                ..Default::default()
            }),
        SchedulingPolicy::new(builtin::POWER_OPTIMIZED, SchedulingAlgorithm::PowerOptimized)
            .with_description("Minimize power draw, preferring renewable nodes")
            .with_priority(1)
            .with_power(PowerConstraints {
                prefer_green: true,
                optimization_weight: 0.9,
                ..Default::default()
            }),
        SchedulingPolicy::new(builtin::HIGH_PERFORMANCE, SchedulingAlgorithm::PriorityBased)
            .with_description("Priority placement with a CPU and memory floor")
            .with_priority(2)
            .with_resource(ResourceConstraints {
                min_cpu: Some(2.0),
                min_memory_gib: Some(4.0),
                ..Default::default()
            }),
        SchedulingPolicy::new(builtin::LOW_LATENCY, SchedulingAlgorithm::RoundRobin)
            .with_description("Fast round-robin placement with a 30s budget")
            .with_priority(3)
            .with_time(TimeConstraints {
                max_scheduling_time: Some(Duration::from_secs(30)),
            }),
    ]
}

fn infer_policy(
    policies: &HashMap<String, SchedulingPolicy>,
    workload_type: WorkloadType,
) -> SchedulingPolicy {
    let override_name = match workload_type {
        WorkloadType::Training => Some(builtin::TRAINING_OVERRIDE),
        WorkloadType::Serving => Some(builtin::SERVING_OVERRIDE),
        WorkloadType::Inference => Some(builtin::INFERENCE_OVERRIDE),
        WorkloadType::Batch => Some(builtin::BATCH_OVERRIDE),
        WorkloadType::Unknown => None,
    };
    if let Some(policy) = override_name
        .and_then(|name| policies.get(name))
        .filter(|p| p.enabled)
    {
        return policy.clone();
    }

    match workload_type {
        WorkloadType::Training => {
            SchedulingPolicy::new("training-default", SchedulingAlgorithm::CostOptimized)
                .with_priority(1)
                .with_cost(CostConstraints {
                    prefer_spot: true,
                    optimization_weight: 0.8,
                    ..Default::default()
                })
        }
        WorkloadType::Serving => {
            SchedulingPolicy::new("serving-default", SchedulingAlgorithm::Balanced)
                .with_priority(2)
                .with_resource(ResourceConstraints {
                    min_cpu: Some(0.5),
                    min_memory_gib: Some(1.0),
                    ..Default::default()
                })
        }
        WorkloadType::Inference => {
            SchedulingPolicy::new("inference-default", SchedulingAlgorithm::PowerOptimized)
                .with_priority(3)
                .with_power(PowerConstraints {
                    prefer_green: true,
                    optimization_weight: 0.7,
                    ..Default::default()
                })
        }
        WorkloadType::Batch => SchedulingPolicy::new("batch-default", SchedulingAlgorithm::LeastLoaded)
            .with_time(TimeConstraints {
                max_scheduling_time: Some(Duration::from_secs(5 * 60)),
            }),
        WorkloadType::Unknown => policies
            .get(builtin::DEFAULT)
            .cloned()
            .unwrap_or_else(|| SchedulingPolicy::new(builtin::DEFAULT, SchedulingAlgorithm::Balanced)),
    }
}
