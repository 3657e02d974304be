//! In-memory aggregation of scheduling events
//!
//! Aggregates are running averages updated per event; nothing is recomputed
//! from the full event history.

use super::report::{self, RankedEntry, SchedulingReport, StrategyRecommendation};
use crate::models::{Node, OptimizationStrategyResult, ResourceVector, SchedulingEvent, WorkloadType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tracing::debug;

/// Number of recent hosting nodes remembered per workload
pub const PREFERRED_NODES_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub node_name: String,
    pub total_schedules: u64,
    pub successful_schedules: u64,
    pub failed_schedules: u64,
    pub average_score: f64,
    pub average_cost_per_hour: f64,
    pub average_power_watts: f64,
    /// Reserved CPU over allocatable CPU, refreshed on collection
    pub utilization: f64,
    pub last_scheduled: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkloadMetrics {
    pub workload_id: String,
    pub workload_type: WorkloadType,
    pub total_schedules: u64,
    pub successful_schedules: u64,
    pub failed_schedules: u64,
    /// Averaged over every attempt; failed attempts count as zero
    pub average_score: f64,
    pub average_cost_per_hour: f64,
    pub average_power_watts: f64,
    pub average_duration: Duration,
    /// Most recent successful hosts, oldest first
    pub preferred_nodes: VecDeque<String>,
    pub last_scheduled: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyMetrics {
    pub policy_name: String,
    pub total_schedules: u64,
    pub successful_schedules: u64,
    pub failed_schedules: u64,
    pub average_score: f64,
    pub average_duration: Duration,
    pub last_used: Option<DateTime<Utc>>,
}

/// Engine-wide totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalMetrics {
    pub total_schedules: u64,
    pub successful_schedules: u64,
    pub failed_schedules: u64,
    pub average_score: f64,
    pub average_cost_per_hour: f64,
    pub average_power_watts: f64,
    pub average_duration: Duration,
    pub last_collection: Option<DateTime<Utc>>,
}

impl GlobalMetrics {
    /// Fraction of attempts that succeeded, in [0, 1]
    pub fn success_rate(&self) -> f64 {
        if self.total_schedules == 0 {
            return 0.0;
        }
        self.successful_schedules as f64 / self.total_schedules as f64
    }
}

#[derive(Debug, Default)]
struct CollectorState {
    nodes: HashMap<String, NodeMetrics>,
    workloads: HashMap<String, WorkloadMetrics>,
    policies: HashMap<String, PolicyMetrics>,
    global: GlobalMetrics,
    /// Failed attempts that never reached a node
    unplaced_failures: u64,
    strategies: BTreeMap<String, OptimizationStrategyResult>,
}

/// Aggregated node, workload and policy metrics behind one lock
#[derive(Debug, Default)]
pub struct MetricsCollector {
    state: RwLock<CollectorState>,
}

fn running_avg(previous: f64, n: u64, value: f64) -> f64 {
    if n == 0 {
        return value;
    }
    (previous * (n - 1) as f64 + value) / n as f64
}

fn running_avg_duration(previous: Duration, n: u64, value: Duration) -> Duration {
    Duration::from_secs_f64(running_avg(previous.as_secs_f64(), n, value.as_secs_f64()).max(0.0))
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one scheduling attempt into every aggregate it touches
    pub fn record_event(&self, event: &SchedulingEvent) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let decision = &event.decision;

        if !event.node_name.is_empty() {
            let node = state
                .nodes
                .entry(event.node_name.clone())
                .or_insert_with(|| NodeMetrics {
                    node_name: event.node_name.clone(),
                    ..Default::default()
                });
            node.total_schedules += 1;
            if event.success {
                node.successful_schedules += 1;
            } else {
                node.failed_schedules += 1;
            }
            let n = node.total_schedules;
            node.average_score = running_avg(node.average_score, n, decision.score);
            node.average_cost_per_hour = running_avg(node.average_cost_per_hour, n, decision.estimated_cost_per_hour);
            node.average_power_watts = running_avg(node.average_power_watts, n, decision.estimated_power_watts);
            node.last_scheduled = Some(event.timestamp);
        } else if !event.success {
            state.unplaced_failures += 1;
        }

        let workload = state
            .workloads
            .entry(event.workload_id.clone())
            .or_insert_with(|| WorkloadMetrics {
                workload_id: event.workload_id.clone(),
                ..Default::default()
            });
        workload.workload_type = event.workload_type;
        workload.total_schedules += 1;
        if event.success {
            workload.successful_schedules += 1;
            if !event.node_name.is_empty() {
                workload.preferred_nodes.push_back(event.node_name.clone());
                while workload.preferred_nodes.len() > PREFERRED_NODES_LIMIT {
                    workload.preferred_nodes.pop_front();
                }
            }
        } else {
            workload.failed_schedules += 1;
        }
        let n = workload.total_schedules;
        workload.average_score = running_avg(workload.average_score, n, decision.score);
        workload.average_cost_per_hour = running_avg(workload.average_cost_per_hour, n, decision.estimated_cost_per_hour);
        workload.average_power_watts = running_avg(workload.average_power_watts, n, decision.estimated_power_watts);
        workload.average_duration = running_avg_duration(workload.average_duration, n, event.duration);
        workload.last_scheduled = Some(event.timestamp);

        if let Some(policy_name) = &event.policy {
            let policy = state
                .policies
                .entry(policy_name.clone())
                .or_insert_with(|| PolicyMetrics {
                    policy_name: policy_name.clone(),
                    ..Default::default()
                });
            policy.total_schedules += 1;
            if event.success {
                policy.successful_schedules += 1;
            } else {
                policy.failed_schedules += 1;
            }
            let n = policy.total_schedules;
            policy.average_score = running_avg(policy.average_score, n, decision.score);
            policy.average_duration = running_avg_duration(policy.average_duration, n, event.duration);
            policy.last_used = Some(event.timestamp);
        }

        let global = &mut state.global;
        global.total_schedules += 1;
        if event.success {
            global.successful_schedules += 1;
        } else {
            global.failed_schedules += 1;
        }
        let n = global.total_schedules;
        global.average_score = running_avg(global.average_score, n, decision.score);
        global.average_cost_per_hour = running_avg(global.average_cost_per_hour, n, decision.estimated_cost_per_hour);
        global.average_power_watts = running_avg(global.average_power_watts, n, decision.estimated_power_watts);
        global.average_duration = running_avg_duration(global.average_duration, n, event.duration);
    }

    /// Refresh node inventory, utilisation and global totals
    ///
    /// Every node in `nodes` and every name in `policies` gets an entry even
    /// before its first event. Global totals are re-derived from per-node
    /// metrics plus failures that never reached a node.
    pub fn collect(&self, nodes: &[Node], reserved: &HashMap<String, ResourceVector>, policies: &[String]) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        for node in nodes {
            let entry = state
                .nodes
                .entry(node.name.clone())
                .or_insert_with(|| NodeMetrics {
                    node_name: node.name.clone(),
                    ..Default::default()
                });
            let claimed = reserved.get(&node.name).map(|r| r.cpu_cores).unwrap_or(0.0);
            entry.utilization = if node.allocatable.cpu_cores > 0.0 {
                (claimed / node.allocatable.cpu_cores).clamp(0.0, 1.0)
            } else {
                0.0
            };
        }

        for name in policies {
            state
                .policies
                .entry(name.clone())
                .or_insert_with(|| PolicyMetrics {
                    policy_name: name.clone(),
                    ..Default::default()
                });
        }

        let mut total = state.unplaced_failures;
        let mut successful = 0;
        let mut score_sum = 0.0;
        let mut cost_sum = 0.0;
        let mut power_sum = 0.0;
        for node in state.nodes.values() {
            let n = node.total_schedules as f64;
            total += node.total_schedules;
            successful += node.successful_schedules;
            score_sum += node.average_score * n;
            cost_sum += node.average_cost_per_hour * n;
            power_sum += node.average_power_watts * n;
        }

        let global = &mut state.global;
        global.total_schedules = total;
        global.successful_schedules = successful;
        global.failed_schedules = total - successful;
        if total > 0 {
            global.average_score = score_sum / total as f64;
            global.average_cost_per_hour = cost_sum / total as f64;
            global.average_power_watts = power_sum / total as f64;
        }
        global.last_collection = Some(Utc::now());

        debug!(
            nodes = state.nodes.len(),
            workloads = state.workloads.len(),
            total_schedules = total,
            "Collected placement metrics"
        );
    }

    /// Remember the winning strategy for a workload, replacing any earlier one
    pub fn record_strategy_result(&self, workload: &str, result: &OptimizationStrategyResult) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.strategies.insert(workload.to_string(), result.clone());
    }

    pub fn node_metrics(&self, node: &str) -> Option<NodeMetrics> {
        self.read(|s| s.nodes.get(node).cloned())
    }

    pub fn workload_metrics(&self, workload: &str) -> Option<WorkloadMetrics> {
        self.read(|s| s.workloads.get(workload).cloned())
    }

    pub fn policy_metrics(&self, policy: &str) -> Option<PolicyMetrics> {
        self.read(|s| s.policies.get(policy).cloned())
    }

    pub fn all_node_metrics(&self) -> Vec<NodeMetrics> {
        let mut nodes: Vec<_> = self.read(|s| s.nodes.values().cloned().collect());
        nodes.sort_by(|a, b| a.node_name.cmp(&b.node_name));
        nodes
    }

    pub fn global_metrics(&self) -> GlobalMetrics {
        self.read(|s| s.global.clone())
    }

    /// Build a report; `period` limits the top-N lists to recently scheduled
    /// entities and `Duration::ZERO` disables that restriction
    pub fn report(&self, period: Duration, top_n: usize) -> SchedulingReport {
        let now = Utc::now();
        let cutoff = if period.is_zero() {
            None
        } else {
            chrono::Duration::from_std(period)
                .ok()
                .and_then(|p| now.checked_sub_signed(p))
        };
        let in_period = |at: Option<DateTime<Utc>>| match cutoff {
            None => true,
            Some(cutoff) => at.is_some_and(|at| at >= cutoff),
        };

        self.read(|state| {
            let global = state.global.clone();

            let top_nodes = report::rank(
                state
                    .nodes
                    .values()
                    .filter(|n| in_period(n.last_scheduled))
                    .map(|n| RankedEntry::new(&n.node_name, n.total_schedules, n.successful_schedules, n.average_score)),
                top_n,
            );
            let top_workloads = report::rank(
                state
                    .workloads
                    .values()
                    .filter(|w| in_period(w.last_scheduled))
                    .map(|w| {
                        RankedEntry::new(&w.workload_id, w.total_schedules, w.successful_schedules, w.average_score)
                    }),
                top_n,
            );
            let policy_usage = state
                .policies
                .values()
                .map(|p| (p.policy_name.clone(), p.total_schedules))
                .collect();
            let node_totals: Vec<u64> = state.nodes.values().map(|n| n.total_schedules).collect();
            let recommendations = report::recommendations(&global, &node_totals);
            let strategy_recommendations = state
                .strategies
                .iter()
                .map(|(workload, result)| StrategyRecommendation {
                    workload: workload.clone(),
                    result: result.clone(),
                })
                .collect();

            SchedulingReport {
                period,
                total_schedules: global.total_schedules,
                successful_schedules: global.successful_schedules,
                failed_schedules: global.failed_schedules,
                success_rate: global.success_rate(),
                average_score: global.average_score,
                average_duration: global.average_duration,
                average_cost_per_hour: global.average_cost_per_hour,
                average_power_watts: global.average_power_watts,
                top_nodes,
                top_workloads,
                policy_usage,
                recommendations,
                strategy_recommendations,
                generated_at: now,
            }
        })
    }

    fn read<T>(&self, f: impl FnOnce(&CollectorState) -> T) -> T {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }
}
