//! Scheduling report and threshold-based recommendations

use super::collector::GlobalMetrics;
use crate::models::OptimizationStrategyResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Duration;

const LOW_SUCCESS_RATE: f64 = 0.8;
const LOW_AVERAGE_SCORE: f64 = 0.6;
const HIGH_AVERAGE_DURATION: Duration = Duration::from_secs(120);
const UNDERUSED_SCHEDULE_COUNT: u64 = 5;

pub const LOW_SUCCESS_RATE_ADVICE: &str =
    "Scheduling success rate is below 80%. Consider reviewing node capacity and workload requirements.";
pub const LOW_SCORE_ADVICE: &str = "Average scheduling score is low. Consider optimizing node selection algorithms.";
pub const SLOW_SCHEDULING_ADVICE: &str =
    "Average scheduling duration is high. Consider optimizing scheduling algorithms.";
pub const UNDERUTILIZED_ADVICE: &str = "Many nodes are underutilized. Consider workload redistribution.";
pub const OPTIMAL_ADVICE: &str = "Scheduling performance is optimal. No immediate recommendations.";

/// A node or workload ranked by `success_rate * average_score`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub name: String,
    pub total_schedules: u64,
    pub success_rate: f64,
    pub average_score: f64,
    pub performance: f64,
}

impl RankedEntry {
    pub fn new(name: &str, total: u64, successful: u64, average_score: f64) -> Self {
        let success_rate = if total == 0 {
            0.0
        } else {
            successful as f64 / total as f64
        };
        Self {
            name: name.to_string(),
            total_schedules: total,
            success_rate,
            average_score,
            performance: success_rate * average_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRecommendation {
    pub workload: String,
    pub result: OptimizationStrategyResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingReport {
    pub period: Duration,
    pub total_schedules: u64,
    pub successful_schedules: u64,
    pub failed_schedules: u64,
    /// Fraction in [0, 1]
    pub success_rate: f64,
    pub average_score: f64,
    pub average_duration: Duration,
    pub average_cost_per_hour: f64,
    pub average_power_watts: f64,
    pub top_nodes: Vec<RankedEntry>,
    pub top_workloads: Vec<RankedEntry>,
    pub policy_usage: BTreeMap<String, u64>,
    pub recommendations: Vec<String>,
    pub strategy_recommendations: Vec<StrategyRecommendation>,
    pub generated_at: DateTime<Utc>,
}

/// Highest performance first, ties by name; at most `top_n` entries
pub(crate) fn rank(entries: impl Iterator<Item = RankedEntry>, top_n: usize) -> Vec<RankedEntry> {
    let mut ranked: Vec<RankedEntry> = entries.collect();
    ranked.sort_by(|a, b| {
        b.performance
            .partial_cmp(&a.performance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(top_n);
    ranked
}

/// `node_totals` holds the schedule count of every known node
pub fn recommendations(global: &GlobalMetrics, node_totals: &[u64]) -> Vec<String> {
    let mut advice = Vec::new();

    if global.total_schedules > 0 && global.success_rate() < LOW_SUCCESS_RATE {
        advice.push(LOW_SUCCESS_RATE_ADVICE.to_string());
    }
    if global.total_schedules > 0 && global.average_score < LOW_AVERAGE_SCORE {
        advice.push(LOW_SCORE_ADVICE.to_string());
    }
    if global.average_duration > HIGH_AVERAGE_DURATION {
        advice.push(SLOW_SCHEDULING_ADVICE.to_string());
    }
    let underused = node_totals
        .iter()
        .filter(|&&total| total < UNDERUSED_SCHEDULE_COUNT)
        .count();
    if underused > node_totals.len() / 2 {
        advice.push(UNDERUTILIZED_ADVICE.to_string());
    }

    if advice.is_empty() {
        advice.push(OPTIMAL_ADVICE.to_string());
    }
    advice
}
