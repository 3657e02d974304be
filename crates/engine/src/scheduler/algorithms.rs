//! Node selection rules
//!
//! Every rule sees the same evaluated candidates; nodes that failed the basic
//! requirement check are never selected.

use super::evaluator::NodeEvaluation;
use crate::models::{labels, Node, WorkloadSpec};
use crate::policy::SchedulingAlgorithm;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;

/// A filtered node together with its evaluation
#[derive(Debug, Clone)]
pub struct Candidate {
    pub node: Node,
    pub evaluation: NodeEvaluation,
}

/// Pick the winning candidate for `algorithm`, or `None` if no candidate is eligible
///
/// `last_used` maps node name to its most recent placement and is only read
/// by round-robin.
pub fn select_node<'a>(
    algorithm: SchedulingAlgorithm,
    workload: &WorkloadSpec,
    candidates: &'a [Candidate],
    last_used: &HashMap<String, DateTime<Utc>>,
) -> Option<&'a Candidate> {
    let eligible = candidates.iter().filter(|c| c.evaluation.eligible);

    match algorithm {
        SchedulingAlgorithm::RoundRobin => eligible.min_by(|a, b| {
            let a_used = last_used.get(&a.node.name);
            let b_used = last_used.get(&b.node.name);
            a_used.cmp(&b_used).then_with(|| a.node.name.cmp(&b.node.name))
        }),
        SchedulingAlgorithm::LeastLoaded => first_max(eligible, |c| c.evaluation.breakdown.resource),
        SchedulingAlgorithm::CostOptimized => first_max(eligible, |c| -c.evaluation.estimated_cost_per_hour),
        SchedulingAlgorithm::PowerOptimized => first_max(eligible, |c| -c.evaluation.estimated_power_watts),
        SchedulingAlgorithm::Balanced => first_max(eligible, |c| c.evaluation.breakdown.balanced()),
        SchedulingAlgorithm::PriorityBased => {
            let mut ranked: Vec<&Candidate> = eligible.collect();
            // stable: equal priorities keep input order
            ranked.sort_by(|a, b| {
                node_priority(workload, &b.node)
                    .partial_cmp(&node_priority(workload, &a.node))
                    .unwrap_or(Ordering::Equal)
            });
            ranked.into_iter().next()
        }
    }
}

/// Workload priority scaled by the node's `priority-tier` label
pub fn node_priority(workload: &WorkloadSpec, node: &Node) -> f64 {
    let priority = f64::from(workload.priority);
    match node.label(labels::PRIORITY_TIER) {
        Some("high") => priority * 1.2,
        Some("low") => priority * 0.8,
        _ => priority,
    }
}

/// Highest key wins; the earliest candidate wins ties
fn first_max<'a, I, F>(candidates: I, key: F) -> Option<&'a Candidate>
where
    I: Iterator<Item = &'a Candidate>,
    F: Fn(&Candidate) -> f64,
{
    let mut best: Option<(&'a Candidate, f64)> = None;
    for candidate in candidates {
        let value = key(candidate);
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((candidate, value)),
        }
    }
    best.map(|(c, _)| c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ResourceVector, WorkloadType};
    use crate::scheduler::evaluator::ScoreBreakdown;

    fn candidate(name: &str, cost: f64, power: f64, breakdown: ScoreBreakdown) -> Candidate {
        Candidate {
            node: Node::new(name, ResourceVector::new(8.0, 32.0, 0, 0)),
            evaluation: NodeEvaluation {
                node_name: name.to_string(),
                eligible: true,
                score: 0.5,
                breakdown,
                estimated_cost_per_hour: cost,
                estimated_power_watts: power,
                reason: String::new(),
            },
        }
    }

    fn uniform(v: f64) -> ScoreBreakdown {
        ScoreBreakdown {
            resource: v,
            cost: v,
            power: v,
            placement: v,
        }
    }

    fn workload(priority: u32) -> WorkloadSpec {
        let mut w = WorkloadSpec::new("w", WorkloadType::Serving, ResourceVector::default());
        w.priority = priority;
        w
    }

    fn pick(algorithm: SchedulingAlgorithm, candidates: &[Candidate]) -> Option<String> {
        select_node(algorithm, &workload(50), candidates, &HashMap::new()).map(|c| c.node.name.clone())
    }

    #[test]
    fn test_cost_and_power_pick_minimum() {
        let candidates = vec![
            candidate("a", 10.0, 100.0, uniform(0.5)),
            candidate("b", 5.0, 300.0, uniform(0.5)),
            candidate("c", 20.0, 50.0, uniform(0.5)),
        ];
        assert_eq!(pick(SchedulingAlgorithm::CostOptimized, &candidates).as_deref(), Some("b"));
        assert_eq!(pick(SchedulingAlgorithm::PowerOptimized, &candidates).as_deref(), Some("c"));
    }

    #[test]
    fn test_ties_go_to_first_candidate() {
        let candidates = vec![
            candidate("b", 5.0, 100.0, uniform(0.5)),
            candidate("a", 5.0, 100.0, uniform(0.5)),
        ];
        for algorithm in [
            SchedulingAlgorithm::LeastLoaded,
            SchedulingAlgorithm::CostOptimized,
            SchedulingAlgorithm::PowerOptimized,
            SchedulingAlgorithm::Balanced,
            SchedulingAlgorithm::PriorityBased,
        ] {
            assert_eq!(pick(algorithm, &candidates).as_deref(), Some("b"), "{algorithm}");
        }
    }

    #[test]
    fn test_round_robin_prefers_unused_then_oldest() {
        let candidates = vec![
            candidate("c", 1.0, 1.0, uniform(0.5)),
            candidate("b", 1.0, 1.0, uniform(0.5)),
            candidate("a", 1.0, 1.0, uniform(0.5)),
        ];
        let now = Utc::now();
        let mut last_used = HashMap::new();
        last_used.insert("a".to_string(), now);
        let chosen = select_node(SchedulingAlgorithm::RoundRobin, &workload(0), &candidates, &last_used);
        assert_eq!(chosen.unwrap().node.name, "b");

        last_used.insert("b".to_string(), now - chrono::Duration::seconds(10));
        last_used.insert("c".to_string(), now - chrono::Duration::seconds(5));
        let chosen = select_node(SchedulingAlgorithm::RoundRobin, &workload(0), &candidates, &last_used);
        assert_eq!(chosen.unwrap().node.name, "b");
    }

    #[test]
    fn test_priority_tier_scaling() {
        let mut low = candidate("low", 1.0, 1.0, uniform(0.5));
        low.node = low.node.with_label(labels::PRIORITY_TIER, "low");
        let mut high = candidate("high", 1.0, 1.0, uniform(0.5));
        high.node = high.node.with_label(labels::PRIORITY_TIER, "high");
        let plain = candidate("plain", 1.0, 1.0, uniform(0.5));

        let candidates = vec![low, plain, high];
        assert_eq!(pick(SchedulingAlgorithm::PriorityBased, &candidates).as_deref(), Some("high"));
        assert_eq!(node_priority(&workload(50), &candidates[0].node), 40.0);
    }

    #[test]
    fn test_ineligible_never_selected() {
        let mut only = candidate("a", 1.0, 1.0, uniform(0.9));
        only.evaluation.eligible = false;
        for algorithm in SchedulingAlgorithm::ALL {
            assert!(pick(algorithm, std::slice::from_ref(&only)).is_none());
        }
    }

    #[test]
    fn test_balanced_weights_cost_heaviest() {
        let cost_heavy = ScoreBreakdown {
            resource: 0.5,
            cost: 1.0,
            power: 0.5,
            placement: 0.5,
        };
        let resource_heavy = ScoreBreakdown {
            resource: 1.0,
            cost: 0.5,
            power: 0.5,
            placement: 0.5,
        };
        let candidates = vec![
            candidate("resource", 1.0, 1.0, resource_heavy),
            candidate("cost", 1.0, 1.0, cost_heavy),
        ];
        assert_eq!(pick(SchedulingAlgorithm::Balanced, &candidates).as_deref(), Some("cost"));
    }
}
