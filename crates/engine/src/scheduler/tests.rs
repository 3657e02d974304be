//! Decision-level scenarios for the scheduler

use super::*;
use crate::metrics::MetricsCollector;
use crate::models::{labels, CostPreferences, ResourceVector, WorkloadSpec, WorkloadType};
use crate::policy::{CostConstraints, SchedulingAlgorithm, SchedulingPolicy};

fn node(name: &str, cpu: f64, memory: f64) -> Node {
    Node::new(name, ResourceVector::new(cpu, memory, 0, 0))
}

fn workload(name: &str, cpu: f64, memory: f64) -> WorkloadSpec {
    WorkloadSpec::new(name, WorkloadType::Batch, ResourceVector::new(cpu, memory, 0, 0))
}

fn policy(algorithm: SchedulingAlgorithm) -> SchedulingPolicy {
    SchedulingPolicy::new(algorithm.as_str(), algorithm)
}

#[test]
fn test_empty_node_list_is_no_candidates() {
    let scheduler = Scheduler::default();
    let err = scheduler
        .schedule_balanced(&workload("w", 1.0, 1.0), &[])
        .unwrap_err();
    assert!(matches!(err, EngineError::NoCandidateNodes { .. }));
    assert_eq!(scheduler.global_metrics().failed_schedules, 1);
}

#[test]
fn test_spot_preference_excludes_on_demand_node() {
    let scheduler = Scheduler::default();
    let mut w = workload("w", 1.0, 1.0);
    w.cost = Some(CostPreferences {
        prefer_spot: true,
        ..Default::default()
    });
    let err = scheduler
        .schedule_balanced(&w, &[node("on-demand", 8.0, 32.0)])
        .unwrap_err();
    assert!(matches!(err, EngineError::NoCandidateNodes { .. }));

    let spot = node("spot", 8.0, 32.0).with_label(labels::LIFECYCLE, labels::SPOT);
    let decision = scheduler
        .schedule_balanced(&w, &[node("on-demand", 8.0, 32.0), spot])
        .unwrap();
    assert_eq!(decision.node_name, "spot");
}

#[test]
fn test_cost_optimized_picks_cheapest_label() {
    let scheduler = Scheduler::default();
    let nodes = vec![
        node("medium", 8.0, 32.0).with_label(labels::COST_PER_HOUR, "medium"),
        node("high", 8.0, 32.0).with_label(labels::COST_PER_HOUR, "high"),
        node("low", 8.0, 32.0).with_label(labels::COST_PER_HOUR, "low"),
    ];
    let decision = scheduler
        .schedule_with_policy(&workload("w", 1.0, 1.0), &nodes, &policy(SchedulingAlgorithm::CostOptimized))
        .unwrap();
    assert_eq!(decision.node_name, "low");
    assert_eq!(decision.estimated_cost_per_hour, 5.0);
    assert!(decision.reason.starts_with("cost_optimized: "));
}

#[test]
fn test_balanced_is_deterministic() {
    let nodes = vec![
        node("a", 4.0, 16.0).with_label(labels::COST_TIER, "medium"),
        node("b", 16.0, 64.0).with_label(labels::POWER_EFFICIENCY, "high"),
        node("c", 8.0, 32.0).with_label(labels::COST_TIER, "low"),
    ];
    let first = Scheduler::default()
        .schedule_balanced(&workload("w", 2.0, 4.0), &nodes)
        .unwrap();
    for _ in 0..10 {
        let again = Scheduler::default()
            .schedule_balanced(&workload("w", 2.0, 4.0), &nodes)
            .unwrap();
        assert_eq!(again, first);
    }
}

#[test]
fn test_priority_ties_keep_input_order() {
    let scheduler = Scheduler::default();
    let nodes = vec![node("second", 8.0, 32.0), node("first", 8.0, 32.0)];
    let decision = scheduler
        .schedule_with_policy(&workload("w", 1.0, 1.0), &nodes, &policy(SchedulingAlgorithm::PriorityBased))
        .unwrap();
    assert_eq!(decision.node_name, "second");
}

#[test]
fn test_reservations_prevent_overcommit() {
    let scheduler = Scheduler::default();
    let nodes = vec![node("only", 4.0, 8.0)];

    scheduler
        .schedule_balanced(&workload("w1", 3.0, 4.0), &nodes)
        .unwrap();
    let err = scheduler
        .schedule_balanced(&workload("w2", 3.0, 4.0), &nodes)
        .unwrap_err();
    assert!(matches!(err, EngineError::NoCandidateNodes { .. }));

    let reserved = scheduler.ledger().reserved_by_node(None);
    assert!(nodes[0].allocatable.saturating_sub(&reserved["only"]).cpu_cores >= 0.0);
    assert!(reserved["only"].fits_within(&nodes[0].allocatable));

    // rescheduling the same workload does not count its own claim
    scheduler
        .schedule_balanced(&workload("w1", 3.0, 4.0), &nodes)
        .unwrap();
    assert_eq!(scheduler.reservations().len(), 1);

    scheduler.release_reservation("w1");
    scheduler
        .schedule_balanced(&workload("w2", 3.0, 4.0), &nodes)
        .unwrap();
}

#[test]
fn test_insufficient_nodes_never_selected() {
    let scheduler = Scheduler::default();
    let nodes = vec![
        node("tiny", 0.5, 1.0),
        node("fits", 2.0, 4.0),
        node("no-mem", 8.0, 1.0),
    ];
    for algorithm in SchedulingAlgorithm::ALL {
        let w = workload(&format!("w-{algorithm}"), 1.5, 2.0);
        let decision = scheduler.schedule_with_policy(&w, &nodes, &policy(algorithm)).unwrap();
        assert_eq!(decision.node_name, "fits", "{algorithm}");
        scheduler.release_reservation(&w.name);
    }
}

#[test]
fn test_scores_stay_in_unit_range() {
    let scheduler = Scheduler::default();
    let mut w = workload("w", 1.0, 2.0);
    w.cost = Some(CostPreferences {
        prefer_spot: true,
        ..Default::default()
    });
    let labelled = node("n", 2.0, 4.0)
        .with_label(labels::LIFECYCLE, labels::SPOT)
        .with_label(labels::COST_TIER, "low")
        .with_label(labels::ENERGY_SOURCE, labels::RENEWABLE)
        .with_label(labels::POWER_EFFICIENCY, "high");
    for algorithm in SchedulingAlgorithm::ALL {
        let evaluation = scheduler.evaluate_node(&w, &labelled, &policy(algorithm));
        let b = evaluation.breakdown;
        for component in [evaluation.score, b.resource, b.cost, b.power, b.placement] {
            assert!((0.0..=1.0).contains(&component), "{component}");
        }
    }
}

#[test]
fn test_round_robin_rotates() {
    let scheduler = Scheduler::default();
    let nodes = vec![node("c", 64.0, 256.0), node("a", 64.0, 256.0), node("b", 64.0, 256.0)];
    let round_robin = policy(SchedulingAlgorithm::RoundRobin);

    let picks: Vec<String> = (0..4)
        .map(|i| {
            scheduler
                .schedule_with_policy(&workload(&format!("w{i}"), 1.0, 1.0), &nodes, &round_robin)
                .unwrap()
                .node_name
        })
        .collect();
    assert_eq!(picks, vec!["a", "b", "c", "a"]);
}

#[test]
fn test_policy_cost_ceiling_filters_nodes() {
    let scheduler = Scheduler::default();
    let nodes = vec![
        node("high", 8.0, 32.0).with_label(labels::COST_PER_HOUR, "high"),
        node("medium", 8.0, 32.0).with_label(labels::COST_PER_HOUR, "medium"),
    ];
    let capped = policy(SchedulingAlgorithm::Balanced).with_cost(CostConstraints {
        max_cost_per_hour: Some(12.0),
        ..Default::default()
    });
    let decision = scheduler
        .schedule_with_policy(&workload("w", 1.0, 1.0), &nodes, &capped)
        .unwrap();
    assert_eq!(decision.node_name, "medium");
    assert!(decision.estimated_cost_per_hour <= 12.0);
}

#[test]
fn test_invalid_workload_rejected_and_recorded() {
    let scheduler = Scheduler::default();
    let err = scheduler
        .schedule_balanced(&workload("", 1.0, 1.0), &[node("a", 4.0, 8.0)])
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidWorkload { .. }));
    assert_eq!(scheduler.history(0).len(), 1);
}

#[test]
fn test_history_is_capped() {
    let scheduler = Scheduler::new(SchedulerConfig {
        history_capacity: 5,
        ..Default::default()
    });
    for i in 0..8 {
        let _ = scheduler.schedule_balanced(&workload(&format!("w{i}"), 1.0, 1.0), &[]);
    }
    let history = scheduler.history(0);
    assert_eq!(history.len(), 5);
    assert_eq!(history[0].workload_id, "w3");
    assert_eq!(history[4].workload_id, "w7");
    assert_eq!(scheduler.global_metrics().total_schedules, 8);
}

#[test]
fn test_events_reach_collector() {
    let collector = Arc::new(MetricsCollector::new());
    let scheduler = Scheduler::default().with_collector(collector.clone());
    let nodes = vec![node("a", 8.0, 32.0)];

    scheduler
        .schedule_balanced(&workload("w", 1.0, 1.0), &nodes)
        .unwrap();
    let _ = scheduler.schedule_balanced(&workload("w", 1.0, 1.0), &[]);

    let metrics = collector.workload_metrics("w").unwrap();
    assert_eq!(metrics.total_schedules, 2);
    assert_eq!(metrics.successful_schedules, 1);
    assert_eq!(metrics.failed_schedules, 1);
    assert_eq!(collector.node_metrics("a").unwrap().successful_schedules, 1);
    assert_eq!(
        collector.policy_metrics(builtin::DEFAULT).unwrap().total_schedules,
        2
    );
}

#[test]
fn test_cleanup_expired_reservations() {
    let scheduler = Scheduler::new(SchedulerConfig {
        reservation_ttl: Duration::ZERO,
        ..Default::default()
    });
    scheduler
        .schedule_balanced(&workload("w", 1.0, 1.0), &[node("a", 8.0, 32.0)])
        .unwrap();
    assert_eq!(scheduler.cleanup_expired_reservations(), 1);
    assert!(scheduler.reservations().is_empty());
}

#[test]
fn test_oversized_reservation_ttl_still_schedules() {
    let scheduler = Scheduler::new(SchedulerConfig {
        reservation_ttl: Duration::from_secs(1_000_000 * 365 * 24 * 3600),
        ..Default::default()
    });
    let decision = scheduler
        .schedule_balanced(&workload("w", 1.0, 1.0), &[node("a", 8.0, 32.0)])
        .unwrap();
    assert_eq!(decision.node_name, "a");
    assert_eq!(scheduler.reservations().len(), 1);
    assert_eq!(scheduler.cleanup_expired_reservations(), 0);
}

#[test]
fn test_schedule_balanced_uses_balanced_algorithm() {
    let scheduler = Scheduler::default();
    let decision = scheduler
        .schedule_balanced(&workload("w", 1.0, 1.0), &[node("a", 8.0, 32.0)])
        .unwrap();
    assert!(decision.reason.starts_with("balanced:"), "{}", decision.reason);
    assert_eq!(scheduler.history(0)[0].policy.as_deref(), Some("default"));
}
