//! Bounded scheduling history and the scheduler's own running totals

use crate::models::SchedulingEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Default number of events retained
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Running totals kept alongside the history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub total_schedules: u64,
    pub successful_schedules: u64,
    pub failed_schedules: u64,
    /// Running average over successful decisions
    pub average_score: f64,
    pub average_duration: Duration,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Fixed-capacity ring of scheduling events, oldest discarded first
#[derive(Debug)]
pub struct SchedulingHistory {
    events: VecDeque<SchedulingEvent>,
    capacity: usize,
    stats: SchedulerStats,
}

impl Default for SchedulingHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl SchedulingHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
            capacity,
            stats: SchedulerStats::default(),
        }
    }

    pub fn push(&mut self, event: SchedulingEvent) {
        self.update_stats(&event);
        while self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    fn update_stats(&mut self, event: &SchedulingEvent) {
        let stats = &mut self.stats;
        stats.total_schedules += 1;
        stats.last_updated = Some(event.timestamp);
        if !event.success {
            stats.failed_schedules += 1;
            return;
        }
        stats.successful_schedules += 1;
        let n = stats.successful_schedules;
        stats.average_score = (stats.average_score * (n - 1) as f64 + event.decision.score) / n as f64;
        stats.average_duration = Duration::from_secs_f64(
            (stats.average_duration.as_secs_f64() * (n - 1) as f64 + event.duration.as_secs_f64()) / n as f64,
        );
    }

    /// The last `limit` events, oldest first; zero means all
    pub fn recent(&self, limit: usize) -> Vec<SchedulingEvent> {
        let limit = if limit == 0 { self.events.len() } else { limit.min(self.events.len()) };
        self.events
            .iter()
            .skip(self.events.len() - limit)
            .cloned()
            .collect()
    }

    /// Timestamp of the most recent successful placement on `node`
    pub fn last_used(&self, node: &str) -> Option<DateTime<Utc>> {
        self.events
            .iter()
            .rev()
            .find(|e| e.success && e.node_name == node)
            .map(|e| e.timestamp)
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats.clone()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
