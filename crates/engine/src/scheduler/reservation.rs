//! Time-bounded capacity reservations
//!
//! Advisory bookkeeping for this engine only. Two decisions racing for the
//! same node can both pass filtering and both reserve; callers reconcile that
//! downstream.

use crate::models::{ResourceVector, WorkloadSpec};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Default reservation lifetime (24 hours)
pub const DEFAULT_RESERVATION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceReservation {
    pub node_name: String,
    pub resources: ResourceVector,
    pub workload_id: String,
    pub priority: u32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ResourceReservation {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Reservations keyed by workload id; one per workload
pub struct ReservationLedger {
    reservations: DashMap<String, ResourceReservation>,
    ttl: Duration,
}

impl Default for ReservationLedger {
    fn default() -> Self {
        Self::new(DEFAULT_RESERVATION_TTL)
    }
}

impl ReservationLedger {
    pub fn new(ttl: Duration) -> Self {
        Self {
            reservations: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Claim the workload's requested capacity on `node_name`, replacing any earlier claim
    pub fn reserve(&self, workload: &WorkloadSpec, node_name: &str) -> ResourceReservation {
        self.reserve_at(workload, node_name, Utc::now())
    }

    pub fn reserve_at(&self, workload: &WorkloadSpec, node_name: &str, now: DateTime<Utc>) -> ResourceReservation {
        // A TTL past the representable range never expires
        let expires_at = chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let reservation = ResourceReservation {
            node_name: node_name.to_string(),
            resources: workload.resources,
            workload_id: workload.name.clone(),
            priority: workload.priority,
            created_at: now,
            expires_at,
        };
        if let Some(previous) = self
            .reservations
            .insert(workload.name.clone(), reservation.clone())
        {
            debug!(
                workload = %workload.name,
                previous_node = %previous.node_name,
                node = %node_name,
                "Replaced existing reservation"
            );
        }
        reservation
    }

    pub fn release(&self, workload_id: &str) -> Option<ResourceReservation> {
        self.reservations.remove(workload_id).map(|(_, v)| v)
    }

    pub fn get(&self, workload_id: &str) -> Option<ResourceReservation> {
        self.reservations.get(workload_id).map(|r| r.clone())
    }

    pub fn list(&self) -> Vec<ResourceReservation> {
        self.reservations.iter().map(|r| r.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }

    /// Sum of active claims per node, ignoring those held by `excluding`
    pub fn reserved_by_node(&self, excluding: Option<&str>) -> HashMap<String, ResourceVector> {
        self.reserved_by_node_at(excluding, Utc::now())
    }

    pub fn reserved_by_node_at(&self, excluding: Option<&str>, now: DateTime<Utc>) -> HashMap<String, ResourceVector> {
        let mut totals: HashMap<String, ResourceVector> = HashMap::new();
        for entry in self.reservations.iter() {
            let r = entry.value();
            if Some(r.workload_id.as_str()) == excluding || !r.is_active_at(now) {
                continue;
            }
            let total = totals.entry(r.node_name.clone()).or_default();
            *total = total.add(&r.resources);
        }
        totals
    }

    /// Drop reservations whose expiry has passed; returns how many were removed
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now())
    }

    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.reservations.len();
        self.reservations.retain(|_, r| r.is_active_at(now));
        before.saturating_sub(self.reservations.len())
    }
}
