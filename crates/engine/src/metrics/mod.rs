//! Scheduling metrics aggregation and reporting
//!
//! The collector folds every scheduling attempt into per-node, per-workload
//! and per-policy running averages. A periodic loop refreshes the node
//! inventory from a [`NodeInventory`] source.

mod collector;
mod r#loop;
mod report;


pub use collector::{
    GlobalMetrics, MetricsCollector, NodeMetrics, PolicyMetrics, WorkloadMetrics, PREFERRED_NODES_LIMIT,
};
pub use r#loop::{CollectionConfig, CollectionLoop, CollectionLoopBuilder, CollectionPass};
pub use report::{recommendations, RankedEntry, SchedulingReport, StrategyRecommendation};

use crate::models::Node;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::{PoisonError, RwLock};

/// Source of the live node inventory
#[async_trait]
pub trait NodeInventory: Send + Sync {
    async fn list_nodes(&self) -> Result<Vec<Node>>;
}

/// Inventory held in memory and replaced wholesale
#[derive(Debug, Default)]
pub struct StaticInventory {
    nodes: RwLock<Vec<Node>>,
}

impl StaticInventory {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes: RwLock::new(nodes),
        }
    }

    pub fn replace(&self, nodes: Vec<Node>) {
        *self.nodes.write().unwrap_or_else(PoisonError::into_inner) = nodes;
    }
}

#[async_trait]
impl NodeInventory for StaticInventory {
    async fn list_nodes(&self) -> Result<Vec<Node>> {
        Ok(self.nodes.read().unwrap_or_else(PoisonError::into_inner).clone())
    }
}
