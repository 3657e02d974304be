//! Periodic metrics collection
//!
//! Each tick refreshes the node inventory, folds it into the collector and
//! sweeps expired reservations. Inventory failures are logged and retried on
//! the next tick.

use super::NodeInventory;
use crate::engine::PlacementEngine;
use crate::health::{components, HealthRegistry};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Configuration for the collection loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Time between collection passes (default: 5 minutes)
    #[serde(with = "duration_secs")]
    pub interval: Duration,
    /// Sweep expired reservations on every pass
    pub sweep_reservations: bool,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            sweep_reservations: true,
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

/// Outcome of one collection pass
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CollectionPass {
    pub nodes: usize,
    pub expired_reservations: usize,
    pub inventory_error: Option<String>,
}

pub struct CollectionLoop {
    engine: Arc<PlacementEngine>,
    inventory: Arc<dyn NodeInventory>,
    health: Option<HealthRegistry>,
    config: CollectionConfig,
}

impl CollectionLoop {
    pub fn new(engine: Arc<PlacementEngine>, inventory: Arc<dyn NodeInventory>, config: CollectionConfig) -> Self {
        Self {
            engine,
            inventory,
            health: None,
            config,
        }
    }

    /// Run until `shutdown` fires or its sender is dropped
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting metrics collection loop"
        );

        let mut ticker = interval(self.config.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let start = Instant::now();
                    let pass = self.collect_once().await;
                    debug!(
                        nodes = pass.nodes,
                        expired_reservations = pass.expired_reservations,
                        failed = pass.inventory_error.is_some(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Collection cycle complete"
                    );
                }
                _ = shutdown.recv() => {
                    info!("Shutting down metrics collection loop");
                    break;
                }
            }
        }
    }

    /// One collection pass; never fails, errors are recorded in the result
    pub async fn collect_once(&self) -> CollectionPass {
        let mut pass = CollectionPass::default();

        match self.inventory.list_nodes().await {
            Ok(nodes) => {
                self.engine.collect_metrics(&nodes);
                pass.nodes = nodes.len();
                if let Some(health) = &self.health {
                    health.set_healthy(components::INVENTORY).await;
                }
            }
            Err(e) => {
                self.engine.metrics().inc_collection_errors();
                warn!(error = %e, "Failed to refresh node inventory");
                if let Some(health) = &self.health {
                    health
                        .set_degraded(components::INVENTORY, format!("inventory refresh failed: {e}"))
                        .await;
                }
                pass.inventory_error = Some(e.to_string());
            }
        }

        if self.config.sweep_reservations {
            pass.expired_reservations = self.engine.sweep_expired_reservations();
        }
        pass
    }
}

/// Builder for the collection loop
pub struct CollectionLoopBuilder {
    engine: Option<Arc<PlacementEngine>>,
    inventory: Option<Arc<dyn NodeInventory>>,
    health: Option<HealthRegistry>,
    config: CollectionConfig,
}

impl CollectionLoopBuilder {
    pub fn new() -> Self {
        Self {
            engine: None,
            inventory: None,
            health: None,
            config: CollectionConfig::default(),
        }
    }

    pub fn engine(mut self, engine: Arc<PlacementEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn inventory(mut self, inventory: Arc<dyn NodeInventory>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    /// Report inventory health to `health`
    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn sweep_reservations(mut self, sweep: bool) -> Self {
        self.config.sweep_reservations = sweep;
        self
    }

    pub fn config(mut self, config: CollectionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<CollectionLoop> {
        let engine = self
            .engine
            .ok_or_else(|| anyhow::anyhow!("Engine is required"))?;
        let inventory = self
            .inventory
            .ok_or_else(|| anyhow::anyhow!("Inventory is required"))?;

        let mut collection_loop = CollectionLoop::new(engine, inventory, self.config);
        collection_loop.health = self.health;
        Ok(collection_loop)
    }
}

impl Default for CollectionLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
