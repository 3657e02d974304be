//! Placement agent
//!
//! Hosts the placement engine, refreshes node metrics on a fixed cadence and
//! serves health, metrics and report endpoints.

use anyhow::{Context, Result};
use placement_agent::{api, config::AgentConfig, inventory::FileInventory};
use placement_engine::{
    health::HealthRegistry, CollectionLoopBuilder, NodeInventory, PlacementEngine, StaticInventory,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting placement-agent");

    let config = AgentConfig::load().context("Failed to load configuration")?;
    info!(
        instance = %config.instance_name,
        api_port = config.api_port,
        collection_interval_secs = config.collection_interval_secs,
        "Agent configured"
    );

    let engine = Arc::new(PlacementEngine::new(config.engine_config()));
    engine.logger().log_startup(AGENT_VERSION, engine.list_policies().len());

    let health_registry = HealthRegistry::new();
    health_registry.register_all().await;

    let inventory: Arc<dyn NodeInventory> = match &config.inventory_path {
        Some(path) => Arc::new(FileInventory::new(path)),
        None => {
            warn!("No inventory_path configured, node metrics will stay empty");
            Arc::new(StaticInventory::default())
        }
    };

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let collection = CollectionLoopBuilder::new()
        .engine(engine.clone())
        .inventory(inventory)
        .health(health_registry.clone())
        .interval(config.collection_interval())
        .build()?;
    let collection_handle = tokio::spawn(collection.run(shutdown_rx));

    let app_state = Arc::new(api::AppState::new(
        engine.clone(),
        health_registry.clone(),
        config.report_period(),
    ));
    health_registry.set_ready(true).await;
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            engine.logger().log_shutdown("SIGINT received");
        }
        result = api_handle => {
            let reason = match result {
                Ok(Ok(())) => "API server stopped".to_string(),
                Ok(Err(e)) => format!("API server failed: {e}"),
                Err(e) => format!("API server task panicked: {e}"),
            };
            engine.logger().log_shutdown(&reason);
        }
    }

    let _ = shutdown_tx.send(());
    if let Err(e) = collection_handle.await {
        warn!(error = %e, "Collection loop ended abnormally");
    }
    info!("Shutting down");

    Ok(())
}
