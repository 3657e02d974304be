//! Component health for liveness and readiness probes

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Working, but on stale or partial input
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn with_status(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status wins; an empty set is healthy
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|c| c.status)
            .fold(ComponentStatus::Healthy, |worst, status| match (worst, status) {
                (ComponentStatus::Unhealthy, _) | (_, ComponentStatus::Unhealthy) => ComponentStatus::Unhealthy,
                (ComponentStatus::Degraded, _) | (_, ComponentStatus::Degraded) => ComponentStatus::Degraded,
                _ => ComponentStatus::Healthy,
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
///
/// Only components with runtime status transitions are listed.
pub mod components {
    /// Node inventory refresh, driven by the collection loop
    pub const INVENTORY: &str = "inventory";

    pub const ALL: [&str; 1] = [INVENTORY];
}

/// Shared, cloneable view of component health
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Register `name` as healthy
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    /// Register every tracked engine component
    pub async fn register_all(&self) {
        for name in components::ALL {
            self.register(name).await;
        }
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.components.write().await.insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    /// Ready once started, unless some component is unhealthy
    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let status = self.health().await.status;

        let reason = if !ready {
            Some("engine not yet started".to_string())
        } else if status == ComponentStatus::Unhealthy {
            Some("a component is unhealthy".to_string())
        } else {
            None
        };
        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_registry_is_healthy() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());
    }

    #[tokio::test]
    async fn test_register_all() {
        let registry = HealthRegistry::new();
        registry.register_all().await;
        let health = registry.health().await;
        assert_eq!(health.components.len(), 1);
        assert_eq!(
            health.components[components::INVENTORY].status,
            ComponentStatus::Healthy
        );
    }

    #[tokio::test]
    async fn test_register_all_tracks_only_inventory() {
        let registry = HealthRegistry::new();
        registry.register_all().await;
        let health = registry.health().await;
        let names: Vec<&str> = health.components.keys().map(String::as_str).collect();
        assert_eq!(names, vec![components::INVENTORY]);
        assert!(!health.components.contains_key("scheduler"));
        assert!(!health.components.contains_key("metrics_collector"));
    }

    #[tokio::test]
    async fn test_degraded_inventory_degrades_overall() {
        let registry = HealthRegistry::new();
        registry.register_all().await;
        registry.set_degraded(components::INVENTORY, "inventory file missing").await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert!(health.status.is_operational());

        registry.set_ready(true).await;
        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_unhealthy_wins_over_degraded() {
        let registry = HealthRegistry::new();
        registry.register_all().await;
        registry.set_degraded(components::INVENTORY, "slow").await;
        registry.set_unhealthy("api_server", "bind failed").await;
        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_readiness() {
        let registry = HealthRegistry::new();
        registry.register(components::INVENTORY).await;
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());

        registry.set_ready(true).await;
        assert!(registry.readiness().await.ready);

        registry.set_unhealthy(components::INVENTORY, "failed").await;
        assert!(!registry.readiness().await.ready);
    }
}
