//! Workload placement and cost/power optimization engine
//!
//! This crate provides:
//! - Constraint filtering and multi-criteria node scoring
//! - Six node selection algorithms driven by scheduling policies
//! - Time-bounded capacity reservations
//! - Advisory cost/power optimization strategies
//! - Scheduling metrics, reports and health/observability plumbing

pub mod engine;
pub mod error;
pub mod health;
pub mod metrics;
pub mod models;
pub mod observability;
pub mod policy;
pub mod pricing;
pub mod resources;
pub mod scheduler;
pub mod strategy;

pub use engine::{EngineConfig, PlacementEngine};
pub use error::{EngineError, EngineResult, ErrorClass};
pub use health::{ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse};
pub use metrics::{
    CollectionConfig, CollectionLoop, CollectionLoopBuilder, MetricsCollector, NodeInventory, SchedulingReport,
    StaticInventory,
};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
pub use policy::{PolicyManager, PolicyTemplate, PolicyUpdate, SchedulingAlgorithm, SchedulingPolicy};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use strategy::{StrategyKind, StrategyManager};
