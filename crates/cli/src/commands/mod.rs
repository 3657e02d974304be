//! CLI command implementations

pub mod estimate;
pub mod policies;
pub mod schedule;
pub mod strategy;
