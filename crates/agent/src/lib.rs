//! Placement agent: runs the placement engine as a long-lived daemon

pub mod api;
pub mod config;
pub mod inventory;
