//! Agent configuration
//!
//! Read from an optional file named by `PLACEMENT_AGENT_CONFIG`, overridden
//! by `PLACEMENT_*` environment variables.

use anyhow::{Context, Result};
use placement_engine::{EngineConfig, SchedulerConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "PLACEMENT_AGENT_CONFIG";
/// Prefix of per-field environment overrides
pub const ENV_PREFIX: &str = "PLACEMENT";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Port for health, metrics and report endpoints
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default = "default_collection_interval")]
    pub collection_interval_secs: u64,

    #[serde(default = "default_reservation_ttl")]
    pub reservation_ttl_secs: u64,

    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    #[serde(default = "default_report_top_n")]
    pub report_top_n: usize,

    /// Window served by `GET /report`
    #[serde(default = "default_report_period")]
    pub report_period_secs: u64,

    /// JSON file listing node manifests; no inventory when unset
    #[serde(default)]
    pub inventory_path: Option<PathBuf>,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "placement-agent".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_collection_interval() -> u64 {
    300
}

fn default_reservation_ttl() -> u64 {
    24 * 60 * 60
}

fn default_history_capacity() -> usize {
    1000
}

fn default_report_top_n() -> usize {
    10
}

fn default_report_period() -> u64 {
    3600
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            collection_interval_secs: default_collection_interval(),
            reservation_ttl_secs: default_reservation_ttl(),
            history_capacity: default_history_capacity(),
            report_top_n: default_report_top_n(),
            report_period_secs: default_report_period(),
            inventory_path: None,
        }
    }
}

impl AgentConfig {
    /// Load from the process environment
    pub fn load() -> Result<Self> {
        let file = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        Self::load_with(file.as_deref(), ENV_PREFIX)
    }

    /// Load from `file` (if any) layered under environment variables with `env_prefix`
    pub fn load_with(file: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix(env_prefix).try_parsing(true))
            .build()
            .context("Failed to read agent configuration")?;

        settings
            .try_deserialize()
            .context("Invalid agent configuration")
    }

    pub fn collection_interval(&self) -> Duration {
        Duration::from_secs(self.collection_interval_secs)
    }

    pub fn report_period(&self) -> Duration {
        Duration::from_secs(self.report_period_secs)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            instance_name: self.instance_name.clone(),
            scheduler: SchedulerConfig {
                reservation_ttl: Duration::from_secs(self.reservation_ttl_secs),
                history_capacity: self.history_capacity,
                ..SchedulerConfig::default()
            },
            report_top_n: self.report_top_n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_sources() {
        let config = AgentConfig::load_with(None, "PLACEMENT_TEST_UNSET").unwrap();
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.collection_interval(), Duration::from_secs(300));
        assert_eq!(config.reservation_ttl_secs, 86_400);
        assert_eq!(config.history_capacity, 1000);
        assert!(config.inventory_path.is_none());
    }

    #[test]
    fn test_file_values() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "api_port = 9100\nreport_top_n = 3\ninventory_path = \"/etc/placement/nodes.json\""
        )
        .unwrap();

        let config = AgentConfig::load_with(Some(file.path()), "PLACEMENT_TEST_FILE").unwrap();
        assert_eq!(config.api_port, 9100);
        assert_eq!(config.report_top_n, 3);
        assert_eq!(config.inventory_path, Some(PathBuf::from("/etc/placement/nodes.json")));

        let engine = config.engine_config();
        assert_eq!(engine.report_top_n, 3);
        assert_eq!(engine.scheduler.history_capacity, 1000);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = AgentConfig::load_with(Some(Path::new("/nonexistent/agent.toml")), "PLACEMENT_TEST_MISSING");
        assert!(err.is_err());
    }
}
