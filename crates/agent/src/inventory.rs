//! Node inventory read from a JSON file of node manifests

use anyhow::{Context, Result};
use async_trait::async_trait;
use placement_engine::{Node, NodeInventory, NodeManifest};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Re-reads the file on every refresh so edits are picked up without a restart
#[derive(Debug, Clone)]
pub struct FileInventory {
    path: PathBuf,
}

impl FileInventory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse a JSON array of node manifests
pub fn parse_nodes(json: &str) -> Result<Vec<Node>> {
    let manifests: Vec<NodeManifest> = serde_json::from_str(json).context("Malformed node manifest list")?;
    manifests
        .into_iter()
        .map(|m| {
            let name = m.name.clone();
            Node::try_from(m).with_context(|| format!("Invalid node manifest {name}"))
        })
        .collect()
}

#[async_trait]
impl NodeInventory for FileInventory {
    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read inventory {}", self.path.display()))?;
        let nodes = parse_nodes(&raw)?;
        debug!(path = %self.path.display(), nodes = nodes.len(), "Loaded node inventory");
        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODES: &str = r#"[
        {"name": "gpu-1", "labels": {"lifecycle": "spot"},
         "allocatable": {"cpu": "16", "memory": "64Gi", "gpu": 4}},
        {"name": "cpu-1", "ready": false,
         "allocatable": {"cpu": "8000m", "memory": "32768Mi"}}
    ]"#;

    #[tokio::test]
    async fn test_reads_manifests() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.json");
        tokio::fs::write(&path, NODES).await.unwrap();

        let nodes = FileInventory::new(&path).list_nodes().await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].is_spot());
        assert_eq!(nodes[0].allocatable.gpu, 4);
        assert!(!nodes[1].ready);
        assert_eq!(nodes[1].allocatable.cpu_cores, 8.0);
        assert_eq!(nodes[1].allocatable.memory_gib, 32.0);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let inventory = FileInventory::new("/nonexistent/nodes.json");
        assert!(inventory.list_nodes().await.is_err());
    }

    #[test]
    fn test_bad_quantity_names_node() {
        let err = parse_nodes(r#"[{"name": "bad", "allocatable": {"cpu": "lots", "memory": "1Gi"}}]"#).unwrap_err();
        assert!(format!("{err:#}").contains("bad"));
    }
}
