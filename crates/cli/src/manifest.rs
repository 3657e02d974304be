//! JSON manifest loading

use anyhow::{Context, Result};
use placement_engine::{Node, NodeManifest, WorkloadManifest, WorkloadSpec};
use std::fs;
use std::path::Path;

pub fn load_workload(path: &Path) -> Result<WorkloadSpec> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read workload {}", path.display()))?;
    let manifest: WorkloadManifest =
        serde_json::from_str(&raw).with_context(|| format!("Malformed workload manifest {}", path.display()))?;
    let name = manifest.name.clone();
    WorkloadSpec::try_from(manifest).with_context(|| format!("Invalid workload {name}"))
}

pub fn load_nodes(path: &Path) -> Result<Vec<Node>> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read nodes {}", path.display()))?;
    let manifests: Vec<NodeManifest> =
        serde_json::from_str(&raw).with_context(|| format!("Malformed node list {}", path.display()))?;
    manifests
        .into_iter()
        .map(|m| {
            let name = m.name.clone();
            Node::try_from(m).with_context(|| format!("Invalid node {name}"))
        })
        .collect()
}
