//! CLI integration tests

use std::io::Write;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

const WORKLOAD: &str = r#"{
    "name": "etl-nightly",
    "workload_type": "batch",
    "resources": {"cpu": "4", "memory": "8Gi"},
    "cost": {"prefer_spot": true}
}"#;

const NODES: &str = r#"[
    {"name": "big", "labels": {"lifecycle": "spot"}, "allocatable": {"cpu": "16", "memory": "64Gi"}},
    {"name": "small", "allocatable": {"cpu": "2", "memory": "4Gi"}}
]"#;

fn kcp(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_kcp"))
        .args(args)
        .output()
        .expect("Failed to execute kcp")
}

fn manifest(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = kcp(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("workload placement"), "Should show about text");
    assert!(stdout.contains("schedule"), "Should show schedule command");
    assert!(stdout.contains("strategy"), "Should show strategy command");
    assert!(stdout.contains("estimate"), "Should show estimate command");
    assert!(stdout.contains("policies"), "Should show policies command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = kcp(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("kcp"), "Should show binary name");
}

#[test]
fn test_schedule_help() {
    let output = kcp(&["schedule", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--workload"));
    assert!(stdout.contains("--nodes"));
    assert!(stdout.contains("--policy"));
}

#[test]
fn test_schedule_picks_fitting_node() {
    let workload = manifest(WORKLOAD);
    let nodes = manifest(NODES);
    let output = kcp(&[
        "--format",
        "json",
        "schedule",
        "--workload",
        workload.path().to_str().unwrap(),
        "--nodes",
        nodes.path().to_str().unwrap(),
    ]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let json = stdout_json(&output);
    assert_eq!(json["workload"], "etl-nightly");
    assert_eq!(json["decision"]["node_name"], "big");
}

#[test]
fn test_schedule_with_named_policy() {
    let workload = manifest(WORKLOAD);
    let nodes = manifest(NODES);
    let output = kcp(&[
        "schedule",
        "--workload",
        workload.path().to_str().unwrap(),
        "--nodes",
        nodes.path().to_str().unwrap(),
        "--policy",
        "cost-optimized",
        "--format",
        "json",
    ]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(stdout_json(&output)["policy"], "cost-optimized");
}

#[test]
fn test_schedule_unknown_policy_fails() {
    let workload = manifest(WORKLOAD);
    let nodes = manifest(NODES);
    let output = kcp(&[
        "schedule",
        "--workload",
        workload.path().to_str().unwrap(),
        "--nodes",
        nodes.path().to_str().unwrap(),
        "--policy",
        "nope",
    ]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("policy not found"));
}

#[test]
fn test_schedule_no_fitting_node_fails() {
    let workload = manifest(WORKLOAD);
    let nodes = manifest(r#"[{"name": "tiny", "allocatable": {"cpu": "1", "memory": "1Gi"}}]"#);
    let output = kcp(&[
        "schedule",
        "--workload",
        workload.path().to_str().unwrap(),
        "--nodes",
        nodes.path().to_str().unwrap(),
    ]);

    assert!(!output.status.success());
}

#[test]
fn test_strategy_returns_result() {
    let workload = manifest(WORKLOAD);
    let nodes = manifest(NODES);
    let output = kcp(&[
        "strategy",
        "--workload",
        workload.path().to_str().unwrap(),
        "--nodes",
        nodes.path().to_str().unwrap(),
        "--format",
        "json",
    ]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let json = stdout_json(&output);
    assert!(!json["strategy_name"].as_str().unwrap().is_empty());
    let score = json["score"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&score));
}

#[test]
fn test_estimate_json() {
    let output = kcp(&["estimate", "--cpu", "2", "--memory", "4Gi", "--format", "json"]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let json = stdout_json(&output);
    assert_eq!(json["tier"], "standard");
    let hourly = json["cost"]["final_cost"].as_f64().unwrap();
    let daily = json["daily_cost"].as_f64().unwrap();
    assert!((daily - hourly * 24.0).abs() < 1e-9);
    assert!(json["power_watts"].as_f64().unwrap() > 0.0);
}

#[test]
fn test_estimate_rejects_bad_quantity() {
    let output = kcp(&["estimate", "--cpu", "lots", "--memory", "4Gi"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid resource quantity"));
}

#[test]
fn test_policies_lists_builtins() {
    let output = kcp(&["policies", "--format", "json"]);

    assert!(output.status.success());
    let json = stdout_json(&output);
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 5);
    assert!(names.contains(&"default"));
    assert!(names.contains(&"low-latency"));
    assert!(json[0]["description"].as_str().is_some_and(|d| !d.is_empty()));
}

#[test]
fn test_policies_table() {
    let output = kcp(&["policies"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("cost-optimized"));
    assert!(stdout.contains("Algorithm"));
}
