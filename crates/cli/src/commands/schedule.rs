//! Schedule command

use anyhow::{Context, Result};
use colored::Colorize;
use placement_engine::{PlacementEngine, SchedulingDecision};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;
use tracing::debug;

use crate::manifest::{load_nodes, load_workload};
use crate::output::{color_score, format_currency, format_watts, print_header, print_json, print_success, print_table, OutputFormat};

#[derive(Serialize)]
struct ScheduleOutput<'a> {
    workload: &'a str,
    policy: &'a str,
    decision: &'a SchedulingDecision,
}

#[derive(Tabled)]
struct CandidateRow {
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Cost/h")]
    cost: String,
    #[tabled(rename = "Power")]
    power: String,
    #[tabled(rename = "Fits")]
    fits: String,
}

/// Schedule the workload under the named policy, or the one resolved for it
pub fn schedule(workload_path: &Path, nodes_path: &Path, policy: Option<&str>, format: OutputFormat) -> Result<()> {
    let workload = load_workload(workload_path)?;
    let nodes = load_nodes(nodes_path)?;
    let engine = PlacementEngine::default();

    let policy = match policy {
        Some(name) => engine.get_policy(name)?,
        None => engine.policies().policy_for_workload(&workload),
    };
    debug!(workload = %workload.name, policy = %policy.name, nodes = nodes.len(), "Scheduling");

    let decision = engine
        .schedule_with_policy(&workload, &nodes, &policy)
        .with_context(|| format!("Failed to schedule {}", workload.name))?;

    match format {
        OutputFormat::Json => print_json(&ScheduleOutput {
            workload: &workload.name,
            policy: &policy.name,
            decision: &decision,
        })?,
        OutputFormat::Table => {
            print_header("Scheduling Decision");
            println!("Workload:               {}", workload.name.cyan());
            println!("Policy:                 {} ({})", policy.name, policy.algorithm);
            println!("Node:                   {}", decision.node_name.green().bold());
            println!("Score:                  {}", color_score(decision.score));
            println!("Estimated cost/hour:    {}", format_currency(decision.estimated_cost_per_hour));
            println!("Estimated power:        {}", format_watts(decision.estimated_power_watts));
            println!("Reason:                 {}", decision.reason);
            println!();

            let rows: Vec<CandidateRow> = nodes
                .iter()
                .map(|node| {
                    let eval = engine.scheduler().evaluate_node(&workload, node, &policy);
                    CandidateRow {
                        node: node.name.clone(),
                        score: format!("{:.3}", eval.score),
                        cost: format_currency(eval.estimated_cost_per_hour),
                        power: format_watts(eval.estimated_power_watts),
                        fits: if eval.eligible { "yes" } else { "no" }.to_string(),
                    }
                })
                .collect();
            println!("{}", "Candidates".bold());
            print_table(&rows);
            print_success(&format!("{} placed on {}", workload.name, decision.node_name));
        }
    }

    Ok(())
}
