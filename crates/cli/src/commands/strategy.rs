//! Optimization strategy command

use anyhow::{Context, Result};
use colored::Colorize;
use placement_engine::{EnvironmentSnapshot, PlacementEngine};
use std::path::Path;

use crate::manifest::{load_nodes, load_workload};
use crate::output::{
    color_score, format_currency, format_duration_secs, format_percent, format_watts, print_header, print_info,
    print_json, OutputFormat,
};

pub fn best_strategy(
    workload_path: &Path,
    nodes_path: &Path,
    assigned_node: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let workload = load_workload(workload_path)?;
    let environment = EnvironmentSnapshot {
        available_nodes: load_nodes(nodes_path)?,
        assigned_node,
    };
    let engine = PlacementEngine::default();

    let applicable = engine.strategies().applicable(&workload, &environment);
    let result = engine
        .find_best_strategy(&workload, &environment)
        .with_context(|| format!("No optimization strategy for {}", workload.name))?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_header("Optimization Strategy");
            println!("Workload:               {}", workload.name.cyan());
            println!("Strategy:               {}", result.strategy_name.green().bold());
            println!("Score:                  {}", color_score(result.score));
            println!("Confidence:             {}", format_percent(result.confidence));
            println!("Estimated cost/hour:    {}", format_currency(result.estimated_cost));
            println!("Estimated power:        {}", format_watts(result.estimated_power));
            println!(
                "Implementation time:    {}",
                format_duration_secs(result.implementation_time.as_secs())
            );
            println!();

            if !result.recommendations.is_empty() {
                println!("{}", "Recommendations".bold());
                for rec in &result.recommendations {
                    println!("  • {}", rec);
                }
                println!();
            }
            if !result.required_actions.is_empty() {
                println!("{}", "Required Actions".bold());
                for action in &result.required_actions {
                    println!("  • {}", action);
                }
                println!();
            }

            let names: Vec<&str> = applicable.iter().map(|s| s.name()).collect();
            print_info(&format!("Evaluated: {}", names.join(", ")));
        }
    }

    Ok(())
}
