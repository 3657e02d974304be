//! Workload placement CLI
//!
//! Runs the placement engine locally against JSON manifests: schedule a
//! workload, ask for the best optimization strategy, price a resource
//! request or list the built-in scheduling policies.

mod commands;
mod manifest;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{estimate, policies, schedule, strategy};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Workload placement CLI
#[derive(Parser)]
#[command(name = "kcp")]
#[command(author, version, about = "CLI for the workload placement engine", long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pick a node for a workload
    Schedule {
        /// Workload manifest (JSON)
        #[arg(long, short)]
        workload: PathBuf,

        /// Node inventory (JSON array of node manifests)
        #[arg(long, short)]
        nodes: PathBuf,

        /// Built-in policy to schedule under (resolved from the workload type if omitted)
        #[arg(long, short)]
        policy: Option<String>,
    },

    /// Find the best cost/power optimization strategy for a workload
    Strategy {
        /// Workload manifest (JSON)
        #[arg(long, short)]
        workload: PathBuf,

        /// Node inventory (JSON array of node manifests)
        #[arg(long, short)]
        nodes: PathBuf,

        /// Node currently hosting the workload
        #[arg(long)]
        assigned_node: Option<String>,
    },

    /// Estimate cost and power for a resource request
    Estimate {
        /// CPU quantity (e.g. 2, 500m)
        #[arg(long)]
        cpu: String,

        /// Memory quantity (e.g. 4Gi, 512Mi)
        #[arg(long)]
        memory: String,

        /// Number of GPUs
        #[arg(long, default_value = "0")]
        gpu: String,

        /// Number of NPUs
        #[arg(long, default_value = "0")]
        npu: String,

        /// Pricing tier (standard, premium, economy, spot)
        #[arg(long)]
        tier: Option<String>,
    },

    /// List the built-in scheduling policies
    Policies,
}

/// Engine logs go to stderr, and only with --verbose
fn init_tracing() {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        init_tracing();
    }

    match cli.command {
        Commands::Schedule {
            workload,
            nodes,
            policy,
        } => {
            schedule::schedule(&workload, &nodes, policy.as_deref(), cli.format)?;
        }
        Commands::Strategy {
            workload,
            nodes,
            assigned_node,
        } => {
            strategy::best_strategy(&workload, &nodes, assigned_node, cli.format)?;
        }
        Commands::Estimate {
            cpu,
            memory,
            gpu,
            npu,
            tier,
        } => {
            estimate::estimate(&cpu, &memory, &gpu, &npu, tier.as_deref(), cli.format)?;
        }
        Commands::Policies => {
            policies::list_policies(cli.format)?;
        }
    }

    Ok(())
}
