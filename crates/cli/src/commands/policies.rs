//! Policy listing command

use anyhow::Result;
use placement_engine::{PlacementEngine, SchedulingPolicy};
use tabled::Tabled;

use crate::output::{print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct PolicyRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Algorithm")]
    algorithm: String,
    #[tabled(rename = "Priority")]
    priority: i32,
    #[tabled(rename = "Enabled")]
    enabled: bool,
    #[tabled(rename = "Constraints")]
    constraints: String,
    #[tabled(rename = "Description")]
    description: String,
}

fn constraint_summary(policy: &SchedulingPolicy) -> String {
    let c = &policy.constraints;
    let mut parts = Vec::new();
    if let Some(resource) = &c.resource {
        if let Some(cpu) = resource.min_cpu {
            parts.push(format!("cpu>={cpu}"));
        }
        if let Some(mem) = resource.min_memory_gib {
            parts.push(format!("mem>={mem}Gi"));
        }
    }
    if let Some(cost) = &c.cost {
        if cost.prefer_spot {
            parts.push("spot".to_string());
        }
        if let Some(max) = cost.max_cost_per_hour {
            parts.push(format!("cost<=${max}/h"));
        }
    }
    if let Some(power) = &c.power {
        if power.prefer_green {
            parts.push("green".to_string());
        }
        if let Some(max) = power.max_power_watts {
            parts.push(format!("power<={max}W"));
        }
    }
    if let Some(limit) = policy.max_scheduling_time() {
        parts.push(format!("within {}s", limit.as_secs()));
    }
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(", ")
    }
}

pub fn list_policies(format: OutputFormat) -> Result<()> {
    let policies = PlacementEngine::default().list_policies();

    match format {
        OutputFormat::Json => print_json(&policies)?,
        OutputFormat::Table => {
            let rows: Vec<PolicyRow> = policies
                .iter()
                .map(|p| PolicyRow {
                    name: p.name.clone(),
                    algorithm: p.algorithm.to_string(),
                    priority: p.priority,
                    enabled: p.enabled,
                    constraints: constraint_summary(p),
                    description: p.description.clone(),
                })
                .collect();
            print_table(&rows);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use placement_engine::policy::builtin;

    #[test]
    fn test_constraint_summary() {
        let engine = PlacementEngine::default();
        let cost = engine.get_policy(builtin::COST_OPTIMIZED).unwrap();
        assert_eq!(constraint_summary(&cost), "spot");
        let fast = engine.get_policy(builtin::LOW_LATENCY).unwrap();
        assert_eq!(constraint_summary(&fast), "within 30s");
        let default = engine.get_policy(builtin::DEFAULT).unwrap();
        assert_eq!(constraint_summary(&default), "-");
    }
}
