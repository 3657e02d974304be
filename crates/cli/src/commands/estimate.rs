//! Cost and power estimate command

use anyhow::{anyhow, Result};
use colored::Colorize;
use placement_engine::pricing::{CostBreakdown, CostModel, PowerModel, PricingTier};
use placement_engine::resources::parse_device_count;
use placement_engine::ResourceVector;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{format_currency, format_watts, print_header, print_json, print_table, OutputFormat};

const TIERS: [&str; 4] = ["standard", "premium", "economy", "spot"];

#[derive(Debug, Serialize)]
pub struct Estimate {
    pub tier: String,
    pub resources: ResourceVector,
    pub cost: CostBreakdown,
    pub power_watts: f64,
    pub daily_cost: f64,
    pub monthly_cost: f64,
    pub daily_energy_kwh: f64,
    pub monthly_energy_kwh: f64,
}

#[derive(Tabled)]
struct CostRow {
    #[tabled(rename = "Component")]
    component: &'static str,
    #[tabled(rename = "Cost/h")]
    cost: String,
}

/// Price a resource request under the default models
pub fn compute(cpu: &str, memory: &str, gpu: &str, npu: &str, tier: Option<&str>) -> Result<Estimate> {
    let resources = ResourceVector::from_quantities(cpu, memory, parse_device_count(gpu)?, parse_device_count(npu)?)?;
    let tier_name = tier.unwrap_or("standard");
    let tier = PricingTier::named(tier_name)
        .ok_or_else(|| anyhow!("Unknown pricing tier {tier_name:?}, expected one of {}", TIERS.join(", ")))?;

    let cost = CostModel::default().tiered(&resources, &tier);
    let power_watts = PowerModel::default().watts(&resources);
    let daily_cost = cost.final_cost * 24.0;

    Ok(Estimate {
        tier: tier.name,
        resources,
        cost,
        power_watts,
        daily_cost,
        monthly_cost: daily_cost * 30.0,
        daily_energy_kwh: PowerModel::daily_energy_kwh(power_watts),
        monthly_energy_kwh: PowerModel::monthly_energy_kwh(power_watts),
    })
}

pub fn estimate(cpu: &str, memory: &str, gpu: &str, npu: &str, tier: Option<&str>, format: OutputFormat) -> Result<()> {
    let estimate = compute(cpu, memory, gpu, npu, tier)?;

    match format {
        OutputFormat::Json => print_json(&estimate)?,
        OutputFormat::Table => {
            let r = &estimate.resources;
            print_header("Resource Estimate");
            println!(
                "Request:                {} cores, {:.2} GiB, {} GPU, {} NPU",
                r.cpu_cores, r.memory_gib, r.gpu, r.npu
            );
            println!("Tier:                   {}", estimate.tier.cyan());
            println!();

            let c = &estimate.cost;
            let rows = vec![
                CostRow { component: "CPU", cost: format_currency(c.cpu) },
                CostRow { component: "Memory", cost: format_currency(c.memory) },
                CostRow { component: "GPU", cost: format_currency(c.gpu) },
                CostRow { component: "NPU", cost: format_currency(c.npu) },
                CostRow { component: "Infrastructure", cost: format_currency(c.infrastructure) },
                CostRow { component: "Total", cost: format_currency(c.final_cost) },
            ];
            print_table(&rows);
            println!();

            println!("Daily cost:             {}", format_currency(estimate.daily_cost));
            println!("Monthly cost:           {}", format_currency(estimate.monthly_cost).bold());
            println!("Power draw:             {}", format_watts(estimate.power_watts));
            println!("Daily energy:           {:.2} kWh", estimate.daily_energy_kwh);
            println!("Monthly energy:         {:.2} kWh", estimate.monthly_energy_kwh);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_matches_cost_model() {
        let estimate = compute("2", "4Gi", "0", "0", None).unwrap();
        let resources = ResourceVector::new(2.0, 4.0, 0, 0);
        assert!((estimate.cost.final_cost - CostModel::default().hourly(&resources)).abs() < 1e-9);
        assert!((estimate.monthly_cost - CostModel::default().monthly(&resources)).abs() < 1e-6);
        assert_eq!(estimate.tier, "standard");
    }

    #[test]
    fn test_premium_costs_more() {
        let standard = compute("2", "4Gi", "1", "0", None).unwrap();
        let premium = compute("2", "4Gi", "1", "0", Some("premium")).unwrap();
        assert!(premium.cost.final_cost > standard.cost.final_cost);
    }

    #[test]
    fn test_unknown_tier() {
        let err = compute("1", "1Gi", "0", "0", Some("gold")).unwrap_err();
        assert!(err.to_string().contains("gold"));
    }

    #[test]
    fn test_bad_cpu_quantity() {
        assert!(compute("abc", "1Gi", "0", "0", None).is_err());
    }
}
