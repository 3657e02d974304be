//! Hourly cost model

use crate::models::ResourceVector;
use serde::{Deserialize, Serialize};

const HOURS_PER_DAY: f64 = 24.0;
const DAYS_PER_MONTH: f64 = 30.0;
const MONTHS_PER_YEAR: f64 = 12.0;

/// Per-unit hourly rates plus a flat infrastructure overhead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    pub cpu_per_core_hour: f64,
    pub memory_per_gib_hour: f64,
    pub gpu_per_hour: f64,
    pub npu_per_hour: f64,
    pub base_per_hour: f64,
    /// Fraction taken off the total for spot capacity
    pub spot_discount: f64,
    /// Fraction taken off the total for reserved capacity
    pub reserved_discount: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            cpu_per_core_hour: 0.05,
            memory_per_gib_hour: 0.01,
            gpu_per_hour: 2.50,
            npu_per_hour: 2.00,
            base_per_hour: 0.10,
            spot_discount: 0.30,
            reserved_discount: 0.20,
        }
    }
}

/// Per-component cost of a resource vector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub cpu: f64,
    pub memory: f64,
    pub gpu: f64,
    pub npu: f64,
    pub infrastructure: f64,
    pub total: f64,
    pub discount: f64,
    pub final_cost: f64,
}

/// Rate multipliers for a named pricing tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingTier {
    pub name: String,
    pub cpu_multiplier: f64,
    pub memory_multiplier: f64,
    pub gpu_multiplier: f64,
    pub npu_multiplier: f64,
}

impl PricingTier {
    fn uniform(name: &str, multiplier: f64) -> Self {
        Self::new(name, multiplier, multiplier, multiplier, multiplier)
    }

    fn new(name: &str, cpu: f64, memory: f64, gpu: f64, npu: f64) -> Self {
        Self {
            name: name.to_string(),
            cpu_multiplier: cpu,
            memory_multiplier: memory,
            gpu_multiplier: gpu,
            npu_multiplier: npu,
        }
    }

    /// Look up a built-in tier: `standard`, `premium`, `economy` or `spot`
    pub fn named(name: &str) -> Option<Self> {
        match name {
            "standard" => Some(Self::uniform("standard", 1.0)),
            "premium" => Some(Self::new("premium", 1.5, 1.3, 1.8, 1.6)),
            "economy" => Some(Self::new("economy", 0.7, 0.8, 0.6, 0.7)),
            "spot" => Some(Self::uniform("spot", 0.7)),
            _ => None,
        }
    }
}

/// Non-negative difference between a current and an optimized cost
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSavings {
    pub amount: f64,
    pub percentage: f64,
}

impl CostModel {
    /// Hourly cost of `resources` with no tier or discount
    pub fn hourly(&self, resources: &ResourceVector) -> f64 {
        self.breakdown(resources).final_cost
    }

    pub fn breakdown(&self, resources: &ResourceVector) -> CostBreakdown {
        self.tiered(resources, &PricingTier::uniform("standard", 1.0))
    }

    /// Cost with each component scaled by the tier's multiplier
    pub fn tiered(&self, resources: &ResourceVector, tier: &PricingTier) -> CostBreakdown {
        let cpu = resources.cpu_cores * self.cpu_per_core_hour * tier.cpu_multiplier;
        let memory = resources.memory_gib * self.memory_per_gib_hour * tier.memory_multiplier;
        let gpu = f64::from(resources.gpu) * self.gpu_per_hour * tier.gpu_multiplier;
        let npu = f64::from(resources.npu) * self.npu_per_hour * tier.npu_multiplier;
        let total = cpu + memory + gpu + npu + self.base_per_hour;

        CostBreakdown {
            cpu,
            memory,
            gpu,
            npu,
            infrastructure: self.base_per_hour,
            total,
            discount: 0.0,
            final_cost: total,
        }
    }

    /// Breakdown with spot and/or reserved discounts taken off the total
    pub fn with_discounts(&self, resources: &ResourceVector, spot: bool, reserved: bool) -> CostBreakdown {
        let mut breakdown = self.breakdown(resources);
        if spot {
            breakdown.discount += breakdown.total * self.spot_discount;
        }
        if reserved {
            breakdown.discount += breakdown.total * self.reserved_discount;
        }
        breakdown.final_cost = (breakdown.total - breakdown.discount).max(0.0);
        breakdown
    }

    pub fn daily(&self, resources: &ResourceVector) -> f64 {
        self.hourly(resources) * HOURS_PER_DAY
    }

    pub fn monthly(&self, resources: &ResourceVector) -> f64 {
        self.daily(resources) * DAYS_PER_MONTH
    }

    pub fn yearly(&self, resources: &ResourceVector) -> f64 {
        self.monthly(resources) * MONTHS_PER_YEAR
    }

    pub fn savings(&self, current: f64, optimized: f64) -> CostSavings {
        if current <= 0.0 {
            return CostSavings::default();
        }
        let amount = current - optimized;
        CostSavings {
            amount: amount.max(0.0),
            percentage: (amount / current * 100.0).max(0.0),
        }
    }
}
