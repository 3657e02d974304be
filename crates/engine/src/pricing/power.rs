use crate::models::ResourceVector;
use serde::{Deserialize, Serialize};

/// Per-unit wattage plus a base system draw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerModel {
    pub watts_per_core: f64,
    pub watts_per_gib: f64,
    pub watts_per_gpu: f64,
    pub watts_per_npu: f64,
    pub base_watts: f64,
}

impl Default for PowerModel {
    fn default() -> Self {
        Self {
            watts_per_core: 15.0,
            watts_per_gib: 0.5,
            watts_per_gpu: 300.0,
            watts_per_npu: 250.0,
            base_watts: 50.0,
        }
    }
}

impl PowerModel {
    pub fn watts(&self, resources: &ResourceVector) -> f64 {
        self.base_watts
            + resources.cpu_cores * self.watts_per_core
            + resources.memory_gib * self.watts_per_gib
            + f64::from(resources.gpu) * self.watts_per_gpu
            + f64::from(resources.npu) * self.watts_per_npu
    }

    /// kWh drawn over a day at a constant `watts`
    pub fn daily_energy_kwh(watts: f64) -> f64 {
        watts * 24.0 / 1000.0
    }

    /// kWh drawn over a 30-day month at a constant `watts`
    pub fn monthly_energy_kwh(watts: f64) -> f64 {
        Self::daily_energy_kwh(watts) * 30.0
    }
}
