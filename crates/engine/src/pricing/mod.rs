//! Cost and power models
//!
//! Pure functions from a resource vector to an hourly price or a wattage.

mod cost;
mod power;

pub use cost::{CostBreakdown, CostModel, CostSavings, PricingTier};
pub use power::PowerModel;
