//! Concrete provider implementations.

mod carbon_aware;
mod energy_charts;

pub use carbon_aware::{CarbonAwareAdapter, CARBON_AWARE_FORECAST_URL, CARBON_AWARE_INTENSITY_URL};
pub use energy_charts::{EnergyChartsAdapter, ENERGY_CHARTS_CO2EQ_URL};
