use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical provider identifiers used in logs and responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    EnergyCharts,
    CarbonAware,
}

impl ProviderId {
    pub const ALL: [Self; 2] = [Self::EnergyCharts, Self::CarbonAware];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EnergyCharts => "energy_charts",
            Self::CarbonAware => "carbon_aware",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "energy_charts" | "energy-charts" => Ok(Self::EnergyCharts),
            "carbon_aware" | "carbon-aware" => Ok(Self::CarbonAware),
            other => Err(ValidationError::InvalidProvider {
                value: other.to_owned(),
            }),
        }
    }
}

/// Which provider path produced a best-start result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Raw series from the primary provider, optimized locally.
    Primary,
    /// Point forecast from the secondary provider.
    Fallback,
}

impl Provenance {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

impl Display for Provenance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
