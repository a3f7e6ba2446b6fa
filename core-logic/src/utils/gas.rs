//! # Core Logic - Gas Configuration
//!
//! Legacy gas-price policy shared by chains: an optional fixed price and
//! the percentage applied when a node rejects a fee as too low. Chains
//! fetch the network price themselves.

use serde::Deserialize;

const WEI_PER_GWEI: f64 = 1e9;

/// Configuration for gas management
#[derive(Debug, Clone)]
pub struct GasConfig {
    /// Percentage of the fresh network price used after an underpriced error.
    pub bump_percent: u64,
    /// Fixed gas price for the first attempt instead of the network suggestion.
    pub price_override_gwei: Option<f64>,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            bump_percent: 120,
            price_override_gwei: None,
        }
    }
}

impl GasConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bump_percent(mut self, percent: u64) -> Self {
        self.bump_percent = percent;
        self
    }

    pub fn with_price_override(mut self, gwei: f64) -> Self {
        self.price_override_gwei = Some(gwei);
        self
    }

    pub fn price_override_wei(&self) -> Option<u128> {
        self.price_override_gwei.map(gwei_to_wei)
    }

    /// `price * bump_percent / 100`, never below `price`.
    pub fn bumped(&self, price_wei: u128) -> u128 {
        let bumped = price_wei.saturating_mul(self.bump_percent as u128) / 100;
        bumped.max(price_wei)
    }
}

/// Convert gwei to wei
pub fn gwei_to_wei(gwei: f64) -> u128 {
    (gwei * WEI_PER_GWEI) as u128
}

/// Deserialize helper for GasConfig from TOML
#[derive(Deserialize, Default, Debug, Clone)]
pub struct GasConfigToml {
    pub bump_percent: Option<u64>,
    pub price_override_gwei: Option<f64>,
}

impl From<GasConfigToml> for GasConfig {
    fn from(toml: GasConfigToml) -> Self {
        Self {
            bump_percent: toml.bump_percent.unwrap_or(120),
            price_override_gwei: toml.price_override_gwei,
        }
    }
}
