//! Campaign tunables.
//!
//! Ratios are stored as plain numbers so that config files stay readable;
//! they are converted to fixed-point once, at the point of use.

use crate::fixed::{self, Resources};
use serde::{Deserialize, Serialize};

/// Errors from validating a [`CampaignConfig`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroRatio(&'static str),
    #[error("scrap_ratio must be a finite, non-negative number (got {0})")]
    InvalidScrapRatio(f64),
}

/// Economy and transit tunables for a campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignConfig {
    /// Fraction of a ship's points refunded when it is scrapped.
    pub scrap_ratio: f64,
    /// Resources generated per unit of planet value per turn, split evenly
    /// among the controlling faction's members.
    pub resource_generation_ratio: u32,
    /// Fleet mass divided by this gives the hohmann cost per distance unit.
    pub hohmann_mass_ratio: u32,
    /// Fleet mass divided by this gives the brachistochrone cost per distance unit.
    pub brachistochrone_mass_ratio: u32,
    /// When set, a brachistochrone tick that covers less than its full
    /// two units pays only for the units actually covered.
    pub prorate_final_burn: bool,
    /// Ring buffer capacity per event kind.
    pub event_buffer_capacity: usize,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            scrap_ratio: 0.5,
            resource_generation_ratio: 10,
            hohmann_mass_ratio: 30,
            brachistochrone_mass_ratio: 15,
            prorate_final_burn: false,
            event_buffer_capacity: 1024,
        }
    }
}

impl CampaignConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.scrap_ratio.is_finite() || self.scrap_ratio < 0.0 {
            return Err(ConfigError::InvalidScrapRatio(self.scrap_ratio));
        }
        if self.resource_generation_ratio == 0 {
            return Err(ConfigError::ZeroRatio("resource_generation_ratio"));
        }
        if self.hohmann_mass_ratio == 0 {
            return Err(ConfigError::ZeroRatio("hohmann_mass_ratio"));
        }
        if self.brachistochrone_mass_ratio == 0 {
            return Err(ConfigError::ZeroRatio("brachistochrone_mass_ratio"));
        }
        Ok(())
    }

    pub(crate) fn scrap_ratio_fixed(&self) -> Resources {
        fixed::f64_to_resources(self.scrap_ratio)
    }
}
