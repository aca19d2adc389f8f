//! Rating formula configuration

use crate::rating::elo::{ExtendedEloConfig, RoundingRule};
use crate::types::Rating;
use serde::{Deserialize, Serialize};

/// Constants fed into the Elo formula
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    pub starting_rating: Rating,
    pub k_factor: f64,
    pub rounding: RoundingRule,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            starting_rating: 1200,
            k_factor: 32.0,
            rounding: RoundingRule::HalfAwayFromZero,
        }
    }
}

impl RatingConfig {
    pub fn to_elo_config(&self) -> ExtendedEloConfig {
        ExtendedEloConfig::new(self.k_factor, self.starting_rating, self.rounding)
    }
}
