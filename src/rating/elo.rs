//! Elo rating formula
//!
//! Raw deltas come from the skillratings Elo implementation (logistic expected
//! score, base 10, scale 400). Each side is then rounded independently to the
//! stored whole-point granularity, so a pair may miss zero-sum by one point.

use crate::error::{LedgerError, Result};
use crate::rating::calculator::RatingCalculator;
use crate::types::{Outcome, Rating, RatingDelta};
use serde::{Deserialize, Serialize};
use skillratings::elo::{elo, EloConfig, EloRating};
use skillratings::Outcomes;
use std::str::FromStr;
use tracing::debug;

/// Rule used to bring a raw floating point delta to whole rating points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingRule {
    /// 2.5 -> 3, -2.5 -> -3
    #[default]
    HalfAwayFromZero,
    /// 2.5 -> 2, 3.5 -> 4 (bankers' rounding)
    HalfToEven,
}

impl RoundingRule {
    pub fn round(&self, value: f64) -> i64 {
        match self {
            RoundingRule::HalfAwayFromZero => value.round() as i64,
            RoundingRule::HalfToEven => value.round_ties_even() as i64,
        }
    }
}

impl FromStr for RoundingRule {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "half_away_from_zero" => Ok(RoundingRule::HalfAwayFromZero),
            "half_to_even" => Ok(RoundingRule::HalfToEven),
            other => Err(LedgerError::ConfigurationError {
                message: format!("Unknown rounding rule: {}", other),
            }),
        }
    }
}

impl std::fmt::Display for RoundingRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundingRule::HalfAwayFromZero => write!(f, "half_away_from_zero"),
            RoundingRule::HalfToEven => write!(f, "half_to_even"),
        }
    }
}

/// Extended configuration for the Elo formula
/// This wraps the skillratings EloConfig with the ledger's own parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendedEloConfig {
    /// Core Elo parameters (K-factor)
    pub elo_config: EloConfig,
    /// Initial rating for new players
    pub initial_rating: Rating,
    /// Rounding applied to each side's raw delta
    pub rounding: RoundingRule,
}

impl Default for ExtendedEloConfig {
    fn default() -> Self {
        Self {
            elo_config: EloConfig { k: 32.0 },
            initial_rating: 1200,
            rounding: RoundingRule::HalfAwayFromZero,
        }
    }
}

impl ExtendedEloConfig {
    pub fn new(k_factor: f64, initial_rating: Rating, rounding: RoundingRule) -> Self {
        Self {
            elo_config: EloConfig { k: k_factor },
            initial_rating,
            rounding,
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !self.elo_config.k.is_finite() || self.elo_config.k <= 0.0 {
            return Err(LedgerError::ConfigurationError {
                message: "K-factor must be a positive finite number".to_string(),
            });
        }

        if self.initial_rating <= 0 {
            return Err(LedgerError::ConfigurationError {
                message: "Initial rating must be positive".to_string(),
            });
        }

        Ok(())
    }
}

/// Expected scores `(player1, player2)`; the pair always sums to one
pub fn expected_score(player1: Rating, player2: Rating) -> (f64, f64) {
    skillratings::elo::expected_score(
        &EloRating {
            rating: player1 as f64,
        },
        &EloRating {
            rating: player2 as f64,
        },
    )
}

impl From<Outcome> for Outcomes {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Player1Win => Outcomes::WIN,
            Outcome::Player2Win => Outcomes::LOSS,
            Outcome::Draw => Outcomes::DRAW,
        }
    }
}

/// Elo rating calculator implementation
#[derive(Debug, Clone)]
pub struct EloRatingCalculator {
    config: ExtendedEloConfig,
}

impl EloRatingCalculator {
    /// Create a new Elo rating calculator
    pub fn new(config: ExtendedEloConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self { config })
    }

    pub fn k_factor(&self) -> f64 {
        self.config.elo_config.k
    }

    /// Unrounded deltas `K * (actual - expected)` for each side
    pub fn raw_delta(&self, player1: Rating, player2: Rating, outcome: Outcome) -> (f64, f64) {
        let one = EloRating {
            rating: player1 as f64,
        };
        let two = EloRating {
            rating: player2 as f64,
        };

        let (new_one, new_two) = elo(&one, &two, &outcome.into(), &self.config.elo_config);

        (new_one.rating - one.rating, new_two.rating - two.rating)
    }
}

impl RatingCalculator for EloRatingCalculator {
    fn calculate_delta(&self, player1: Rating, player2: Rating, outcome: Outcome) -> RatingDelta {
        let (raw1, raw2) = self.raw_delta(player1, player2, outcome);
        let delta = RatingDelta::new(
            self.config.rounding.round(raw1),
            self.config.rounding.round(raw2),
        );

        debug!(
            "Elo delta: {} vs {} ({}) expected {:.3}, actual {:.1} -> raw ({:.3}, {:.3}) rounded {}",
            player1,
            player2,
            outcome,
            expected_score(player1, player2).0,
            outcome.actual_scores().0,
            raw1,
            raw2,
            delta
        );

        delta
    }

    fn initial_rating(&self) -> Rating {
        self.config.initial_rating
    }

    fn config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null)
    }
}
