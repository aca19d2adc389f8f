//! Main application configuration
//!
//! This module defines the top-level configuration structure, environment
//! variable and TOML file loading, and validation.

use crate::config::ledger::LedgerConfig;
use crate::config::rating::RatingConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub rating: RatingConfig,
    pub ledger: LedgerConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "rivalry-ledger".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; environment variables still override it
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Parse configuration from TOML text without validating it
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| anyhow!("Invalid TOML configuration: {}", e))
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }

        // Rating settings
        if let Ok(rating) = env::var("STARTING_RATING") {
            self.rating.starting_rating = rating
                .parse()
                .map_err(|_| anyhow!("Invalid STARTING_RATING value: {}", rating))?;
        }
        if let Ok(k) = env::var("K_FACTOR") {
            self.rating.k_factor = k
                .parse()
                .map_err(|_| anyhow!("Invalid K_FACTOR value: {}", k))?;
        }
        if let Ok(rule) = env::var("ROUNDING_RULE") {
            self.rating.rounding = rule
                .parse()
                .map_err(|_| anyhow!("Invalid ROUNDING_RULE value: {}", rule))?;
        }

        // Ledger settings
        if let Ok(timeout) = env::var("STORE_TIMEOUT_MS") {
            self.ledger.store_timeout_ms = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid STORE_TIMEOUT_MS value: {}", timeout))?;
        }
        if let Ok(retries) = env::var("MAX_CONFLICT_RETRIES") {
            self.ledger.max_conflict_retries = retries
                .parse()
                .map_err(|_| anyhow!("Invalid MAX_CONFLICT_RETRIES value: {}", retries))?;
        }
        if let Ok(tolerance) = env::var("ZERO_SUM_TOLERANCE") {
            self.ledger.zero_sum_tolerance = tolerance
                .parse()
                .map_err(|_| anyhow!("Invalid ZERO_SUM_TOLERANCE value: {}", tolerance))?;
        }

        Ok(())
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.name.is_empty() {
        return Err(anyhow!("Service name cannot be empty"));
    }

    // Validate rating settings
    config
        .rating
        .to_elo_config()
        .validate()
        .map_err(|e| anyhow!("{}", e))?;

    // Validate ledger settings
    if config.ledger.store_timeout_ms == 0 {
        return Err(anyhow!("Store timeout must be greater than 0"));
    }
    if config.ledger.zero_sum_tolerance < 0 {
        return Err(anyhow!("Zero-sum tolerance cannot be negative"));
    }

    Ok(())
}
