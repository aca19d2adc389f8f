//! Configuration management for the rivalry ledger
//!
//! This module handles configuration loading from environment variables and
//! TOML files, validation, and default values.

pub mod app;
pub mod ledger;
pub mod rating;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, ServiceSettings};
pub use ledger::LedgerConfig;
pub use rating::RatingConfig;
