//! Metrics for the rivalry ledger
//!
//! Prometheus counters and histograms describing ledger transactions.

pub mod collector;

pub use collector::{LedgerMetrics, MetricsCollector, MetricsTimer};
