//! Metrics collection using Prometheus

use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the ledger
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Ledger transaction metrics
    ledger_metrics: LedgerMetrics,
}

/// Ledger transaction metrics
#[derive(Clone)]
pub struct LedgerMetrics {
    /// Transactions by operation and result
    pub transactions_total: IntCounterVec,

    /// Optimistic commits that lost a race and were retried
    pub conflict_retries_total: IntCounter,

    /// Stored deltas or tallies rejected as corrupt
    pub integrity_faults_total: IntCounter,

    /// Match-store failures that were undone by a compensating transaction
    pub compensations_total: IntCounterVec,

    /// End-to-end transaction duration including lock waits
    pub transaction_duration_seconds: HistogramVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let ledger_metrics = LedgerMetrics::new(&registry)?;

        Ok(Self {
            registry,
            ledger_metrics,
        })
    }

    /// Get ledger metrics
    pub fn ledger(&self) -> &LedgerMetrics {
        &self.ledger_metrics
    }

    /// Record a finished ledger transaction
    pub fn record_transaction(&self, operation: &str, status: &str, duration: Duration) {
        self.ledger_metrics
            .transactions_total
            .with_label_values(&[operation, status])
            .inc();

        self.ledger_metrics
            .transaction_duration_seconds
            .with_label_values(&[operation])
            .observe(duration.as_secs_f64());
    }

    pub fn record_conflict_retry(&self) {
        self.ledger_metrics.conflict_retries_total.inc();
    }

    pub fn record_integrity_fault(&self) {
        self.ledger_metrics.integrity_faults_total.inc();
    }

    pub fn record_compensation(&self, operation: &str, success: bool) {
        let status = if success { "success" } else { "failed" };

        self.ledger_metrics
            .compensations_total
            .with_label_values(&[operation, status])
            .inc();
    }

    /// Render all registered metrics in the Prometheus text format
    pub fn gather_text(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl LedgerMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let transactions_total = IntCounterVec::new(
            Opts::new(
                "rivalry_ledger_transactions_total",
                "Total ledger transactions executed",
            ),
            &["operation", "status"],
        )?;
        registry.register(Box::new(transactions_total.clone()))?;

        let conflict_retries_total = IntCounter::new(
            "rivalry_ledger_conflict_retries_total",
            "Optimistic rating commits retried after a concurrent write",
        )?;
        registry.register(Box::new(conflict_retries_total.clone()))?;

        let integrity_faults_total = IntCounter::new(
            "rivalry_ledger_integrity_faults_total",
            "Stored deltas or tallies rejected as inconsistent",
        )?;
        registry.register(Box::new(integrity_faults_total.clone()))?;

        let compensations_total = IntCounterVec::new(
            Opts::new(
                "rivalry_ledger_compensations_total",
                "Ledger transactions undone after a match store failure",
            ),
            &["operation", "status"],
        )?;
        registry.register(Box::new(compensations_total.clone()))?;

        let transaction_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "rivalry_ledger_transaction_duration_seconds",
                "Ledger transaction duration including lock waits",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(transaction_duration_seconds.clone()))?;

        Ok(Self {
            transactions_total,
            conflict_retries_total,
            integrity_faults_total,
            compensations_total,
            transaction_duration_seconds,
        })
    }
}
