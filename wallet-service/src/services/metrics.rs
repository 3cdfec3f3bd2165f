//! Prometheus metrics for wallet-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// Ledger transaction counter by kind and outcome.
pub static TRANSACTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "wallet_transactions_total",
        "Total number of coin transactions recorded",
        &["kind", "outcome"] // ok, insufficient_funds, error - not account_id to avoid cardinality explosion
    )
    .expect("Failed to register transactions_total")
});

/// Identifier resolution counter by kind.
pub static RESOLUTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "wallet_resolutions_total",
        "Total number of identifier resolutions",
        &["kind", "access_type"]
    )
    .expect("Failed to register resolutions_total")
});

/// Token unlock counter by outcome.
pub static UNLOCKS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "wallet_unlocks_total",
        "Total number of share-token unlock attempts",
        &["outcome"] // granted, already_accessible, insufficient_funds, error
    )
    .expect("Failed to register unlocks_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "wallet_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "wallet_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&TRANSACTIONS_TOTAL);
    Lazy::force(&RESOLUTIONS_TOTAL);
    Lazy::force(&UNLOCKS_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
