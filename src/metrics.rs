//! Prometheus metrics for the strategy loop.
//!
//! This module provides metrics for:
//! - Decision cycle latency
//! - Lend-book fetch latency
//! - Order placement and cancellation counters
//! - Gateway error counter

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use tracing::debug;

// === Metric Name Constants ===

/// Decision cycle latency metric name.
pub const METRIC_CYCLE_LATENCY: &str = "cycle_latency_ms";
/// Lend-book fetch latency metric name.
pub const METRIC_LENDBOOK_FETCH_LATENCY: &str = "lendbook_fetch_latency_ms";
/// Decision cycles counter metric name.
pub const METRIC_CYCLES: &str = "cycles_total";
/// Orders placed counter metric name.
pub const METRIC_ORDERS_PLACED: &str = "orders_placed_total";
/// Offers cancelled counter metric name.
pub const METRIC_OFFERS_CANCELLED: &str = "offers_cancelled_total";
/// Gateway errors counter metric name.
pub const METRIC_GATEWAY_ERRORS: &str = "gateway_errors_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_CYCLE_LATENCY,
        "Decision cycle latency in milliseconds"
    );
    describe_histogram!(
        METRIC_LENDBOOK_FETCH_LATENCY,
        "Lend-book fetch latency in milliseconds"
    );

    describe_counter!(METRIC_CYCLES, "Total number of decision cycles run");
    describe_counter!(METRIC_ORDERS_PLACED, "Total number of lending orders placed");
    describe_counter!(
        METRIC_OFFERS_CANCELLED,
        "Total number of resting offers cancelled"
    );
    describe_counter!(
        METRIC_GATEWAY_ERRORS,
        "Total number of cycles abandoned on a gateway error"
    );

    debug!("Metrics initialized");
}

/// Record decision cycle latency.
pub fn record_cycle_latency(start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_CYCLE_LATENCY).record(latency_ms);
}

/// Record lend-book fetch latency.
pub fn record_book_fetch_latency(start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_LENDBOOK_FETCH_LATENCY).record(latency_ms);
}

/// Increment the decision cycle counter.
pub fn inc_cycles() {
    counter!(METRIC_CYCLES).increment(1);
}

/// Increment the orders placed counter.
pub fn inc_orders_placed() {
    counter!(METRIC_ORDERS_PLACED).increment(1);
}

/// Increment the offers cancelled counter.
pub fn inc_offers_cancelled() {
    counter!(METRIC_OFFERS_CANCELLED).increment(1);
}

/// Increment the gateway error counter.
pub fn inc_gateway_errors() {
    counter!(METRIC_GATEWAY_ERRORS).increment(1);
}
