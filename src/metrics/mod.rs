//! Prometheus metrics for position submission
//!
//! Exposes metrics for:
//! - Position requests submitted, failed and reverted
//! - Collateral approvals

use crate::error::{TradeError, TradeResult};

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec, Encoder, TextEncoder};

lazy_static! {
    pub static ref POSITIONS_SUBMITTED: CounterVec = register_counter_vec!(
        "kiloex_positions_submitted_total",
        "Position requests mined, by action",
        &["chain_id", "action"]
    ).unwrap();

    pub static ref POSITIONS_FAILED: CounterVec = register_counter_vec!(
        "kiloex_positions_failed_total",
        "Position requests that raised an error, by action",
        &["chain_id", "action"]
    ).unwrap();

    pub static ref POSITIONS_REVERTED: CounterVec = register_counter_vec!(
        "kiloex_positions_reverted_total",
        "Position requests mined with a failed status, by action",
        &["chain_id", "action"]
    ).unwrap();

    pub static ref APPROVALS_SUBMITTED: CounterVec = register_counter_vec!(
        "kiloex_approvals_submitted_total",
        "Collateral approval transactions mined",
        &["chain_id"]
    ).unwrap();
}

/// Encode the default registry in the Prometheus text format.
///
/// The binary logs this at debug level before exiting; long-lived embedders
/// can serve it from their own endpoint.
pub fn render() -> TradeResult<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TradeError::Config(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| TradeError::Config(format!("Metrics are not UTF-8: {}", e)))
}

// Helper functions to record metrics

pub fn record_position_submitted(chain_id: u64, action: &str) {
    POSITIONS_SUBMITTED
        .with_label_values(&[&chain_id.to_string(), action])
        .inc();
}

pub fn record_position_failed(chain_id: u64, action: &str) {
    POSITIONS_FAILED
        .with_label_values(&[&chain_id.to_string(), action])
        .inc();
}

pub fn record_position_reverted(chain_id: u64, action: &str) {
    POSITIONS_REVERTED
        .with_label_values(&[&chain_id.to_string(), action])
        .inc();
}

pub fn record_approval_submitted(chain_id: u64) {
    APPROVALS_SUBMITTED
        .with_label_values(&[&chain_id.to_string()])
        .inc();
}
