//! ID generation utilities for admitr
//!
//! Provides functions for generating unique identifiers for records,
//! triggers, and transition log entries.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

/// Generate a unique record ID
///
/// Format: `rec-{timestamp_ms}-{random_hex}`
/// Example: `rec-1738300800123-a1b2`
pub fn generate_record_id() -> String {
    let timestamp = now_ms();
    let random: u16 = rand::rng().random();
    format!("rec-{}-{:04x}", timestamp, random)
}

/// Generate a unique trigger ID
///
/// Format: `trg-{timestamp_ms}-{random_hex}`
pub fn generate_trigger_id() -> String {
    let timestamp = now_ms();
    let random: u16 = rand::rng().random();
    format!("trg-{}-{:04x}", timestamp, random)
}

/// Generate a transition log entry ID
///
/// Format: `tlog-{timestamp_ms}-{random_hex}`
pub fn generate_log_id() -> String {
    let timestamp = now_ms();
    let random: u16 = rand::rng().random();
    format!("tlog-{}-{:04x}", timestamp, random)
}
