//! Error types for admitr
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in admitr
#[derive(Debug, Error)]
pub enum AdmitrError {
    /// Record not found in storage
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// Trigger not found in storage
    #[error("Trigger not found: {0}")]
    TriggerNotFound(String),

    /// A transition was attempted from a stage the record is no longer in.
    /// Distinct from generic storage errors so callers can tell "someone
    /// else already moved this record" apart from "the database is down".
    #[error("Stage mismatch for record {record_id}: expected {expected}, found {actual}")]
    StageMismatch {
        record_id: String,
        expected: String,
        actual: String,
    },

    /// Malformed trigger configuration (bad target stage, empty document
    /// list, illegal operator for a field type, ...)
    #[error("Trigger configuration error: {0}")]
    TriggerConfig(String),

    /// Requirement fact fetch failed
    #[error("Fact lookup failed: {0}")]
    FactLookup(String),

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AdmitrError {
    /// Returns true if this is a stale-stage rejection.
    pub fn is_stage_mismatch(&self) -> bool {
        matches!(self, AdmitrError::StageMismatch { .. })
    }

    /// Returns true if this error fails the affected trigger closed
    /// (evaluate as "not met") instead of aborting the evaluation pass.
    pub fn is_trigger_isolated(&self) -> bool {
        matches!(
            self,
            AdmitrError::TriggerConfig(_) | AdmitrError::FactLookup(_)
        )
    }
}

impl From<rusqlite::Error> for AdmitrError {
    fn from(e: rusqlite::Error) -> Self {
        AdmitrError::Storage(e.to_string())
    }
}

/// Result type alias for admitr operations
pub type Result<T> = std::result::Result<T, AdmitrError>;
