//! Storage trait definitions.
//!
//! The engine takes these traits as explicit dependencies so storage can
//! be substituted (SQLite in production, in-memory in tests) without
//! touching evaluation or execution logic.

use crate::domain::record::Record;
use crate::domain::transition_log::TransitionLog;
use crate::domain::trigger::TransitionTrigger;
use crate::error::Result;

/// Persistence for records.
pub trait RecordStore: Send + Sync {
    /// Create a new record.
    fn insert(&self, record: &Record) -> Result<()>;

    /// Get a record by ID.
    fn get(&self, id: &str) -> Result<Option<Record>>;

    /// List all records.
    fn list(&self) -> Result<Vec<Record>>;

    /// Compare-and-swap stage update: succeeds only if the record's
    /// current stage still equals `expected_stage`. Returns the updated
    /// record, or `StageMismatch` if another transition won the race.
    fn update_stage(&self, id: &str, expected_stage: &str, new_stage: &str) -> Result<Record>;

    /// Set or clear the record's substage.
    fn set_substage(&self, id: &str, substage: Option<&str>) -> Result<()>;
}

/// Persistence for transition triggers.
pub trait TriggerStore: Send + Sync {
    /// Create a new trigger.
    fn create(&self, trigger: &TransitionTrigger) -> Result<()>;

    /// Find a trigger by ID.
    fn find(&self, id: &str) -> Result<Option<TransitionTrigger>>;

    /// Replace an existing trigger.
    fn update(&self, trigger: &TransitionTrigger) -> Result<()>;

    /// Delete a trigger by ID.
    fn delete(&self, id: &str) -> Result<()>;

    /// Flip a trigger's active flag.
    fn set_active(&self, id: &str, active: bool) -> Result<()>;

    /// All triggers owned by a stage, active or not, in evaluation order.
    fn list_for_stage(&self, stage_id: &str) -> Result<Vec<TransitionTrigger>>;

    /// Active triggers owned by a stage in evaluation order
    /// (`order_index`, ties broken by `created_at`). Inactive triggers
    /// are filtered here and never reach the evaluator.
    fn list_active_for_stage(&self, stage_id: &str) -> Result<Vec<TransitionTrigger>>;
}

/// Append-only persistence for the transition log.
pub trait TransitionLogStore: Send + Sync {
    /// Append one entry. There is no update or delete.
    fn append(&self, entry: &TransitionLog) -> Result<()>;

    /// All entries for a record in chronological order.
    fn list_for_record(&self, record_id: &str) -> Result<Vec<TransitionLog>>;
}
