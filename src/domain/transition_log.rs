//! Transition log records for audit and history display.
//!
//! Append-only: entries are created by the Transition Executor and never
//! updated or deleted.

use crate::id::{generate_log_id, now_ms};
use serde::{Deserialize, Serialize};

use super::trigger::{TransitionTrigger, TriggerType};

/// One stage change for one record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionLog {
    /// Unique entry identifier ("tlog-1738300800123-a1b2")
    pub id: String,

    /// The record that moved
    pub record_id: String,

    pub from_stage_id: String,
    pub to_stage_id: String,

    /// The trigger that fired, None for manual transitions
    pub trigger_id: Option<String>,

    /// Trigger type attribution (manual_approval for manual transitions)
    pub trigger_type: TriggerType,

    /// Unix timestamp in milliseconds
    pub created_at: i64,
}

impl TransitionLog {
    /// Entry for an automatic transition fired by a trigger.
    pub fn automatic(
        record_id: &str,
        from_stage_id: &str,
        to_stage_id: &str,
        trigger: &TransitionTrigger,
    ) -> Self {
        Self {
            id: generate_log_id(),
            record_id: record_id.to_string(),
            from_stage_id: from_stage_id.to_string(),
            to_stage_id: to_stage_id.to_string(),
            trigger_id: Some(trigger.id.clone()),
            trigger_type: trigger.trigger_type(),
            created_at: now_ms(),
        }
    }

    /// Entry for a manual administrative transition.
    pub fn manual(record_id: &str, from_stage_id: &str, to_stage_id: &str) -> Self {
        Self {
            id: generate_log_id(),
            record_id: record_id.to_string(),
            from_stage_id: from_stage_id.to_string(),
            to_stage_id: to_stage_id.to_string(),
            trigger_id: None,
            trigger_type: TriggerType::ManualApproval,
            created_at: now_ms(),
        }
    }

    pub fn is_manual(&self) -> bool {
        self.trigger_id.is_none()
    }

    /// One-line summary for notifications and history display.
    pub fn summary(&self) -> String {
        format!(
            "{}: {} -> {} ({})",
            self.record_id, self.from_stage_id, self.to_stage_id, self.trigger_type
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trigger::TriggerCondition;

    #[test]
    fn test_automatic_entry() {
        let trigger =
            TransitionTrigger::new("send_documents", TriggerCondition::AllDocumentsApproved);
        let entry =
            TransitionLog::automatic("rec-001", "send_documents", "document_approval", &trigger);

        assert!(entry.id.starts_with("tlog-"));
        assert_eq!(entry.record_id, "rec-001");
        assert_eq!(entry.from_stage_id, "send_documents");
        assert_eq!(entry.to_stage_id, "document_approval");
        assert_eq!(entry.trigger_id, Some(trigger.id.clone()));
        assert_eq!(entry.trigger_type, TriggerType::AllDocumentsApproved);
        assert!(!entry.is_manual());
    }

    #[test]
    fn test_manual_entry() {
        let entry = TransitionLog::manual("rec-001", "fee_payment", "accepted");

        assert!(entry.trigger_id.is_none());
        assert_eq!(entry.trigger_type, TriggerType::ManualApproval);
        assert!(entry.is_manual());
    }

    #[test]
    fn test_summary() {
        let entry = TransitionLog::manual("rec-001", "fee_payment", "accepted");
        assert_eq!(
            entry.summary(),
            "rec-001: fee_payment -> accepted (manual_approval)"
        );
    }

    #[test]
    fn test_serialization_roundtrip() {
        let trigger = TransitionTrigger::new("fee_payment", TriggerCondition::PaymentReceived);
        let entry = TransitionLog::automatic("rec-001", "fee_payment", "accepted", &trigger);

        let json = serde_json::to_string(&entry).unwrap();
        let parsed: TransitionLog = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
    }
}
