//! Notification decision payload.
//!
//! The engine decides *whether* to notify and of what; delivery belongs
//! to the messaging collaborator.

use serde::{Deserialize, Serialize};

use super::trigger::TransitionTrigger;

/// The payload handed to the messaging subsystem after a transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationDecision {
    pub notify_student: bool,
    pub notify_admin: bool,
    pub record_id: String,
    /// Human-readable description of the transition
    pub transition_summary: String,
}

impl NotificationDecision {
    /// Decision derived from a trigger's notify flags.
    pub fn from_trigger(trigger: &TransitionTrigger, record_id: &str, summary: &str) -> Self {
        Self {
            notify_student: trigger.notify_student,
            notify_admin: trigger.notify_admin,
            record_id: record_id.to_string(),
            transition_summary: summary.to_string(),
        }
    }

    /// Decision that notifies no one (manual transitions).
    pub fn none(record_id: &str, summary: &str) -> Self {
        Self {
            notify_student: false,
            notify_admin: false,
            record_id: record_id.to_string(),
            transition_summary: summary.to_string(),
        }
    }

    pub fn should_send(&self) -> bool {
        self.notify_student || self.notify_admin
    }
}
