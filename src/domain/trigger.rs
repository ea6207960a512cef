//! Transition trigger configuration.
//!
//! A trigger is a rule owned by a stage: when its condition is satisfied,
//! the record advances to the trigger's target stage. The condition is a
//! tagged sum type keyed by trigger type so the evaluator can match
//! exhaustively — an unhandled type is a compile error, not a silent
//! runtime pass.

use crate::id::{generate_trigger_id, now_ms};
use serde::{Deserialize, Serialize};

/// Type-specific condition payload. The serde tag is the wire contract
/// between the trigger-builder UI and the evaluator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerCondition {
    /// Every mandatory document requirement for the record's current
    /// stage/program is approved. No mandatory requirements ⇒ true.
    AllDocumentsApproved,

    /// Every listed document type is approved for the record.
    SpecificDocumentApproved { document_types: Vec<String> },

    /// The record's payment for the current stage is settled.
    PaymentReceived,

    /// A submission exists for the configured form.
    FormSubmitted { form_id: String },

    /// Documents, payment, and forms for the stage are all satisfied.
    AllRequirementsCompleted,

    /// Never auto-satisfied; requires an explicit administrative action.
    ManualApproval,
}

impl TriggerCondition {
    pub fn trigger_type(&self) -> TriggerType {
        match self {
            TriggerCondition::AllDocumentsApproved => TriggerType::AllDocumentsApproved,
            TriggerCondition::SpecificDocumentApproved { .. } => {
                TriggerType::SpecificDocumentApproved
            }
            TriggerCondition::PaymentReceived => TriggerType::PaymentReceived,
            TriggerCondition::FormSubmitted { .. } => TriggerType::FormSubmitted,
            TriggerCondition::AllRequirementsCompleted => TriggerType::AllRequirementsCompleted,
            TriggerCondition::ManualApproval => TriggerType::ManualApproval,
        }
    }
}

/// Fieldless trigger-type discriminant, used for log attribution and
/// display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    AllDocumentsApproved,
    SpecificDocumentApproved,
    PaymentReceived,
    FormSubmitted,
    AllRequirementsCompleted,
    ManualApproval,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerType::AllDocumentsApproved => "all_documents_approved",
            TriggerType::SpecificDocumentApproved => "specific_document_approved",
            TriggerType::PaymentReceived => "payment_received",
            TriggerType::FormSubmitted => "form_submitted",
            TriggerType::AllRequirementsCompleted => "all_requirements_completed",
            TriggerType::ManualApproval => "manual_approval",
        }
    }

    /// Stage-completion trigger types default to the pipeline's next stage
    /// when no explicit target is configured. Every other type requires an
    /// explicit target.
    pub fn has_implicit_target(&self) -> bool {
        matches!(
            self,
            TriggerType::AllDocumentsApproved | TriggerType::AllRequirementsCompleted
        )
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, TriggerType::ManualApproval)
    }
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TriggerType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "all_documents_approved" => Ok(TriggerType::AllDocumentsApproved),
            "specific_document_approved" => Ok(TriggerType::SpecificDocumentApproved),
            "payment_received" => Ok(TriggerType::PaymentReceived),
            "form_submitted" => Ok(TriggerType::FormSubmitted),
            "all_requirements_completed" => Ok(TriggerType::AllRequirementsCompleted),
            "manual_approval" => Ok(TriggerType::ManualApproval),
            other => Err(format!("unknown trigger type: {}", other)),
        }
    }
}

/// A configured transition rule owned by a stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionTrigger {
    /// Unique identifier ("trg-1738300800123-a1b2")
    pub id: String,

    /// The stage this trigger belongs to
    pub stage_id: String,

    /// Type-specific condition payload
    pub condition: TriggerCondition,

    /// Stage to move to when the condition is satisfied. None means the
    /// type's implicit default (next stage) for stage-completion types,
    /// and a configuration error for everything else.
    pub target_stage_id: Option<String>,

    /// Inactive triggers are skipped entirely and never evaluated
    pub is_active: bool,

    pub notify_student: bool,
    pub notify_admin: bool,

    /// Evaluation order within the stage. Ties break by `created_at`, so
    /// first-match selection is reproducible across storage backends.
    pub order_index: u32,

    /// Unix timestamp in milliseconds
    pub created_at: i64,
}

impl TransitionTrigger {
    /// Create an active trigger with no target override and no
    /// notifications.
    pub fn new(stage_id: &str, condition: TriggerCondition) -> Self {
        Self {
            id: generate_trigger_id(),
            stage_id: stage_id.to_string(),
            condition,
            target_stage_id: None,
            is_active: true,
            notify_student: false,
            notify_admin: false,
            order_index: 0,
            created_at: now_ms(),
        }
    }

    /// Set an explicit target stage.
    pub fn with_target(mut self, target_stage_id: &str) -> Self {
        self.target_stage_id = Some(target_stage_id.to_string());
        self
    }

    /// Set the evaluation order within the stage.
    pub fn with_order(mut self, order_index: u32) -> Self {
        self.order_index = order_index;
        self
    }

    /// Set the notification flags.
    pub fn with_notifications(mut self, notify_student: bool, notify_admin: bool) -> Self {
        self.notify_student = notify_student;
        self.notify_admin = notify_admin;
        self
    }

    /// Mark the trigger inactive.
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn trigger_type(&self) -> TriggerType {
        self.condition.trigger_type()
    }
}
