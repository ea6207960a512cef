//! Domain types for admitr
//!
//! This module contains all core domain types:
//! - Record: a lead/applicant/student with its pipeline position
//! - Pipeline/Stage: the ordered stage set records move through
//! - TransitionTrigger: configured per-stage transition rules
//! - TransitionLog: append-only audit trail of stage changes
//! - Requirement facts: document/payment/form inputs to the evaluator
//! - NotificationDecision: who to tell about a transition

pub mod facts;
pub mod notification;
pub mod pipeline;
pub mod record;
pub mod transition_log;
pub mod trigger;

pub use facts::{DocumentRequirement, DocumentStatus, PaymentStatus};
pub use notification::NotificationDecision;
pub use pipeline::{DEFAULT_ENTRY_STAGE, Pipeline, Stage};
pub use record::{Record, RecordType};
pub use transition_log::TransitionLog;
pub use trigger::{TransitionTrigger, TriggerCondition, TriggerType};
