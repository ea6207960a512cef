//! Requirement fact access.
//!
//! The evaluator reads facts through the `FactsReader` trait so tests and
//! embedders can substitute in-memory fakes for the real collaborator
//! subsystems (document review, payments, form submission).

pub mod memory;

use serde_json::Value;

use crate::domain::facts::{DocumentRequirement, DocumentStatus, PaymentStatus};
use crate::error::Result;

/// Read access to a record's requirement facts. All methods are read-only;
/// facts are owned and mutated by collaborator subsystems.
pub trait FactsReader: Send + Sync {
    /// Document requirements for a record at a stage.
    fn document_requirements(
        &self,
        record_id: &str,
        stage_id: &str,
    ) -> Result<Vec<DocumentRequirement>>;

    /// Status of one document type for a record, across stages.
    fn document_status(
        &self,
        record_id: &str,
        document_type: &str,
    ) -> Result<Option<DocumentStatus>>;

    /// Payment status for a record's stage fee. `None` means no payment
    /// requirement is registered for that stage.
    fn payment_status(&self, record_id: &str, stage_id: &str) -> Result<Option<PaymentStatus>>;

    /// Form ids required for a record at a stage.
    fn required_forms(&self, record_id: &str, stage_id: &str) -> Result<Vec<String>>;

    /// Whether a submission exists for the given form.
    fn form_submitted(&self, record_id: &str, form_id: &str) -> Result<bool>;

    /// Generic record field value for the field-condition path.
    fn record_field(&self, record_id: &str, field: &str) -> Result<Option<Value>>;
}

pub use memory::InMemoryFacts;
