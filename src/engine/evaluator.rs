//! Condition evaluator.
//!
//! Decides, for one trigger, whether its condition is currently satisfied
//! for a given record. Pure read path: facts come in through the
//! `FactsReader` seam, nothing is mutated.
//!
//! Fail-closed policy: malformed condition config and missing
//! requirements evaluate to "not met" (or a `TriggerConfig` error the
//! orchestrator treats the same way), never to a silent pass.

use tracing::debug;

use crate::domain::record::Record;
use crate::domain::trigger::{TransitionTrigger, TriggerCondition};
use crate::error::{AdmitrError, Result};
use crate::facts::FactsReader;
use crate::registry::{ConditionFieldRegistry, FieldCondition};

/// Evaluates trigger conditions against requirement facts.
pub struct ConditionEvaluator<'a, F: FactsReader + ?Sized> {
    facts: &'a F,
    registry: ConditionFieldRegistry,
}

impl<'a, F: FactsReader + ?Sized> ConditionEvaluator<'a, F> {
    pub fn new(facts: &'a F) -> Self {
        Self {
            facts,
            registry: ConditionFieldRegistry::new(),
        }
    }

    /// Is the trigger's condition satisfied for this record right now?
    pub fn evaluate(&self, record: &Record, trigger: &TransitionTrigger) -> Result<bool> {
        let satisfied = match &trigger.condition {
            TriggerCondition::AllDocumentsApproved => self.all_documents_approved(record)?,
            TriggerCondition::SpecificDocumentApproved { document_types } => {
                self.specific_documents_approved(record, document_types)?
            }
            TriggerCondition::PaymentReceived => self.payment_received(record)?,
            TriggerCondition::FormSubmitted { form_id } => {
                self.facts.form_submitted(&record.id, form_id)?
            }
            TriggerCondition::AllRequirementsCompleted => {
                self.all_requirements_completed(record)?
            }
            // Never auto-satisfied; the executor's manual path is the only
            // way through
            TriggerCondition::ManualApproval => false,
        };
        debug!(
            trigger_id = %trigger.id,
            trigger_type = %trigger.trigger_type(),
            record_id = %record.id,
            satisfied,
            "evaluated trigger condition"
        );
        Ok(satisfied)
    }

    /// Every mandatory document for the record's current stage is
    /// approved. No mandatory documents ⇒ vacuously true.
    fn all_documents_approved(&self, record: &Record) -> Result<bool> {
        let requirements = self
            .facts
            .document_requirements(&record.id, &record.stage_id)?;
        Ok(requirements
            .iter()
            .filter(|r| r.mandatory)
            .all(|r| r.status.is_approved()))
    }

    /// Every listed document type is approved. An unknown document type
    /// means the requirement doesn't exist yet ⇒ not met.
    fn specific_documents_approved(&self, record: &Record, document_types: &[String]) -> Result<bool> {
        if document_types.is_empty() {
            return Err(AdmitrError::TriggerConfig(
                "specific_document_approved requires at least one document type".to_string(),
            ));
        }
        for document_type in document_types {
            match self.facts.document_status(&record.id, document_type)? {
                Some(status) if status.is_approved() => {}
                _ => return Ok(false),
            }
        }
        Ok(true)
    }

    /// Payment for the record's current stage is settled. No payment fact
    /// registered ⇒ not met.
    fn payment_received(&self, record: &Record) -> Result<bool> {
        Ok(self
            .facts
            .payment_status(&record.id, &record.stage_id)?
            .is_some_and(|s| s.is_settled()))
    }

    /// Documents AND payment AND forms for the stage. Payment and forms
    /// only gate when such facts are registered for the stage.
    fn all_requirements_completed(&self, record: &Record) -> Result<bool> {
        if !self.all_documents_approved(record)? {
            return Ok(false);
        }

        if let Some(status) = self
            .facts
            .payment_status(&record.id, &record.stage_id)?
            && !status.is_settled()
        {
            return Ok(false);
        }

        for form_id in self.facts.required_forms(&record.id, &record.stage_id)? {
            if !self.facts.form_submitted(&record.id, &form_id)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Generic path: evaluate a field+operator+value condition against the
    /// record's field value, validated against the field registry.
    pub fn evaluate_field_condition(
        &self,
        record_id: &str,
        condition: &FieldCondition,
    ) -> Result<bool> {
        condition.validate(&self.registry)?;
        let field = self.registry.require_field(&condition.field)?;
        let actual = self.facts.record_field(record_id, &condition.field)?;
        condition.evaluate(field.field_type, actual.as_ref())
    }

    /// The registry backing the generic condition path.
    pub fn registry(&self) -> &ConditionFieldRegistry {
        &self.registry
    }
}
