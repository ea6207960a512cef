//! In-memory facts fake for tests and embedders.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde_json::Value;

use super::FactsReader;
use crate::domain::facts::{DocumentRequirement, DocumentStatus, PaymentStatus};
use crate::error::{AdmitrError, Result};

#[derive(Debug, Default)]
struct FactsInner {
    /// (record_id, stage_id) -> document requirements
    documents: HashMap<(String, String), Vec<DocumentRequirement>>,
    /// (record_id, stage_id) -> payment status
    payments: HashMap<(String, String), PaymentStatus>,
    /// (record_id, stage_id) -> required form ids
    required_forms: HashMap<(String, String), Vec<String>>,
    /// (record_id, form_id) submissions
    submissions: HashSet<(String, String)>,
    /// (record_id, field) -> value
    fields: HashMap<(String, String), Value>,
}

/// Settable `FactsReader` backed by hash maps.
#[derive(Debug, Default)]
pub struct InMemoryFacts {
    inner: Mutex<FactsInner>,
}

impl InMemoryFacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or update a document requirement.
    pub fn set_document(
        &self,
        record_id: &str,
        stage_id: &str,
        document_type: &str,
        mandatory: bool,
        status: DocumentStatus,
    ) {
        let mut inner = self.inner.lock().expect("facts lock poisoned");
        let requirements = inner
            .documents
            .entry((record_id.to_string(), stage_id.to_string()))
            .or_default();
        if let Some(existing) = requirements
            .iter_mut()
            .find(|r| r.document_type == document_type)
        {
            existing.mandatory = mandatory;
            existing.status = status;
        } else {
            requirements.push(DocumentRequirement::new(document_type, mandatory, status));
        }
    }

    pub fn set_payment(&self, record_id: &str, stage_id: &str, status: PaymentStatus) {
        self.inner
            .lock()
            .expect("facts lock poisoned")
            .payments
            .insert((record_id.to_string(), stage_id.to_string()), status);
    }

    pub fn require_form(&self, record_id: &str, stage_id: &str, form_id: &str) {
        self.inner
            .lock()
            .expect("facts lock poisoned")
            .required_forms
            .entry((record_id.to_string(), stage_id.to_string()))
            .or_default()
            .push(form_id.to_string());
    }

    pub fn submit_form(&self, record_id: &str, form_id: &str) {
        self.inner
            .lock()
            .expect("facts lock poisoned")
            .submissions
            .insert((record_id.to_string(), form_id.to_string()));
    }

    pub fn set_field(&self, record_id: &str, field: &str, value: Value) {
        self.inner
            .lock()
            .expect("facts lock poisoned")
            .fields
            .insert((record_id.to_string(), field.to_string()), value);
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, FactsInner>> {
        self.inner
            .lock()
            .map_err(|e| AdmitrError::FactLookup(e.to_string()))
    }
}

impl FactsReader for InMemoryFacts {
    fn document_requirements(
        &self,
        record_id: &str,
        stage_id: &str,
    ) -> Result<Vec<DocumentRequirement>> {
        Ok(self
            .lock()?
            .documents
            .get(&(record_id.to_string(), stage_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn document_status(
        &self,
        record_id: &str,
        document_type: &str,
    ) -> Result<Option<DocumentStatus>> {
        let inner = self.lock()?;
        Ok(inner
            .documents
            .iter()
            .filter(|((rid, _), _)| rid == record_id)
            .flat_map(|(_, reqs)| reqs.iter())
            .find(|r| r.document_type == document_type)
            .map(|r| r.status))
    }

    fn payment_status(&self, record_id: &str, stage_id: &str) -> Result<Option<PaymentStatus>> {
        Ok(self
            .lock()?
            .payments
            .get(&(record_id.to_string(), stage_id.to_string()))
            .copied())
    }

    fn required_forms(&self, record_id: &str, stage_id: &str) -> Result<Vec<String>> {
        Ok(self
            .lock()?
            .required_forms
            .get(&(record_id.to_string(), stage_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn form_submitted(&self, record_id: &str, form_id: &str) -> Result<bool> {
        Ok(self
            .lock()?
            .submissions
            .contains(&(record_id.to_string(), form_id.to_string())))
    }

    fn record_field(&self, record_id: &str, field: &str) -> Result<Option<Value>> {
        Ok(self
            .lock()?
            .fields
            .get(&(record_id.to_string(), field.to_string()))
            .cloned())
    }
}
