//! In-memory store for unit tests and embedding.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::domain::record::Record;
use crate::domain::transition_log::TransitionLog;
use crate::domain::trigger::TransitionTrigger;
use crate::error::{AdmitrError, Result};

use super::traits::{RecordStore, TransitionLogStore, TriggerStore};

#[derive(Debug, Default)]
struct StoreInner {
    records: HashMap<String, Record>,
    triggers: HashMap<String, TransitionTrigger>,
    log: Vec<TransitionLog>,
}

/// Hash-map-backed implementation of all three store traits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreInner>> {
        self.inner
            .lock()
            .map_err(|e| AdmitrError::Storage(e.to_string()))
    }
}

impl RecordStore for MemoryStore {
    fn insert(&self, record: &Record) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.records.contains_key(&record.id) {
            return Err(AdmitrError::Storage(format!(
                "record {} already exists",
                record.id
            )));
        }
        inner.records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Record>> {
        Ok(self.lock()?.records.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Record>> {
        let mut records: Vec<Record> = self.lock()?.records.values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    fn update_stage(&self, id: &str, expected_stage: &str, new_stage: &str) -> Result<Record> {
        let mut inner = self.lock()?;
        let record = inner
            .records
            .get_mut(id)
            .ok_or_else(|| AdmitrError::RecordNotFound(id.to_string()))?;

        if record.stage_id != expected_stage {
            return Err(AdmitrError::StageMismatch {
                record_id: id.to_string(),
                expected: expected_stage.to_string(),
                actual: record.stage_id.clone(),
            });
        }

        record.stage_id = new_stage.to_string();
        record.substage_id = None;
        record.touch();
        Ok(record.clone())
    }

    fn set_substage(&self, id: &str, substage: Option<&str>) -> Result<()> {
        let mut inner = self.lock()?;
        let record = inner
            .records
            .get_mut(id)
            .ok_or_else(|| AdmitrError::RecordNotFound(id.to_string()))?;
        record.substage_id = substage.map(|s| s.to_string());
        record.touch();
        Ok(())
    }
}

impl TriggerStore for MemoryStore {
    fn create(&self, trigger: &TransitionTrigger) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.triggers.contains_key(&trigger.id) {
            return Err(AdmitrError::Storage(format!(
                "trigger {} already exists",
                trigger.id
            )));
        }
        inner.triggers.insert(trigger.id.clone(), trigger.clone());
        Ok(())
    }

    fn find(&self, id: &str) -> Result<Option<TransitionTrigger>> {
        Ok(self.lock()?.triggers.get(id).cloned())
    }

    fn update(&self, trigger: &TransitionTrigger) -> Result<()> {
        let mut inner = self.lock()?;
        if !inner.triggers.contains_key(&trigger.id) {
            return Err(AdmitrError::TriggerNotFound(trigger.id.clone()));
        }
        inner.triggers.insert(trigger.id.clone(), trigger.clone());
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let mut inner = self.lock()?;
        inner
            .triggers
            .remove(id)
            .ok_or_else(|| AdmitrError::TriggerNotFound(id.to_string()))?;
        Ok(())
    }

    fn set_active(&self, id: &str, active: bool) -> Result<()> {
        let mut inner = self.lock()?;
        let trigger = inner
            .triggers
            .get_mut(id)
            .ok_or_else(|| AdmitrError::TriggerNotFound(id.to_string()))?;
        trigger.is_active = active;
        Ok(())
    }

    fn list_for_stage(&self, stage_id: &str) -> Result<Vec<TransitionTrigger>> {
        let mut triggers: Vec<TransitionTrigger> = self
            .lock()?
            .triggers
            .values()
            .filter(|t| t.stage_id == stage_id)
            .cloned()
            .collect();
        triggers.sort_by(|a, b| {
            a.order_index
                .cmp(&b.order_index)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(triggers)
    }

    fn list_active_for_stage(&self, stage_id: &str) -> Result<Vec<TransitionTrigger>> {
        Ok(self
            .list_for_stage(stage_id)?
            .into_iter()
            .filter(|t| t.is_active)
            .collect())
    }
}

impl TransitionLogStore for MemoryStore {
    fn append(&self, entry: &TransitionLog) -> Result<()> {
        self.lock()?.log.push(entry.clone());
        Ok(())
    }

    fn list_for_record(&self, record_id: &str) -> Result<Vec<TransitionLog>> {
        Ok(self
            .lock()?
            .log
            .iter()
            .filter(|e| e.record_id == record_id)
            .cloned()
            .collect())
    }
}
