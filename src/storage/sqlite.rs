//! SQLite-backed store.
//!
//! Records and triggers are stored as JSON blobs with indexed columns for
//! the fields queries filter and order on. The transition log and the
//! collaborator fact tables (documents, payments, forms, record fields)
//! are plain columns.
//!
//! The stage write is a real compare-and-swap: the UPDATE is guarded by
//! `WHERE id = ? AND stage_id = ?`, so a concurrent transition loses the
//! race with a `StageMismatch` instead of silently clobbering the stage.

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::domain::facts::{DocumentRequirement, DocumentStatus, PaymentStatus};
use crate::domain::record::Record;
use crate::domain::transition_log::TransitionLog;
use crate::domain::trigger::TransitionTrigger;
use crate::error::{AdmitrError, Result};
use crate::facts::FactsReader;
use crate::id::now_ms;

use super::traits::{RecordStore, TransitionLogStore, TriggerStore};

/// SQLite store implementing records, triggers, the transition log, and
/// the fact tables collaborator subsystems write into.
///
/// `Connection` isn't Sync (it uses RefCell internally), so it sits
/// behind a Mutex. Operations are quick and need exclusive access anyway.
pub struct SqliteStore {
    db: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open or create the store for the given project directory.
    ///
    /// The database lives at `~/.admitr/<project-hash>/admitr.db`.
    pub fn open(project_dir: &Path) -> Result<Self> {
        let project_hash = compute_project_hash(project_dir)?;
        let base_dir = dirs::home_dir()
            .ok_or_else(|| AdmitrError::Storage("cannot determine home directory".to_string()))?
            .join(".admitr")
            .join(&project_hash);

        Self::open_at(&base_dir)
    }

    /// Open or create the store at the specified directory.
    ///
    /// Useful for testing with custom paths.
    pub fn open_at(base_dir: &Path) -> Result<Self> {
        fs::create_dir_all(base_dir)?;
        let db_path = base_dir.join("admitr.db");

        let db = Connection::open(&db_path)?;
        Self::init_schema(&db)?;

        Ok(Self { db: Mutex::new(db) })
    }

    /// In-memory database, handy for tests that don't need reopening.
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory()?;
        Self::init_schema(&db)?;
        Ok(Self { db: Mutex::new(db) })
    }

    fn init_schema(db: &Connection) -> Result<()> {
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                id TEXT PRIMARY KEY,
                record_type TEXT NOT NULL,
                stage_id TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                json_data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_records_stage ON records(stage_id);
            CREATE INDEX IF NOT EXISTS idx_records_type ON records(record_type);

            CREATE TABLE IF NOT EXISTS triggers (
                id TEXT PRIMARY KEY,
                stage_id TEXT NOT NULL,
                is_active INTEGER NOT NULL,
                order_index INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                json_data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_triggers_stage ON triggers(stage_id);

            CREATE TABLE IF NOT EXISTS transition_log (
                id TEXT PRIMARY KEY,
                record_id TEXT NOT NULL,
                from_stage_id TEXT NOT NULL,
                to_stage_id TEXT NOT NULL,
                trigger_id TEXT,
                trigger_type TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_log_record ON transition_log(record_id);

            CREATE TABLE IF NOT EXISTS documents (
                record_id TEXT NOT NULL,
                stage_id TEXT NOT NULL,
                document_type TEXT NOT NULL,
                mandatory INTEGER NOT NULL,
                status TEXT NOT NULL,
                PRIMARY KEY (record_id, stage_id, document_type)
            );

            CREATE TABLE IF NOT EXISTS payments (
                record_id TEXT NOT NULL,
                stage_id TEXT NOT NULL,
                status TEXT NOT NULL,
                PRIMARY KEY (record_id, stage_id)
            );

            CREATE TABLE IF NOT EXISTS form_requirements (
                record_id TEXT NOT NULL,
                stage_id TEXT NOT NULL,
                form_id TEXT NOT NULL,
                PRIMARY KEY (record_id, stage_id, form_id)
            );

            CREATE TABLE IF NOT EXISTS form_submissions (
                record_id TEXT NOT NULL,
                form_id TEXT NOT NULL,
                submitted_at INTEGER NOT NULL,
                PRIMARY KEY (record_id, form_id)
            );

            CREATE TABLE IF NOT EXISTS record_fields (
                record_id TEXT NOT NULL,
                field TEXT NOT NULL,
                value_json TEXT NOT NULL,
                PRIMARY KEY (record_id, field)
            );
            "#,
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|e| AdmitrError::Storage(e.to_string()))
    }

    fn write_record(db: &Connection, record: &Record) -> Result<()> {
        let json_data = serde_json::to_string(record)?;
        db.execute(
            r#"
            INSERT OR REPLACE INTO records
            (id, record_type, stage_id, created_at, updated_at, json_data)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.id,
                record.record_type.as_str(),
                record.stage_id,
                record.created_at,
                record.updated_at,
                json_data,
            ],
        )?;
        Ok(())
    }

    fn write_trigger(db: &Connection, trigger: &TransitionTrigger) -> Result<()> {
        let json_data = serde_json::to_string(trigger)?;
        db.execute(
            r#"
            INSERT OR REPLACE INTO triggers
            (id, stage_id, is_active, order_index, created_at, json_data)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                trigger.id,
                trigger.stage_id,
                trigger.is_active,
                trigger.order_index,
                trigger.created_at,
                json_data,
            ],
        )?;
        Ok(())
    }

    fn read_record(db: &Connection, id: &str) -> Result<Option<Record>> {
        let json: Option<String> = db
            .query_row("SELECT json_data FROM records WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn triggers_for_stage(
        db: &Connection,
        stage_id: &str,
        active_only: bool,
    ) -> Result<Vec<TransitionTrigger>> {
        let sql = if active_only {
            r#"
            SELECT json_data FROM triggers
            WHERE stage_id = ?1 AND is_active = 1
            ORDER BY order_index, created_at, id
            "#
        } else {
            r#"
            SELECT json_data FROM triggers
            WHERE stage_id = ?1
            ORDER BY order_index, created_at, id
            "#
        };
        let mut stmt = db.prepare(sql)?;
        let rows = stmt.query_map([stage_id], |row| {
            let json: String = row.get(0)?;
            Ok(json)
        })?;

        let mut triggers = Vec::new();
        for row in rows {
            let json = row?;
            triggers.push(serde_json::from_str(&json)?);
        }
        Ok(triggers)
    }

    //=== Collaborator fact writes (simulating document review, payments,
    //    form submission) ===

    /// Register or update a document requirement.
    pub fn set_document(
        &self,
        record_id: &str,
        stage_id: &str,
        document_type: &str,
        mandatory: bool,
        status: DocumentStatus,
    ) -> Result<()> {
        let db = self.lock()?;
        db.execute(
            r#"
            INSERT OR REPLACE INTO documents
            (record_id, stage_id, document_type, mandatory, status)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record_id,
                stage_id,
                document_type,
                mandatory,
                status_str(status)
            ],
        )?;
        Ok(())
    }

    /// Update the status of an already-registered document requirement.
    pub fn set_document_status(
        &self,
        record_id: &str,
        document_type: &str,
        status: DocumentStatus,
    ) -> Result<()> {
        let db = self.lock()?;
        let affected = db.execute(
            "UPDATE documents SET status = ?3 WHERE record_id = ?1 AND document_type = ?2",
            params![record_id, document_type, status_str(status)],
        )?;
        if affected == 0 {
            return Err(AdmitrError::Storage(format!(
                "no {} requirement registered for {}",
                document_type, record_id
            )));
        }
        Ok(())
    }

    pub fn set_payment(&self, record_id: &str, stage_id: &str, status: PaymentStatus) -> Result<()> {
        let db = self.lock()?;
        db.execute(
            r#"
            INSERT OR REPLACE INTO payments (record_id, stage_id, status)
            VALUES (?1, ?2, ?3)
            "#,
            params![record_id, stage_id, payment_str(status)],
        )?;
        Ok(())
    }

    pub fn require_form(&self, record_id: &str, stage_id: &str, form_id: &str) -> Result<()> {
        let db = self.lock()?;
        db.execute(
            r#"
            INSERT OR IGNORE INTO form_requirements (record_id, stage_id, form_id)
            VALUES (?1, ?2, ?3)
            "#,
            params![record_id, stage_id, form_id],
        )?;
        Ok(())
    }

    pub fn submit_form(&self, record_id: &str, form_id: &str) -> Result<()> {
        let db = self.lock()?;
        db.execute(
            r#"
            INSERT OR REPLACE INTO form_submissions (record_id, form_id, submitted_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![record_id, form_id, now_ms()],
        )?;
        Ok(())
    }

    pub fn set_field(&self, record_id: &str, field: &str, value: &Value) -> Result<()> {
        let db = self.lock()?;
        db.execute(
            r#"
            INSERT OR REPLACE INTO record_fields (record_id, field, value_json)
            VALUES (?1, ?2, ?3)
            "#,
            params![record_id, field, serde_json::to_string(value)?],
        )?;
        Ok(())
    }
}

impl RecordStore for SqliteStore {
    fn insert(&self, record: &Record) -> Result<()> {
        let db = self.lock()?;
        if Self::read_record(&db, &record.id)?.is_some() {
            return Err(AdmitrError::Storage(format!(
                "record {} already exists",
                record.id
            )));
        }
        Self::write_record(&db, record)
    }

    fn get(&self, id: &str) -> Result<Option<Record>> {
        let db = self.lock()?;
        Self::read_record(&db, id)
    }

    fn list(&self) -> Result<Vec<Record>> {
        let db = self.lock()?;
        let mut stmt =
            db.prepare("SELECT json_data FROM records ORDER BY created_at, id")?;
        let rows = stmt.query_map([], |row| {
            let json: String = row.get(0)?;
            Ok(json)
        })?;

        let mut records = Vec::new();
        for row in rows {
            let json = row?;
            records.push(serde_json::from_str(&json)?);
        }
        Ok(records)
    }

    fn update_stage(&self, id: &str, expected_stage: &str, new_stage: &str) -> Result<Record> {
        let db = self.lock()?;
        let mut record = Self::read_record(&db, id)?
            .ok_or_else(|| AdmitrError::RecordNotFound(id.to_string()))?;

        if record.stage_id != expected_stage {
            return Err(AdmitrError::StageMismatch {
                record_id: id.to_string(),
                expected: expected_stage.to_string(),
                actual: record.stage_id,
            });
        }

        record.stage_id = new_stage.to_string();
        record.substage_id = None;
        record.touch();
        let json_data = serde_json::to_string(&record)?;

        // Guarded write: only applies if nothing raced us since the read
        let affected = db.execute(
            r#"
            UPDATE records SET stage_id = ?3, updated_at = ?4, json_data = ?5
            WHERE id = ?1 AND stage_id = ?2
            "#,
            params![id, expected_stage, new_stage, record.updated_at, json_data],
        )?;

        if affected == 0 {
            let actual = Self::read_record(&db, id)?
                .map(|r| r.stage_id)
                .ok_or_else(|| AdmitrError::RecordNotFound(id.to_string()))?;
            return Err(AdmitrError::StageMismatch {
                record_id: id.to_string(),
                expected: expected_stage.to_string(),
                actual,
            });
        }

        Ok(record)
    }

    fn set_substage(&self, id: &str, substage: Option<&str>) -> Result<()> {
        let db = self.lock()?;
        let mut record = Self::read_record(&db, id)?
            .ok_or_else(|| AdmitrError::RecordNotFound(id.to_string()))?;
        record.substage_id = substage.map(|s| s.to_string());
        record.touch();
        Self::write_record(&db, &record)
    }
}

impl TriggerStore for SqliteStore {
    fn create(&self, trigger: &TransitionTrigger) -> Result<()> {
        let db = self.lock()?;
        let exists: Option<String> = db
            .query_row(
                "SELECT id FROM triggers WHERE id = ?1",
                [&trigger.id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(AdmitrError::Storage(format!(
                "trigger {} already exists",
                trigger.id
            )));
        }
        Self::write_trigger(&db, trigger)
    }

    fn find(&self, id: &str) -> Result<Option<TransitionTrigger>> {
        let db = self.lock()?;
        let json: Option<String> = db
            .query_row("SELECT json_data FROM triggers WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn update(&self, trigger: &TransitionTrigger) -> Result<()> {
        let db = self.lock()?;
        let exists: Option<String> = db
            .query_row(
                "SELECT id FROM triggers WHERE id = ?1",
                [&trigger.id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(AdmitrError::TriggerNotFound(trigger.id.clone()));
        }
        Self::write_trigger(&db, trigger)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let db = self.lock()?;
        let affected = db.execute("DELETE FROM triggers WHERE id = ?1", [id])?;
        if affected == 0 {
            return Err(AdmitrError::TriggerNotFound(id.to_string()));
        }
        Ok(())
    }

    fn set_active(&self, id: &str, active: bool) -> Result<()> {
        let db = self.lock()?;
        let json: Option<String> = db
            .query_row("SELECT json_data FROM triggers WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()?;
        let mut trigger: TransitionTrigger = match json {
            Some(json) => serde_json::from_str(&json)?,
            None => return Err(AdmitrError::TriggerNotFound(id.to_string())),
        };
        trigger.is_active = active;
        Self::write_trigger(&db, &trigger)
    }

    fn list_for_stage(&self, stage_id: &str) -> Result<Vec<TransitionTrigger>> {
        let db = self.lock()?;
        Self::triggers_for_stage(&db, stage_id, false)
    }

    fn list_active_for_stage(&self, stage_id: &str) -> Result<Vec<TransitionTrigger>> {
        let db = self.lock()?;
        Self::triggers_for_stage(&db, stage_id, true)
    }
}

impl TransitionLogStore for SqliteStore {
    fn append(&self, entry: &TransitionLog) -> Result<()> {
        let db = self.lock()?;
        db.execute(
            r#"
            INSERT INTO transition_log
            (id, record_id, from_stage_id, to_stage_id, trigger_id, trigger_type, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                entry.id,
                entry.record_id,
                entry.from_stage_id,
                entry.to_stage_id,
                entry.trigger_id,
                entry.trigger_type.as_str(),
                entry.created_at,
            ],
        )?;
        Ok(())
    }

    fn list_for_record(&self, record_id: &str) -> Result<Vec<TransitionLog>> {
        let db = self.lock()?;
        let mut stmt = db.prepare(
            r#"
            SELECT id, record_id, from_stage_id, to_stage_id, trigger_id, trigger_type, created_at
            FROM transition_log
            WHERE record_id = ?1
            ORDER BY created_at, id
            "#,
        )?;
        let rows = stmt.query_map([record_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, i64>(6)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, record_id, from_stage_id, to_stage_id, trigger_id, trigger_type, created_at) =
                row?;
            entries.push(TransitionLog {
                id,
                record_id,
                from_stage_id,
                to_stage_id,
                trigger_id,
                trigger_type: trigger_type
                    .parse()
                    .map_err(AdmitrError::Storage)?,
                created_at,
            });
        }
        Ok(entries)
    }
}

impl FactsReader for SqliteStore {
    fn document_requirements(
        &self,
        record_id: &str,
        stage_id: &str,
    ) -> Result<Vec<DocumentRequirement>> {
        let db = self.lock()?;
        let mut stmt = db.prepare(
            r#"
            SELECT document_type, mandatory, status FROM documents
            WHERE record_id = ?1 AND stage_id = ?2
            ORDER BY document_type
            "#,
        )?;
        let rows = stmt.query_map(params![record_id, stage_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, bool>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut requirements = Vec::new();
        for row in rows {
            let (document_type, mandatory, status) = row?;
            requirements.push(DocumentRequirement {
                document_type,
                mandatory,
                status: status.parse().map_err(AdmitrError::FactLookup)?,
            });
        }
        Ok(requirements)
    }

    fn document_status(
        &self,
        record_id: &str,
        document_type: &str,
    ) -> Result<Option<DocumentStatus>> {
        let db = self.lock()?;
        let status: Option<String> = db
            .query_row(
                "SELECT status FROM documents WHERE record_id = ?1 AND document_type = ?2",
                params![record_id, document_type],
                |row| row.get(0),
            )
            .optional()?;
        match status {
            Some(s) => Ok(Some(s.parse().map_err(AdmitrError::FactLookup)?)),
            None => Ok(None),
        }
    }

    fn payment_status(&self, record_id: &str, stage_id: &str) -> Result<Option<PaymentStatus>> {
        let db = self.lock()?;
        let status: Option<String> = db
            .query_row(
                "SELECT status FROM payments WHERE record_id = ?1 AND stage_id = ?2",
                params![record_id, stage_id],
                |row| row.get(0),
            )
            .optional()?;
        match status {
            Some(s) => Ok(Some(s.parse().map_err(AdmitrError::FactLookup)?)),
            None => Ok(None),
        }
    }

    fn required_forms(&self, record_id: &str, stage_id: &str) -> Result<Vec<String>> {
        let db = self.lock()?;
        let mut stmt = db.prepare(
            r#"
            SELECT form_id FROM form_requirements
            WHERE record_id = ?1 AND stage_id = ?2
            ORDER BY form_id
            "#,
        )?;
        let rows = stmt.query_map(params![record_id, stage_id], |row| row.get(0))?;

        let mut forms = Vec::new();
        for row in rows {
            forms.push(row?);
        }
        Ok(forms)
    }

    fn form_submitted(&self, record_id: &str, form_id: &str) -> Result<bool> {
        let db = self.lock()?;
        let found: Option<i64> = db
            .query_row(
                "SELECT submitted_at FROM form_submissions WHERE record_id = ?1 AND form_id = ?2",
                params![record_id, form_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn record_field(&self, record_id: &str, field: &str) -> Result<Option<Value>> {
        let db = self.lock()?;
        let json: Option<String> = db
            .query_row(
                "SELECT value_json FROM record_fields WHERE record_id = ?1 AND field = ?2",
                params![record_id, field],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

fn status_str(status: DocumentStatus) -> &'static str {
    match status {
        DocumentStatus::Pending => "pending",
        DocumentStatus::Submitted => "submitted",
        DocumentStatus::Approved => "approved",
        DocumentStatus::Rejected => "rejected",
    }
}

fn payment_str(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "pending",
        PaymentStatus::Paid => "paid",
        PaymentStatus::Completed => "completed",
        PaymentStatus::Failed => "failed",
        PaymentStatus::Refunded => "refunded",
    }
}

/// Hash a project path into a short stable directory name.
pub fn compute_project_hash(project_dir: &Path) -> Result<String> {
    let canonical = project_dir.canonicalize()?;
    let path_str = canonical.to_string_lossy();
    let mut hasher = Sha256::new();
    hasher.update(path_str.as_bytes());
    let result = hasher.finalize();

    // Take first 16 chars of hex
    Ok(hex::encode(&result[..8]))
}
