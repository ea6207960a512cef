//! Record types — the entities moving through the admissions pipeline.
//!
//! A Record is a lead, applicant, or student. Its `stage_id` changes only
//! through the Transition Executor or the explicit manual path; nothing
//! else mutates it.

use crate::id::{generate_record_id, now_ms};
use serde::{Deserialize, Serialize};

use super::pipeline::DEFAULT_ENTRY_STAGE;

/// A lead, applicant, or student moving through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    /// Unique identifier ("rec-1738300800123-a1b2")
    pub id: String,

    /// What kind of record: Lead, Applicant, or Student
    pub record_type: RecordType,

    pub first_name: String,
    pub last_name: String,
    pub email: String,

    /// Program of interest (e.g. "msc-data-science"), if known
    pub program: Option<String>,

    /// Current pipeline stage
    pub stage_id: String,

    /// Fine-grained position within the stage, if any
    pub substage_id: Option<String>,

    /// Unix timestamp in milliseconds
    pub created_at: i64,

    /// Unix timestamp in milliseconds
    pub updated_at: i64,
}

/// The three kinds of records in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Lead,
    Applicant,
    Student,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Lead => "lead",
            RecordType::Applicant => "applicant",
            RecordType::Student => "student",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "lead" => Ok(RecordType::Lead),
            "applicant" => Ok(RecordType::Applicant),
            "student" => Ok(RecordType::Student),
            other => Err(format!("unknown record type: {}", other)),
        }
    }
}

impl Record {
    /// Create a new record at the given stage.
    pub fn new(
        record_type: RecordType,
        first_name: &str,
        last_name: &str,
        email: &str,
        stage_id: &str,
    ) -> Self {
        let now = now_ms();
        Self {
            id: generate_record_id(),
            record_type,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            program: None,
            stage_id: stage_id.to_string(),
            substage_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a new lead at the pipeline entry stage.
    pub fn new_lead(first_name: &str, last_name: &str, email: &str) -> Self {
        Self::new(
            RecordType::Lead,
            first_name,
            last_name,
            email,
            DEFAULT_ENTRY_STAGE,
        )
    }

    /// Set the program of interest.
    pub fn with_program(mut self, program: &str) -> Self {
        self.program = Some(program.to_string());
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Update the timestamp
    pub fn touch(&mut self) {
        self.updated_at = now_ms();
    }
}
