//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - record: create/list/show records and the manual stage path
//! - trigger: manage per-stage transition triggers
//! - doc/payment/form/field: record requirement facts
//! - evaluate/advance/sweep: run the engine
//! - history: transition log display
//! - fields: condition field catalog

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// admitr - stage transition engine for admissions pipelines
#[derive(Parser, Debug)]
#[command(name = "admitr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage records (leads, applicants, students)
    Record {
        #[command(subcommand)]
        command: RecordCommands,
    },

    /// Manage per-stage transition triggers
    Trigger {
        #[command(subcommand)]
        command: TriggerCommands,
    },

    /// Record document requirement facts
    Doc {
        #[command(subcommand)]
        command: DocCommands,
    },

    /// Record payment facts
    Payment {
        #[command(subcommand)]
        command: PaymentCommands,
    },

    /// Record form facts
    Form {
        #[command(subcommand)]
        command: FormCommands,
    },

    /// Record field values and check field conditions
    Field {
        #[command(subcommand)]
        command: FieldCommands,
    },

    /// Evaluate stage completion for a record (no side effects)
    Evaluate {
        /// Record ID to evaluate
        record_id: String,
    },

    /// Evaluate and, on a match, execute the transition
    Advance {
        /// Record ID to advance
        record_id: String,

        /// Evaluate only, never execute
        #[arg(long)]
        dry_run: bool,
    },

    /// Evaluate every record once and execute any matches
    Sweep,

    /// Show the transition history for a record
    History {
        /// Record ID to show
        record_id: String,
    },

    /// List the condition field catalog
    Fields {
        /// Filter by entity (lead, applicant, student)
        #[arg(short, long)]
        entity: Option<String>,
    },
}

/// Record subcommands
#[derive(Subcommand, Debug)]
pub enum RecordCommands {
    /// Create a new record
    Add {
        /// Record type (lead, applicant, student)
        record_type: String,
        first_name: String,
        last_name: String,
        email: String,

        /// Program of interest
        #[arg(short, long)]
        program: Option<String>,

        /// Starting stage (defaults to the pipeline entry stage)
        #[arg(short, long)]
        stage: Option<String>,
    },

    /// List records
    List {
        /// Filter by stage
        #[arg(short, long)]
        stage: Option<String>,
    },

    /// Show one record
    Show {
        /// Record ID
        id: String,
    },

    /// Manually move a record to a stage (admin path)
    SetStage {
        /// Record ID
        id: String,

        /// Target stage
        stage: String,
    },
}

/// Trigger subcommands
#[derive(Subcommand, Debug)]
pub enum TriggerCommands {
    /// Add a trigger to a stage
    Add {
        /// Stage the trigger belongs to
        stage: String,

        /// Trigger type (all_documents_approved, specific_document_approved,
        /// payment_received, form_submitted, all_requirements_completed,
        /// manual_approval)
        trigger_type: String,

        /// Target stage (defaults to the next stage for stage-completion
        /// types)
        #[arg(short, long)]
        target: Option<String>,

        /// Document type for specific_document_approved (repeatable)
        #[arg(short, long)]
        document: Vec<String>,

        /// Form ID for form_submitted
        #[arg(short, long)]
        form: Option<String>,

        /// Evaluation order within the stage
        #[arg(short, long, default_value_t = 0)]
        order: u32,

        /// Notify the student on transition
        #[arg(long)]
        notify_student: bool,

        /// Notify admins on transition
        #[arg(long)]
        notify_admin: bool,
    },

    /// List triggers for a stage
    List {
        /// Stage to list
        stage: String,
    },

    /// Activate a trigger
    Enable {
        /// Trigger ID
        id: String,
    },

    /// Deactivate a trigger
    Disable {
        /// Trigger ID
        id: String,
    },

    /// Delete a trigger
    Remove {
        /// Trigger ID
        id: String,
    },
}

/// Document fact subcommands
#[derive(Subcommand, Debug)]
pub enum DocCommands {
    /// Register a document requirement for a record at a stage
    Require {
        record_id: String,
        stage: String,
        document_type: String,

        /// Mark the document optional (mandatory by default)
        #[arg(long)]
        optional: bool,
    },

    /// Set a document's review status
    SetStatus {
        record_id: String,
        document_type: String,

        /// pending, submitted, approved, rejected
        status: String,
    },

    /// Shorthand for set-status approved
    Approve {
        record_id: String,
        document_type: String,
    },
}

/// Payment fact subcommands
#[derive(Subcommand, Debug)]
pub enum PaymentCommands {
    /// Set the payment status for a record's stage fee
    Set {
        record_id: String,

        /// pending, paid, completed, failed, refunded
        status: String,

        /// Stage the fee belongs to (defaults to the record's current
        /// stage)
        #[arg(short, long)]
        stage: Option<String>,
    },
}

/// Form fact subcommands
#[derive(Subcommand, Debug)]
pub enum FormCommands {
    /// Register a required form for a record at a stage
    Require {
        record_id: String,
        stage: String,
        form_id: String,
    },

    /// Record a form submission
    Submit {
        record_id: String,
        form_id: String,
    },
}

/// Field subcommands
#[derive(Subcommand, Debug)]
pub enum FieldCommands {
    /// Set a record field value (JSON or plain string)
    Set {
        record_id: String,
        field: String,
        value: String,
    },

    /// Evaluate a field condition against a record
    Check {
        record_id: String,
        field: String,

        /// Operator (equals, contains, greater_than, ...)
        operator: String,

        /// Expected value (JSON or plain string)
        value: String,
    },
}
