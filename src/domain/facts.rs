//! Requirement fact types.
//!
//! Facts are owned and mutated by collaborator subsystems (document
//! review, payment processing, form submission) and are read-only inputs
//! to the evaluation engine.

use serde::{Deserialize, Serialize};

/// Review status of a document requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Requested but not yet uploaded
    Pending,
    /// Uploaded, awaiting review
    Submitted,
    Approved,
    Rejected,
}

impl DocumentStatus {
    pub fn is_approved(&self) -> bool {
        matches!(self, DocumentStatus::Approved)
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DocumentStatus::Pending),
            "submitted" => Ok(DocumentStatus::Submitted),
            "approved" => Ok(DocumentStatus::Approved),
            "rejected" => Ok(DocumentStatus::Rejected),
            other => Err(format!("unknown document status: {}", other)),
        }
    }
}

/// One document requirement for a record at a stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRequirement {
    /// Document type ("passport", "transcript", "visa", ...)
    pub document_type: String,
    /// Whether this document gates stage completion
    pub mandatory: bool,
    pub status: DocumentStatus,
}

impl DocumentRequirement {
    pub fn new(document_type: &str, mandatory: bool, status: DocumentStatus) -> Self {
        Self {
            document_type: document_type.to_string(),
            mandatory,
            status,
        }
    }
}

/// Payment status for a record's stage fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Both "paid" and "completed" count as settled — upstream payment
    /// providers report either depending on capture mode.
    pub fn is_settled(&self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::Completed)
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(format!("unknown payment status: {}", other)),
        }
    }
}
