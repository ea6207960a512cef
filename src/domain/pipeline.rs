//! Pipeline and stage definitions.
//!
//! A pipeline is an ordered, named set of stages. Stage order is explicit
//! (`order_index`) so transition targets and implicit "next stage"
//! resolution never depend on incidental storage order.

use serde::{Deserialize, Serialize};

/// Stage a new record enters the default pipeline at.
pub const DEFAULT_ENTRY_STAGE: &str = "new_inquiry";

/// A single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stage {
    /// Stable identifier ("send_documents")
    pub id: String,
    /// Human-readable name ("Send Documents")
    pub name: String,
    /// Position in the pipeline, 0-based
    pub order_index: u32,
}

impl Stage {
    pub fn new(id: &str, name: &str, order_index: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            order_index,
        }
    }
}

/// An ordered set of stages records move through.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Create a pipeline from a list of stages. Stages are sorted by
    /// `order_index` so callers can pass them in any order.
    pub fn new(mut stages: Vec<Stage>) -> Self {
        stages.sort_by_key(|s| s.order_index);
        Self { stages }
    }

    /// The default admissions pipeline.
    pub fn default_admissions() -> Self {
        Self::new(vec![
            Stage::new("new_inquiry", "New Inquiry", 0),
            Stage::new("qualification", "Qualification", 1),
            Stage::new("application", "Application", 2),
            Stage::new("send_documents", "Send Documents", 3),
            Stage::new("document_approval", "Document Approval", 4),
            Stage::new("fee_payment", "Fee Payment", 5),
            Stage::new("accepted", "Accepted", 6),
            Stage::new("enrollment", "Enrollment", 7),
        ])
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self, id: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.stage(id).is_some()
    }

    /// The stage immediately after `id` in pipeline order, if any.
    pub fn next_after(&self, id: &str) -> Option<&Stage> {
        let pos = self.stages.iter().position(|s| s.id == id)?;
        self.stages.get(pos + 1)
    }

    /// First stage of the pipeline (where new records enter).
    pub fn first(&self) -> Option<&Stage> {
        self.stages.first()
    }

    /// Last stage of the pipeline.
    pub fn last(&self) -> Option<&Stage> {
        self.stages.last()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::default_admissions()
    }
}
