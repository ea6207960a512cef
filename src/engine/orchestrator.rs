//! Transition orchestrator.
//!
//! Entry point for "has this record finished this stage?". Pure
//! evaluation: runs the stage's active triggers through the evaluator in
//! contractual order and reports the first match. The caller separately
//! invokes the executor, so evaluation can be retried or polled without
//! changing state.

use tracing::{debug, warn};

use crate::domain::pipeline::Pipeline;
use crate::domain::trigger::{TransitionTrigger, TriggerType};
use crate::error::{AdmitrError, Result};
use crate::facts::FactsReader;
use crate::storage::traits::{RecordStore, TriggerStore};

use super::evaluator::ConditionEvaluator;

/// Result of a stage-completion evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct StageEvaluation {
    pub should_transition: bool,
    pub next_stage_id: Option<String>,
    pub trigger_id: Option<String>,
    pub trigger_type: Option<TriggerType>,
}

impl StageEvaluation {
    /// The record stays put. This is the expected common case, not an
    /// error.
    pub fn no_transition() -> Self {
        Self {
            should_transition: false,
            next_stage_id: None,
            trigger_id: None,
            trigger_type: None,
        }
    }

    /// A trigger matched and the record should move.
    pub fn transition(next_stage_id: &str, trigger: &TransitionTrigger) -> Self {
        Self {
            should_transition: true,
            next_stage_id: Some(next_stage_id.to_string()),
            trigger_id: Some(trigger.id.clone()),
            trigger_type: Some(trigger.trigger_type()),
        }
    }
}

/// Runs a stage's triggers and selects the first satisfied one.
pub struct TransitionOrchestrator<'a, R, T, F>
where
    R: RecordStore + ?Sized,
    T: TriggerStore + ?Sized,
    F: FactsReader + ?Sized,
{
    records: &'a R,
    triggers: &'a T,
    facts: &'a F,
    pipeline: &'a Pipeline,
}

impl<'a, R, T, F> TransitionOrchestrator<'a, R, T, F>
where
    R: RecordStore + ?Sized,
    T: TriggerStore + ?Sized,
    F: FactsReader + ?Sized,
{
    pub fn new(records: &'a R, triggers: &'a T, facts: &'a F, pipeline: &'a Pipeline) -> Self {
        Self {
            records,
            triggers,
            facts,
            pipeline,
        }
    }

    /// Evaluate stage completion for a record.
    ///
    /// First-match selection: triggers run in (`order_index`,
    /// `created_at`) order and the first satisfied one wins. Per-trigger
    /// failures (bad config, fact lookup errors) fail that trigger closed
    /// and the pass continues — one malformed trigger never aborts the
    /// whole evaluation.
    pub fn evaluate_stage_completion(
        &self,
        record_id: &str,
        stage_id: &str,
    ) -> Result<StageEvaluation> {
        let record = self
            .records
            .get(record_id)?
            .ok_or_else(|| AdmitrError::RecordNotFound(record_id.to_string()))?;

        // Evaluating against a stage the record is no longer in means the
        // caller holds stale state
        if record.stage_id != stage_id {
            return Err(AdmitrError::StageMismatch {
                record_id: record_id.to_string(),
                expected: stage_id.to_string(),
                actual: record.stage_id.clone(),
            });
        }

        let triggers = self.triggers.list_active_for_stage(stage_id)?;
        debug!(
            record_id,
            stage_id,
            trigger_count = triggers.len(),
            "evaluating stage completion"
        );

        let evaluator = ConditionEvaluator::new(self.facts);
        for trigger in &triggers {
            match evaluator.evaluate(&record, trigger) {
                Ok(true) => match self.resolve_target(trigger) {
                    Ok(next_stage_id) => {
                        debug!(
                            record_id,
                            trigger_id = %trigger.id,
                            next_stage_id = %next_stage_id,
                            "trigger matched"
                        );
                        return Ok(StageEvaluation::transition(&next_stage_id, trigger));
                    }
                    Err(e) => {
                        warn!(
                            trigger_id = %trigger.id,
                            stage_id,
                            error = %e,
                            "trigger matched but target resolution failed, failing closed"
                        );
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        trigger_id = %trigger.id,
                        record_id,
                        error = %e,
                        "trigger evaluation failed, treating as not met"
                    );
                }
            }
        }

        Ok(StageEvaluation::no_transition())
    }

    /// Resolve where a satisfied trigger sends the record: its configured
    /// target, or the pipeline's next stage for types with an implicit
    /// default. Anything else is a configuration error.
    fn resolve_target(&self, trigger: &TransitionTrigger) -> Result<String> {
        if let Some(target) = &trigger.target_stage_id {
            if self.pipeline.contains(target) {
                return Ok(target.clone());
            }
            return Err(AdmitrError::TriggerConfig(format!(
                "target stage {} is not in the pipeline",
                target
            )));
        }

        if trigger.trigger_type().has_implicit_target() {
            return self
                .pipeline
                .next_after(&trigger.stage_id)
                .map(|s| s.id.clone())
                .ok_or_else(|| {
                    AdmitrError::TriggerConfig(format!(
                        "no stage after {} for implicit target",
                        trigger.stage_id
                    ))
                });
        }

        Err(AdmitrError::TriggerConfig(format!(
            "trigger {} has no target stage and type {} has no implicit default",
            trigger.id,
            trigger.trigger_type()
        )))
    }
}
