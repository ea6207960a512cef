//! The transition engine: evaluator, orchestrator, executor.
//!
//! Evaluation and execution are deliberately decoupled: the orchestrator
//! only decides, the executor only applies. Callers evaluate after any
//! requirement fact changes and invoke the executor once per detected
//! trigger firing.

pub mod evaluator;
pub mod executor;
pub mod notify;
pub mod orchestrator;

pub use evaluator::ConditionEvaluator;
pub use executor::{AuditWrite, TransitionExecutor, TransitionOutcome};
pub use notify::{LogNotificationSink, NotificationSink, NullNotificationSink};
pub use orchestrator::{StageEvaluation, TransitionOrchestrator};
