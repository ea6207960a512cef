//! Transition executor.
//!
//! Performs the actual stage change and makes it durable and auditable.
//! The stage write is a compare-and-swap against the expected from-stage,
//! so a record can never be transitioned out of a stale stage. The log
//! append is best-effort audit: if it fails after a successful stage
//! write, the stage change stands and the failure is surfaced for
//! operator follow-up instead of rolling back.

use tracing::{info, warn};

use crate::domain::notification::NotificationDecision;
use crate::domain::record::Record;
use crate::domain::transition_log::TransitionLog;
use crate::domain::trigger::TransitionTrigger;
use crate::error::Result;
use crate::storage::traits::{RecordStore, TransitionLogStore};

use super::notify::NotificationSink;

/// What happened to the audit log append.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditWrite {
    /// Exactly one log entry was appended.
    Logged(TransitionLog),
    /// The stage change stands but the log append failed; needs operator
    /// follow-up.
    Failed(String),
}

impl AuditWrite {
    pub fn is_logged(&self) -> bool {
        matches!(self, AuditWrite::Logged(_))
    }
}

/// Result of a successful transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    /// The record after the stage change
    pub record: Record,
    pub from_stage_id: String,
    pub to_stage_id: String,
    pub audit: AuditWrite,
    /// The decision handed to the messaging collaborator
    pub notification: NotificationDecision,
}

/// Applies transitions decided by the orchestrator (or by an admin).
pub struct TransitionExecutor<'a, R, L>
where
    R: RecordStore + ?Sized,
    L: TransitionLogStore + ?Sized,
{
    records: &'a R,
    log: &'a L,
    sink: Option<&'a dyn NotificationSink>,
}

impl<'a, R, L> TransitionExecutor<'a, R, L>
where
    R: RecordStore + ?Sized,
    L: TransitionLogStore + ?Sized,
{
    pub fn new(records: &'a R, log: &'a L) -> Self {
        Self {
            records,
            log,
            sink: None,
        }
    }

    /// Hand notification decisions to a sink after each transition.
    pub fn with_sink(mut self, sink: &'a dyn NotificationSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Execute a transition detected by the orchestrator.
    ///
    /// Not idempotent: callers invoke this once per detected trigger
    /// firing. A second invocation for the same logical transition fails
    /// the compare-and-swap (the record is no longer at `from_stage_id`)
    /// with a `StageMismatch` the caller can tell apart from storage
    /// failures.
    pub fn execute_transition(
        &self,
        record_id: &str,
        from_stage_id: &str,
        to_stage_id: &str,
        trigger: Option<&TransitionTrigger>,
    ) -> Result<TransitionOutcome> {
        // Stage write first; if it fails nothing is logged and the record
        // stays put, safe to retry
        let record = self
            .records
            .update_stage(record_id, from_stage_id, to_stage_id)?;

        let entry = match trigger {
            Some(t) => TransitionLog::automatic(record_id, from_stage_id, to_stage_id, t),
            None => TransitionLog::manual(record_id, from_stage_id, to_stage_id),
        };
        let summary = entry.summary();

        let audit = match self.log.append(&entry) {
            Ok(()) => AuditWrite::Logged(entry),
            Err(e) => {
                // The business-critical state change already succeeded;
                // surface the audit failure, don't roll back
                warn!(
                    record_id,
                    from_stage_id, to_stage_id,
                    error = %e,
                    "transition applied but audit log append failed"
                );
                AuditWrite::Failed(e.to_string())
            }
        };

        let notification = match trigger {
            Some(t) => NotificationDecision::from_trigger(t, record_id, &summary),
            None => NotificationDecision::none(record_id, &summary),
        };
        if notification.should_send()
            && let Some(sink) = self.sink
        {
            sink.notify(&notification);
        }

        info!(record_id, from_stage_id, to_stage_id, "record transitioned");

        Ok(TransitionOutcome {
            record,
            from_stage_id: from_stage_id.to_string(),
            to_stage_id: to_stage_id.to_string(),
            audit,
            notification,
        })
    }

    /// The manual/admin path: same compare-and-swap and log discipline,
    /// attributed to `manual_approval` with no trigger id.
    pub fn execute_manual(
        &self,
        record_id: &str,
        from_stage_id: &str,
        to_stage_id: &str,
    ) -> Result<TransitionOutcome> {
        self.execute_transition(record_id, from_stage_id, to_stage_id, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::{Record, RecordType};
    use crate::domain::transition_log::TransitionLog;
    use crate::domain::trigger::{TriggerCondition, TriggerType};
    use crate::error::AdmitrError;
    use crate::storage::memory::MemoryStore;
    use std::sync::Mutex;

    fn seed_record(store: &MemoryStore, stage: &str) -> Record {
        let record = Record::new(
            RecordType::Applicant,
            "Ada",
            "Lovelace",
            "ada@example.com",
            stage,
        );
        store.insert(&record).unwrap();
        record
    }

    #[test]
    fn test_execute_updates_stage_and_logs() {
        let store = MemoryStore::new();
        let record = seed_record(&store, "fee_payment");
        let trigger = TransitionTrigger::new("fee_payment", TriggerCondition::PaymentReceived)
            .with_target("accepted");

        let executor = TransitionExecutor::new(&store, &store);
        let outcome = executor
            .execute_transition(&record.id, "fee_payment", "accepted", Some(&trigger))
            .unwrap();

        assert_eq!(outcome.record.stage_id, "accepted");
        assert!(outcome.audit.is_logged());

        let stored = store.get(&record.id).unwrap().unwrap();
        assert_eq!(stored.stage_id, "accepted");

        let entries = store.list_for_record(&record.id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].from_stage_id, "fee_payment");
        assert_eq!(entries[0].to_stage_id, "accepted");
        assert_eq!(entries[0].trigger_id, Some(trigger.id.clone()));
        assert_eq!(entries[0].trigger_type, TriggerType::PaymentReceived);
    }

    #[test]
    fn test_stale_stage_rejected_and_nothing_logged() {
        let store = MemoryStore::new();
        let record = seed_record(&store, "accepted");

        let executor = TransitionExecutor::new(&store, &store);
        let err = executor
            .execute_transition(&record.id, "fee_payment", "accepted", None)
            .unwrap_err();

        assert!(err.is_stage_mismatch());
        match err {
            AdmitrError::StageMismatch {
                expected, actual, ..
            } => {
                assert_eq!(expected, "fee_payment");
                assert_eq!(actual, "accepted");
            }
            other => panic!("unexpected error: {other}"),
        }

        // Record untouched, log untouched
        let stored = store.get(&record.id).unwrap().unwrap();
        assert_eq!(stored.stage_id, "accepted");
        assert!(store.list_for_record(&record.id).unwrap().is_empty());
    }

    #[test]
    fn test_double_invoke_second_fails_cas() {
        let store = MemoryStore::new();
        let record = seed_record(&store, "fee_payment");

        let executor = TransitionExecutor::new(&store, &store);
        executor
            .execute_transition(&record.id, "fee_payment", "accepted", None)
            .unwrap();

        let err = executor
            .execute_transition(&record.id, "fee_payment", "accepted", None)
            .unwrap_err();
        assert!(err.is_stage_mismatch());

        // Exactly one log row from the one successful transition
        assert_eq!(store.list_for_record(&record.id).unwrap().len(), 1);
    }

    #[test]
    fn test_manual_transition_attribution() {
        let store = MemoryStore::new();
        let record = seed_record(&store, "fee_payment");

        let executor = TransitionExecutor::new(&store, &store);
        let outcome = executor
            .execute_manual(&record.id, "fee_payment", "accepted")
            .unwrap();

        match &outcome.audit {
            AuditWrite::Logged(entry) => {
                assert!(entry.trigger_id.is_none());
                assert_eq!(entry.trigger_type, TriggerType::ManualApproval);
            }
            AuditWrite::Failed(reason) => panic!("audit failed: {reason}"),
        }
        assert!(!outcome.notification.should_send());
    }

    #[test]
    fn test_notification_from_trigger_flags() {
        let store = MemoryStore::new();
        let record = seed_record(&store, "fee_payment");
        let trigger = TransitionTrigger::new("fee_payment", TriggerCondition::PaymentReceived)
            .with_target("accepted")
            .with_notifications(true, true);

        let executor = TransitionExecutor::new(&store, &store);
        let outcome = executor
            .execute_transition(&record.id, "fee_payment", "accepted", Some(&trigger))
            .unwrap();

        assert!(outcome.notification.notify_student);
        assert!(outcome.notification.notify_admin);
        assert_eq!(outcome.notification.record_id, record.id);
        assert!(
            outcome
                .notification
                .transition_summary
                .contains("fee_payment")
        );
    }

    #[test]
    fn test_sink_receives_decision() {
        #[derive(Default)]
        struct CapturingSink {
            seen: Mutex<Vec<NotificationDecision>>,
        }

        impl NotificationSink for CapturingSink {
            fn notify(&self, decision: &NotificationDecision) {
                self.seen.lock().unwrap().push(decision.clone());
            }
        }

        let store = MemoryStore::new();
        let record = seed_record(&store, "fee_payment");
        let trigger = TransitionTrigger::new("fee_payment", TriggerCondition::PaymentReceived)
            .with_target("accepted")
            .with_notifications(true, false);

        let sink = CapturingSink::default();
        let executor = TransitionExecutor::new(&store, &store).with_sink(&sink);
        executor
            .execute_transition(&record.id, "fee_payment", "accepted", Some(&trigger))
            .unwrap();

        let seen = sink.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].notify_student);
    }

    #[test]
    fn test_sink_skipped_when_nothing_to_send() {
        #[derive(Default)]
        struct CountingSink {
            count: Mutex<usize>,
        }

        impl NotificationSink for CountingSink {
            fn notify(&self, _: &NotificationDecision) {
                *self.count.lock().unwrap() += 1;
            }
        }

        let store = MemoryStore::new();
        let record = seed_record(&store, "fee_payment");

        let sink = CountingSink::default();
        let executor = TransitionExecutor::new(&store, &store).with_sink(&sink);
        executor
            .execute_manual(&record.id, "fee_payment", "accepted")
            .unwrap();

        assert_eq!(*sink.count.lock().unwrap(), 0);
    }

    #[test]
    fn test_log_failure_surfaces_but_stage_stands() {
        struct FailingLog;

        impl TransitionLogStore for FailingLog {
            fn append(&self, _: &TransitionLog) -> crate::error::Result<()> {
                Err(AdmitrError::Storage("disk full".to_string()))
            }
            fn list_for_record(&self, _: &str) -> crate::error::Result<Vec<TransitionLog>> {
                Ok(vec![])
            }
        }

        let store = MemoryStore::new();
        let record = seed_record(&store, "fee_payment");

        let log = FailingLog;
        let executor = TransitionExecutor::new(&store, &log);
        let outcome = executor
            .execute_manual(&record.id, "fee_payment", "accepted")
            .unwrap();

        // Stage change stands
        assert_eq!(outcome.record.stage_id, "accepted");
        let stored = store.get(&record.id).unwrap().unwrap();
        assert_eq!(stored.stage_id, "accepted");

        // Audit failure surfaced, not rolled back
        match outcome.audit {
            AuditWrite::Failed(reason) => assert!(reason.contains("disk full")),
            AuditWrite::Logged(_) => panic!("append should have failed"),
        }
    }

    #[test]
    fn test_n_transitions_n_log_rows() {
        let store = MemoryStore::new();
        let record = seed_record(&store, "send_documents");

        let executor = TransitionExecutor::new(&store, &store);
        executor
            .execute_manual(&record.id, "send_documents", "document_approval")
            .unwrap();
        executor
            .execute_manual(&record.id, "document_approval", "fee_payment")
            .unwrap();
        executor
            .execute_manual(&record.id, "fee_payment", "accepted")
            .unwrap();

        let entries = store.list_for_record(&record.id).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].from_stage_id, "send_documents");
        assert_eq!(entries[1].from_stage_id, "document_approval");
        assert_eq!(entries[2].from_stage_id, "fee_payment");
        assert_eq!(entries[2].to_stage_id, "accepted");
    }
}
