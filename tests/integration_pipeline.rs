//! End-to-end pipeline integration tests
//!
//! Exercises the evaluator, orchestrator, and executor against the
//! SQLite store, with the store's fact tables standing in for the
//! collaborator subsystems.

use admitr::domain::facts::{DocumentStatus, PaymentStatus};
use admitr::domain::pipeline::Pipeline;
use admitr::domain::record::{Record, RecordType};
use admitr::domain::trigger::{TransitionTrigger, TriggerCondition, TriggerType};
use admitr::engine::{TransitionExecutor, TransitionOrchestrator};
use admitr::error::Result;
use admitr::storage::{RecordStore, SqliteStore, TransitionLogStore, TriggerStore};
use tempfile::TempDir;

fn open_store() -> (SqliteStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = SqliteStore::open_at(temp_dir.path()).unwrap();
    (store, temp_dir)
}

fn applicant_at(store: &SqliteStore, stage: &str) -> Record {
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

/// Scenario: three mandatory documents, all approved, one trigger.
#[test]
fn test_all_documents_approved_fires() -> Result<()> {
    let (store, _temp) = open_store();
    let pipeline = Pipeline::default_admissions();
    let record = applicant_at(&store, "send_documents");

    for doc in ["passport", "transcript", "reference_letter"] {
        store.set_document(&record.id, "send_documents", doc, true, DocumentStatus::Approved)?;
    }
    let trigger = TransitionTrigger::new("send_documents", TriggerCondition::AllDocumentsApproved)
        .with_target("document_approval");
    store.create(&trigger)?;

    let orchestrator = TransitionOrchestrator::new(&store, &store, &store, &pipeline);
    let evaluation = orchestrator.evaluate_stage_completion(&record.id, "send_documents")?;

    assert!(evaluation.should_transition);
    assert_eq!(evaluation.next_stage_id.as_deref(), Some("document_approval"));
    assert_eq!(evaluation.trigger_type, Some(TriggerType::AllDocumentsApproved));

    Ok(())
}

/// Scenario: one of three mandatory documents still pending.
#[test]
fn test_pending_document_blocks() -> Result<()> {
    let (store, _temp) = open_store();
    let pipeline = Pipeline::default_admissions();
    let record = applicant_at(&store, "send_documents");

    store.set_document(&record.id, "send_documents", "passport", true, DocumentStatus::Approved)?;
    store.set_document(&record.id, "send_documents", "transcript", true, DocumentStatus::Approved)?;
    store.set_document(&record.id, "send_documents", "visa", true, DocumentStatus::Pending)?;

    let trigger = TransitionTrigger::new("send_documents", TriggerCondition::AllDocumentsApproved)
        .with_target("document_approval");
    store.create(&trigger)?;

    let orchestrator = TransitionOrchestrator::new(&store, &store, &store, &pipeline);
    let evaluation = orchestrator.evaluate_stage_completion(&record.id, "send_documents")?;
    assert!(!evaluation.should_transition);

    // Approving the last document flips the evaluation
    store.set_document_status(&record.id, "visa", DocumentStatus::Approved)?;
    let evaluation = orchestrator.evaluate_stage_completion(&record.id, "send_documents")?;
    assert!(evaluation.should_transition);

    Ok(())
}

/// Scenario: payment received moves the record and appends one log row.
#[test]
fn test_payment_received_transition_end_to_end() -> Result<()> {
    let (store, _temp) = open_store();
    let pipeline = Pipeline::default_admissions();
    let record = applicant_at(&store, "fee_payment");

    let trigger = TransitionTrigger::new("fee_payment", TriggerCondition::PaymentReceived)
        .with_target("accepted")
        .with_notifications(true, true);
    store.create(&trigger)?;
    store.set_payment(&record.id, "fee_payment", PaymentStatus::Paid)?;

    let orchestrator = TransitionOrchestrator::new(&store, &store, &store, &pipeline);
    let evaluation = orchestrator.evaluate_stage_completion(&record.id, "fee_payment")?;
    assert!(evaluation.should_transition);

    let executor = TransitionExecutor::new(&store, &store);
    let outcome = executor.execute_transition(
        &record.id,
        "fee_payment",
        evaluation.next_stage_id.as_deref().unwrap(),
        Some(&trigger),
    )?;

    assert_eq!(outcome.record.stage_id, "accepted");
    assert!(outcome.notification.notify_student);
    assert!(outcome.notification.notify_admin);

    let stored = store.get(&record.id)?.unwrap();
    assert_eq!(stored.stage_id, "accepted");

    let entries = store.list_for_record(&record.id)?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].trigger_type, TriggerType::PaymentReceived);
    assert_eq!(entries[0].trigger_id, Some(trigger.id.clone()));

    Ok(())
}

/// Scenario: inactive trigger A is ignored, active trigger B matches.
#[test]
fn test_inactive_trigger_skipped_active_selected() -> Result<()> {
    let (store, _temp) = open_store();
    let pipeline = Pipeline::default_admissions();
    let record = applicant_at(&store, "application");

    let inactive = TransitionTrigger::new(
        "application",
        TriggerCondition::SpecificDocumentApproved {
            document_types: vec!["passport".to_string()],
        },
    )
    .with_order(0)
    .with_target("send_documents")
    .inactive();
    let active = TransitionTrigger::new("application", TriggerCondition::AllRequirementsCompleted)
        .with_order(1);
    store.create(&inactive)?;
    store.create(&active)?;

    // Even the inactive trigger's condition being satisfiable is
    // irrelevant: it never reaches the evaluator
    store.set_document(&record.id, "application", "passport", true, DocumentStatus::Approved)?;

    let orchestrator = TransitionOrchestrator::new(&store, &store, &store, &pipeline);
    let evaluation = orchestrator.evaluate_stage_completion(&record.id, "application")?;

    assert!(evaluation.should_transition);
    assert_eq!(evaluation.trigger_id.as_deref(), Some(active.id.as_str()));
    assert_eq!(
        evaluation.trigger_type,
        Some(TriggerType::AllRequirementsCompleted)
    );
    // Implicit target: the stage after "application"
    assert_eq!(evaluation.next_stage_id.as_deref(), Some("send_documents"));

    Ok(())
}

/// Scenario: concurrent move, stale execute must be rejected.
#[test]
fn test_stale_transition_rejected() -> Result<()> {
    let (store, _temp) = open_store();
    let record = applicant_at(&store, "fee_payment");

    let executor = TransitionExecutor::new(&store, &store);

    // A concurrent path already moved the record
    executor.execute_manual(&record.id, "fee_payment", "accepted")?;

    let err = executor
        .execute_manual(&record.id, "fee_payment", "accepted")
        .unwrap_err();
    assert!(err.is_stage_mismatch());

    // Only the first transition is logged
    assert_eq!(store.list_for_record(&record.id)?.len(), 1);

    Ok(())
}

#[test]
fn test_zero_triggers_never_transitions() -> Result<()> {
    let (store, _temp) = open_store();
    let pipeline = Pipeline::default_admissions();
    let record = applicant_at(&store, "qualification");

    let orchestrator = TransitionOrchestrator::new(&store, &store, &store, &pipeline);
    for _ in 0..3 {
        let evaluation = orchestrator.evaluate_stage_completion(&record.id, "qualification")?;
        assert!(!evaluation.should_transition);
    }

    Ok(())
}

#[test]
fn test_vacuous_truth_no_mandatory_documents() -> Result<()> {
    let (store, _temp) = open_store();
    let pipeline = Pipeline::default_admissions();
    let record = applicant_at(&store, "send_documents");

    // Only an optional document registered
    store.set_document(&record.id, "send_documents", "portfolio", false, DocumentStatus::Pending)?;
    let trigger =
        TransitionTrigger::new("send_documents", TriggerCondition::AllDocumentsApproved);
    store.create(&trigger)?;

    let orchestrator = TransitionOrchestrator::new(&store, &store, &store, &pipeline);
    let evaluation = orchestrator.evaluate_stage_completion(&record.id, "send_documents")?;
    assert!(evaluation.should_transition);

    Ok(())
}

#[test]
fn test_first_match_determinism() -> Result<()> {
    let (store, _temp) = open_store();
    let pipeline = Pipeline::default_admissions();
    let record = applicant_at(&store, "send_documents");

    let low = TransitionTrigger::new("send_documents", TriggerCondition::AllDocumentsApproved)
        .with_order(1)
        .with_target("document_approval");
    let high = TransitionTrigger::new("send_documents", TriggerCondition::AllRequirementsCompleted)
        .with_order(9)
        .with_target("fee_payment");
    store.create(&high)?;
    store.create(&low)?;

    let orchestrator = TransitionOrchestrator::new(&store, &store, &store, &pipeline);
    for _ in 0..10 {
        let evaluation = orchestrator.evaluate_stage_completion(&record.id, "send_documents")?;
        assert_eq!(evaluation.trigger_id.as_deref(), Some(low.id.as_str()));
        assert_eq!(evaluation.next_stage_id.as_deref(), Some("document_approval"));
    }

    Ok(())
}

/// Evaluation is pure: repeated evaluation without execution changes
/// nothing.
#[test]
fn test_evaluate_without_execute_is_side_effect_free() -> Result<()> {
    let (store, _temp) = open_store();
    let pipeline = Pipeline::default_admissions();
    let record = applicant_at(&store, "send_documents");

    let trigger =
        TransitionTrigger::new("send_documents", TriggerCondition::AllDocumentsApproved);
    store.create(&trigger)?;

    let orchestrator = TransitionOrchestrator::new(&store, &store, &store, &pipeline);
    for _ in 0..5 {
        let evaluation = orchestrator.evaluate_stage_completion(&record.id, "send_documents")?;
        assert!(evaluation.should_transition);
    }

    let stored = store.get(&record.id)?.unwrap();
    assert_eq!(stored.stage_id, "send_documents");
    assert!(store.list_for_record(&record.id)?.is_empty());

    Ok(())
}

/// Walk a record through the whole pipeline and audit every hop.
#[test]
fn test_full_pipeline_walk_logs_every_hop() -> Result<()> {
    let (store, _temp) = open_store();
    let pipeline = Pipeline::default_admissions();
    let record = applicant_at(&store, "new_inquiry");

    let executor = TransitionExecutor::new(&store, &store);
    let stages: Vec<String> = pipeline.stages().iter().map(|s| s.id.clone()).collect();
    for pair in stages.windows(2) {
        executor.execute_manual(&record.id, &pair[0], &pair[1])?;
    }

    let stored = store.get(&record.id)?.unwrap();
    assert_eq!(stored.stage_id, "enrollment");

    let entries = store.list_for_record(&record.id)?;
    assert_eq!(entries.len(), stages.len() - 1);
    for (entry, pair) in entries.iter().zip(stages.windows(2)) {
        assert_eq!(entry.from_stage_id, pair[0]);
        assert_eq!(entry.to_stage_id, pair[1]);
        assert!(entry.is_manual());
    }

    Ok(())
}

/// Requirement-driven progression: documents then payment, each change
/// followed by an evaluate+execute round, the way callers are expected
/// to drive the engine.
#[test]
fn test_requirement_driven_progression() -> Result<()> {
    let (store, _temp) = open_store();
    let pipeline = Pipeline::default_admissions();
    let record = applicant_at(&store, "send_documents");

    store.create(
        &TransitionTrigger::new("send_documents", TriggerCondition::AllDocumentsApproved)
            .with_target("document_approval"),
    )?;
    store.create(
        &TransitionTrigger::new(
            "document_approval",
            TriggerCondition::SpecificDocumentApproved {
                document_types: vec!["visa".to_string()],
            },
        )
        .with_target("fee_payment"),
    )?;
    store.create(
        &TransitionTrigger::new("fee_payment", TriggerCondition::PaymentReceived)
            .with_target("accepted"),
    )?;

    store.set_document(&record.id, "send_documents", "passport", true, DocumentStatus::Pending)?;

    let orchestrator = TransitionOrchestrator::new(&store, &store, &store, &pipeline);
    let executor = TransitionExecutor::new(&store, &store);

    let advance_if_ready = |record_id: &str| -> Result<Option<String>> {
        let current = store.get(record_id)?.unwrap();
        let evaluation = orchestrator.evaluate_stage_completion(record_id, &current.stage_id)?;
        if !evaluation.should_transition {
            return Ok(None);
        }
        let next = evaluation.next_stage_id.clone().unwrap();
        let trigger = match evaluation.trigger_id.as_deref() {
            Some(id) => store.find(id)?,
            None => None,
        };
        executor.execute_transition(record_id, &current.stage_id, &next, trigger.as_ref())?;
        Ok(Some(next))
    };

    // Nothing approved yet
    assert_eq!(advance_if_ready(&record.id)?, None);

    // Passport approved -> send_documents completes
    store.set_document_status(&record.id, "passport", DocumentStatus::Approved)?;
    assert_eq!(
        advance_if_ready(&record.id)?.as_deref(),
        Some("document_approval")
    );

    // Visa requirement appears at the new stage, approval moves it on
    store.set_document(&record.id, "document_approval", "visa", true, DocumentStatus::Approved)?;
    assert_eq!(advance_if_ready(&record.id)?.as_deref(), Some("fee_payment"));

    // Failed payment doesn't move it, settled payment does
    store.set_payment(&record.id, "fee_payment", PaymentStatus::Failed)?;
    assert_eq!(advance_if_ready(&record.id)?, None);
    store.set_payment(&record.id, "fee_payment", PaymentStatus::Paid)?;
    assert_eq!(advance_if_ready(&record.id)?.as_deref(), Some("accepted"));

    // Three automatic transitions, three log rows, correct attribution
    let entries = store.list_for_record(&record.id)?;
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].trigger_type, TriggerType::AllDocumentsApproved);
    assert_eq!(entries[1].trigger_type, TriggerType::SpecificDocumentApproved);
    assert_eq!(entries[2].trigger_type, TriggerType::PaymentReceived);
    assert!(entries.iter().all(|e| e.trigger_id.is_some()));

    Ok(())
}

/// Manual transitions work regardless of automation state: a
/// manual_approval trigger never fires on its own, but the admin path
/// moves the record.
#[test]
fn test_manual_approval_stage() -> Result<()> {
    let (store, _temp) = open_store();
    let pipeline = Pipeline::default_admissions();
    let record = applicant_at(&store, "accepted");

    store.create(
        &TransitionTrigger::new("accepted", TriggerCondition::ManualApproval)
            .with_target("enrollment"),
    )?;

    let orchestrator = TransitionOrchestrator::new(&store, &store, &store, &pipeline);
    let evaluation = orchestrator.evaluate_stage_completion(&record.id, "accepted")?;
    assert!(!evaluation.should_transition);

    let executor = TransitionExecutor::new(&store, &store);
    let outcome = executor.execute_manual(&record.id, "accepted", "enrollment")?;
    assert_eq!(outcome.record.stage_id, "enrollment");

    let entries = store.list_for_record(&record.id)?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].trigger_type, TriggerType::ManualApproval);
    assert!(entries[0].trigger_id.is_none());

    Ok(())
}
