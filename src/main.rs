use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::{info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

mod cli;

use admitr::config::Config;
use admitr::domain::pipeline::Pipeline;
use admitr::domain::record::{Record, RecordType};
use admitr::domain::trigger::{TransitionTrigger, TriggerCondition, TriggerType};
use admitr::engine::{
    ConditionEvaluator, LogNotificationSink, NotificationSink, NullNotificationSink,
    StageEvaluation, TransitionExecutor, TransitionOrchestrator,
};
use admitr::registry::{ConditionFieldRegistry, FieldCondition, Operator};
use admitr::storage::{RecordStore, SqliteStore, TransitionLogStore, TriggerStore};
use cli::Cli;
use cli::commands::{
    Commands, DocCommands, FieldCommands, FormCommands, PaymentCommands, RecordCommands,
    TriggerCommands,
};

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("admitr")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("admitr.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn open_store(config: &Config) -> Result<SqliteStore> {
    let store = match &config.storage.data_dir {
        Some(dir) => SqliteStore::open_at(dir)?,
        None => SqliteStore::open(&std::env::current_dir()?)?,
    };
    Ok(store)
}

/// Parse a CLI value as JSON, falling back to a plain string.
fn parse_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

fn require_record(store: &SqliteStore, id: &str) -> Result<Record> {
    store
        .get(id)?
        .ok_or_else(|| eyre::eyre!("record {} not found", id))
}

fn require_stage(pipeline: &Pipeline, stage_id: &str) -> Result<()> {
    if pipeline.contains(stage_id) {
        return Ok(());
    }
    let known: Vec<&str> = pipeline.stages().iter().map(|s| s.id.as_str()).collect();
    Err(eyre::eyre!(
        "unknown stage {} (pipeline stages: {})",
        stage_id,
        known.join(", ")
    ))
}

fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    let store = open_store(config)?;
    let pipeline = config.pipeline();

    match &cli.command {
        None => show_overview(&store, &pipeline),
        Some(Commands::Record { command }) => {
            handle_record_command(command, &store, &pipeline)
        }
        Some(Commands::Trigger { command }) => {
            handle_trigger_command(command, &store, &pipeline)
        }
        Some(Commands::Doc { command }) => handle_doc_command(command, &store, &pipeline),
        Some(Commands::Payment { command }) => handle_payment_command(command, &store),
        Some(Commands::Form { command }) => handle_form_command(command, &store, &pipeline),
        Some(Commands::Field { command }) => handle_field_command(command, &store),
        Some(Commands::Evaluate { record_id }) => {
            handle_evaluate_command(record_id, &store, &pipeline)
        }
        Some(Commands::Advance { record_id, dry_run }) => {
            handle_advance_command(record_id, *dry_run, &store, &pipeline, config)
        }
        Some(Commands::Sweep) => handle_sweep_command(&store, &pipeline, config),
        Some(Commands::History { record_id }) => handle_history_command(record_id, &store),
        Some(Commands::Fields { entity }) => handle_fields_command(entity.as_deref()),
    }
}

fn show_overview(store: &SqliteStore, pipeline: &Pipeline) -> Result<()> {
    let records = store.list()?;
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in &records {
        *counts.entry(record.stage_id.as_str()).or_insert(0) += 1;
    }

    println!("{} ({} records)", "Pipeline".bold(), records.len());
    for stage in pipeline.stages() {
        let count = counts.get(stage.id.as_str()).copied().unwrap_or(0);
        println!("  {:<20} {}", stage.id, count.to_string().cyan());
    }
    Ok(())
}

fn handle_record_command(
    command: &RecordCommands,
    store: &SqliteStore,
    pipeline: &Pipeline,
) -> Result<()> {
    match command {
        RecordCommands::Add {
            record_type,
            first_name,
            last_name,
            email,
            program,
            stage,
        } => {
            let record_type: RecordType = record_type.parse().map_err(|e: String| eyre::eyre!(e))?;
            let stage_id = match stage {
                Some(s) => {
                    require_stage(pipeline, s)?;
                    s.clone()
                }
                None => pipeline
                    .first()
                    .ok_or_else(|| eyre::eyre!("pipeline has no stages"))?
                    .id
                    .clone(),
            };

            let mut record = Record::new(record_type, first_name, last_name, email, &stage_id);
            if let Some(program) = program {
                record = record.with_program(program);
            }
            store.insert(&record)?;

            info!("Created record {} at stage {}", record.id, record.stage_id);
            println!(
                "{} {} ({}) at {}",
                "Created:".green(),
                record.id,
                record.full_name(),
                record.stage_id
            );
        }
        RecordCommands::List { stage } => {
            let records = store.list()?;
            for record in records
                .iter()
                .filter(|r| stage.as_ref().is_none_or(|s| &r.stage_id == s))
            {
                println!(
                    "{}  {:<10} {:<20} {}",
                    record.id,
                    record.record_type,
                    record.stage_id,
                    record.full_name()
                );
            }
        }
        RecordCommands::Show { id } => {
            let record = require_record(store, id)?;
            println!("{}        {}", "Record:".bold(), record.id);
            println!("  type     {}", record.record_type);
            println!("  name     {}", record.full_name());
            println!("  email    {}", record.email);
            if let Some(program) = &record.program {
                println!("  program  {}", program);
            }
            println!("  stage    {}", record.stage_id.cyan());
            if let Some(substage) = &record.substage_id {
                println!("  substage {}", substage);
            }
        }
        RecordCommands::SetStage { id, stage } => {
            require_stage(pipeline, stage)?;
            let record = require_record(store, id)?;

            let executor = TransitionExecutor::new(store, store);
            let outcome = executor.execute_manual(id, &record.stage_id, stage)?;

            println!(
                "{} {} {} -> {}",
                "Moved:".green(),
                id,
                outcome.from_stage_id,
                outcome.to_stage_id
            );
            if let admitr::engine::AuditWrite::Failed(reason) = &outcome.audit {
                println!("{} audit log append failed: {}", "Warning:".yellow(), reason);
            }
        }
    }
    Ok(())
}

fn handle_trigger_command(
    command: &TriggerCommands,
    store: &SqliteStore,
    pipeline: &Pipeline,
) -> Result<()> {
    match command {
        TriggerCommands::Add {
            stage,
            trigger_type,
            target,
            document,
            form,
            order,
            notify_student,
            notify_admin,
        } => {
            require_stage(pipeline, stage)?;
            let trigger_type: TriggerType =
                trigger_type.parse().map_err(|e: String| eyre::eyre!(e))?;

            let condition = match trigger_type {
                TriggerType::AllDocumentsApproved => TriggerCondition::AllDocumentsApproved,
                TriggerType::SpecificDocumentApproved => {
                    if document.is_empty() {
                        return Err(eyre::eyre!(
                            "specific_document_approved needs at least one --document"
                        ));
                    }
                    TriggerCondition::SpecificDocumentApproved {
                        document_types: document.clone(),
                    }
                }
                TriggerType::PaymentReceived => TriggerCondition::PaymentReceived,
                TriggerType::FormSubmitted => TriggerCondition::FormSubmitted {
                    form_id: form
                        .clone()
                        .ok_or_else(|| eyre::eyre!("form_submitted needs --form"))?,
                },
                TriggerType::AllRequirementsCompleted => {
                    TriggerCondition::AllRequirementsCompleted
                }
                TriggerType::ManualApproval => TriggerCondition::ManualApproval,
            };

            if let Some(target) = target {
                require_stage(pipeline, target)?;
            } else if !trigger_type.has_implicit_target() {
                return Err(eyre::eyre!(
                    "{} has no implicit target stage, pass --target",
                    trigger_type
                ));
            }

            let mut trigger = TransitionTrigger::new(stage, condition)
                .with_order(*order)
                .with_notifications(*notify_student, *notify_admin);
            if let Some(target) = target {
                trigger = trigger.with_target(target);
            }
            store.create(&trigger)?;

            info!("Created trigger {} on stage {}", trigger.id, stage);
            println!("{} {} ({})", "Created:".green(), trigger.id, trigger_type);
        }
        TriggerCommands::List { stage } => {
            for trigger in store.list_for_stage(stage)? {
                let state = if trigger.is_active {
                    "active".green()
                } else {
                    "inactive".red()
                };
                let target = trigger
                    .target_stage_id
                    .as_deref()
                    .unwrap_or("(next stage)");
                println!(
                    "{}  [{}] {:<28} -> {:<20} order {}",
                    trigger.id,
                    state,
                    trigger.trigger_type().to_string(),
                    target,
                    trigger.order_index
                );
            }
        }
        TriggerCommands::Enable { id } => {
            store.set_active(id, true)?;
            println!("{} {}", "Enabled:".green(), id);
        }
        TriggerCommands::Disable { id } => {
            store.set_active(id, false)?;
            println!("{} {}", "Disabled:".yellow(), id);
        }
        TriggerCommands::Remove { id } => {
            store.delete(id)?;
            println!("{} {}", "Removed:".red(), id);
        }
    }
    Ok(())
}

fn handle_doc_command(
    command: &DocCommands,
    store: &SqliteStore,
    pipeline: &Pipeline,
) -> Result<()> {
    match command {
        DocCommands::Require {
            record_id,
            stage,
            document_type,
            optional,
        } => {
            require_stage(pipeline, stage)?;
            require_record(store, record_id)?;
            store.set_document(
                record_id,
                stage,
                document_type,
                !optional,
                admitr::domain::facts::DocumentStatus::Pending,
            )?;
            println!(
                "{} {} requires {} at {}",
                "Registered:".green(),
                record_id,
                document_type,
                stage
            );
        }
        DocCommands::SetStatus {
            record_id,
            document_type,
            status,
        } => {
            let status = status.parse().map_err(|e: String| eyre::eyre!(e))?;
            store.set_document_status(record_id, document_type, status)?;
            println!("{} {} {:?}", "Updated:".green(), document_type, status);
        }
        DocCommands::Approve {
            record_id,
            document_type,
        } => {
            store.set_document_status(
                record_id,
                document_type,
                admitr::domain::facts::DocumentStatus::Approved,
            )?;
            println!("{} {}", "Approved:".green(), document_type);
        }
    }
    Ok(())
}

fn handle_payment_command(command: &PaymentCommands, store: &SqliteStore) -> Result<()> {
    match command {
        PaymentCommands::Set {
            record_id,
            status,
            stage,
        } => {
            let record = require_record(store, record_id)?;
            let stage_id = stage.clone().unwrap_or(record.stage_id);
            let status = status.parse().map_err(|e: String| eyre::eyre!(e))?;
            store.set_payment(record_id, &stage_id, status)?;
            println!(
                "{} {} payment at {} is {:?}",
                "Updated:".green(),
                record_id,
                stage_id,
                status
            );
        }
    }
    Ok(())
}

fn handle_form_command(
    command: &FormCommands,
    store: &SqliteStore,
    pipeline: &Pipeline,
) -> Result<()> {
    match command {
        FormCommands::Require {
            record_id,
            stage,
            form_id,
        } => {
            require_stage(pipeline, stage)?;
            require_record(store, record_id)?;
            store.require_form(record_id, stage, form_id)?;
            println!(
                "{} {} requires form {} at {}",
                "Registered:".green(),
                record_id,
                form_id,
                stage
            );
        }
        FormCommands::Submit { record_id, form_id } => {
            store.submit_form(record_id, form_id)?;
            println!("{} {} submitted {}", "Recorded:".green(), record_id, form_id);
        }
    }
    Ok(())
}

fn handle_field_command(command: &FieldCommands, store: &SqliteStore) -> Result<()> {
    match command {
        FieldCommands::Set {
            record_id,
            field,
            value,
        } => {
            require_record(store, record_id)?;
            store.set_field(record_id, field, &parse_value(value))?;
            println!("{} {}.{} = {}", "Set:".green(), record_id, field, value);
        }
        FieldCommands::Check {
            record_id,
            field,
            operator,
            value,
        } => {
            let operator: Operator = operator.parse().map_err(|e: String| eyre::eyre!(e))?;
            let condition = FieldCondition::new(field, operator, parse_value(value));

            let evaluator = ConditionEvaluator::new(store);
            let satisfied = evaluator.evaluate_field_condition(record_id, &condition)?;
            if satisfied {
                println!("{}", "satisfied".green());
            } else {
                println!("{}", "not satisfied".red());
            }
        }
    }
    Ok(())
}

fn handle_evaluate_command(
    record_id: &str,
    store: &SqliteStore,
    pipeline: &Pipeline,
) -> Result<()> {
    let record = require_record(store, record_id)?;

    let orchestrator = TransitionOrchestrator::new(store, store, store, pipeline);
    let evaluation = orchestrator.evaluate_stage_completion(record_id, &record.stage_id)?;

    print_evaluation(&record, &evaluation);
    Ok(())
}

fn print_evaluation(record: &Record, evaluation: &StageEvaluation) {
    if evaluation.should_transition {
        println!(
            "{} {} -> {} (trigger {} / {})",
            "Transition:".green(),
            record.stage_id,
            evaluation.next_stage_id.as_deref().unwrap_or("?"),
            evaluation.trigger_id.as_deref().unwrap_or("?"),
            evaluation
                .trigger_type
                .map(|t| t.to_string())
                .unwrap_or_default()
        );
    } else {
        println!(
            "{} no trigger matched, {} stays at {}",
            "No transition:".yellow(),
            record.id,
            record.stage_id
        );
    }
}

fn handle_advance_command(
    record_id: &str,
    dry_run: bool,
    store: &SqliteStore,
    pipeline: &Pipeline,
    config: &Config,
) -> Result<()> {
    let record = require_record(store, record_id)?;

    let orchestrator = TransitionOrchestrator::new(store, store, store, pipeline);
    let evaluation = orchestrator.evaluate_stage_completion(record_id, &record.stage_id)?;
    print_evaluation(&record, &evaluation);

    if !evaluation.should_transition || dry_run {
        return Ok(());
    }

    let Some(next_stage_id) = evaluation.next_stage_id.as_deref() else {
        return Err(eyre::eyre!("evaluation carried no target stage"));
    };
    let trigger = match evaluation.trigger_id.as_deref() {
        Some(trigger_id) => store.find(trigger_id)?,
        None => None,
    };

    let log_sink = LogNotificationSink;
    let null_sink = NullNotificationSink;
    let sink: &dyn NotificationSink = if config.notifications.enabled {
        &log_sink
    } else {
        &null_sink
    };

    let executor = TransitionExecutor::new(store, store).with_sink(sink);
    let outcome =
        executor.execute_transition(record_id, &record.stage_id, next_stage_id, trigger.as_ref())?;

    println!(
        "{} {} {} -> {}",
        "Advanced:".green(),
        record_id,
        outcome.from_stage_id,
        outcome.to_stage_id
    );
    if let admitr::engine::AuditWrite::Failed(reason) = &outcome.audit {
        println!("{} audit log append failed: {}", "Warning:".yellow(), reason);
    }
    Ok(())
}

fn handle_sweep_command(store: &SqliteStore, pipeline: &Pipeline, config: &Config) -> Result<()> {
    let records = store.list()?;
    let orchestrator = TransitionOrchestrator::new(store, store, store, pipeline);

    let log_sink = LogNotificationSink;
    let null_sink = NullNotificationSink;
    let sink: &dyn NotificationSink = if config.notifications.enabled {
        &log_sink
    } else {
        &null_sink
    };
    let executor = TransitionExecutor::new(store, store).with_sink(sink);

    let mut advanced = 0usize;
    let mut failed = 0usize;
    for record in &records {
        let evaluation = match orchestrator.evaluate_stage_completion(&record.id, &record.stage_id)
        {
            Ok(evaluation) => evaluation,
            Err(e) => {
                warn!("sweep: evaluation failed for {}: {}", record.id, e);
                failed += 1;
                continue;
            }
        };

        if !evaluation.should_transition {
            continue;
        }
        let Some(next_stage_id) = evaluation.next_stage_id.as_deref() else {
            continue;
        };
        let trigger = match evaluation.trigger_id.as_deref() {
            Some(trigger_id) => store.find(trigger_id)?,
            None => None,
        };

        match executor.execute_transition(
            &record.id,
            &record.stage_id,
            next_stage_id,
            trigger.as_ref(),
        ) {
            Ok(outcome) => {
                println!(
                    "{} {} {} -> {}",
                    "Advanced:".green(),
                    record.id,
                    outcome.from_stage_id,
                    outcome.to_stage_id
                );
                advanced += 1;
            }
            Err(e) => {
                warn!("sweep: transition failed for {}: {}", record.id, e);
                println!("{} {}: {}", "Failed:".red(), record.id, e);
                failed += 1;
            }
        }
    }

    println!(
        "Swept {} records: {} advanced, {} failed",
        records.len(),
        advanced,
        failed
    );
    Ok(())
}

fn handle_history_command(record_id: &str, store: &SqliteStore) -> Result<()> {
    let entries = store.list_for_record(record_id)?;
    if entries.is_empty() {
        println!("No transitions for {}", record_id);
        return Ok(());
    }

    for entry in entries {
        let when = chrono::DateTime::from_timestamp_millis(entry.created_at)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| entry.created_at.to_string());
        let attribution = match &entry.trigger_id {
            Some(trigger_id) => format!("{} ({})", entry.trigger_type, trigger_id),
            None => "manual".to_string(),
        };
        println!(
            "{}  {} -> {}  {}",
            when.dimmed(),
            entry.from_stage_id,
            entry.to_stage_id.cyan(),
            attribution
        );
    }
    Ok(())
}

fn handle_fields_command(entity: Option<&str>) -> Result<()> {
    let registry = ConditionFieldRegistry::new();
    let entity = match entity {
        Some(raw) => Some(raw.parse::<RecordType>().map_err(|e| eyre::eyre!(e))?),
        None => None,
    };

    for field in registry.fields() {
        if let Some(entity) = entity
            && !field.applies_to(entity)
        {
            continue;
        }
        let operators: Vec<&str> = field.operators().iter().map(|o| o.as_str()).collect();
        println!(
            "{:<26} {:<8} {}",
            field.name.bold(),
            format!("{:?}", field.field_type).to_lowercase(),
            operators.join(", ").dimmed()
        );
        if !field.options.is_empty() {
            println!("{:<26} options: {}", "", field.options.join(", "));
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).context("Application failed")?;

    Ok(())
}
