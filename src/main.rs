//! ClientPulse CLI: runs the engine over a JSON snapshot of client records.
//!
//! Read-only commands print JSON. Writing commands run under the same guard
//! as the scheduled sweep and save the snapshot back in place.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use clientpulse_lib::analysis::analyze_client_by_id;
use clientpulse_lib::automation::run_automation;
use clientpulse_lib::db::{ClientStore, MemoryStore};
use clientpulse_lib::error::{EngineError, ErrorPayload};
use clientpulse_lib::helpers::{filter_clients, format_relative, sort_clients, SortKey};
use clientpulse_lib::hygiene::run_interaction_pruning;
use clientpulse_lib::portfolio::{activity_report, dashboard_stats, summarize_portfolio};
use clientpulse_lib::recategorize::run_recategorization;
use clientpulse_lib::scheduler::get_next_run_time;
use clientpulse_lib::signals::cadence::build_follow_up_queue_in;
use clientpulse_lib::signals::scoring::score_client;
use clientpulse_lib::state::{load_config, AppState};
use clientpulse_lib::types::{ClientStatus, EngineConfig, ExecutionTrigger, InteractionKind};

#[derive(Parser)]
#[command(name = "clientpulse", version)]
#[command(about = "Client scoring and follow-up over a JSON snapshot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Snapshot {
    /// JSON array of client records
    snapshot: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Score every client
    Score(Snapshot),

    /// Analysis for one client
    Analyze {
        #[command(flatten)]
        input: Snapshot,
        /// Client id
        id: String,
    },

    /// Clients due for contact, most overdue first
    #[command(name = "follow-up")]
    FollowUp(Snapshot),

    /// Portfolio summary with recommendations
    Summary(Snapshot),

    /// Activity report by recency bucket
    Report(Snapshot),

    /// Dashboard counts
    Stats(Snapshot),

    /// Search, filter and sort clients
    List {
        #[command(flatten)]
        input: Snapshot,
        /// Name or phone fragment
        #[arg(long, default_value = "")]
        search: String,
        /// Only this status (active, inactive, potential)
        #[arg(long)]
        status: Option<ClientStatus>,
        /// name, lastInteraction or createdAt
        #[arg(long, default_value = "name")]
        sort: SortKey,
    },

    /// Record an interaction with a client
    Log {
        #[command(flatten)]
        input: Snapshot,
        /// Client id
        id: String,
        /// What happened
        description: String,
        /// call, email, meeting or other
        #[arg(long, default_value = "call")]
        kind: InteractionKind,
    },

    /// Apply score-based status changes to all clients, or one
    Recategorize {
        #[command(flatten)]
        input: Snapshot,
        /// Only this client
        id: Option<String>,
    },

    /// Mark clients past the inactivity threshold as Inactive
    Sweep(Snapshot),

    /// Drop interactions older than the retention window
    Prune(Snapshot),

    /// Next scheduled sweep from the configured cron entry
    #[command(name = "next-run")]
    NextRun,

    /// Run the scheduled sweep until Ctrl-C
    Serve(Snapshot),
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<String, String> {
    let config = load_config()?;
    let now = Utc::now();

    match command {
        Command::Score(input) => {
            let records = open(&input)?.get_all().map_err(describe)?;
            let scores: Vec<_> = records
                .iter()
                .map(|r| json!({ "clientId": r.id, "result": score_client(r, now) }))
                .collect();
            Ok(to_json(&scores))
        }
        Command::Analyze { input, id } => {
            let records = open(&input)?.get_all().map_err(describe)?;
            let analysis = analyze_client_by_id(&records, &id, now).map_err(describe)?;
            Ok(to_json(&analysis))
        }
        Command::FollowUp(input) => {
            let records = open(&input)?.get_all().map_err(describe)?;
            let tz: Tz = config
                .contact_timezone
                .parse()
                .map_err(|_| format!("Invalid timezone: {}", config.contact_timezone))?;
            Ok(to_json(&build_follow_up_queue_in(&records, now, &tz)))
        }
        Command::Summary(input) => {
            let records = open(&input)?.get_all().map_err(describe)?;
            Ok(to_json(&summarize_portfolio(&records, now)))
        }
        Command::Report(input) => {
            let records = open(&input)?.get_all().map_err(describe)?;
            Ok(to_json(&activity_report(&records, now)))
        }
        Command::Stats(input) => {
            let records = open(&input)?.get_all().map_err(describe)?;
            Ok(to_json(&dashboard_stats(&records, now)))
        }
        Command::List {
            input,
            search,
            status,
            sort,
        } => {
            let records = open(&input)?.get_all().map_err(describe)?;
            let matched: Vec<_> = filter_clients(&records, &search, status)
                .into_iter()
                .cloned()
                .collect();
            let rows: Vec<_> = sort_clients(&matched, sort)
                .iter()
                .map(|r| {
                    json!({
                        "id": r.id,
                        "name": r.name,
                        "phone": r.phone,
                        "status": r.status,
                        "lastInteraction": format_relative(r.last_interaction_at, now),
                    })
                })
                .collect();
            Ok(to_json(&rows))
        }
        Command::Log {
            input,
            id,
            description,
            kind,
        } => {
            let store = open(&input)?;
            let interaction = store
                .add_interaction(&id, &description, kind, now)
                .map_err(describe)?;
            store.persist().map_err(describe)?;
            Ok(to_json(&interaction))
        }
        Command::Recategorize { input, id } => {
            let state = shared_state(config, open(&input)?);
            let outcome = run_recategorization(&state, id.as_deref(), now).map_err(describe)?;
            Ok(to_json(&outcome))
        }
        Command::Sweep(input) => {
            let state = shared_state(config, open(&input)?);
            let sweep = run_automation(&state, ExecutionTrigger::Manual, now).map_err(describe)?;
            Ok(to_json(&sweep))
        }
        Command::Prune(input) => {
            let state = shared_state(config, open(&input)?);
            let report = run_interaction_pruning(&state, now).map_err(describe)?;
            Ok(to_json(&report))
        }
        Command::NextRun => {
            let entry = &config.automation;
            let next = get_next_run_time(entry, now).map_err(describe)?;
            Ok(to_json(&json!({
                "enabled": entry.enabled,
                "cron": entry.cron,
                "timezone": entry.timezone,
                "nextRun": next,
            })))
        }
        Command::Serve(input) => serve(config, open(&input)?).map(|_| String::new()),
    }
}

/// Runs until Ctrl-C. Every sweep persists the snapshot as it finishes.
fn serve(config: EngineConfig, store: MemoryStore) -> Result<(), String> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start runtime: {}", e))?;

    match get_next_run_time(&config.automation, Utc::now()) {
        Ok(next) if config.automation.enabled => log::info!("Next sweep at {}", next),
        Ok(_) => log::warn!("Automation is disabled in config; nothing will run"),
        Err(e) => return Err(describe(e)),
    }

    let state = Arc::new(shared_state(config, store));

    runtime.block_on(async {
        clientpulse_lib::spawn_automation(state.clone());
        log::info!("Automation scheduler running; press Ctrl-C to stop");
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| format!("Failed to wait for Ctrl-C: {}", e))
    })?;

    state.store.persist().map_err(describe)?;
    log::info!(
        "Stopped after {} runs",
        state.get_execution_history(usize::MAX).len()
    );
    Ok(())
}

fn open(input: &Snapshot) -> Result<MemoryStore, String> {
    MemoryStore::load_snapshot(&input.snapshot).map_err(describe)
}

fn shared_state(config: EngineConfig, store: MemoryStore) -> AppState {
    AppState::new(config, Arc::new(store))
}

/// Error message followed by what the user can do about it.
fn describe(err: EngineError) -> String {
    let payload = ErrorPayload::from(&err);
    format!("{}\n  {}", payload.message, payload.recovery_suggestion)
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize output: {}\"}}", e))
}
