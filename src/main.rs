use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::{json, Value};

use aquaservice_lib::dashboard::{
    build_views, customer_due_breakdown, filter_views, overdue_count, status_summary,
    ActiveFilter, StatusFilter, ViewQuery,
};
use aquaservice_lib::dates::today;
use aquaservice_lib::db::DbError;
use aquaservice_lib::error::{ServiceError, ServiceFailure, ServiceResult};
use aquaservice_lib::notification::{LogNotifier, Notifier, Severity};
use aquaservice_lib::plans::{plan_views, today_plan_count};
use aquaservice_lib::services;
use aquaservice_lib::state::{default_config_path, load_config_from, AppState};
use aquaservice_lib::types::PlanStatus;

/// Track customers, service history and planned visits.
#[derive(Parser, Debug)]
#[command(name = "aquaservice", version)]
struct Cli {
    /// Config file to use instead of ~/.aquaservice/config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Customers ordered by urgency, with per-status totals.
    Dashboard {
        /// Case-insensitive match on name, phone or address.
        #[arg(long)]
        search: Option<String>,
        /// Include inactive customers.
        #[arg(long, conflicts_with = "inactive")]
        all: bool,
        /// Only inactive customers.
        #[arg(long)]
        inactive: bool,
        #[arg(long, value_enum, default_value_t = StatusArg::All)]
        status: StatusArg,
    },
    /// Count of active customers past their due date, and today's visits.
    Overdue,
    /// One customer with per-type schedule, history, snoozes and plans.
    Customer { id: String },
    /// Planned visits, optionally filtered by status.
    Plans {
        #[arg(long)]
        status: Option<PlanStatus>,
    },
    /// Write a JSON backup of every table.
    Export {
        /// Defaults to the configured backup directory.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Replace all data with the contents of a backup file.
    Import { file: PathBuf },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StatusArg {
    All,
    Overdue,
    DueSoon,
    Upcoming,
    OnTrack,
}

impl From<StatusArg> for StatusFilter {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::All => StatusFilter::All,
            StatusArg::Overdue => StatusFilter::Overdue,
            StatusArg::DueSoon => StatusFilter::DueSoon,
            StatusArg::Upcoming => StatusFilter::Upcoming,
            StatusArg::OnTrack => StatusFilter::OnTrack,
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> ServiceResult<Value> {
    serde_json::to_value(value).map_err(|e| ServiceError::Store(DbError::Encode(e)))
}

async fn run(state: &AppState, command: Command) -> ServiceResult<Value> {
    let rules = state.config.schedule_rules();
    let today = today();

    match command {
        Command::Dashboard {
            search,
            all,
            inactive,
            status,
        } => {
            let active = if all {
                ActiveFilter::All
            } else if inactive {
                ActiveFilter::InactiveOnly
            } else {
                ActiveFilter::ActiveOnly
            };
            let snapshot = state.db().load_snapshot()?;
            let views = build_views(&snapshot, &ViewQuery { search, active }, &rules, today);
            let summary = status_summary(&views);
            let views = filter_views(views, status.into());
            Ok(json!({
                "summary": to_json(&summary)?,
                "customers": to_json(&views)?,
            }))
        }
        Command::Overdue => {
            let snapshot = state.db().load_snapshot()?;
            Ok(json!({
                "overdue": overdue_count(&snapshot, &rules, today),
                "todayPlans": today_plan_count(&snapshot, today),
            }))
        }
        Command::Customer { id } => {
            let db = state.db();
            let snapshot = db.load_snapshot()?;
            let breakdown = customer_due_breakdown(&snapshot, &id, &rules, today)
                .ok_or_else(|| ServiceError::not_found("Customer", &id))?;
            Ok(json!({
                "customer": to_json(&breakdown)?,
                "history": to_json(&services::maintenance::maintenance_history(&db, &id)?)?,
                "snoozes": to_json(&services::reminders::snooze_history(&db, &id)?)?,
                "plans": to_json(&services::plans::customer_plans(&db, &id)?)?,
            }))
        }
        Command::Plans { status } => {
            let snapshot = state.db().load_snapshot()?;
            to_json(&plan_views(&snapshot, status, today))
        }
        Command::Export { dir } => {
            let dir = match dir {
                Some(dir) => dir,
                None => state
                    .backup_dir()
                    .map_err(|e| ServiceError::Io(e.to_string()))?,
            };
            let json = services::backup::export_json(&state.db())?;
            let path =
                services::backup::write_backup_json(state.notifier.as_ref(), json, &dir, today)
                    .await?;
            Ok(json!({ "path": path }))
        }
        Command::Import { file } => {
            let limits = state.config.import_limits();
            let text = services::backup::read_backup_file(&file, &limits)
                .await
                .inspect_err(|e| state.notifier.notify(&e.to_string(), Severity::Error))?;
            let summary = services::backup::import_backup_json(
                &state.db(),
                state.notifier.as_ref(),
                &text,
                &limits,
            )?;
            to_json(&summary)
        }
    }
}

fn print_failure(err: &ServiceError) {
    let failure = ServiceFailure::from(err);
    match serde_json::to_string_pretty(&failure) {
        Ok(text) => eprintln!("{}", text),
        Err(_) => eprintln!("{}", err),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => match default_config_path() {
            Ok(path) => path,
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::from(2);
            }
        },
    };
    let config = match load_config_from(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.as_str()),
    )
    .init();
    if !config_path.exists() {
        log::info!("No config at {}; using defaults", config_path.display());
    }

    let state = match AppState::open(config, Box::new(LogNotifier)) {
        Ok(state) => state,
        Err(e) => {
            print_failure(&ServiceError::Store(e));
            return ExitCode::FAILURE;
        }
    };

    match run(&state, cli.command).await {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(text) => {
                println!("{}", text);
                ExitCode::SUCCESS
            }
            Err(e) => {
                print_failure(&ServiceError::Store(DbError::Encode(e)));
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            print_failure(&e);
            ExitCode::FAILURE
        }
    }
}
