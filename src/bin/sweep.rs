//! Daily maintenance entry point, meant to be run from cron once per day.
//!
//! Reschedules reviews missed yesterday, then prints one JSON line per user
//! with cards due on the sweep date for the notification dispatcher.

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Parser;
use review_scheduler::Scheduler;
use review_scheduler::config::Settings;
use review_scheduler::database::db::SqliteStore;
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "revision-sweep")]
#[command(about = "Reschedule missed reviews and list users to remind", long_about = None)]
struct Args {
    /// Settings file
    #[arg(long, env = "REVIEW_SETTINGS", default_value = "settings.toml")]
    config: PathBuf,

    /// Database file, overrides the settings file
    #[arg(long, env = "REVIEW_DATABASE")]
    database: Option<PathBuf>,

    /// Day to sweep for (YYYY-MM-DD), defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Skip printing reminder targets
    #[arg(long)]
    no_reminders: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "review_scheduler=info,revision_sweep=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let settings = Settings::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let database = args.database.unwrap_or(settings.database_path);
    let as_of = args.date.unwrap_or_else(|| Local::now().date_naive());

    let store = SqliteStore::open(&database, as_of)
        .with_context(|| format!("opening {}", database.display()))?;
    let scheduler = Scheduler::new(store.clone(), store);

    let report = scheduler.catch_up_sweep(as_of)?;
    for failure in &report.failures {
        warn!(
            user_id = failure.user_id,
            card_id = failure.card_id,
            reason = %failure.reason,
            "record left unscheduled"
        );
    }
    if !report.is_clean() {
        warn!(failures = report.failure_count(), "sweep finished with failures");
    }

    if args.no_reminders {
        return Ok(());
    }

    let targets = scheduler.reminder_targets(as_of)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for target in &targets {
        writeln!(out, "{}", serde_json::to_string(target)?)?;
    }
    info!(users = targets.len(), %as_of, "reminder targets written");

    Ok(())
}
