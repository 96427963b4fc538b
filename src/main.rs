//! Bakery Inventory Scheduler
//! 
//! Usage:
//!   bakery_scheduler run [create|mark_overdue|progress_reminder]
//!   bakery_scheduler serve
//!   bakery_scheduler cron
//!   bakery_scheduler init-db

use anyhow::{bail, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use bakery_scheduler::backend::SqliteBackend;
use bakery_scheduler::scheduler::{Directive, InventoryScheduler, Trigger};
use bakery_scheduler::server::{run_server, AppState};
use bakery_scheduler::utils::init_telemetry;
use bakery_scheduler::{cron, SchedulerConfig};

const USAGE: &str = "\
Usage: bakery_scheduler <command>

Commands:
  run [ACTION]   Run one job now. ACTION is create, mark_overdue or
                 progress_reminder; without it the weekly job is inferred
                 from today's weekday (Sunday: create, Monday: mark_overdue).
  serve          Serve the HTTP trigger on BAKERY_BIND_ADDR.
  cron           Run the weekly jobs and reminders on their cron schedules.
  init-db        Create the SQLite schema at BAKERY_DB_PATH.";

// ──────────────────────────────────────────────────────────────────────────────
// MAIN ENTRY POINT
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let config = SchedulerConfig::from_env()?;
    let _telemetry = init_telemetry("bakery_scheduler", config.otlp)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("run");

    match command {
        "run" => run_once(&config, args.get(1).map(String::as_str)).await,
        "serve" => {
            let scheduler = build_scheduler(&config).await?;
            run_server(AppState::new(scheduler), &config.bind_addr).await
        }
        "cron" => {
            let scheduler = build_scheduler(&config).await?;
            let mut sched = cron::start_cron(scheduler, &config).await?;
            tokio::signal::ctrl_c().await?;
            info!("Shutting down cron runner");
            sched.shutdown().await?;
            Ok(())
        }
        "init-db" => {
            let db = SqliteBackend::new(&config.db_path).await?;
            println!("✅ Schema ready at {}", db.path().display());
            Ok(())
        }
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => bail!("unknown command '{}'\n\n{}", other, USAGE),
    }
}

async fn build_scheduler(config: &SchedulerConfig) -> Result<Arc<InventoryScheduler>> {
    let backend = Arc::new(SqliteBackend::new(&config.db_path).await?);
    Ok(Arc::new(InventoryScheduler::from_backend(backend, config.dispatcher())))
}

async fn run_once(config: &SchedulerConfig, action: Option<&str>) -> Result<()> {
    let scheduler = build_scheduler(config).await?;
    let now = Utc::now();

    let output = match action {
        Some("progress_reminder") => serde_json::to_value(scheduler.run_progress_reminder(now).await?)?,
        Some(action) => {
            let directive: Directive = action.parse()?;
            serde_json::to_value(scheduler.dispatch(Trigger::at(now).with_directive(directive)).await?)?
        }
        None => serde_json::to_value(scheduler.dispatch(Trigger::at(now)).await?)?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
