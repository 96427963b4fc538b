//! Cron Runner
//! 
//! In-process replacement for an external trigger: the weekly jobs and the
//! progress reminder on UTC cron schedules. Failed runs are logged and the
//! next occurrence fires as usual.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::config::SchedulerConfig;
use crate::scheduler::{Directive, InventoryScheduler, Trigger};

fn weekly_job(schedule: &str, scheduler: Arc<InventoryScheduler>, directive: Directive) -> Result<Job> {
    Job::new_async(schedule, move |_id, _lock| {
        let scheduler = scheduler.clone();
        Box::pin(async move {
            match scheduler.dispatch(Trigger::at(Utc::now()).with_directive(directive)).await {
                Ok(outcome) => {
                    let notified = outcome.report.notifications();
                    if let Some(lookup_error) = &notified.lookup_error {
                        warn!(action = %outcome.action, "Recipients unavailable: {}", lookup_error);
                    }
                    info!(action = %outcome.action, sent = notified.sent, failed = notified.failed, "{}", outcome.message)
                }
                Err(e) => error!(action = %directive, "Scheduled run failed: {}", e),
            }
        })
    })
    .with_context(|| format!("invalid cron schedule '{}' for {}", schedule, directive))
}

fn reminder_job(schedule: &str, scheduler: Arc<InventoryScheduler>) -> Result<Job> {
    Job::new_async(schedule, move |_id, _lock| {
        let scheduler = scheduler.clone();
        Box::pin(async move {
            match scheduler.run_progress_reminder(Utc::now()).await {
                Ok(report) => info!("{}", report.message()),
                Err(e) => error!("Progress reminder failed: {}", e),
            }
        })
    })
    .with_context(|| format!("invalid cron schedule '{}' for progress reminder", schedule))
}

/// Registers all jobs and starts ticking. Keep the returned scheduler alive.
pub async fn start_cron(scheduler: Arc<InventoryScheduler>, config: &SchedulerConfig) -> Result<JobScheduler> {
    let sched = JobScheduler::new().await?;
    sched.add(weekly_job(&config.create_cron, scheduler.clone(), Directive::Create)?).await?;
    sched.add(weekly_job(&config.overdue_cron, scheduler.clone(), Directive::MarkOverdue)?).await?;
    sched.add(reminder_job(&config.reminder_cron, scheduler)?).await?;
    sched.start().await?;

    info!(
        create = %config.create_cron,
        mark_overdue = %config.overdue_cron,
        reminder = %config.reminder_cron,
        "Cron schedules registered"
    );
    Ok(sched)
}
