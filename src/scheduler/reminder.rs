use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::info;

use super::{InventoryScheduler, ProgressReminderReport, SchedulerError};

impl InventoryScheduler {
    /// Asks every worker on an open shift to report intermediate production.
    pub async fn run_progress_reminder(&self, now: DateTime<Utc>) -> Result<ProgressReminderReport, SchedulerError> {
        let recipients = self
            .shifts
            .open_shift_recipients()
            .await
            .map_err(|e| SchedulerError::read("fetch open shifts", e))?;

        let notifications = self
            .notify(
                Ok(recipients),
                "Production progress 📊",
                "Report how many kg of product are ready so far",
                json!({ "screen": "progress" }),
            )
            .await;

        info!(recipients = notifications.recipients, sent = notifications.sent, "Progress reminders sent");
        Ok(ProgressReminderReport { at: now, notifications })
    }
}
