use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::info;

use super::{InventoryScheduler, OverdueSweepReport, SchedulerError};
use crate::calendar::{iso_week_of, previous_week};
use crate::model::SUPERVISORY_ROLES;
use crate::notify::NotificationOutcome;

impl InventoryScheduler {
    /// Closes last week: its pending acts become overdue and supervisors are
    /// told how many stores missed the count.
    ///
    /// Only pending acts of that one week are touched, so a second run is a no-op.
    pub async fn run_overdue_sweep(&self, now: DateTime<Utc>) -> Result<OverdueSweepReport, SchedulerError> {
        let current = iso_week_of(now.date_naive());
        let week = previous_week(current);
        info!(%current, target = %week, "Sweeping overdue inventory acts");

        let overdue = self
            .acts
            .mark_overdue(week)
            .await
            .map_err(|e| SchedulerError::write("mark overdue", e))?;

        let notifications = if overdue.is_empty() {
            NotificationOutcome::default()
        } else {
            let lookup = self.workers.list_workers_by_roles(&SUPERVISORY_ROLES).await;
            self.notify(
                lookup,
                "⚠️ Overdue inventory acts",
                &format!(
                    "{} store(s) did not submit the inventory count for week {}",
                    overdue.len(),
                    week
                ),
                json!({ "screen": "inventory" }),
            )
            .await
        };

        info!(%week, overdue = overdue.len(), notified = notifications.sent, "Overdue sweep finished");
        Ok(OverdueSweepReport { week, overdue, notifications })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ActStore, FailPoint, InMemoryBackend};
    use crate::calendar::IsoWeek;
    use crate::model::{ActCandidate, ActStatus};
    use crate::notify::RecordingDispatcher;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn candidate(store_id: &str, week: IsoWeek) -> ActCandidate {
        ActCandidate {
            store_id: store_id.to_string(),
            worker_id: "baker".to_string(),
            week,
            scheduled_date: week.sunday(),
        }
    }

    fn monday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_year_boundary_targets_week_53() {
        let backend = Arc::new(InMemoryBackend::new());
        let notifier = Arc::new(RecordingDispatcher::new());
        let scheduler = InventoryScheduler::from_backend(backend.clone(), notifier.clone());
        backend
            .upsert_acts(vec![candidate("s1", IsoWeek::new(53, 2026)), candidate("s2", IsoWeek::new(52, 2026))])
            .await
            .unwrap();

        // Monday 2027-01-04 opens week 1 of 2027; 2026 has 53 ISO weeks.
        let monday = Utc.with_ymd_and_hms(2027, 1, 4, 0, 0, 0).unwrap();
        let report = scheduler.run_overdue_sweep(monday).await.unwrap();

        assert_eq!(report.week, IsoWeek::new(53, 2026));
        assert_eq!(report.overdue.len(), 1);
        assert_eq!(report.overdue[0].store_id, "s1");

        let statuses: Vec<_> = backend.acts().await.iter().map(|a| a.status).collect();
        assert_eq!(statuses, vec![ActStatus::Overdue, ActStatus::Pending]);
    }

    #[tokio::test]
    async fn test_nothing_overdue_sends_nothing() {
        let backend = Arc::new(InMemoryBackend::new());
        let notifier = Arc::new(RecordingDispatcher::new());
        let scheduler = InventoryScheduler::from_backend(backend.clone(), notifier.clone());
        backend.add_worker("Olga", "owner", Some("ExponentPushToken[o]")).await;

        let report = scheduler.run_overdue_sweep(monday()).await.unwrap();
        assert_eq!(report.week, IsoWeek::new(42, 2026));
        assert!(report.overdue.is_empty());
        assert!(notifier.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_failure_skips_notification() {
        let backend = Arc::new(InMemoryBackend::new());
        let notifier = Arc::new(RecordingDispatcher::new());
        let scheduler = InventoryScheduler::from_backend(backend.clone(), notifier.clone());
        backend.fail(FailPoint::MarkOverdue, true);

        let err = scheduler.run_overdue_sweep(monday()).await.unwrap_err();
        assert!(matches!(err, SchedulerError::UpstreamWrite { .. }));
        assert!(notifier.calls().await.is_empty());
        assert_eq!(backend.reads(), 0);
    }
}
