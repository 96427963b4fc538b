use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::{ActCreationReport, InventoryScheduler, SchedulerError};
use crate::calendar::{iso_week_of, sunday_of};
use crate::model::ActCandidate;

impl InventoryScheduler {
    /// Creates this week's pending act for every store that has a baker.
    ///
    /// Safe to re-run: stores that already have an act for the week keep it
    /// untouched, and only workers of newly inserted acts are notified.
    pub async fn run_act_creation(&self, now: DateTime<Utc>) -> Result<ActCreationReport, SchedulerError> {
        let week = iso_week_of(now.date_naive());
        let scheduled_date = sunday_of(week.week, week.year);
        info!(%week, %scheduled_date, "Creating weekly inventory acts");

        // The full list up front: a directory failure must not leave half the stores processed.
        let stores = self
            .stores
            .list_stores()
            .await
            .map_err(|e| SchedulerError::read("fetch stores", e))?;

        let mut report = ActCreationReport::new(week, scheduled_date, stores.len());
        if stores.is_empty() {
            warn!("No stores found");
            return Ok(report);
        }

        let mut candidates = Vec::with_capacity(stores.len());
        for store in stores {
            match self.resolve_responsible_worker(&store.id).await? {
                Some(worker_id) => candidates.push(ActCandidate {
                    store_id: store.id.clone(),
                    worker_id,
                    week,
                    scheduled_date,
                }),
                None => {
                    debug!(store = %store.name, "No baker assigned, skipping");
                    report.skipped_stores.push(store);
                }
            }
        }

        if candidates.is_empty() {
            warn!(%week, "No bakers assigned to any store");
            return Ok(report);
        }

        let attempted = candidates.len();
        let created = self
            .acts
            .upsert_acts(candidates)
            .await
            .map_err(|e| SchedulerError::write("insert inventory acts", e))?;
        report.already_scheduled = attempted.saturating_sub(created.len());

        let assigned: Vec<String> = {
            let mut seen = HashSet::new();
            created
                .iter()
                .filter(|act| seen.insert(act.worker_id.as_str()))
                .map(|act| act.worker_id.clone())
                .collect()
        };
        report.created = created;

        if !assigned.is_empty() {
            let lookup = self.workers.notification_recipients(&assigned).await;
            report.notifications = self
                .notify(
                    lookup,
                    "📋 Inventory count",
                    &format!("Run the warehouse inventory count for week {}", week),
                    json!({ "screen": "inventory-act" }),
                )
                .await;
        }

        info!(
            %week,
            created = report.created.len(),
            already_scheduled = report.already_scheduled,
            skipped = report.skipped_stores.len(),
            notified = report.notifications.sent,
            "Act creation finished"
        );
        Ok(report)
    }
}
