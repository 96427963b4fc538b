//! Weekly Inventory Scheduler
//! 
//! Sunday: one pending inventory act per store, assigned to its baker.
//! Monday: last week's still-pending acts become overdue and supervisors hear
//! about it. Every entry point takes `now` explicitly.

mod creation;
mod dispatch;
mod error;
mod overdue;
mod reminder;
mod report;
mod resolver;

pub use dispatch::{select_job, Directive, Trigger, TriggerOutcome};
pub use error::SchedulerError;
pub use report::{ActCreationReport, JobReport, OverdueSweepReport, ProgressReminderReport};
pub use resolver::resolve_responsible_worker;

use anyhow::Result;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::backend::{ActStore, ShiftDirectory, StoreDirectory, WorkerDirectory};
use crate::model::Recipient;
use crate::notify::{build_messages, NotificationDispatcher, NotificationOutcome};

pub struct InventoryScheduler {
    stores: Arc<dyn StoreDirectory>,
    workers: Arc<dyn WorkerDirectory>,
    acts: Arc<dyn ActStore>,
    shifts: Arc<dyn ShiftDirectory>,
    notifier: Arc<dyn NotificationDispatcher>,
}

impl InventoryScheduler {
    pub fn new(
        stores: Arc<dyn StoreDirectory>,
        workers: Arc<dyn WorkerDirectory>,
        acts: Arc<dyn ActStore>,
        shifts: Arc<dyn ShiftDirectory>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self { stores, workers, acts, shifts, notifier }
    }

    /// Wires every collaborator to one backend.
    pub fn from_backend<B>(backend: Arc<B>, notifier: Arc<dyn NotificationDispatcher>) -> Self
    where
        B: StoreDirectory + WorkerDirectory + ActStore + ShiftDirectory + 'static,
    {
        Self {
            stores: backend.clone(),
            workers: backend.clone(),
            acts: backend.clone(),
            shifts: backend,
            notifier,
        }
    }

    /// Sends one message per distinct address. A failed recipient lookup is
    /// recorded, not raised.
    async fn notify(&self, lookup: Result<Vec<Recipient>>, title: &str, body: &str, data: Value) -> NotificationOutcome {
        let recipients = match lookup {
            Ok(recipients) => recipients,
            Err(e) => {
                warn!("Recipient lookup failed, skipping notifications: {:#}", e);
                return NotificationOutcome::lookup_failed(&e);
            }
        };

        let mut seen = HashSet::new();
        let recipients: Vec<Recipient> = recipients
            .into_iter()
            .filter(|r| seen.insert(r.notification_address.clone()))
            .collect();
        if recipients.is_empty() {
            debug!("No addressable recipients");
            return NotificationOutcome::default();
        }

        let messages = build_messages(&recipients, title, body, data);
        let outcome = self.notifier.send_batch(messages).await;
        if outcome.failed > 0 {
            warn!(sent = outcome.sent, failed = outcome.failed, "Some notifications were not delivered");
        }
        NotificationOutcome::delivered(recipients.len(), outcome)
    }
}
