//! Job Reports
//! 
//! Every job returns its primary outcome together with a separate
//! `NotificationOutcome`, so delivery trouble is visible without being an error.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::IsoWeek;
use crate::model::{InventoryAct, Store};
use crate::notify::NotificationOutcome;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActCreationReport {
    pub week: IsoWeek,
    pub scheduled_date: NaiveDate,
    pub stores_total: usize,
    /// Rows actually inserted by this run
    pub created: Vec<InventoryAct>,
    /// Candidates that already had an act for this week
    pub already_scheduled: usize,
    /// Stores with no count-duty worker bound to them
    pub skipped_stores: Vec<Store>,
    pub notifications: NotificationOutcome,
}

impl ActCreationReport {
    pub fn new(week: IsoWeek, scheduled_date: NaiveDate, stores_total: usize) -> Self {
        Self {
            week,
            scheduled_date,
            stores_total,
            created: Vec::new(),
            already_scheduled: 0,
            skipped_stores: Vec::new(),
            notifications: NotificationOutcome::default(),
        }
    }

    pub fn message(&self) -> String {
        if self.stores_total == 0 {
            return "No stores found".to_string();
        }
        if self.skipped_stores.len() == self.stores_total {
            return format!("No bakers assigned to stores, cannot create acts for week {}", self.week);
        }
        let mut message = format!("Created {} inventory acts for week {}", self.created.len(), self.week);
        if !self.skipped_stores.is_empty() {
            message.push_str(&format!(" ({} stores skipped: no baker assigned)", self.skipped_stores.len()));
        }
        message
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverdueSweepReport {
    /// The closed week that was swept
    pub week: IsoWeek,
    pub overdue: Vec<InventoryAct>,
    pub notifications: NotificationOutcome,
}

impl OverdueSweepReport {
    pub fn message(&self) -> String {
        format!("Marked {} acts as overdue for week {}", self.overdue.len(), self.week)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressReminderReport {
    pub at: DateTime<Utc>,
    pub notifications: NotificationOutcome,
}

impl ProgressReminderReport {
    pub fn message(&self) -> String {
        if self.notifications.recipients == 0 {
            return "No open shifts".to_string();
        }
        format!(
            "Sent progress reminders to {} of {} workers",
            self.notifications.sent, self.notifications.recipients
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobReport {
    ActCreation(ActCreationReport),
    OverdueSweep(OverdueSweepReport),
    ProgressReminder(ProgressReminderReport),
}

impl JobReport {
    pub fn message(&self) -> String {
        match self {
            JobReport::ActCreation(r) => r.message(),
            JobReport::OverdueSweep(r) => r.message(),
            JobReport::ProgressReminder(r) => r.message(),
        }
    }

    pub fn notifications(&self) -> &NotificationOutcome {
        match self {
            JobReport::ActCreation(r) => &r.notifications,
            JobReport::OverdueSweep(r) => &r.notifications,
            JobReport::ProgressReminder(r) => &r.notifications,
        }
    }
}
