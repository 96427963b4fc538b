//! Domain Records
//! 
//! Stores, workers, shifts and the weekly inventory acts the scheduler owns.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::calendar::IsoWeek;

/// Role eligible for inventory-count duty
pub const COUNT_DUTY_ROLE: &str = "baker";

/// Roles notified when acts go overdue
pub const SUPERVISORY_ROLES: [&str; 3] = ["admin", "owner", "manager"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActStatus {
    Pending,
    Completed,
    Overdue,
}

impl ActStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActStatus::Pending => "pending",
            ActStatus::Completed => "completed",
            ActStatus::Overdue => "overdue",
        }
    }

    /// Completed and overdue acts never change again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ActStatus::Pending)
    }
}

impl fmt::Display for ActStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ActStatus::Pending),
            "completed" => Ok(ActStatus::Completed),
            "overdue" => Ok(ActStatus::Overdue),
            other => anyhow::bail!("unknown act status '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Store {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Worker {
    pub id: String,
    pub full_name: String,
    pub company_role: String,
    /// Push token registered by the mobile app, if any
    pub notification_address: Option<String>,
}

/// A worker bound to a store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreAssignment {
    pub worker_id: String,
    pub store_id: String,
    pub assigned_at: DateTime<Utc>,
}

/// A worker that can actually be reached by a push notification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recipient {
    pub worker_id: String,
    pub notification_address: String,
}

/// A pending act about to be upserted. Never carries a missing worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActCandidate {
    pub store_id: String,
    pub worker_id: String,
    pub week: IsoWeek,
    pub scheduled_date: NaiveDate,
}

impl ActCandidate {
    pub fn conflict_key(&self) -> (&str, i32, u32) {
        (&self.store_id, self.week.year, self.week.week)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventoryAct {
    pub id: String,
    pub store_id: String,
    pub worker_id: String,
    pub week_year: i32,
    pub week_number: u32,
    pub scheduled_date: NaiveDate,
    pub conducted_at: Option<DateTime<Utc>>,
    pub status: ActStatus,
    pub created_at: DateTime<Utc>,
}

impl InventoryAct {
    pub fn week(&self) -> IsoWeek {
        IsoWeek { week: self.week_number, year: self.week_year }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    Open,
    Closed,
}

impl ShiftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftStatus::Open => "open",
            ShiftStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Shift {
    pub id: String,
    pub worker_id: String,
    pub status: ShiftStatus,
}
