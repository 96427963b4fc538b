//! Scheduler Entry Point
//! 
//! One trigger runs exactly one job. The job comes from an explicit directive,
//! or from the weekday of `now` when the trigger carries none.

use chrono::{DateTime, Datelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use super::{InventoryScheduler, JobReport, SchedulerError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Directive {
    Create,
    MarkOverdue,
}

impl Directive {
    pub fn as_str(&self) -> &'static str {
        match self {
            Directive::Create => "create",
            Directive::MarkOverdue => "mark_overdue",
        }
    }

    /// Reads `{ "action": ... }` from a trigger body. Anything else, including
    /// an empty or malformed body, means "no directive".
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        #[derive(Deserialize)]
        struct Payload {
            action: Option<String>,
        }

        serde_json::from_slice::<Payload>(payload)
            .ok()
            .and_then(|p| p.action)
            .and_then(|action| action.parse().ok())
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Directive {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Directive::Create),
            "mark_overdue" => Ok(Directive::MarkOverdue),
            other => anyhow::bail!("unknown action '{}' (expected create or mark_overdue)", other),
        }
    }
}

/// Decision table for a trigger.
///
/// | directive    | weekday | job           |
/// |--------------|---------|---------------|
/// | create       | any     | act creation  |
/// | mark_overdue | any     | overdue sweep |
/// | none         | Sun     | act creation  |
/// | none         | Mon     | overdue sweep |
/// | none         | other   | error         |
pub fn select_job(directive: Option<Directive>, weekday: Weekday) -> Result<Directive, SchedulerError> {
    match (directive, weekday) {
        (Some(directive), _) => Ok(directive),
        (None, Weekday::Sun) => Ok(Directive::Create),
        (None, Weekday::Mon) => Ok(Directive::MarkOverdue),
        (None, weekday) => Err(SchedulerError::CannotInferAction { weekday }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub directive: Option<Directive>,
    pub now: DateTime<Utc>,
}

impl Trigger {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { directive: None, now }
    }

    pub fn with_directive(mut self, directive: Directive) -> Self {
        self.directive = Some(directive);
        self
    }

    pub fn from_payload(payload: &[u8], now: DateTime<Utc>) -> Self {
        Self { directive: Directive::from_payload(payload), now }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriggerOutcome {
    pub action: Directive,
    pub message: String,
    pub report: JobReport,
}

impl InventoryScheduler {
    pub async fn dispatch(&self, trigger: Trigger) -> Result<TriggerOutcome, SchedulerError> {
        let action = select_job(trigger.directive, trigger.now.weekday()).map_err(|e| {
            warn!("{}", e);
            e
        })?;
        info!(%action, explicit = trigger.directive.is_some(), "Scheduler triggered");

        let report = match action {
            Directive::Create => JobReport::ActCreation(self.run_act_creation(trigger.now).await?),
            Directive::MarkOverdue => JobReport::OverdueSweep(self.run_overdue_sweep(trigger.now).await?),
        };

        Ok(TriggerOutcome { action, message: report.message(), report })
    }
}
