//! Bakery Inventory Scheduler
//! 
//! Weekly inventory-count tasks for a bakery chain:
//! - One pending inventory act per store each week, assigned to its baker
//! - Unfinished acts swept to overdue when the week closes
//! - Push notifications to assigned workers and supervisors
//! - Progress reminders for open shifts
//!
//! Triggered from cron, HTTP, or the command line.

pub mod backend;
pub mod calendar;
pub mod config;
pub mod cron;
pub mod model;
pub mod notify;
pub mod scheduler;
pub mod server;
pub mod utils;

// Re-exports for convenience
pub use calendar::IsoWeek;
pub use config::SchedulerConfig;
pub use scheduler::{Directive, InventoryScheduler, SchedulerError, Trigger, TriggerOutcome};
