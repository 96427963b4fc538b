//! Collaborator Contracts
//! 
//! The scheduler reads stores, workers and shifts and writes inventory acts
//! through these traits. `sqlite` persists them durably; `memory` keeps them in
//! process for tests and local dry runs.

mod memory;
pub mod sqlite;

#[cfg(any(test, feature = "test-util"))]
pub use memory::FailPoint;
pub use memory::InMemoryBackend;
pub use sqlite::SqliteBackend;

use anyhow::Result;
use async_trait::async_trait;

use crate::calendar::IsoWeek;
use crate::model::{ActCandidate, InventoryAct, Recipient, Store, StoreAssignment};

#[async_trait]
pub trait StoreDirectory: Send + Sync {
    async fn list_stores(&self) -> Result<Vec<Store>>;
}

#[async_trait]
pub trait WorkerDirectory: Send + Sync {
    /// Workers bound to `store_id` holding `role`, earliest assignment first
    /// (ties by worker id).
    async fn list_workers_by_store_and_role(&self, store_id: &str, role: &str) -> Result<Vec<StoreAssignment>>;

    /// Workers holding any of `roles` that have a notification address.
    async fn list_workers_by_roles(&self, roles: &[&str]) -> Result<Vec<Recipient>>;

    /// Notification addresses of the given workers; workers without one are omitted.
    async fn notification_recipients(&self, worker_ids: &[String]) -> Result<Vec<Recipient>>;
}

#[async_trait]
pub trait ActStore: Send + Sync {
    /// Inserts all candidates atomically, skipping any whose
    /// (store, week-year, week-number) already exists. Returns only the rows
    /// actually inserted.
    async fn upsert_acts(&self, candidates: Vec<ActCandidate>) -> Result<Vec<InventoryAct>>;

    /// Moves every pending act of `week` to overdue and returns the moved rows.
    async fn mark_overdue(&self, week: IsoWeek) -> Result<Vec<InventoryAct>>;
}

#[async_trait]
pub trait ShiftDirectory: Send + Sync {
    /// Workers with an open shift and a notification address.
    async fn open_shift_recipients(&self) -> Result<Vec<Recipient>>;
}
