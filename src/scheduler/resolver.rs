use anyhow::Result;

use super::{InventoryScheduler, SchedulerError};
use crate::backend::WorkerDirectory;
use crate::model::COUNT_DUTY_ROLE;

/// Picks the count-duty worker for `store_id`: earliest assignment wins, ties go
/// to the smaller worker id. The directory's own ordering is not trusted.
pub async fn resolve_responsible_worker(workers: &dyn WorkerDirectory, store_id: &str) -> Result<Option<String>> {
    let assignments = workers.list_workers_by_store_and_role(store_id, COUNT_DUTY_ROLE).await?;
    Ok(assignments
        .into_iter()
        .min_by(|a, b| a.assigned_at.cmp(&b.assigned_at).then_with(|| a.worker_id.cmp(&b.worker_id)))
        .map(|a| a.worker_id))
}

impl InventoryScheduler {
    pub async fn resolve_responsible_worker(&self, store_id: &str) -> Result<Option<String>, SchedulerError> {
        resolve_responsible_worker(self.workers.as_ref(), store_id)
            .await
            .map_err(|e| SchedulerError::read("resolve responsible worker", e))
    }
}
