//! In-Process Backend
//! 
//! Same contracts and conflict semantics as the SQLite backend, held in memory.
//! With the `test-util` feature it also counts directory reads and can be told
//! to fail individual operations.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(any(test, feature = "test-util"))]
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{ActStore, ShiftDirectory, StoreDirectory, WorkerDirectory};
use crate::calendar::IsoWeek;
use crate::model::{
    ActCandidate, ActStatus, InventoryAct, Recipient, Shift, ShiftStatus, Store, StoreAssignment, Worker,
};

#[derive(Default)]
struct State {
    stores: Vec<Store>,
    workers: Vec<Worker>,
    assignments: Vec<StoreAssignment>,
    acts: Vec<InventoryAct>,
    shifts: Vec<Shift>,
}

impl State {
    fn recipient(&self, worker_id: &str) -> Option<Recipient> {
        self.workers.iter().find(|w| w.id == worker_id).and_then(|w| {
            w.notification_address.as_ref().map(|address| Recipient {
                worker_id: w.id.clone(),
                notification_address: address.clone(),
            })
        })
    }
}

/// Operations that can be made to fail on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    ListStores,
    WorkerLookup,
    RecipientLookup,
    Upsert,
    MarkOverdue,
    ShiftLookup,
}

#[cfg(any(test, feature = "test-util"))]
#[derive(Default)]
struct Hooks {
    reads: AtomicUsize,
    upserts: AtomicUsize,
    armed: [AtomicBool; 6],
}

#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
    #[cfg(any(test, feature = "test-util"))]
    hooks: Hooks,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts the call and fails it when `point` is armed.
    #[cfg(any(test, feature = "test-util"))]
    fn enter(&self, point: FailPoint) -> Result<()> {
        match point {
            FailPoint::Upsert => {
                self.hooks.upserts.fetch_add(1, Ordering::SeqCst);
            }
            FailPoint::MarkOverdue => {}
            _ => {
                self.hooks.reads.fetch_add(1, Ordering::SeqCst);
            }
        }
        if self.hooks.armed[point as usize].load(Ordering::SeqCst) {
            anyhow::bail!("injected failure at {:?}", point);
        }
        Ok(())
    }

    #[cfg(not(any(test, feature = "test-util")))]
    fn enter(&self, _point: FailPoint) -> Result<()> {
        Ok(())
    }

    #[cfg(any(test, feature = "test-util"))]
    pub fn fail(&self, point: FailPoint, fail: bool) {
        self.hooks.armed[point as usize].store(fail, Ordering::SeqCst);
    }

    /// Number of directory reads served so far
    #[cfg(any(test, feature = "test-util"))]
    pub fn reads(&self) -> usize {
        self.hooks.reads.load(Ordering::SeqCst)
    }

    /// Number of upsert calls served so far
    #[cfg(any(test, feature = "test-util"))]
    pub fn upserts(&self) -> usize {
        self.hooks.upserts.load(Ordering::SeqCst)
    }

    pub async fn add_store(&self, name: &str) -> Store {
        let store = Store { id: Uuid::new_v4().to_string(), name: name.to_string() };
        self.state.lock().await.stores.push(store.clone());
        store
    }

    pub async fn add_worker(&self, full_name: &str, company_role: &str, push_token: Option<&str>) -> Worker {
        let worker = Worker {
            id: Uuid::new_v4().to_string(),
            full_name: full_name.to_string(),
            company_role: company_role.to_string(),
            notification_address: push_token.map(str::to_string),
        };
        self.state.lock().await.workers.push(worker.clone());
        worker
    }

    pub async fn assign_worker(&self, worker_id: &str, store_id: &str, assigned_at: DateTime<Utc>) {
        self.state.lock().await.assignments.push(StoreAssignment {
            worker_id: worker_id.to_string(),
            store_id: store_id.to_string(),
            assigned_at,
        });
    }

    pub async fn open_shift(&self, worker_id: &str) -> Shift {
        let shift = Shift {
            id: Uuid::new_v4().to_string(),
            worker_id: worker_id.to_string(),
            status: ShiftStatus::Open,
        };
        self.state.lock().await.shifts.push(shift.clone());
        shift
    }

    /// Records a finished count; only pending acts move.
    pub async fn complete_act(&self, act_id: &str, conducted_at: DateTime<Utc>) -> bool {
        let mut state = self.state.lock().await;
        match state.acts.iter_mut().find(|a| a.id == act_id && a.status == ActStatus::Pending) {
            Some(act) => {
                act.status = ActStatus::Completed;
                act.conducted_at = Some(conducted_at);
                true
            }
            None => false,
        }
    }

    pub async fn acts(&self) -> Vec<InventoryAct> {
        self.state.lock().await.acts.clone()
    }
}

#[async_trait]
impl StoreDirectory for InMemoryBackend {
    async fn list_stores(&self) -> Result<Vec<Store>> {
        self.enter(FailPoint::ListStores)?;
        Ok(self.state.lock().await.stores.clone())
    }
}

#[async_trait]
impl WorkerDirectory for InMemoryBackend {
    async fn list_workers_by_store_and_role(&self, store_id: &str, role: &str) -> Result<Vec<StoreAssignment>> {
        self.enter(FailPoint::WorkerLookup)?;
        let state = self.state.lock().await;
        let mut matches: Vec<StoreAssignment> = state
            .assignments
            .iter()
            .filter(|a| a.store_id == store_id)
            .filter(|a| state.workers.iter().any(|w| w.id == a.worker_id && w.company_role == role))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.assigned_at.cmp(&b.assigned_at).then_with(|| a.worker_id.cmp(&b.worker_id)));
        Ok(matches)
    }

    async fn list_workers_by_roles(&self, roles: &[&str]) -> Result<Vec<Recipient>> {
        self.enter(FailPoint::RecipientLookup)?;
        let state = self.state.lock().await;
        Ok(state
            .workers
            .iter()
            .filter(|w| roles.contains(&w.company_role.as_str()))
            .filter_map(|w| state.recipient(&w.id))
            .collect())
    }

    async fn notification_recipients(&self, worker_ids: &[String]) -> Result<Vec<Recipient>> {
        self.enter(FailPoint::RecipientLookup)?;
        let state = self.state.lock().await;
        Ok(worker_ids.iter().filter_map(|id| state.recipient(id)).collect())
    }
}

#[async_trait]
impl ActStore for InMemoryBackend {
    async fn upsert_acts(&self, candidates: Vec<ActCandidate>) -> Result<Vec<InventoryAct>> {
        self.enter(FailPoint::Upsert)?;
        let mut state = self.state.lock().await;
        let created_at = Utc::now();
        let mut inserted = Vec::new();

        for candidate in candidates {
            let (store_id, year, week) = candidate.conflict_key();
            let exists = state
                .acts
                .iter()
                .any(|a| a.store_id == store_id && a.week_year == year && a.week_number == week);
            if exists {
                continue;
            }
            let act = InventoryAct {
                id: Uuid::new_v4().to_string(),
                store_id: candidate.store_id,
                worker_id: candidate.worker_id,
                week_year: candidate.week.year,
                week_number: candidate.week.week,
                scheduled_date: candidate.scheduled_date,
                conducted_at: None,
                status: ActStatus::Pending,
                created_at,
            };
            state.acts.push(act.clone());
            inserted.push(act);
        }
        Ok(inserted)
    }

    async fn mark_overdue(&self, week: IsoWeek) -> Result<Vec<InventoryAct>> {
        self.enter(FailPoint::MarkOverdue)?;
        let mut state = self.state.lock().await;
        let mut updated = Vec::new();
        for act in state.acts.iter_mut() {
            if act.week() == week && act.status == ActStatus::Pending {
                act.status = ActStatus::Overdue;
                updated.push(act.clone());
            }
        }
        Ok(updated)
    }
}

#[async_trait]
impl ShiftDirectory for InMemoryBackend {
    async fn open_shift_recipients(&self) -> Result<Vec<Recipient>> {
        self.enter(FailPoint::ShiftLookup)?;
        let state = self.state.lock().await;
        let mut recipients: Vec<Recipient> = state
            .shifts
            .iter()
            .filter(|s| s.status == ShiftStatus::Open)
            .filter_map(|s| state.recipient(&s.worker_id))
            .collect();
        recipients.sort_by(|a, b| a.worker_id.cmp(&b.worker_id));
        recipients.dedup();
        Ok(recipients)
    }
}
