//! SQLite Backend
//! 
//! Durable implementation of every collaborator contract. Each call opens its
//! own connection on the blocking pool, so the backend is cheap to clone and
//! safe to share across jobs.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, params_from_iter, Connection, Row};
use std::path::{Path, PathBuf};
use tokio::task;
use uuid::Uuid;

use super::{ActStore, ShiftDirectory, StoreDirectory, WorkerDirectory};
use crate::calendar::IsoWeek;
use crate::model::{
    ActCandidate, ActStatus, InventoryAct, Recipient, Shift, ShiftStatus, Store, StoreAssignment, Worker,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS stores (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS workers (
    id TEXT PRIMARY KEY,
    full_name TEXT NOT NULL,
    company_role TEXT NOT NULL,
    push_token TEXT
);
CREATE TABLE IF NOT EXISTS store_assignments (
    worker_id TEXT NOT NULL REFERENCES workers(id),
    store_id TEXT NOT NULL REFERENCES stores(id),
    assigned_at TEXT NOT NULL,
    PRIMARY KEY (worker_id, store_id)
);
CREATE TABLE IF NOT EXISTS inventory_acts (
    id TEXT PRIMARY KEY,
    store_id TEXT NOT NULL REFERENCES stores(id),
    worker_id TEXT NOT NULL REFERENCES workers(id),
    week_year INTEGER NOT NULL,
    week_number INTEGER NOT NULL,
    scheduled_date TEXT NOT NULL,
    conducted_at TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL,
    UNIQUE (store_id, week_year, week_number)
);
CREATE TABLE IF NOT EXISTS shifts (
    id TEXT PRIMARY KEY,
    worker_id TEXT NOT NULL REFERENCES workers(id),
    status TEXT NOT NULL,
    opened_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_acts_week_status ON inventory_acts(week_year, week_number, status);
CREATE INDEX IF NOT EXISTS idx_assignments_store ON store_assignments(store_id);
CREATE INDEX IF NOT EXISTS idx_shifts_status ON shifts(status);
"#;

const ACT_COLUMNS: &str =
    "id, store_id, worker_id, week_year, week_number, scheduled_date, conducted_at, status, created_at";

// Fixed precision keeps the stored timestamps lexicographically ordered.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid timestamp '{}'", raw))?
        .with_timezone(&Utc))
}

fn act_from_row(row: &Row<'_>) -> Result<InventoryAct> {
    let scheduled_date: String = row.get(5)?;
    let conducted_at: Option<String> = row.get(6)?;
    let status: String = row.get(7)?;
    let created_at: String = row.get(8)?;

    Ok(InventoryAct {
        id: row.get(0)?,
        store_id: row.get(1)?,
        worker_id: row.get(2)?,
        week_year: row.get(3)?,
        week_number: row.get(4)?,
        scheduled_date: scheduled_date
            .parse::<NaiveDate>()
            .with_context(|| format!("invalid scheduled_date '{}'", scheduled_date))?,
        conducted_at: conducted_at.as_deref().map(parse_timestamp).transpose()?,
        status: status.parse()?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn placeholders(count: usize) -> String {
    (1..=count).map(|i| format!("?{}", i)).collect::<Vec<_>>().join(", ")
}

#[derive(Clone)]
pub struct SqliteBackend {
    db_path: PathBuf,
}

impl SqliteBackend {
    /// Opens (creating if needed) the database at `db_path` and applies the schema.
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let backend = Self { db_path: db_path.as_ref().to_path_buf() };
        backend
            .with_conn(|conn| {
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await
            .context("Failed to initialise inventory schema")?;
        Ok(backend)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let path = self.db_path.clone();
        task::spawn_blocking(move || {
            let mut conn = Connection::open(&path)?;
            f(&mut conn)
        })
        .await?
    }

    pub async fn add_store(&self, name: &str) -> Result<Store> {
        let store = Store { id: Uuid::new_v4().to_string(), name: name.to_string() };
        let row = store.clone();
        self.with_conn(move |conn| {
            conn.execute("INSERT INTO stores (id, name) VALUES (?1, ?2)", params![&row.id, &row.name])?;
            Ok(())
        })
        .await?;
        Ok(store)
    }

    pub async fn add_worker(&self, full_name: &str, company_role: &str, push_token: Option<&str>) -> Result<Worker> {
        let worker = Worker {
            id: Uuid::new_v4().to_string(),
            full_name: full_name.to_string(),
            company_role: company_role.to_string(),
            notification_address: push_token.map(str::to_string),
        };
        let row = worker.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO workers (id, full_name, company_role, push_token) VALUES (?1, ?2, ?3, ?4)",
                params![&row.id, &row.full_name, &row.company_role, &row.notification_address],
            )?;
            Ok(())
        })
        .await?;
        Ok(worker)
    }

    pub async fn assign_worker(&self, worker_id: &str, store_id: &str, assigned_at: DateTime<Utc>) -> Result<StoreAssignment> {
        let assignment = StoreAssignment {
            worker_id: worker_id.to_string(),
            store_id: store_id.to_string(),
            assigned_at,
        };
        let row = assignment.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO store_assignments (worker_id, store_id, assigned_at) VALUES (?1, ?2, ?3)",
                params![&row.worker_id, &row.store_id, timestamp(row.assigned_at)],
            )?;
            Ok(())
        })
        .await?;
        Ok(assignment)
    }

    pub async fn open_shift(&self, worker_id: &str) -> Result<Shift> {
        let shift = Shift {
            id: Uuid::new_v4().to_string(),
            worker_id: worker_id.to_string(),
            status: ShiftStatus::Open,
        };
        let row = shift.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO shifts (id, worker_id, status, opened_at) VALUES (?1, ?2, ?3, ?4)",
                params![&row.id, &row.worker_id, row.status.as_str(), timestamp(Utc::now())],
            )?;
            Ok(())
        })
        .await?;
        Ok(shift)
    }

    pub async fn close_shift(&self, shift_id: &str) -> Result<()> {
        let id = shift_id.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE shifts SET status = ?1 WHERE id = ?2",
                params![ShiftStatus::Closed.as_str(), &id],
            )?;
            Ok(())
        })
        .await
    }

    /// Records a finished count. Only pending acts can complete; returns whether
    /// the act moved.
    pub async fn complete_act(&self, act_id: &str, conducted_at: DateTime<Utc>) -> Result<bool> {
        let id = act_id.to_string();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE inventory_acts SET status = 'completed', conducted_at = ?1 WHERE id = ?2 AND status = 'pending'",
                params![timestamp(conducted_at), &id],
            )?;
            Ok(changed == 1)
        })
        .await
    }

    pub async fn list_acts(&self) -> Result<Vec<InventoryAct>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM inventory_acts ORDER BY week_year, week_number, store_id",
                ACT_COLUMNS
            ))?;
            let mut rows = stmt.query([])?;
            let mut acts = Vec::new();
            while let Some(row) = rows.next()? {
                acts.push(act_from_row(row)?);
            }
            Ok(acts)
        })
        .await
    }
}

#[async_trait]
impl StoreDirectory for SqliteBackend {
    async fn list_stores(&self) -> Result<Vec<Store>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM stores ORDER BY name, id")?;
            let stores = stmt
                .query_map([], |row| Ok(Store { id: row.get(0)?, name: row.get(1)? }))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(stores)
        })
        .await
    }
}

#[async_trait]
impl WorkerDirectory for SqliteBackend {
    async fn list_workers_by_store_and_role(&self, store_id: &str, role: &str) -> Result<Vec<StoreAssignment>> {
        let store_id = store_id.to_string();
        let role = role.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT a.worker_id, a.store_id, a.assigned_at
                 FROM store_assignments a
                 JOIN workers w ON w.id = a.worker_id
                 WHERE a.store_id = ?1 AND w.company_role = ?2
                 ORDER BY a.assigned_at ASC, a.worker_id ASC",
            )?;
            let raw = stmt
                .query_map(params![&store_id, &role], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            raw.into_iter()
                .map(|(worker_id, store_id, assigned_at)| -> Result<StoreAssignment> {
                    Ok(StoreAssignment { worker_id, store_id, assigned_at: parse_timestamp(&assigned_at)? })
                })
                .collect()
        })
        .await
    }

    async fn list_workers_by_roles(&self, roles: &[&str]) -> Result<Vec<Recipient>> {
        if roles.is_empty() {
            return Ok(Vec::new());
        }
        let roles: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT id, push_token FROM workers
                 WHERE company_role IN ({}) AND push_token IS NOT NULL
                 ORDER BY id",
                placeholders(roles.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let recipients = stmt
                .query_map(params_from_iter(roles.iter()), |row| {
                    Ok(Recipient { worker_id: row.get(0)?, notification_address: row.get(1)? })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(recipients)
        })
        .await
    }

    async fn notification_recipients(&self, worker_ids: &[String]) -> Result<Vec<Recipient>> {
        if worker_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = worker_ids.to_vec();
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT id, push_token FROM workers
                 WHERE id IN ({}) AND push_token IS NOT NULL
                 ORDER BY id",
                placeholders(ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let recipients = stmt
                .query_map(params_from_iter(ids.iter()), |row| {
                    Ok(Recipient { worker_id: row.get(0)?, notification_address: row.get(1)? })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(recipients)
        })
        .await
    }
}

#[async_trait]
impl ActStore for SqliteBackend {
    async fn upsert_acts(&self, candidates: Vec<ActCandidate>) -> Result<Vec<InventoryAct>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let mut inserted = Vec::new();
            {
                let mut stmt = tx.prepare(&format!(
                    "INSERT INTO inventory_acts
                        (id, store_id, worker_id, week_year, week_number, scheduled_date, status, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT (store_id, week_year, week_number) DO NOTHING
                     RETURNING {}",
                    ACT_COLUMNS
                ))?;
                let created_at = timestamp(Utc::now());

                for candidate in &candidates {
                    let mut rows = stmt.query(params![
                        Uuid::new_v4().to_string(),
                        &candidate.store_id,
                        &candidate.worker_id,
                        candidate.week.year,
                        candidate.week.week,
                        candidate.scheduled_date.to_string(),
                        ActStatus::Pending.as_str(),
                        &created_at,
                    ])?;
                    if let Some(row) = rows.next()? {
                        inserted.push(act_from_row(row)?);
                    }
                }
            }
            tx.commit()?;
            Ok(inserted)
        })
        .await
    }

    async fn mark_overdue(&self, week: IsoWeek) -> Result<Vec<InventoryAct>> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let mut updated = Vec::new();
            {
                let mut stmt = tx.prepare(&format!(
                    "UPDATE inventory_acts SET status = ?1
                     WHERE week_year = ?2 AND week_number = ?3 AND status = ?4
                     RETURNING {}",
                    ACT_COLUMNS
                ))?;
                let mut rows = stmt.query(params![
                    ActStatus::Overdue.as_str(),
                    week.year,
                    week.week,
                    ActStatus::Pending.as_str(),
                ])?;
                while let Some(row) = rows.next()? {
                    updated.push(act_from_row(row)?);
                }
            }
            tx.commit()?;
            Ok(updated)
        })
        .await
    }
}

#[async_trait]
impl ShiftDirectory for SqliteBackend {
    async fn open_shift_recipients(&self) -> Result<Vec<Recipient>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT w.id, w.push_token
                 FROM shifts s
                 JOIN workers w ON w.id = s.worker_id
                 WHERE s.status = ?1 AND w.push_token IS NOT NULL
                 ORDER BY w.id",
            )?;
            let recipients = stmt
                .query_map(params![ShiftStatus::Open.as_str()], |row| {
                    Ok(Recipient { worker_id: row.get(0)?, notification_address: row.get(1)? })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(recipients)
        })
        .await
    }
}
