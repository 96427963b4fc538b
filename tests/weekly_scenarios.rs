//! End-to-end runs of the weekly scheduler against the in-process backend.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::sync::Arc;

use bakery_scheduler::backend::{ActStore, InMemoryBackend};
use bakery_scheduler::model::{ActCandidate, ActStatus};
use bakery_scheduler::notify::RecordingDispatcher;
use bakery_scheduler::scheduler::JobReport;
use bakery_scheduler::{Directive, InventoryScheduler, IsoWeek, SchedulerError, Trigger};

struct World {
    backend: Arc<InMemoryBackend>,
    notifier: Arc<RecordingDispatcher>,
    scheduler: InventoryScheduler,
}

impl World {
    fn new() -> Self {
        let backend = Arc::new(InMemoryBackend::new());
        let notifier = Arc::new(RecordingDispatcher::new());
        let scheduler = InventoryScheduler::from_backend(backend.clone(), notifier.clone());
        Self { backend, notifier, scheduler }
    }

    /// Three stores, two with a baker who has a push token, one with nobody.
    async fn three_stores() -> Self {
        let world = Self::new();
        let hired = Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap();
        for (store, baker) in [("Central", Some("Anna")), ("Riverside", Some("Boris")), ("Airport", None)] {
            let store = world.backend.add_store(store).await;
            if let Some(name) = baker {
                let token = format!("ExponentPushToken[{}]", name);
                let worker = world.backend.add_worker(name, "baker", Some(token.as_str())).await;
                world.backend.assign_worker(&worker.id, &store.id, hired).await;
            }
        }
        world.backend.add_worker("Olga", "owner", Some("ExponentPushToken[olga]")).await;
        world.backend.add_worker("Max", "manager", Some("ExponentPushToken[max]")).await;
        world.backend.add_worker("Cashier", "cashier", Some("ExponentPushToken[cash]")).await;
        world
    }
}

fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

// 2026-10-18 closes ISO week 42; 2026-10-19 opens week 43.
fn sunday() -> DateTime<Utc> {
    utc(2026, 10, 18, 8)
}

fn monday() -> DateTime<Utc> {
    utc(2026, 10, 19, 0)
}

fn wednesday() -> DateTime<Utc> {
    utc(2026, 10, 14, 12)
}

#[tokio::test]
async fn test_scenario_a_two_of_three_stores_get_acts() {
    let world = World::three_stores().await;

    let outcome = world.scheduler.dispatch(Trigger::at(sunday())).await.unwrap();
    assert_eq!(outcome.action, Directive::Create);

    let JobReport::ActCreation(report) = outcome.report else {
        panic!("expected an act creation report");
    };
    assert_eq!(report.created.len(), 2);
    assert_eq!(report.skipped_stores.len(), 1);
    assert_eq!(report.skipped_stores[0].name, "Airport");
    assert!(report.created.iter().all(|a| a.status == ActStatus::Pending));
    assert!(report.created.iter().all(|a| a.scheduled_date == NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()));

    let messages = world.notifier.messages().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(report.notifications.sent, 2);
    assert!(messages.iter().all(|m| m.body.contains("42/2026")));
    assert!(messages.iter().all(|m| m.data["screen"] == "inventory-act"));
    assert_eq!(outcome.message, "Created 2 inventory acts for week 42/2026 (1 stores skipped: no baker assigned)");
}

#[tokio::test]
async fn test_creation_twice_in_one_week_is_idempotent() {
    let world = World::three_stores().await;

    let first = world.scheduler.run_act_creation(sunday()).await.unwrap();
    let acts_after_first = world.backend.acts().await;

    let second = world.scheduler.run_act_creation(utc(2026, 10, 18, 20)).await.unwrap();
    let acts_after_second = world.backend.acts().await;

    assert_eq!(first.created.len(), 2);
    assert!(second.created.is_empty());
    assert_eq!(second.already_scheduled, 2);
    assert_eq!(acts_after_first, acts_after_second);
    // Only the first run notified anyone
    assert_eq!(world.notifier.calls().await.len(), 1);
}

#[tokio::test]
async fn test_existing_act_is_not_overwritten() {
    let world = World::three_stores().await;
    world.scheduler.run_act_creation(sunday()).await.unwrap();
    let acts = world.backend.acts().await;
    assert!(world.backend.complete_act(&acts[0].id, utc(2026, 10, 18, 10)).await);

    world.scheduler.run_act_creation(utc(2026, 10, 18, 11)).await.unwrap();

    let after = world.backend.acts().await;
    assert_eq!(after.len(), 2);
    assert_eq!(after[0].status, ActStatus::Completed);
    assert!(after[0].conducted_at.is_some());
}

#[tokio::test]
async fn test_scenario_b_pending_act_goes_overdue() {
    let world = World::three_stores().await;
    world.scheduler.run_act_creation(sunday()).await.unwrap();
    let acts = world.backend.acts().await;
    // Riverside counted on time, Central did not
    assert!(world.backend.complete_act(&acts[1].id, utc(2026, 10, 18, 15)).await);
    let before = world.notifier.calls().await.len();

    let outcome = world.scheduler.dispatch(Trigger::at(monday())).await.unwrap();
    assert_eq!(outcome.action, Directive::MarkOverdue);
    let JobReport::OverdueSweep(report) = outcome.report else {
        panic!("expected an overdue sweep report");
    };
    assert_eq!(report.week, IsoWeek::new(42, 2026));
    assert_eq!(report.overdue.len(), 1);
    assert_eq!(report.overdue[0].id, acts[0].id);

    let calls = world.notifier.calls().await;
    assert_eq!(calls.len(), before + 1);
    let batch = calls.last().unwrap();
    // Owner and manager; the cashier is not supervisory
    assert_eq!(batch.len(), 2);
    assert!(batch.iter().all(|m| m.body.starts_with("1 store(s)")));

    let statuses: Vec<_> = world.backend.acts().await.iter().map(|a| a.status).collect();
    assert_eq!(statuses, vec![ActStatus::Overdue, ActStatus::Completed]);
}

#[tokio::test]
async fn test_sweep_twice_transitions_once() {
    let world = World::three_stores().await;
    world.scheduler.run_act_creation(sunday()).await.unwrap();

    let first = world.scheduler.run_overdue_sweep(monday()).await.unwrap();
    let second = world.scheduler.run_overdue_sweep(utc(2026, 10, 19, 6)).await.unwrap();

    assert_eq!(first.overdue.len(), 2);
    assert!(second.overdue.is_empty());
    assert_eq!(second.notifications.recipients, 0);
}

#[tokio::test]
async fn test_sweep_leaves_current_week_alone() {
    let world = World::three_stores().await;
    let this_week = IsoWeek::new(43, 2026);
    world
        .backend
        .upsert_acts(vec![ActCandidate {
            store_id: "s".to_string(),
            worker_id: "w".to_string(),
            week: this_week,
            scheduled_date: this_week.sunday(),
        }])
        .await
        .unwrap();

    let report = world.scheduler.run_overdue_sweep(monday()).await.unwrap();
    assert!(report.overdue.is_empty());
    assert_eq!(world.backend.acts().await[0].status, ActStatus::Pending);
}

#[tokio::test]
async fn test_sweep_in_first_week_targets_last_week_of_previous_year() {
    let world = World::new();
    for (week, year) in [(52, 2022), (53, 2020)] {
        let target = IsoWeek::new(week, year);
        world
            .backend
            .upsert_acts(vec![ActCandidate {
                store_id: format!("store-{}", year),
                worker_id: "w".to_string(),
                week: target,
                scheduled_date: target.sunday(),
            }])
            .await
            .unwrap();
    }

    // 2023-01-02 opens week 1 of 2023 (2022 has 52 weeks)
    let report = world.scheduler.run_overdue_sweep(utc(2023, 1, 2, 0)).await.unwrap();
    assert_eq!(report.week, IsoWeek::new(52, 2022));
    assert_eq!(report.overdue.len(), 1);

    // 2021-01-04 opens week 1 of 2021 (2020 has 53 weeks)
    let report = world.scheduler.run_overdue_sweep(utc(2021, 1, 4, 0)).await.unwrap();
    assert_eq!(report.week, IsoWeek::new(53, 2020));
    assert_eq!(report.overdue.len(), 1);
}

#[tokio::test]
async fn test_scenario_c_wednesday_without_directive_is_rejected() {
    let world = World::three_stores().await;

    let err = world.scheduler.dispatch(Trigger::at(wednesday())).await.unwrap_err();
    assert!(matches!(err, SchedulerError::CannotInferAction { .. }));
    assert_eq!(world.backend.reads(), 0);
    assert_eq!(world.backend.upserts(), 0);
    assert!(world.notifier.calls().await.is_empty());
}

#[tokio::test]
async fn test_scenario_d_explicit_create_matches_sunday_run() {
    let inferred = World::three_stores().await;
    let explicit = World::three_stores().await;

    let a = inferred.scheduler.dispatch(Trigger::at(sunday())).await.unwrap();
    let b = explicit
        .scheduler
        .dispatch(Trigger::at(wednesday()).with_directive(Directive::Create))
        .await
        .unwrap();

    assert_eq!(a.action, b.action);
    assert_eq!(a.message, b.message);
    let (JobReport::ActCreation(a), JobReport::ActCreation(b)) = (a.report, b.report) else {
        panic!("expected act creation reports");
    };
    assert_eq!(a.week, b.week);
    assert_eq!(a.scheduled_date, b.scheduled_date);
    assert_eq!(a.created.len(), b.created.len());
    assert_eq!(a.notifications, b.notifications);
}

#[tokio::test]
async fn test_explicit_sweep_on_sunday() {
    let world = World::three_stores().await;
    let outcome = world
        .scheduler
        .dispatch(Trigger::from_payload(br#"{"action":"mark_overdue"}"#, sunday()))
        .await
        .unwrap();
    assert_eq!(outcome.action, Directive::MarkOverdue);
    // Sunday of week 42 sweeps week 41
    assert_eq!(outcome.message, "Marked 0 acts as overdue for week 41/2026");
}
