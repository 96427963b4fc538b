//! HTTP Trigger
//! 
//! Lets an external scheduler (or an operator) fire the weekly jobs over HTTP.
//! `POST /trigger` accepts an optional `{ "action": ... }` body; without one the
//! job is inferred from the current weekday.

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::scheduler::{InventoryScheduler, ProgressReminderReport, SchedulerError, Trigger, TriggerOutcome};

struct ServerError(SchedulerError);

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = if self.0.is_input_error() {
            StatusCode::BAD_REQUEST
        } else {
            error!("Scheduler run failed: {}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl From<SchedulerError> for ServerError {
    fn from(err: SchedulerError) -> Self {
        Self(err)
    }
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<InventoryScheduler>,
    clock: Clock,
}

impl AppState {
    pub fn new(scheduler: Arc<InventoryScheduler>) -> Self {
        Self { scheduler, clock: Arc::new(Utc::now) }
    }

    /// Replaces the wall clock, e.g. to pin the weekday.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/trigger", get(infer_handler).post(trigger_handler))
        .route("/reminders/progress", post(progress_reminder_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(state: AppState, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🚀 Scheduler trigger listening at http://{}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn trigger_handler(State(state): State<AppState>, body: Bytes) -> Result<Json<TriggerOutcome>, ServerError> {
    let trigger = Trigger::from_payload(&body, state.now());
    Ok(Json(state.scheduler.dispatch(trigger).await?))
}

async fn infer_handler(State(state): State<AppState>) -> Result<Json<TriggerOutcome>, ServerError> {
    Ok(Json(state.scheduler.dispatch(Trigger::at(state.now())).await?))
}

async fn progress_reminder_handler(
    State(state): State<AppState>,
) -> Result<Json<ProgressReminderReport>, ServerError> {
    Ok(Json(state.scheduler.run_progress_reminder(state.now()).await?))
}
