//! Control plane over the sync engine: status, manual triggers, cursor
//! reset, scheduler switches, and read access to the synced data. None of
//! these bypass the sync lock.

use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use utoipa::ToSchema;

use crate::{
    error::AppError,
    models::{ActiveIndexDocument, LeaveDocument, SyncCursor},
    state::AppState,
    sync::{CheckSummary, CycleSummary},
};

/// Minimum spacing between manual sync triggers.
const MANUAL_TRIGGER_SPACING: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize, ToSchema)]
pub struct SyncStatusResponse {
    pub cursor: SyncCursor,
    pub active_approvals: usize,
    pub lock_held: bool,
    pub auto_sync_enabled: bool,
    pub status_check_enabled: bool,
}

pub async fn sync_status(
    State(state): State<AppState>,
) -> Result<Json<SyncStatusResponse>, AppError> {
    let cursor = state.service.current_cursor().await?;
    let index = state.service.active_index().await?;

    Ok(Json(SyncStatusResponse {
        cursor,
        active_approvals: index.approvals.len(),
        lock_held: state.service.lock().is_held(),
        auto_sync_enabled: state.control.poller_enabled(),
        status_check_enabled: state.control.checker_enabled(),
    }))
}

/// Runs one incremental cycle now. 409 while a sync holds the lock, 429
/// within ten seconds of the previous manual trigger.
pub async fn trigger_sync(State(state): State<AppState>) -> Result<Json<CycleSummary>, AppError> {
    {
        let mut last = state.last_manual_trigger.lock().await;
        if let Some(previous) = *last {
            if previous.elapsed() < MANUAL_TRIGGER_SPACING {
                return Err(AppError::TooManyRequests(
                    "Manual sync was triggered less than 10 seconds ago".into(),
                ));
            }
        }
        *last = Some(Instant::now());
    }

    let summary = state.service.run_incremental_cycle().await?;
    Ok(Json(summary))
}

pub async fn trigger_check(State(state): State<AppState>) -> Result<Json<CheckSummary>, AppError> {
    let summary = state.service.run_status_check().await?;
    Ok(Json(summary))
}

pub async fn reset_cursor(State(state): State<AppState>) -> Result<Json<SyncCursor>, AppError> {
    let cursor = state.service.reset_cursor().await?;
    tracing::info!(
        baseline = cursor.last_sync_end_timestamp,
        "Sync cursor reset to baseline"
    );
    Ok(Json(cursor))
}

fn toggle_response(scheduler: &str, enabled: bool) -> Json<Value> {
    Json(json!({ "scheduler": scheduler, "enabled": enabled }))
}

pub async fn start_poller(State(state): State<AppState>) -> Json<Value> {
    state.control.set_poller(true);
    toggle_response("poller", true)
}

pub async fn stop_poller(State(state): State<AppState>) -> Json<Value> {
    state.control.set_poller(false);
    toggle_response("poller", false)
}

pub async fn start_checker(State(state): State<AppState>) -> Json<Value> {
    state.control.set_checker(true);
    toggle_response("checker", true)
}

pub async fn stop_checker(State(state): State<AppState>) -> Json<Value> {
    state.control.set_checker(false);
    toggle_response("checker", false)
}

pub async fn list_active(
    State(state): State<AppState>,
) -> Result<Json<ActiveIndexDocument>, AppError> {
    Ok(Json(state.service.active_index().await?))
}

pub async fn leave_document(
    State(state): State<AppState>,
) -> Result<Json<LeaveDocument>, AppError> {
    Ok(Json(state.service.leave_document().await?))
}

pub async fn openapi_document() -> Json<utoipa::openapi::OpenApi> {
    use utoipa::OpenApi as _;
    Json(crate::docs::ApiDoc::openapi())
}
