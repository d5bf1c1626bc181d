#![allow(dead_code)] // OpenAPI doc stubs are only referenced by utoipa macros.

use utoipa::OpenApi;

use crate::handlers::admin::SyncStatusResponse;
use crate::models::{
    ActiveIndexDocument, ApprovalRecord, EmployeeInfo, IndexMetadata, LeaveDocument, LeaveStatus,
    SyncCursor,
};
use crate::sync::{CheckSummary, CycleSummary};

#[derive(OpenApi)]
#[openapi(
    paths(
        sync_status_doc,
        trigger_sync_doc,
        trigger_check_doc,
        reset_cursor_doc,
        list_active_doc,
        leave_document_doc,
    ),
    components(schemas(
        SyncStatusResponse,
        CycleSummary,
        CheckSummary,
        SyncCursor,
        ActiveIndexDocument,
        ApprovalRecord,
        IndexMetadata,
        LeaveDocument,
        EmployeeInfo,
        LeaveStatus,
    )),
    tags((name = "sync", description = "Approval sync control plane"))
)]
pub struct ApiDoc;

#[utoipa::path(
    get,
    path = "/api/sync/status",
    tag = "sync",
    responses((status = 200, description = "Cursor, scheduler, and lock state", body = SyncStatusResponse))
)]
async fn sync_status_doc() {}

#[utoipa::path(
    post,
    path = "/api/sync/trigger",
    tag = "sync",
    responses(
        (status = 200, description = "One incremental cycle ran", body = CycleSummary),
        (status = 409, description = "A sync already holds the lock"),
        (status = 429, description = "Triggered again within 10 seconds"),
    )
)]
async fn trigger_sync_doc() {}

#[utoipa::path(
    post,
    path = "/api/sync/check",
    tag = "sync",
    responses(
        (status = 200, description = "One status-check cycle ran", body = CheckSummary),
        (status = 409, description = "A sync already holds the lock"),
    )
)]
async fn trigger_check_doc() {}

#[utoipa::path(
    post,
    path = "/api/sync/reset",
    tag = "sync",
    responses(
        (status = 200, description = "Cursor rewound to the baseline", body = SyncCursor),
        (status = 409, description = "A sync already holds the lock"),
    )
)]
async fn reset_cursor_doc() {}

#[utoipa::path(
    get,
    path = "/api/sync/active",
    tag = "sync",
    responses((status = 200, description = "The active-approvals index", body = ActiveIndexDocument))
)]
async fn list_active_doc() {}

#[utoipa::path(
    get,
    path = "/api/leave",
    tag = "sync",
    responses((status = 200, description = "The synced leave document", body = LeaveDocument))
)]
async fn leave_document_doc() {}
