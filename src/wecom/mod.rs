//! Client for the WeCom approval platform: token issuance, windowed
//! approval-list queries, detail fetches, and cached user/department
//! lookups, plus the batch fetching modes used by the pollers.

pub mod batch;
pub mod client;
pub mod types;

pub use client::WecomClient;
pub use types::{ApprovalDetail, UserProfile};

use async_trait::async_trait;

use crate::error::SyncError;

/// Seconds in the largest window the approval-list endpoint accepts.
pub const MAX_WINDOW_SECS: i64 = 31 * 86_400;

/// The upstream surface the sync engine consumes. `WecomClient` is the
/// production implementation; tests substitute a scripted double.
#[async_trait]
pub trait ApprovalPlatform: Send + Sync {
    /// Approval numbers of leave records inside `[start, end]` (Unix
    /// seconds). The window must not exceed [`MAX_WINDOW_SECS`].
    async fn list_approval_numbers(&self, start: i64, end: i64) -> Result<Vec<String>, SyncError>;

    /// Full detail for one approval number.
    async fn approval_detail(&self, sp_no: &str) -> Result<ApprovalDetail, SyncError>;

    /// Cached user lookup; `None` on any failure (callers fall back to
    /// a placeholder name).
    async fn user(&self, userid: &str) -> Option<UserProfile>;

    /// Cached department-name lookup; `None` on any failure.
    async fn department_name(&self, dept_id: i64) -> Option<String>;
}

/// Splits `[start, end]` into non-overlapping chunks no longer than the
/// 31-day cap, with 1-second boundaries between consecutive chunks.
pub fn split_window(start: i64, end: i64) -> Vec<(i64, i64)> {
    let mut chunks = Vec::new();
    let mut chunk_start = start;
    while chunk_start <= end {
        let chunk_end = (chunk_start + MAX_WINDOW_SECS).min(end);
        chunks.push((chunk_start, chunk_end));
        if chunk_end == end {
            break;
        }
        chunk_start = chunk_end + 1;
    }
    chunks
}
