//! The shared engine behind all three update sources.
//!
//! Every write to the leave store or the active index happens inside a
//! method of [`SyncService`] while its non-blocking lock is held. The
//! refetched approval detail is authoritative everywhere; callback status
//! hints only steer filtering.

use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

use crate::error::SyncError;
use crate::models::{
    ActiveIndexDocument, ApprovalRecord, EmployeeInfo, LeaveDocument, LeaveStatus, SyncCursor,
};
use crate::store::{ActiveIndexStore, CursorStore, LeaveStore};
use crate::sync::lock::SyncLock;
use crate::sync::{merger, transform};
use crate::utils::time;
use crate::wecom::{batch, split_window, ApprovalDetail, ApprovalPlatform};

/// Pause between consecutive list chunks of one logical window.
const CHUNK_PAUSE: Duration = Duration::from_millis(500);
/// Upstream record type this system tracks.
const LEAVE_RECORD: &str = "leave";

/// Result of one incremental poll cycle.
#[derive(Debug, Default, Clone, Serialize, ToSchema)]
pub struct CycleSummary {
    pub window_start: i64,
    pub window_end: i64,
    pub listed: usize,
    pub fetched: usize,
    pub failed_items: usize,
    pub new_employees: usize,
    pub updated_employees: usize,
    pub tracked: usize,
    /// True when the window was empty and nothing ran.
    pub skipped: bool,
}

/// Result of one status-check cycle.
#[derive(Debug, Default, Clone, Serialize, ToSchema)]
pub struct CheckSummary {
    pub checked: usize,
    pub transitions: usize,
    pub removed: usize,
    pub remaining: usize,
}

pub struct SyncService {
    platform: Arc<dyn ApprovalPlatform>,
    leave: LeaveStore,
    active: ActiveIndexStore,
    cursor: CursorStore,
    lock: SyncLock,
    tz: Tz,
}

impl SyncService {
    pub fn new(
        platform: Arc<dyn ApprovalPlatform>,
        leave: LeaveStore,
        active: ActiveIndexStore,
        cursor: CursorStore,
        tz: Tz,
    ) -> Self {
        Self {
            platform,
            leave,
            active,
            cursor,
            lock: SyncLock::new(),
            tz,
        }
    }

    pub fn lock(&self) -> &SyncLock {
        &self.lock
    }

    pub fn platform(&self) -> &dyn ApprovalPlatform {
        self.platform.as_ref()
    }

    pub async fn leave_document(&self) -> Result<LeaveDocument, SyncError> {
        self.leave.load().await
    }

    pub async fn active_index(&self) -> Result<ActiveIndexDocument, SyncError> {
        self.active.load().await
    }

    pub async fn current_cursor(&self) -> Result<SyncCursor, SyncError> {
        self.cursor.load().await
    }

    /// Rewinds the cursor to the configured baseline. Takes the lock like
    /// every other control operation.
    pub async fn reset_cursor(&self) -> Result<SyncCursor, SyncError> {
        let _guard = self.lock.try_acquire().ok_or(SyncError::LockBusy)?;
        self.cursor.reset().await
    }

    /// One incremental poll over `[cursor, now]`. Advances the cursor only
    /// when the whole cycle succeeds; a failure bumps the failure counter
    /// and leaves the window for the next tick.
    pub async fn run_incremental_cycle(&self) -> Result<CycleSummary, SyncError> {
        let _guard = self.lock.try_acquire().ok_or(SyncError::LockBusy)?;

        let mut cursor = self.cursor.load().await?;
        let start = cursor.last_sync_end_timestamp;
        let end = time::now_unix();
        if end <= start {
            tracing::debug!(start, end, "Incremental window empty, skipping cycle");
            return Ok(CycleSummary {
                window_start: start,
                window_end: end,
                skipped: true,
                ..CycleSummary::default()
            });
        }

        match self.incremental_window(start, end).await {
            Ok(summary) => {
                cursor.record_success(end, summary.fetched as u64);
                self.cursor.save(&cursor).await?;
                tracing::info!(
                    start,
                    end,
                    listed = summary.listed,
                    fetched = summary.fetched,
                    tracked = summary.tracked,
                    "Incremental sync cycle completed"
                );
                Ok(summary)
            }
            Err(err) => {
                cursor.record_failure();
                if let Err(save_err) = self.cursor.save(&cursor).await {
                    tracing::error!(%save_err, "Failed to persist cursor failure counter");
                }
                tracing::warn!(start, end, %err, "Incremental sync cycle failed");
                Err(err)
            }
        }
    }

    async fn incremental_window(&self, start: i64, end: i64) -> Result<CycleSummary, SyncError> {
        let chunks = split_window(start, end);
        let mut sp_nos: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for (i, (chunk_start, chunk_end)) in chunks.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(CHUNK_PAUSE).await;
            }
            for sp_no in self
                .platform
                .list_approval_numbers(*chunk_start, *chunk_end)
                .await?
            {
                if seen.insert(sp_no.clone()) {
                    sp_nos.push(sp_no);
                }
            }
        }

        let outcome = batch::fetch_details_bulk(self.platform.as_ref(), &sp_nos).await;
        let relevant: Vec<ApprovalDetail> = outcome
            .details
            .into_iter()
            .filter(|detail| {
                detail.sp_name == LEAVE_RECORD
                    && matches!(
                        LeaveStatus::from_code(detail.sp_status),
                        Some(LeaveStatus::Pending | LeaveStatus::Approved)
                    )
            })
            .collect();

        let incoming =
            transform::build_batch(&relevant, self.platform.as_ref(), &self.tz).await;
        let mut doc = self.leave.load().await?;
        let stats = merger::merge_batch(&mut doc, &incoming);
        self.leave.save(&mut doc).await?;

        let mut index = self.active.load().await?;
        let now = time::now_unix();
        let mut tracked = 0;
        for detail in &relevant {
            if detail.sp_status != LeaveStatus::Pending.code() || index.contains(&detail.sp_no) {
                continue;
            }
            if let Some(record) = self.record_from_detail(detail, &incoming, now) {
                if index.insert(record) {
                    tracked += 1;
                }
            }
        }
        self.active.save(&index).await?;

        Ok(CycleSummary {
            window_start: start,
            window_end: end,
            listed: sp_nos.len(),
            fetched: relevant.len(),
            failed_items: outcome.failed,
            new_employees: stats.new_employees,
            updated_employees: stats.updated_employees,
            tracked,
            skipped: false,
        })
    }

    fn record_from_detail(
        &self,
        detail: &ApprovalDetail,
        incoming: &crate::models::LeaveBatch,
        now: i64,
    ) -> Option<ApprovalRecord> {
        let userid = detail.applier_userid()?.to_string();
        let slots = transform::detail_slots(detail, &self.tz);
        if slots.is_empty() {
            return None;
        }
        let info = incoming
            .employee_info
            .get(&userid)
            .cloned()
            .unwrap_or_else(|| EmployeeInfo {
                name: transform::UNKNOWN_NAME.to_string(),
                department: transform::UNKNOWN_NAME.to_string(),
            });

        Some(ApprovalRecord {
            sp_no: detail.sp_no.clone(),
            userid,
            name: info.name,
            department: info.department,
            apply_time: detail.apply_time,
            submit_time: time::unix_to_iso(detail.apply_time),
            current_status: LeaveStatus::Pending.code(),
            status_text: LeaveStatus::Pending.text().to_string(),
            leave_dates: slots,
            last_checked: now,
            last_checked_time: time::unix_to_iso(now),
        })
    }

    /// One status-check pass over the active index. An empty index
    /// returns without touching the lock.
    pub async fn run_status_check(&self) -> Result<CheckSummary, SyncError> {
        if self.active.load().await?.approvals.is_empty() {
            return Ok(CheckSummary::default());
        }

        let _guard = self.lock.try_acquire().ok_or(SyncError::LockBusy)?;

        // Reload under the lock; another writer may have run in between.
        let mut index = self.active.load().await?;
        let sp_nos: Vec<String> = index.approvals.keys().cloned().collect();
        let outcome = batch::fetch_details_status(self.platform.as_ref(), &sp_nos).await;

        let mut doc = self.leave.load().await?;
        let mut doc_changed = false;
        let mut transitions = 0;
        let mut removed = 0;
        let now = time::now_unix();

        for detail in &outcome.details {
            let transition = {
                let Some(entry) = index.approvals.get_mut(&detail.sp_no) else {
                    continue;
                };
                if detail.sp_status == entry.current_status {
                    entry.touch(now);
                    continue;
                }
                let Some(status) = LeaveStatus::from_code(detail.sp_status) else {
                    tracing::debug!(
                        sp_no = %detail.sp_no,
                        code = detail.sp_status,
                        "Ignoring unknown status during check"
                    );
                    continue;
                };
                let userid = entry.userid.clone();
                let slots = entry.leave_dates.clone();
                if !status.is_terminal() {
                    entry.set_status(status, now);
                }
                (status, userid, slots)
            };

            let (status, userid, slots) = transition;
            for slot in &slots {
                doc.set_slot(&userid, slot, status.text());
            }
            doc_changed = true;
            transitions += 1;
            if status.is_terminal() {
                index.approvals.remove(&detail.sp_no);
                removed += 1;
                tracing::info!(
                    sp_no = %detail.sp_no,
                    status = status.text(),
                    "Approval reached terminal status, untracking"
                );
            }
        }

        if doc_changed {
            self.leave.save(&mut doc).await?;
        }
        self.active.save(&index).await?;

        Ok(CheckSummary {
            checked: outcome.details.len(),
            transitions,
            removed,
            remaining: index.approvals.len(),
        })
    }

    /// Dispatches one callback event. The caller must hold the sync lock;
    /// the detail is refetched because the pushed status is only a hint.
    pub async fn dispatch_event_locked(&self, sp_no: &str) -> Result<(), SyncError> {
        let detail = self.platform.approval_detail(sp_no).await?;
        if !detail.sp_name.is_empty() && detail.sp_name != LEAVE_RECORD {
            tracing::debug!(sp_no, sp_name = %detail.sp_name, "Ignoring non-leave approval");
            return Ok(());
        }
        let Some(status) = LeaveStatus::from_code(detail.sp_status) else {
            tracing::debug!(sp_no, code = detail.sp_status, "Ignoring unknown status code");
            return Ok(());
        };

        match status {
            LeaveStatus::Pending => self.dispatch_pending(&detail).await,
            LeaveStatus::Approved => self.dispatch_approved(&detail).await,
            other => self.dispatch_terminal(&detail, other).await,
        }
    }

    async fn dispatch_pending(&self, detail: &ApprovalDetail) -> Result<(), SyncError> {
        let details = std::slice::from_ref(detail);
        let incoming = transform::build_batch(details, self.platform.as_ref(), &self.tz).await;
        if incoming.is_empty() {
            return Ok(());
        }

        let mut doc = self.leave.load().await?;
        merger::merge_batch(&mut doc, &incoming);
        self.leave.save(&mut doc).await?;

        let mut index = self.active.load().await?;
        if !index.contains(&detail.sp_no) {
            let now = time::now_unix();
            if let Some(record) = self.record_from_detail(detail, &incoming, now) {
                if index.insert(record) {
                    self.active.save(&index).await?;
                    tracing::info!(sp_no = %detail.sp_no, "Tracking new pending approval");
                }
            }
        }
        Ok(())
    }

    async fn dispatch_approved(&self, detail: &ApprovalDetail) -> Result<(), SyncError> {
        let mut index = self.active.load().await?;
        if let Some(entry) = index.approvals.remove(&detail.sp_no) {
            // Fast path: the stored slots are enough.
            let mut doc = self.leave.load().await?;
            for slot in &entry.leave_dates {
                doc.set_slot(&entry.userid, slot, LeaveStatus::Approved.text());
            }
            self.leave.save(&mut doc).await?;
            self.active.save(&index).await?;
            tracing::info!(sp_no = %detail.sp_no, "Approval confirmed, untracked");
            return Ok(());
        }

        let details = std::slice::from_ref(detail);
        let incoming = transform::build_batch(details, self.platform.as_ref(), &self.tz).await;
        if incoming.is_empty() {
            return Ok(());
        }
        let mut doc = self.leave.load().await?;
        merger::merge_batch(&mut doc, &incoming);
        self.leave.save(&mut doc).await
    }

    async fn dispatch_terminal(
        &self,
        detail: &ApprovalDetail,
        status: LeaveStatus,
    ) -> Result<(), SyncError> {
        let mut index = self.active.load().await?;
        if let Some(entry) = index.approvals.remove(&detail.sp_no) {
            let mut doc = self.leave.load().await?;
            for slot in &entry.leave_dates {
                doc.set_slot(&entry.userid, slot, status.text());
            }
            self.leave.save(&mut doc).await?;
            self.active.save(&index).await?;
            tracing::info!(
                sp_no = %detail.sp_no,
                status = status.text(),
                "Tracked approval reached terminal status"
            );
            return Ok(());
        }

        // Untracked approval: only touch employees the store already knows.
        let Some(userid) = detail.applier_userid() else {
            return Ok(());
        };
        let slots = transform::detail_slots(detail, &self.tz);
        if slots.is_empty() {
            return Ok(());
        }
        let mut doc = self.leave.load().await?;
        if !doc.employee_info.contains_key(userid) && !doc.leave_data.contains_key(userid) {
            tracing::debug!(sp_no = %detail.sp_no, userid, "Terminal event for unknown employee, skipping");
            return Ok(());
        }
        for slot in &slots {
            doc.set_slot(userid, slot, status.text());
        }
        self.leave.save(&mut doc).await
    }
}
