use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::models::leave::LeaveStatus;
use crate::utils::time;

/// One tracked pending approval in the active index.
///
/// Carries enough to perform a terminal transition without another detail
/// fetch: the owner, the slots it contributed, and the submit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ApprovalRecord {
    pub sp_no: String,
    pub userid: String,
    pub name: String,
    pub department: String,
    pub apply_time: i64,
    pub submit_time: String,
    pub current_status: i64,
    pub status_text: String,
    pub leave_dates: Vec<String>,
    pub last_checked: i64,
    pub last_checked_time: String,
}

impl ApprovalRecord {
    pub fn touch(&mut self, now_unix: i64) {
        self.last_checked = now_unix;
        self.last_checked_time = time::unix_to_iso(now_unix);
    }

    pub fn set_status(&mut self, status: LeaveStatus, now_unix: i64) {
        self.current_status = status.code();
        self.status_text = status.text().to_string();
        self.touch(now_unix);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IndexMetadata {
    #[serde(rename = "cutoffTimestamp")]
    pub cutoff_timestamp: i64,
    #[serde(rename = "cutoffDate")]
    pub cutoff_date: String,
}

/// The persisted shadow index of pending approvals, keyed by approval
/// number. Nothing submitted before the cutoff may be inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ActiveIndexDocument {
    pub metadata: IndexMetadata,
    #[serde(default)]
    pub approvals: BTreeMap<String, ApprovalRecord>,
}

impl ActiveIndexDocument {
    pub fn empty(cutoff_timestamp: i64) -> Self {
        Self {
            metadata: IndexMetadata {
                cutoff_timestamp,
                cutoff_date: time::unix_to_iso(cutoff_timestamp),
            },
            approvals: BTreeMap::new(),
        }
    }

    pub fn contains(&self, sp_no: &str) -> bool {
        self.approvals.contains_key(sp_no)
    }

    /// Inserts a pending approval, refusing anything submitted before the
    /// cutoff.
    pub fn insert(&mut self, record: ApprovalRecord) -> bool {
        if record.apply_time < self.metadata.cutoff_timestamp {
            return false;
        }
        self.approvals.insert(record.sp_no.clone(), record);
        true
    }
}
