use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::utils::time;

/// Cursor over the incremental poll window.
///
/// `last_sync_end_timestamp` is monotone: it advances only after a cycle
/// completes successfully, so a failed window is retried on the next tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SyncCursor {
    #[serde(rename = "lastSyncEndTimestamp")]
    pub last_sync_end_timestamp: i64,
    #[serde(rename = "lastSyncTime")]
    pub last_sync_time: String,
    #[serde(rename = "totalSynced")]
    pub total_synced: u64,
    #[serde(rename = "successfulSyncs")]
    pub successful_syncs: u64,
    #[serde(rename = "failedSyncs")]
    pub failed_syncs: u64,
}

impl SyncCursor {
    pub fn at_baseline(baseline: i64) -> Self {
        Self {
            last_sync_end_timestamp: baseline,
            last_sync_time: time::unix_to_iso(baseline),
            total_synced: 0,
            successful_syncs: 0,
            failed_syncs: 0,
        }
    }

    pub fn record_success(&mut self, window_end: i64, synced: u64) {
        self.last_sync_end_timestamp = window_end;
        self.last_sync_time = time::now_iso();
        self.total_synced += synced;
        self.successful_syncs += 1;
    }

    /// A failed cycle bumps the counter and leaves the window end alone.
    pub fn record_failure(&mut self) {
        self.failed_syncs += 1;
        self.last_sync_time = time::now_iso();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_advances_and_counts() {
        let mut cursor = SyncCursor::at_baseline(1_000);
        cursor.record_success(2_000, 5);
        assert_eq!(cursor.last_sync_end_timestamp, 2_000);
        assert_eq!(cursor.total_synced, 5);
        assert_eq!(cursor.successful_syncs, 1);
        assert_eq!(cursor.failed_syncs, 0);
    }

    #[test]
    fn failure_leaves_window_end_unchanged() {
        let mut cursor = SyncCursor::at_baseline(1_000);
        cursor.record_failure();
        assert_eq!(cursor.last_sync_end_timestamp, 1_000);
        assert_eq!(cursor.failed_syncs, 1);
    }

    #[test]
    fn cursor_serializes_with_camel_case_keys() {
        let cursor = SyncCursor::at_baseline(1_767_196_800);
        let value = serde_json::to_value(&cursor).unwrap();
        assert_eq!(value["lastSyncEndTimestamp"], 1_767_196_800i64);
        assert_eq!(value["successfulSyncs"], 0);
        assert_eq!(value["failedSyncs"], 0);
    }
}
