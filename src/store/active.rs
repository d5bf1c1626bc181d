use std::path::PathBuf;

use crate::error::SyncError;
use crate::models::ActiveIndexDocument;

/// Load/save of the active-approvals shadow index.
pub struct ActiveIndexStore {
    path: PathBuf,
    cutoff_timestamp: i64,
}

impl ActiveIndexStore {
    pub fn new(path: PathBuf, cutoff_timestamp: i64) -> Self {
        Self {
            path,
            cutoff_timestamp,
        }
    }

    /// Returns the stored index, or an empty one carrying the configured
    /// cutoff before the first write.
    pub async fn load(&self) -> Result<ActiveIndexDocument, SyncError> {
        Ok(super::read_json(&self.path)
            .await?
            .unwrap_or_else(|| ActiveIndexDocument::empty(self.cutoff_timestamp)))
    }

    pub async fn save(&self, doc: &ActiveIndexDocument) -> Result<(), SyncError> {
        super::write_json_atomic(&self.path, doc).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApprovalRecord, LeaveStatus};
    use crate::utils::time;

    fn record(sp_no: &str, apply_time: i64) -> ApprovalRecord {
        ApprovalRecord {
            sp_no: sp_no.into(),
            userid: "u1".into(),
            name: "Alice".into(),
            department: "Eng".into(),
            apply_time,
            submit_time: time::unix_to_iso(apply_time),
            current_status: LeaveStatus::Pending.code(),
            status_text: LeaveStatus::Pending.text().into(),
            leave_dates: vec!["2026-2.14".into()],
            last_checked: apply_time,
            last_checked_time: time::unix_to_iso(apply_time),
        }
    }

    #[tokio::test]
    async fn load_before_first_write_carries_cutoff() {
        let dir = tempfile::tempdir().unwrap();
        let store = ActiveIndexStore::new(dir.path().join("active.json"), 1_500);
        let index = store.load().await.unwrap();
        assert_eq!(index.metadata.cutoff_timestamp, 1_500);
        assert!(index.approvals.is_empty());
    }

    #[tokio::test]
    async fn save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ActiveIndexStore::new(dir.path().join("active.json"), 1_000);

        let mut index = store.load().await.unwrap();
        assert!(index.insert(record("A1", 2_000)));
        store.save(&index).await.unwrap();

        let reloaded = store.load().await.unwrap();
        assert_eq!(reloaded, index);
        assert!(reloaded.contains("A1"));
    }
}
