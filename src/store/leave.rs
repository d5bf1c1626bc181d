use std::path::PathBuf;

use crate::error::SyncError;
use crate::models::LeaveDocument;
use crate::utils::time;

/// Load/save of the single leave document. The sync lock is the only
/// thing that may call [`LeaveStore::save`].
pub struct LeaveStore {
    path: PathBuf,
}

impl LeaveStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns the stored document, or an empty one before the first write.
    pub async fn load(&self) -> Result<LeaveDocument, SyncError> {
        Ok(super::read_json(&self.path).await?.unwrap_or_default())
    }

    /// Persists the document, stamping a fresh `updatedAt`.
    pub async fn save(&self, doc: &mut LeaveDocument) -> Result<(), SyncError> {
        doc.updated_at = time::now_iso();
        super::write_json_atomic(&self.path, doc).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmployeeInfo;

    #[tokio::test]
    async fn load_before_first_write_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LeaveStore::new(dir.path().join("leave_data.json"));
        let doc = store.load().await.unwrap();
        assert!(doc.leave_data.is_empty());
        assert!(doc.employee_info.is_empty());
    }

    #[tokio::test]
    async fn save_stamps_updated_at() {
        let dir = tempfile::tempdir().unwrap();
        let store = LeaveStore::new(dir.path().join("leave_data.json"));

        let mut doc = LeaveDocument::default();
        doc.set_slot("u1", "2026-3.1", "Approved");
        doc.employee_info.insert(
            "u1".into(),
            EmployeeInfo {
                name: "Alice".into(),
                department: "Eng".into(),
            },
        );
        store.save(&mut doc).await.unwrap();
        assert!(!doc.updated_at.is_empty());

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, doc);
        assert_eq!(loaded.slot_status("u1", "2026-3.1"), Some("Approved"));
    }
}
