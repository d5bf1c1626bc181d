use std::path::PathBuf;

use crate::error::SyncError;
use crate::models::SyncCursor;

/// Load/save of the incremental sync cursor.
pub struct CursorStore {
    path: PathBuf,
    baseline: i64,
}

impl CursorStore {
    pub fn new(path: PathBuf, baseline: i64) -> Self {
        Self { path, baseline }
    }

    pub async fn load(&self) -> Result<SyncCursor, SyncError> {
        Ok(super::read_json(&self.path)
            .await?
            .unwrap_or_else(|| SyncCursor::at_baseline(self.baseline)))
    }

    pub async fn save(&self, cursor: &SyncCursor) -> Result<(), SyncError> {
        super::write_json_atomic(&self.path, cursor).await
    }

    /// Rewinds to the configured baseline, wiping counters.
    pub async fn reset(&self) -> Result<SyncCursor, SyncError> {
        let cursor = SyncCursor::at_baseline(self.baseline);
        self.save(&cursor).await?;
        Ok(cursor)
    }
}
