//! File-backed JSON stores for the leave document, the active index, and
//! the sync cursor.
//!
//! All writes go through an atomic temp-file + rename so a crash never
//! leaves a torn document. The sync lock (not the stores) serializes
//! writers; reads hand out deep copies.

pub mod active;
pub mod cursor;
pub mod leave;

pub use active::ActiveIndexStore;
pub use cursor::CursorStore;
pub use leave::LeaveStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use crate::error::SyncError;

/// Reads a JSON document, returning `None` when the file does not exist yet.
pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, SyncError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Pretty-prints to a sibling temp file, then renames over the target.
pub(crate) async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn read_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let loaded: Option<BTreeMap<String, String>> = read_json(&path).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("doc.json");

        let mut doc = BTreeMap::new();
        doc.insert("k".to_string(), "v".to_string());
        write_json_atomic(&path, &doc).await.unwrap();

        let loaded: Option<BTreeMap<String, String>> = read_json(&path).await.unwrap();
        assert_eq!(loaded.unwrap(), doc);

        // No temp file left behind.
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn write_is_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let mut doc = BTreeMap::new();
        doc.insert("k".to_string(), "v".to_string());
        write_json_atomic(&path, &doc).await.unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(raw.contains('\n'));
    }
}
