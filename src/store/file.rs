//! File-backed store: the whole key space lives in one JSON document.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use super::{MemoryStore, RecordStore};
use crate::error::StoreError;

pub struct FileStore {
    inner: MemoryStore,
    file_path: PathBuf,
}

impl FileStore {
    /// Load the store at `path`, or start empty if the file is missing or unreadable.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let file_path = path.as_ref().to_path_buf();

        let entries = match fs::read_to_string(&file_path) {
            Ok(content) => match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(map) => {
                    info!(target: "store", path = %file_path.display(), keys = map.len(), "Loaded record store");
                    map
                }
                Err(e) => {
                    error!(target: "store", path = %file_path.display(), error = %e, "Record store file is corrupt; starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                error!(target: "store", path = %file_path.display(), error = %e, "Failed to read record store; starting empty");
                BTreeMap::new()
            }
        };

        Self { inner: MemoryStore::from_entries(entries), file_path }
    }

    /// Rewrite the document. Written to a sibling temp file first so a crash
    /// never leaves a half-written store behind.
    fn persist(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self.inner.entries())?;
        let tmp = self.file_path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.file_path)?;
        Ok(())
    }
}

impl RecordStore for FileStore {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.inner.get_raw(key)
    }

    fn put_raw(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.inner.put_raw(key, value)?;
        self.persist()
    }

    fn remove(&mut self, key: &str) -> Result<bool, StoreError> {
        let removed = self.inner.remove(key)?;
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    fn list_keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.inner.list_keys_with_prefix(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreExt;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path().join("store.json"));
        assert!(store.list_keys_with_prefix("").is_empty());
    }

    #[test]
    fn test_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        {
            let mut store = FileStore::open(&path);
            store.put("progress:biology:5:b1:notes", &json!({ "xpAwarded": 20 })).unwrap();
            store.put("bookmarks", &json!([])).unwrap();
            assert!(store.remove("bookmarks").unwrap());
        }

        {
            let store = FileStore::open(&path);
            assert_eq!(store.list_keys_with_prefix("progress:").len(), 1);
            assert_eq!(
                store.get("progress:biology:5:b1:notes"),
                Some(json!({ "xpAwarded": 20 }))
            );
            assert!(store.get("bookmarks").is_none());
        }
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{{{ definitely not json").unwrap();

        let mut store = FileStore::open(&path);
        assert!(store.list_keys_with_prefix("").is_empty());

        // the next write replaces the corrupt document
        store.put_raw("k", "1".into()).unwrap();
        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get_raw("k").as_deref(), Some("1"));
    }
}
