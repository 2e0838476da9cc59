//! In-memory backend, used by tests and when no `STORE_PATH` is configured.

use std::collections::BTreeMap;

use super::RecordStore;
use crate::error::StoreError;

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    /// Byte cap over keys + values; `None` means unbounded.
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects writes once the total size would exceed `quota` bytes,
    /// the way a browser in private mode does.
    pub fn with_quota(quota: usize) -> Self {
        Self { entries: BTreeMap::new(), quota: Some(quota) }
    }

    pub(super) fn from_entries(entries: BTreeMap<String, String>) -> Self {
        Self { entries, quota: None }
    }

    pub(super) fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    fn used_bytes_with(&self, key: &str, value: &str) -> usize {
        let others: usize = self
            .entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum();
        others + key.len() + value.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl RecordStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn put_raw(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        if let Some(quota) = self.quota {
            let used = self.used_bytes_with(key, &value);
            if used > quota {
                return Err(StoreError::QuotaExceeded { used, quota });
            }
        }
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.remove(key).is_some())
    }

    fn list_keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect()
    }
}
