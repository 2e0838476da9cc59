//! Key/value record store.
//!
//! Values are JSON text under string keys, the same model as browser local
//! storage. Backends implement the raw `RecordStore` trait; typed access goes
//! through `StoreExt`, which every backend gets for free.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::StoreError;

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Raw storage contract. Writes replace the whole value under a key.
pub trait RecordStore: Send + Sync {
    /// Raw JSON text stored under `key`.
    fn get_raw(&self, key: &str) -> Option<String>;

    fn put_raw(&mut self, key: &str, value: String) -> Result<(), StoreError>;

    /// Returns true if a value was removed.
    fn remove(&mut self, key: &str) -> Result<bool, StoreError>;

    /// Keys starting with `prefix`, in lexicographic order.
    fn list_keys_with_prefix(&self, prefix: &str) -> Vec<String>;
}

/// JSON helpers layered over any `RecordStore`.
pub trait StoreExt: RecordStore {
    /// Parsed value under `key`. A corrupt value is logged and reported as absent.
    fn get(&self, key: &str) -> Option<Value> {
        self.get_json(key)
    }

    fn put(&mut self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.put_json(key, value)
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_raw(key)?;
        match serde_json::from_str::<T>(&raw) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(target: "store", %key, error = %e, "Discarding malformed stored value");
                None
            }
        }
    }

    fn put_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.put_raw(key, raw)
    }
}

impl<S: RecordStore + ?Sized> StoreExt for S {}

/// Storage key naming.
pub mod keys {
    pub const PROGRESS_PREFIX: &str = "progress:";
    pub const BOOKMARKS: &str = "bookmarks";
    pub const RECENT_VISITS: &str = "recent_visits";
    pub const UNLOCKED_ACHIEVEMENTS: &str = "achievements:unlocked";

    pub fn progress(subject: &str, module: u32, dotpoint: &str, section: &str) -> String {
        format!("{PROGRESS_PREFIX}{subject}:{module}:{dotpoint}:{section}")
    }

    /// Prefix covering every progress key of one subject. The trailing colon keeps
    /// `bio` from matching `biology`.
    pub fn subject_prefix(subject: &str) -> String {
        format!("{PROGRESS_PREFIX}{subject}:")
    }

    /// Subject key embedded in a progress key.
    pub fn subject_of(progress_key: &str) -> Option<&str> {
        progress_key
            .strip_prefix(PROGRESS_PREFIX)?
            .split(':')
            .next()
            .filter(|s| !s.is_empty())
    }
}
