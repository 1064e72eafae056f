//! Key/value blob storage.
//!
//! The store only needs single-key operations: read a blob, write a blob,
//! delete a key, list keys. Every stored blob carries a revision taken from
//! a store-wide counter that only grows, so writers can detect that somebody
//! else wrote the key since they read it, even across a delete and re-create.
//!
//! Backends:
//! - [`MemoryBackend`]: process-local, used by tests and embedders
//! - [`sqlite::SqliteBackend`]: one `kv` table in a local SQLite file

pub mod sqlite;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Result, StoreError};

pub use sqlite::SqliteBackend;

pub type Revision = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stored {
    pub value: String,
    pub revision: Revision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Written(Revision),
    /// The key's revision no longer matched; nothing was written.
    Conflict,
}

pub trait Backend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Stored>>;

    /// Write `value` if the key is still at `expected`.
    ///
    /// `expected == None` means the key must not exist yet. A write either
    /// replaces the whole blob or leaves the old one untouched.
    fn put(&self, key: &str, value: &str, expected: Option<Revision>) -> Result<PutOutcome>;

    /// Returns true if the key existed.
    fn delete(&self, key: &str) -> Result<bool>;

    /// All keys starting with `prefix`, sorted.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

impl<B: Backend + ?Sized> Backend for Arc<B> {
    fn get(&self, key: &str) -> Result<Option<Stored>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &str, expected: Option<Revision>) -> Result<PutOutcome> {
        (**self).put(key, value, expected)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        (**self).delete(key)
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        (**self).keys_with_prefix(prefix)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: HashMap<String, Stored>,
    /// Last revision handed out. Store-wide, so it survives deletes.
    last_revision: Revision,
}

impl MemoryState {
    fn write(&mut self, key: &str, value: &str) -> Revision {
        self.last_revision += 1;
        let revision = self.last_revision;
        self.entries.insert(key.to_string(), Stored { value: value.to_string(), revision });
        revision
    }
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state.lock()
            .map_err(|_| StoreError::Backend("memory backend lock poisoned".to_string()))
    }

    /// Store a raw blob, bypassing revision checks.
    ///
    /// Used to seed legacy or damaged blobs.
    pub fn insert_raw(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.write(key, value);
        Ok(())
    }
}

impl Backend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<Stored>> {
        Ok(self.lock()?.entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str, expected: Option<Revision>) -> Result<PutOutcome> {
        let mut state = self.lock()?;
        let current = state.entries.get(key).map(|s| s.revision);
        if current != expected {
            return Ok(PutOutcome::Conflict);
        }

        Ok(PutOutcome::Written(state.write(key, value)))
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.lock()?.entries.remove(key).is_some())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.lock()?
            .entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_write_requires_absent_key() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.put("k", "a", None).unwrap(), PutOutcome::Written(1));
        assert_eq!(backend.put("k", "b", None).unwrap(), PutOutcome::Conflict);
        assert_eq!(backend.get("k").unwrap().unwrap().value, "a");
    }

    #[test]
    fn stale_revision_is_rejected() {
        let backend = MemoryBackend::new();
        backend.put("k", "a", None).unwrap();
        assert_eq!(backend.put("k", "b", Some(1)).unwrap(), PutOutcome::Written(2));
        assert_eq!(backend.put("k", "c", Some(1)).unwrap(), PutOutcome::Conflict);

        let stored = backend.get("k").unwrap().unwrap();
        assert_eq!(stored, Stored { value: "b".to_string(), revision: 2 });
    }

    #[test]
    fn recreated_key_rejects_writer_from_before_delete() {
        let backend = MemoryBackend::new();
        let PutOutcome::Written(read_at) = backend.put("k", "stale-base", None).unwrap() else {
            panic!("first write conflicted");
        };
        backend.delete("k").unwrap();
        backend.put("k", "fresh", None).unwrap();

        assert_eq!(backend.put("k", "stale-writer", Some(read_at)).unwrap(), PutOutcome::Conflict);
        assert_eq!(backend.get("k").unwrap().unwrap().value, "fresh");
    }

    #[test]
    fn prefix_listing_is_sorted_and_filtered() {
        let backend = MemoryBackend::new();
        for key in ["p_b", "other", "p_a", "px"] {
            backend.insert_raw(key, "{}").unwrap();
        }
        assert_eq!(backend.keys_with_prefix("p_").unwrap(), vec!["p_a", "p_b"]);
    }

    #[test]
    fn delete_reports_presence() {
        let backend = MemoryBackend::new();
        backend.insert_raw("k", "{}").unwrap();
        assert!(backend.delete("k").unwrap());
        assert!(!backend.delete("k").unwrap());
        assert!(backend.get("k").unwrap().is_none());
    }
}
