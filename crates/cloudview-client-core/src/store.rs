use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

const STORE_SCHEMA_VERSION: u32 = 1;
pub const STORE_FILE_NAME: &str = "cloudview-store.v1.json";

/// Durable, synchronous string-keyed storage surviving reloads.
///
/// The UI thread is the only writer, so there is no locking discipline and
/// no cross-key transaction. A full or disabled medium must not surface as
/// an error: `set` degrades silently and callers behave as if nothing was
/// persisted.
pub trait KeyValueStore {
    fn set(&self, key: &str, value: &str);
    fn get(&self, key: &str) -> Option<String>;
    fn remove(&self, key: &str);
}

impl<K: KeyValueStore + ?Sized> KeyValueStore for &K {
    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value);
    }

    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key);
    }
}

impl<K: KeyValueStore + ?Sized> KeyValueStore for Rc<K> {
    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value);
    }

    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key);
    }
}

impl<K: KeyValueStore + ?Sized> KeyValueStore for Arc<K> {
    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value);
    }

    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key);
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn set(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    version: u32,
    entries: BTreeMap<String, String>,
}

/// File-backed store: one versioned JSON document holding every key.
///
/// Loaded once on open; rewritten in full on each mutation. A missing,
/// unreadable, or mismatched-version file yields an empty store rather
/// than an error, and a failed rewrite is logged and swallowed so the
/// session keeps its in-memory view.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    entries: RefCell<BTreeMap<String, String>>,
}

impl FileKeyValueStore {
    pub fn open(path: PathBuf) -> Self {
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => {
                return Self {
                    path,
                    entries: RefCell::new(BTreeMap::new()),
                };
            }
        };
        let parsed = serde_json::from_str::<StoreDocument>(raw.as_str());
        let mut entries = BTreeMap::new();
        if let Ok(document) = parsed
            && document.version == STORE_SCHEMA_VERSION
        {
            entries = document.entries;
        }
        Self {
            path,
            entries: RefCell::new(entries),
        }
    }

    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn flush(&self) {
        let document = StoreDocument {
            version: STORE_SCHEMA_VERSION,
            entries: self.entries.borrow().clone(),
        };
        let serialized = match serde_json::to_string(&document) {
            Ok(serialized) => serialized,
            Err(error) => {
                tracing::warn!(%error, "failed to serialize key-value store document");
                return;
            }
        };
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Err(error) = fs::write(&self.path, serialized) {
            tracing::warn!(%error, path = %self.path.display(), "key-value store write failed");
        }
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn set(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.flush();
    }

    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn remove(&self, key: &str) {
        let removed = self.entries.borrow_mut().remove(key);
        if removed.is_some() {
            self.flush();
        }
    }
}
