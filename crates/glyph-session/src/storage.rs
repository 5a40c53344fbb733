use std::sync::{Arc, Mutex, MutexGuard};

use glyph_core::path_contained_in;
use serde::{Deserialize, Serialize};

use crate::lru::LruMap;
use crate::snapshot::{SessionSnapshot, SESSION_SCHEMA_VERSION};

/// Default bound on cached paths. Classification for paths evicted past this
/// bound is recomputed on next access.
pub const DEFAULT_CAPACITY: usize = 5000;

/// An icon as remembered by the session cache: enough to re-apply display
/// classes without re-running the strategy pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredIcon {
    /// Priority of the strategy that committed the icon.
    pub priority: u8,
    /// The icon's index in the rule table.
    pub index: usize,
    /// Display classes as applied (colour variant included when it was on).
    pub classes: Vec<String>,
}

/// Cached state for one absolute path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub icon: Option<StoredIcon>,
    pub inode: Option<u64>,
}

impl Entry {
    /// Whether the entry holds anything worth keeping.
    pub fn has_data(&self) -> bool {
        self.icon.is_some() || self.inode.is_some()
    }
}

struct StorageInner {
    paths: LruMap<String, Entry>,
    locked: bool,
}

/// The session-scoped, path-keyed icon cache.
///
/// All mutation funnels through methods gated by the `locked` flag: once
/// [`Storage::lock`] is called (shutdown), in-flight work can no longer write
/// into a cache that is about to be serialized and discarded.
pub struct Storage {
    inner: Mutex<StorageInner>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock_inner();
        f.debug_struct("Storage")
            .field("entries", &inner.paths.len())
            .field("locked", &inner.locked)
            .finish()
    }
}

impl Storage {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(StorageInner {
                paths: LruMap::new(capacity),
                locked: false,
            }),
        })
    }

    pub fn with_default_capacity() -> Arc<Self> {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Restores a previous session's snapshot.
    ///
    /// A version mismatch discards everything and starts cold; a partially
    /// restored cache is never produced.
    pub fn from_snapshot(snapshot: SessionSnapshot, capacity: usize) -> Arc<Self> {
        let storage = Self::new(capacity);
        if snapshot.version != SESSION_SCHEMA_VERSION {
            tracing::debug!(
                target = "glyph.session",
                found = snapshot.version,
                expected = SESSION_SCHEMA_VERSION,
                "session snapshot version mismatch; starting cold"
            );
            return storage;
        }
        {
            let mut inner = storage.lock_inner();
            // Snapshot order is least-to-most recent, so sequential insert
            // reproduces the recency order (and re-applies the bound).
            for (path, entry) in snapshot.paths {
                inner.paths.insert(path, entry);
            }
        }
        storage
    }

    /// Serializes the current contents in recency order.
    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock_inner();
        SessionSnapshot {
            version: SESSION_SCHEMA_VERSION,
            paths: inner.paths.snapshot(),
        }
    }

    /// Returns the entry for `path`, creating a blank one if absent.
    ///
    /// When the cache is locked and the path is unknown, returns `None`
    /// instead of creating.
    pub fn get_entry(&self, path: &str) -> Option<Entry> {
        let mut inner = self.lock_inner();
        let key = path.to_string();
        if let Some(entry) = inner.paths.get(&key) {
            return Some(entry.clone());
        }
        if inner.locked {
            return None;
        }
        let entry = Entry::default();
        if let Some((evicted, _)) = inner.paths.insert(key, entry.clone()) {
            tracing::trace!(target = "glyph.session", path = %evicted, "evicted cache entry");
        }
        Some(entry)
    }

    pub fn get_icon(&self, path: &str) -> Option<StoredIcon> {
        let mut inner = self.lock_inner();
        inner
            .paths
            .get(&path.to_string())
            .and_then(|entry| entry.icon.clone())
    }

    /// Records a committed icon. Silently dropped when locked.
    pub fn set_icon(&self, path: &str, icon: StoredIcon) {
        let mut inner = self.lock_inner();
        if inner.locked {
            return;
        }
        let key = path.to_string();
        if let Some(entry) = inner.paths.get_mut(&key) {
            entry.icon = Some(icon);
            return;
        }
        let entry = Entry {
            icon: Some(icon),
            inode: None,
        };
        if let Some((evicted, _)) = inner.paths.insert(key, entry) {
            tracing::trace!(target = "glyph.session", path = %evicted, "evicted cache entry");
        }
    }

    /// Records filesystem identity for `path`.
    ///
    /// A different previously recorded inode means the path now names a
    /// different filesystem object; the stale entry (icon included) is
    /// deleted and recreated before the new inode is stored.
    pub fn set_inode(&self, path: &str, inode: u64) {
        let mut inner = self.lock_inner();
        if inner.locked {
            return;
        }
        let key = path.to_string();
        let stale = match inner.paths.get_mut(&key) {
            Some(entry) => match entry.inode {
                Some(existing) if existing != inode => Some(existing),
                _ => {
                    entry.inode = Some(inode);
                    return;
                }
            },
            None => None,
        };
        if let Some(existing) = stale {
            tracing::debug!(
                target = "glyph.session",
                path,
                old = existing,
                new = inode,
                "stale filesystem identity; discarding cached entry"
            );
            inner.paths.remove(&key);
        }
        let entry = Entry {
            icon: None,
            inode: Some(inode),
        };
        if let Some((evicted, _)) = inner.paths.insert(key, entry) {
            tracing::trace!(target = "glyph.session", path = %evicted, "evicted cache entry");
        }
    }

    /// Drops the entry for a removed path. Silently ignored when locked.
    pub fn delete_path(&self, path: &str) {
        let mut inner = self.lock_inner();
        if inner.locked {
            return;
        }
        inner.paths.remove(&path.to_string());
    }

    pub fn has_data(&self, path: &str) -> bool {
        let inner = self.lock_inner();
        inner
            .paths
            .peek(&path.to_string())
            .is_some_and(Entry::has_data)
    }

    pub fn has_icon(&self, path: &str) -> bool {
        let inner = self.lock_inner();
        inner
            .paths
            .peek(&path.to_string())
            .is_some_and(|entry| entry.icon.is_some())
    }

    /// Sweeps out entries with no data and entries whose path no longer lies
    /// under any open project root. No-op when locked.
    pub fn clean(&self, project_roots: &[String]) {
        let mut inner = self.lock_inner();
        if inner.locked {
            return;
        }
        let before = inner.paths.len();
        inner.paths.retain(|path, entry| {
            entry.has_data() && project_roots.iter().any(|root| path_contained_in(path, root))
        });
        let dropped = before - inner.paths.len();
        if dropped > 0 {
            tracing::debug!(
                target = "glyph.session",
                dropped,
                remaining = inner.paths.len(),
                "cleaned session cache"
            );
        }
    }

    /// Freezes the cache for serialization; all further mutation is a no-op.
    pub fn lock(&self) {
        self.lock_inner().locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.lock_inner().locked
    }

    pub fn len(&self) -> usize {
        self.lock_inner().paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[track_caller]
    fn lock_inner(&self) -> MutexGuard<'_, StorageInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(err) => {
                let loc = std::panic::Location::caller();
                tracing::error!(
                    target = "glyph.session",
                    file = loc.file(),
                    line = loc.line(),
                    "session cache mutex poisoned; continuing with recovered guard"
                );
                err.into_inner()
            }
        }
    }
}
