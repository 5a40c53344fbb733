//! Session-scoped icon cache.
//!
//! Maps absolute paths to their resolved icon and filesystem identity,
//! bounded by LRU eviction and restorable from a versioned snapshot written
//! at shutdown. Stale state (inode reuse, deleted paths, paths outside every
//! open project) self-heals silently; a `locked` flag turns all mutation
//! into no-ops while the snapshot is being serialized.

mod lru;
mod snapshot;
mod storage;

pub use lru::LruMap;
pub use snapshot::{
    load_snapshot, save_snapshot, SessionError, SessionSnapshot, SESSION_SCHEMA_VERSION,
    SNAPSHOT_PAYLOAD_LIMIT_BYTES,
};
pub use storage::{Entry, StoredIcon, Storage, DEFAULT_CAPACITY};
