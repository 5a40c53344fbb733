//! The filesystem entity the icon engine classifies.
//!
//! Resources are owned by the host editor; the engine only reads their state
//! and writes a resolved icon back into the [`ResourceIcon`] slot. All
//! mutable state sits behind one mutex, and observers attach through the
//! stat-load, destroy, and VCS-status emitters.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::events::{Emitter, Subscription};
use crate::paths::file_name_of;

/// Smallest header read issued by [`Resource::ensure_header`], regardless of
/// what a single caller asked for, so consecutive strategies share one read.
const MIN_HEADER_READ: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    File,
    Directory,
}

/// Version-control status as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VcsStatus {
    #[default]
    Clean,
    Modified,
    Added,
}

impl VcsStatus {
    /// Whether the resource counts as "changed" for colour gating.
    pub fn is_changed(self) -> bool {
        matches!(self, VcsStatus::Modified | VcsStatus::Added)
    }
}

/// Filesystem stats relevant to classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceStats {
    /// Tri-state executable bit: `None` until stats have loaded.
    pub executable: Option<bool>,
    pub inode: Option<u64>,
}

#[derive(Debug, Default)]
struct ResourceState {
    data: Option<Arc<Vec<u8>>>,
    executable: Option<bool>,
    inode: Option<u64>,
    language: Option<String>,
    scope: Option<String>,
    vcs: VcsStatus,
    destroyed: bool,
}

/// A file or directory known to the engine.
pub struct Resource {
    path: PathBuf,
    name: String,
    kind: ResourceKind,
    symlink: bool,
    state: Mutex<ResourceState>,
    stats_loaded: Emitter<ResourceStats>,
    destroyed: Emitter<()>,
    vcs_changed: Emitter<VcsStatus>,
    icon: ResourceIcon,
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Resource {
    pub fn new(path: impl Into<PathBuf>, kind: ResourceKind, symlink: bool) -> Arc<Self> {
        let path = path.into();
        let name = file_name_of(&path.to_string_lossy()).to_string();
        Arc::new(Self {
            path,
            name,
            kind,
            symlink,
            state: Mutex::new(ResourceState::default()),
            stats_loaded: Emitter::new(),
            destroyed: Emitter::new(),
            vcs_changed: Emitter::new(),
            icon: ResourceIcon::new(),
        })
    }

    pub fn file(path: impl Into<PathBuf>) -> Arc<Self> {
        Self::new(path, ResourceKind::File, false)
    }

    pub fn directory(path: impl Into<PathBuf>) -> Arc<Self> {
        Self::new(path, ResourceKind::Directory, false)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The absolute-path string the session cache keys this resource by.
    pub fn path_key(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn is_file(&self) -> bool {
        self.kind == ResourceKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == ResourceKind::Directory
    }

    pub fn is_symlink(&self) -> bool {
        self.symlink
    }

    pub fn is_destroyed(&self) -> bool {
        self.lock_state().destroyed
    }

    pub fn data(&self) -> Option<Arc<Vec<u8>>> {
        self.lock_state().data.clone()
    }

    pub fn set_data(&self, data: Vec<u8>) {
        self.lock_state().data = Some(Arc::new(data));
    }

    /// Returns the opening bytes, reading them from disk on first use.
    ///
    /// Reads at least [`MIN_HEADER_READ`] bytes so strategies with differing
    /// scan sizes share one read. Unreadable or missing files yield `None`;
    /// that is a routine miss, not an error.
    pub fn ensure_header(&self, min_bytes: usize) -> Option<Arc<Vec<u8>>> {
        {
            let state = self.lock_state();
            if state.destroyed {
                return None;
            }
            if let Some(data) = &state.data {
                return Some(Arc::clone(data));
            }
        }
        if self.kind != ResourceKind::File {
            return None;
        }

        let wanted = min_bytes.max(MIN_HEADER_READ);
        let bytes = match read_prefix(&self.path, wanted) {
            Ok(bytes) => bytes,
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!(
                        target = "glyph.core",
                        path = %self.path.display(),
                        error = %err,
                        "failed to read resource header"
                    );
                }
                return None;
            }
        };

        let data = Arc::new(bytes);
        let mut state = self.lock_state();
        // A concurrent set_data wins; keep whatever arrived first.
        if state.data.is_none() {
            state.data = Some(Arc::clone(&data));
        }
        Some(state.data.clone().unwrap_or(data))
    }

    pub fn executable(&self) -> Option<bool> {
        self.lock_state().executable
    }

    pub fn inode(&self) -> Option<u64> {
        self.lock_state().inode
    }

    /// Records freshly loaded stats and notifies stat listeners.
    pub fn load_stats(&self, stats: ResourceStats) {
        {
            let mut state = self.lock_state();
            if state.destroyed {
                return;
            }
            state.executable = stats.executable;
            state.inode = stats.inode;
        }
        self.stats_loaded.emit(&stats);
    }

    pub fn language(&self) -> Option<String> {
        self.lock_state().language.clone()
    }

    pub fn set_language(&self, language: Option<String>) {
        self.lock_state().language = language;
    }

    pub fn scope(&self) -> Option<String> {
        self.lock_state().scope.clone()
    }

    pub fn set_scope(&self, scope: Option<String>) {
        self.lock_state().scope = scope;
    }

    pub fn vcs_status(&self) -> VcsStatus {
        self.lock_state().vcs
    }

    pub fn set_vcs_status(&self, status: VcsStatus) {
        let changed = {
            let mut state = self.lock_state();
            if state.destroyed || state.vcs == status {
                false
            } else {
                state.vcs = status;
                true
            }
        };
        if changed {
            self.vcs_changed.emit(&status);
        }
    }

    /// Marks the resource gone. Further mutation is inert.
    pub fn destroy(&self) {
        let first = {
            let mut state = self.lock_state();
            if state.destroyed {
                false
            } else {
                state.destroyed = true;
                true
            }
        };
        if first {
            self.destroyed.emit(&());
        }
    }

    pub fn on_did_load_stats(
        &self,
        callback: impl Fn(&ResourceStats) + Send + Sync + 'static,
    ) -> Subscription {
        self.stats_loaded.subscribe(callback)
    }

    /// One-shot stat listener; removed after the first fire.
    pub fn once_did_load_stats(
        &self,
        callback: impl Fn(&ResourceStats) + Send + Sync + 'static,
    ) -> Subscription {
        self.stats_loaded.once(callback)
    }

    pub fn on_did_destroy(&self, callback: impl Fn(&()) + Send + Sync + 'static) -> Subscription {
        self.destroyed.subscribe(callback)
    }

    pub fn on_did_change_vcs_status(
        &self,
        callback: impl Fn(&VcsStatus) + Send + Sync + 'static,
    ) -> Subscription {
        self.vcs_changed.subscribe(callback)
    }

    pub fn icon(&self) -> &ResourceIcon {
        &self.icon
    }

    #[track_caller]
    fn lock_state(&self) -> MutexGuard<'_, ResourceState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(err) => {
                let loc = std::panic::Location::caller();
                tracing::error!(
                    target = "glyph.core",
                    path = %self.path.display(),
                    file = loc.file(),
                    line = loc.line(),
                    "resource mutex poisoned; continuing with recovered guard"
                );
                err.into_inner()
            }
        }
    }
}

fn read_prefix(path: &Path, limit: usize) -> std::io::Result<Vec<u8>> {
    use std::io::Read;

    let file = std::fs::File::open(path)?;
    let mut bytes = Vec::with_capacity(limit.min(64 * 1024));
    file.take(limit as u64).read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// A committed classification result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconAssignment {
    /// Primary display class, e.g. `"python-icon"`.
    pub icon_class: String,
    /// Optional colour-variant class, e.g. `"medium-blue"`.
    pub colour_class: Option<String>,
    /// Priority of the strategy that committed this icon.
    pub priority: u8,
    /// The icon's index in the rule table.
    pub index: usize,
}

/// The icon slot on a [`Resource`]; the engine writes resolved icons here and
/// UI bindings observe it.
#[derive(Debug)]
pub struct ResourceIcon {
    current: Mutex<Option<IconAssignment>>,
    changed: Emitter<Option<IconAssignment>>,
}

impl Default for ResourceIcon {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceIcon {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            changed: Emitter::new(),
        }
    }

    pub fn current_icon(&self) -> Option<IconAssignment> {
        match self.current.lock() {
            Ok(guard) => guard.clone(),
            Err(err) => err.into_inner().clone(),
        }
    }

    /// Display classes for the current icon, or `None` when unclassified.
    pub fn classes(&self, coloured: bool) -> Option<Vec<String>> {
        let assignment = self.current_icon()?;
        let mut classes = vec![assignment.icon_class];
        if coloured {
            if let Some(colour) = assignment.colour_class {
                classes.push(colour);
            }
        }
        Some(classes)
    }

    /// Classes shown while no strategy has committed anything.
    pub fn fallback_classes(&self, default_icon_class: &str) -> Vec<String> {
        vec![default_icon_class.to_string()]
    }

    /// Stores a new assignment, notifying observers when it differs.
    pub fn set(&self, assignment: IconAssignment) {
        let changed = {
            let mut current = match self.current.lock() {
                Ok(guard) => guard,
                Err(err) => err.into_inner(),
            };
            if current.as_ref() == Some(&assignment) {
                false
            } else {
                *current = Some(assignment.clone());
                true
            }
        };
        if changed {
            self.changed.emit(&Some(assignment));
        }
    }

    pub fn clear(&self) {
        let changed = {
            let mut current = match self.current.lock() {
                Ok(guard) => guard,
                Err(err) => err.into_inner(),
            };
            current.take().is_some()
        };
        if changed {
            self.changed.emit(&None);
        }
    }

    pub fn on_did_change_icon(
        &self,
        callback: impl Fn(&Option<IconAssignment>) + Send + Sync + 'static,
    ) -> Subscription {
        self.changed.subscribe(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn ensure_header_reads_opening_bytes_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("script.sh");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"#!/bin/sh\necho hi\n").unwrap();
        drop(file);

        let resource = Resource::file(&path);
        let header = resource.ensure_header(64).unwrap();
        assert!(header.starts_with(b"#!/bin/sh"));

        // Second call reuses the stored buffer.
        let again = resource.ensure_header(64).unwrap();
        assert!(Arc::ptr_eq(&header, &again));
    }

    #[test]
    fn ensure_header_missing_file_is_a_miss() {
        let resource = Resource::file("/no/such/file/anywhere.txt");
        assert!(resource.ensure_header(64).is_none());
    }

    #[test]
    fn load_stats_notifies_once_listeners() {
        let resource = Resource::file("/tmp/example");
        let fired = Arc::new(AtomicUsize::new(0));
        let fired2 = fired.clone();
        resource
            .once_did_load_stats(move |stats| {
                assert_eq!(stats.executable, Some(true));
                fired2.fetch_add(1, Ordering::SeqCst);
            })
            .detach();

        resource.load_stats(ResourceStats {
            executable: Some(true),
            inode: Some(7),
        });
        resource.load_stats(ResourceStats {
            executable: Some(true),
            inode: Some(7),
        });
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(resource.executable(), Some(true));
        assert_eq!(resource.inode(), Some(7));
    }

    #[test]
    fn destroyed_resource_ignores_mutation() {
        let resource = Resource::file("/tmp/example");
        resource.destroy();
        resource.load_stats(ResourceStats {
            executable: Some(true),
            inode: Some(1),
        });
        assert_eq!(resource.executable(), None);
        assert!(resource.is_destroyed());
    }

    #[test]
    fn icon_slot_emits_on_change_only() {
        let icon = ResourceIcon::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired2 = fired.clone();
        let _sub = icon.on_did_change_icon(move |_| {
            fired2.fetch_add(1, Ordering::SeqCst);
        });

        let assignment = IconAssignment {
            icon_class: "rust-icon".to_string(),
            colour_class: Some("medium-maroon".to_string()),
            priority: 1,
            index: 3,
        };
        icon.set(assignment.clone());
        icon.set(assignment);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        assert_eq!(
            icon.classes(true),
            Some(vec!["rust-icon".to_string(), "medium-maroon".to_string()])
        );
        assert_eq!(icon.classes(false), Some(vec!["rust-icon".to_string()]));
    }
}
