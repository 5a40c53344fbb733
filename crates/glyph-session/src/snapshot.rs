use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bincode::Options;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::Entry;

/// Bumped whenever the serialized shape changes. A snapshot written under
/// any other version restores as an empty cache.
pub const SESSION_SCHEMA_VERSION: u32 = 1;

/// Hard upper bound for a snapshot we will attempt to deserialize.
///
/// Corruption should degrade to a cold start, not an out-of-memory crash; a
/// corrupted length prefix must not request an enormous allocation.
pub const SNAPSHOT_PAYLOAD_LIMIT_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("snapshot encoding failed: {0}")]
    Encode(#[from] bincode::Error),
}

/// The single persisted object: `{paths, version}`.
///
/// `paths` is in least-to-most-recently-used order so restoration reproduces
/// recency exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub version: u32,
    pub paths: Vec<(String, Entry)>,
}

impl SessionSnapshot {
    pub fn current(paths: Vec<(String, Entry)>) -> Self {
        Self {
            version: SESSION_SCHEMA_VERSION,
            paths,
        }
    }
}

fn bincode_options() -> impl bincode::Options + Copy {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
}

fn bincode_options_limited() -> impl bincode::Options + Copy {
    bincode_options().with_limit(SNAPSHOT_PAYLOAD_LIMIT_BYTES as u64)
}

/// Writes the snapshot atomically (tmp file + rename in the target
/// directory).
pub fn save_snapshot(path: &Path, snapshot: &SessionSnapshot) -> Result<(), SessionError> {
    let bytes = bincode_options().serialize(snapshot)?;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        Some(_) => Path::new("."),
        None => return Err(SessionError::Io(io::Error::other("path has no parent"))),
    };
    fs::create_dir_all(parent)?;

    let (tmp_path, mut file) = open_unique_tmp_file(path, parent)?;
    let write_result = (|| -> Result<(), SessionError> {
        file.write_all(&bytes)?;
        file.sync_all()?;
        Ok(())
    })();
    drop(file);
    if let Err(err) = write_result {
        remove_file_best_effort(&tmp_path);
        return Err(err);
    }

    if let Err(err) = fs::rename(&tmp_path, path) {
        // Windows rename does not overwrite; retry once after removing the
        // destination.
        let retried = cfg!(windows)
            && fs::remove_file(path)
                .or_else(|e| {
                    if e.kind() == io::ErrorKind::NotFound {
                        Ok(())
                    } else {
                        Err(e)
                    }
                })
                .and_then(|_| fs::rename(&tmp_path, path))
                .is_ok();
        if !retried {
            remove_file_best_effort(&tmp_path);
            return Err(SessionError::Io(err));
        }
    }

    tracing::debug!(
        target = "glyph.session",
        path = %path.display(),
        entries = snapshot.paths.len(),
        "session snapshot written"
    );
    Ok(())
}

/// Reads a snapshot back, returning `None` for anything unusable.
///
/// A missing file is a routine miss; a corrupt or oversized file is deleted
/// best-effort so stale state does not accumulate.
pub fn load_snapshot(path: &Path) -> Option<SessionSnapshot> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::debug!(
                    target = "glyph.session",
                    path = %path.display(),
                    error = %err,
                    "failed to stat session snapshot"
                );
            }
            return None;
        }
    };
    if !meta.is_file() || meta.len() > SNAPSHOT_PAYLOAD_LIMIT_BYTES as u64 {
        remove_file_best_effort(path);
        return None;
    }

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::debug!(
                    target = "glyph.session",
                    path = %path.display(),
                    error = %err,
                    "failed to read session snapshot"
                );
            }
            return None;
        }
    };

    match bincode_options_limited().deserialize(&bytes) {
        Ok(snapshot) => Some(snapshot),
        Err(err) => {
            tracing::debug!(
                target = "glyph.session",
                path = %path.display(),
                error = %err,
                "corrupt session snapshot; starting cold"
            );
            remove_file_best_effort(path);
            None
        }
    }
}

fn remove_file_best_effort(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::debug!(
                target = "glyph.session",
                path = %path.display(),
                error = %err,
                "failed to remove snapshot file"
            );
        }
    }
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

fn open_unique_tmp_file(dest: &Path, parent: &Path) -> io::Result<(PathBuf, fs::File)> {
    let file_name = dest
        .file_name()
        .ok_or_else(|| io::Error::other("destination path has no file name"))?;
    let pid = std::process::id();

    loop {
        let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(format!(".tmp.{pid}.{counter}"));
        let tmp_path = parent.join(tmp_name);

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
        {
            Ok(file) => return Ok((tmp_path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }
}
