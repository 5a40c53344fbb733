use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::db::{self, RuleSource};
use crate::error::TablesError;
use crate::icon::Icon;

/// Size of the byte window consulted for signature matching. Also caps the
/// memoization key so callers with whole-file buffers don't bloat the cache.
pub const SIGNATURE_SCAN_LIMIT: usize = 512;

/// The indices for one resource kind: the authoritative ordered icon list
/// plus the per-match-kind subsets. Subset order is the first-match tie-break
/// order.
#[derive(Debug, Default)]
struct TableSet {
    by_name: Vec<Arc<Icon>>,
    by_interpreter: Vec<Arc<Icon>>,
    by_language: Vec<Arc<Icon>>,
    by_path: Vec<Arc<Icon>>,
    by_scope: Vec<Arc<Icon>>,
    by_signature: Vec<Arc<Icon>>,
}

impl TableSet {
    fn build(rules: &[RuleSource]) -> Result<Self, TablesError> {
        let mut set = TableSet::default();
        for (index, rule) in rules.iter().enumerate() {
            let icon = Arc::new(db::compile_rule(rule, index)?);
            if icon.match_interpreter.is_some() {
                set.by_interpreter.push(Arc::clone(&icon));
            }
            if icon.match_language.is_some() {
                set.by_language.push(Arc::clone(&icon));
            }
            if icon.match_path.is_some() {
                set.by_path.push(Arc::clone(&icon));
            }
            if icon.match_scope.is_some() {
                set.by_scope.push(Arc::clone(&icon));
            }
            if icon.match_signature.is_some() {
                set.by_signature.push(Arc::clone(&icon));
            }
            set.by_name.push(icon);
        }
        Ok(set)
    }
}

type KeyCache = Mutex<HashMap<String, Option<Arc<Icon>>>>;

/// One memoization map per (match kind, resource kind) pair. File and
/// directory lookups never share a map: the same key (say `src`) can resolve
/// to different rules per kind, and a shared map would pin whichever kind
/// was queried first.
#[derive(Debug, Default)]
struct MatchCaches {
    file_name: KeyCache,
    file_path: KeyCache,
    file_interpreter: KeyCache,
    file_language: KeyCache,
    file_scope: KeyCache,
    dir_name: KeyCache,
    dir_path: KeyCache,
    dir_interpreter: KeyCache,
    dir_language: KeyCache,
    dir_scope: KeyCache,
    signature: Mutex<HashMap<Vec<u8>, Option<Arc<Icon>>>>,
}

/// The compiled, immutable rule database with memoized lookups.
///
/// Negative results are cached too; within a session no key is ever looked
/// up against the raw indices twice.
#[derive(Debug)]
pub struct IconTables {
    files: TableSet,
    directories: TableSet,
    binary: Option<Arc<Icon>>,
    executable: Option<Arc<Icon>>,
    caches: MatchCaches,
}

impl IconTables {
    /// Loads the embedded compiled database.
    ///
    /// Any defect in the compiled data is fatal and surfaced here.
    pub fn load() -> Result<Arc<Self>, TablesError> {
        Self::from_json(db::ICONDB_JSON)
    }

    pub fn from_json(json: &str) -> Result<Arc<Self>, TablesError> {
        let source = db::parse_source(json)?;
        let files = TableSet::build(&source.files)?;
        let directories = TableSet::build(&source.directories)?;

        // Fallback constants, resolved once from the raw indices so the
        // match caches stay untouched.
        let binary = files
            .by_scope
            .iter()
            .find(|icon| icon.matches_scope("source.asm"))
            .cloned();
        let executable = files
            .by_interpreter
            .iter()
            .find(|icon| icon.matches_interpreter("bash"))
            .cloned();

        tracing::debug!(
            target = "glyph.tables",
            file_rules = files.by_name.len(),
            directory_rules = directories.by_name.len(),
            "icon tables loaded"
        );

        Ok(Arc::new(Self {
            files,
            directories,
            binary,
            executable,
            caches: MatchCaches::default(),
        }))
    }

    /// The icon used for binary content with no explicit signature rule.
    pub fn binary_icon(&self) -> Option<Arc<Icon>> {
        self.binary.clone()
    }

    /// The icon used for executables with an unrecognized interpreter.
    pub fn executable_icon(&self) -> Option<Arc<Icon>> {
        self.executable.clone()
    }

    pub fn file_icon_count(&self) -> usize {
        self.files.by_name.len()
    }

    pub fn directory_icon_count(&self) -> usize {
        self.directories.by_name.len()
    }

    /// The icon at `index` in the authoritative list for the given kind.
    pub fn icon_at(&self, index: usize, directory: bool) -> Option<Arc<Icon>> {
        let set = if directory { &self.directories } else { &self.files };
        set.by_name.get(index).cloned()
    }

    pub fn match_name(&self, name: &str, directory: bool) -> Option<Arc<Icon>> {
        let (cache, index) = if directory {
            (&self.caches.dir_name, &self.directories.by_name)
        } else {
            (&self.caches.file_name, &self.files.by_name)
        };
        cached_match(cache, name, index, Icon::matches_name)
    }

    pub fn match_path(&self, path: &str, directory: bool) -> Option<Arc<Icon>> {
        let (cache, index) = if directory {
            (&self.caches.dir_path, &self.directories.by_path)
        } else {
            (&self.caches.file_path, &self.files.by_path)
        };
        cached_match(cache, path, index, Icon::matches_path)
    }

    pub fn match_interpreter(&self, interpreter: &str, directory: bool) -> Option<Arc<Icon>> {
        let (cache, index) = if directory {
            (&self.caches.dir_interpreter, &self.directories.by_interpreter)
        } else {
            (&self.caches.file_interpreter, &self.files.by_interpreter)
        };
        cached_match(cache, interpreter, index, Icon::matches_interpreter)
    }

    pub fn match_language(&self, language: &str, directory: bool) -> Option<Arc<Icon>> {
        let (cache, index) = if directory {
            (&self.caches.dir_language, &self.directories.by_language)
        } else {
            (&self.caches.file_language, &self.files.by_language)
        };
        cached_match(cache, language, index, Icon::matches_language)
    }

    pub fn match_scope(&self, scope: &str, directory: bool) -> Option<Arc<Icon>> {
        let (cache, index) = if directory {
            (&self.caches.dir_scope, &self.directories.by_scope)
        } else {
            (&self.caches.file_scope, &self.files.by_scope)
        };
        cached_match(cache, scope, index, Icon::matches_scope)
    }

    /// Matches raw content against the signature index.
    ///
    /// The null-byte heuristic runs only after the ordered rule scan comes up
    /// empty: unrecognized content containing a null byte classifies as the
    /// binary fallback, and that outcome is cached like any other.
    pub fn match_signature(&self, bytes: &[u8]) -> Option<Arc<Icon>> {
        let window = &bytes[..bytes.len().min(SIGNATURE_SCAN_LIMIT)];
        if let Some(hit) = lock_cache(&self.caches.signature).get(window) {
            return hit.clone();
        }

        let mut result = self
            .files
            .by_signature
            .iter()
            .find(|icon| icon.matches_signature(window))
            .cloned();
        if result.is_none() && window.contains(&0) {
            result = self.binary.clone();
        }

        lock_cache(&self.caches.signature).insert(window.to_vec(), result.clone());
        result
    }

    #[cfg(test)]
    fn signature_cache_len(&self) -> usize {
        lock_cache(&self.caches.signature).len()
    }
}

fn cached_match(
    cache: &KeyCache,
    key: &str,
    index: &[Arc<Icon>],
    matches: impl Fn(&Icon, &str) -> bool,
) -> Option<Arc<Icon>> {
    if let Some(hit) = lock_cache(cache).get(key) {
        return hit.clone();
    }
    let result = index.iter().find(|icon| matches(icon, key)).cloned();
    lock_cache(cache).insert(key.to_string(), result.clone());
    result
}

#[track_caller]
fn lock_cache<T>(cache: &Mutex<T>) -> MutexGuard<'_, T> {
    match cache.lock() {
        Ok(guard) => guard,
        Err(err) => {
            let loc = std::panic::Location::caller();
            tracing::error!(
                target = "glyph.tables",
                file = loc.file(),
                line = loc.line(),
                "match cache mutex poisoned; continuing with recovered guard"
            );
            err.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> Arc<IconTables> {
        IconTables::load().expect("embedded database loads")
    }

    #[test]
    fn name_lookup_first_match_wins() {
        let tables = tables();
        // `build.gradle.kts` is claimed by the earlier gradle rule even
        // though the kotlin rule also matches `.kts`.
        let icon = tables.match_name("build.gradle.kts", false).unwrap();
        assert_eq!(icon.slug(), "gradle");

        let icon = tables.match_name("app.kts", false).unwrap();
        assert_eq!(icon.slug(), "kotlin");
    }

    #[test]
    fn negative_results_are_cached() {
        let tables = tables();
        assert!(tables.match_name("no-rule-matches-this", false).is_none());
        // Cached miss: identical result without a rescan.
        assert!(tables.match_name("no-rule-matches-this", false).is_none());
    }

    #[test]
    fn file_and_directory_caches_are_separate() {
        let tables = tables();
        // `target` is a directory rule only; the file lookup must not be
        // poisoned by the directory result, nor vice versa.
        assert!(tables.match_name("target", false).is_none());
        let dir = tables.match_name("target", true).unwrap();
        assert_eq!(dir.slug(), "build-output");
        assert!(tables.match_name("target", false).is_none());
    }

    #[test]
    fn signature_match_is_idempotent_and_cached_once() {
        let tables = tables();
        let elf = b"\x7fELF\x02\x01\x01\x00";
        let first = tables.match_signature(elf).unwrap();
        let second = tables.match_signature(elf).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(tables.signature_cache_len(), 1);
        assert_eq!(first.slug(), "binary");
    }

    #[test]
    fn null_byte_without_rule_yields_binary_fallback() {
        let tables = tables();
        let blob = b"\x01\x02\x00\x03 no known signature";
        let icon = tables.match_signature(blob).unwrap();
        assert_eq!(icon.slug(), "binary");
        assert!(Arc::ptr_eq(&icon, &tables.binary_icon().unwrap()));
    }

    #[test]
    fn plain_text_without_rule_is_a_miss() {
        let tables = tables();
        assert!(tables.match_signature(b"just some text\n").is_none());
    }

    #[test]
    fn signature_rule_beats_null_byte_heuristic() {
        let tables = tables();
        // PNG header carries both a known signature and (after the header)
        // null bytes; the explicit rule must win.
        let png = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";
        let icon = tables.match_signature(png).unwrap();
        assert_eq!(icon.slug(), "image");
    }

    #[test]
    fn fallback_constants_are_derived_at_construction() {
        let tables = tables();
        assert_eq!(tables.binary_icon().unwrap().slug(), "binary");
        assert_eq!(tables.executable_icon().unwrap().slug(), "shell");
        // Constants were resolved without touching the match caches.
        assert_eq!(tables.signature_cache_len(), 0);
    }

    #[test]
    fn indices_are_subsets_of_by_name() {
        let tables = tables();
        for index in 0..tables.file_icon_count() {
            let icon = tables.icon_at(index, false).unwrap();
            assert_eq!(icon.index(), index);
        }
    }

    #[test]
    fn malformed_json_is_fatal() {
        let err = IconTables::from_json("{not json").unwrap_err();
        assert!(matches!(err, TablesError::Parse(_)));
    }

    #[test]
    fn version_mismatch_is_fatal() {
        let err = IconTables::from_json(r#"{"version": 99, "files": [], "directories": []}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            TablesError::UnsupportedVersion {
                expected: _,
                found: 99
            }
        ));
    }

    #[test]
    fn matcherless_rule_is_fatal() {
        let err = IconTables::from_json(
            r#"{"version": 1, "files": [{"icon": "x", "class": "x-icon", "match": {}}], "directories": []}"#,
        )
        .unwrap_err();
        assert!(matches!(err, TablesError::EmptyRule { .. }));
    }

    #[test]
    fn invalid_pattern_is_fatal() {
        let err = IconTables::from_json(
            r#"{"version": 1, "files": [{"icon": "x", "class": "x-icon", "match": {"name": "("}}], "directories": []}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TablesError::BadPattern { kind: "name", .. }
        ));
    }
}
