use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use glyph_core::Resource;

use crate::header::{contains_null, first_line};
use crate::strategy::{IconMatch, Strategy, StrategyCtx};

/// Classifies by the `#!interpreter [args]` directive on the first line.
///
/// This is the engine's one inherently asynchronous path: when no rule
/// matches and the executable bit is not yet known, the strategy registers a
/// one-shot continuation on the resource's stat-load notification and
/// declines; the continuation re-enters the manager once stats arrive.
pub struct HashbangStrategy {
    /// Paths with a continuation already registered, so repeated queries
    /// don't stack listeners.
    pending: Arc<Mutex<HashSet<String>>>,
}

impl Default for HashbangStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl HashbangStrategy {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

impl Strategy for HashbangStrategy {
    fn name(&self) -> &'static str {
        "hashbang"
    }

    fn priority(&self) -> u8 {
        6
    }

    fn needs_header(&self) -> bool {
        true
    }

    fn min_scan_size(&self) -> usize {
        64
    }

    fn check(&self, resource: &Arc<Resource>, ctx: &StrategyCtx) -> Option<IconMatch> {
        let data = resource.ensure_header(self.min_scan_size())?;
        let line = first_line(&data);
        if contains_null(line) {
            return None;
        }
        let line = std::str::from_utf8(line).ok()?;
        let interpreter = parse_interpreter(line)?;

        // `.ts`/`.tsx` sources carry node hashbangs without being directly
        // executable by node; leave them to later strategies.
        if interpreter == "node" {
            let name = resource.name();
            if name.ends_with(".ts") || name.ends_with(".tsx") {
                return None;
            }
        }

        if let Some(icon) = ctx.tables.match_interpreter(&interpreter, false) {
            return Some(icon.into());
        }

        match resource.executable() {
            Some(true) => ctx.tables.executable_icon().map(IconMatch::from),
            Some(false) => None,
            None => {
                self.defer_until_stats(resource, ctx);
                None
            }
        }
    }
}

impl HashbangStrategy {
    fn defer_until_stats(&self, resource: &Arc<Resource>, ctx: &StrategyCtx) {
        let key = resource.path_key();
        {
            let mut pending = match self.pending.lock() {
                Ok(guard) => guard,
                Err(err) => err.into_inner(),
            };
            if !pending.insert(key.clone()) {
                return;
            }
        }

        tracing::debug!(
            target = "glyph.engine",
            path = %key,
            "deferring hashbang classification until stats load"
        );

        let pending = Arc::clone(&self.pending);
        let manager = ctx.manager();
        let weak_resource = Arc::downgrade(resource);
        resource
            .once_did_load_stats(move |_| {
                {
                    let mut pending = match pending.lock() {
                        Ok(guard) => guard,
                        Err(err) => err.into_inner(),
                    };
                    pending.remove(&key);
                }
                if let (Some(manager), Some(resource)) =
                    (manager.upgrade(), weak_resource.upgrade())
                {
                    manager.query(&resource);
                }
            })
            .detach();
    }
}

/// Extracts the interpreter name from a `#!` line.
///
/// `env` is transparent: the interpreter is the last path segment of env's
/// first non-flag, non-assignment argument.
fn parse_interpreter(line: &str) -> Option<String> {
    let rest = line.strip_prefix("#!")?.trim_start();
    let mut tokens = rest.split_whitespace();
    let command = tokens.next()?;
    let mut base = last_segment(command);

    if base == "env" {
        let argument = tokens.find(|token| !token.starts_with('-') && !token.contains('='))?;
        base = last_segment(argument);
    }

    if base.is_empty() {
        return None;
    }
    Some(base.to_string())
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
