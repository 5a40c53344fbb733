use std::sync::{Arc, Weak};

use glyph_config::IconSettings;
use glyph_core::Resource;
use glyph_session::Storage;
use glyph_tables::{Icon, IconTables};

use crate::manager::StrategyManager;

/// A classification a strategy wants to commit.
#[derive(Debug, Clone)]
pub struct IconMatch {
    pub icon: Arc<Icon>,
}

impl From<Arc<Icon>> for IconMatch {
    fn from(icon: Arc<Icon>) -> Self {
        Self { icon }
    }
}

/// Collaborators handed to every `check` call.
///
/// Strategies receive their dependencies here rather than reaching for any
/// shared package state; `manager` exists solely so a strategy can schedule a
/// re-query continuation when data it needs arrives later.
pub struct StrategyCtx {
    pub tables: Arc<IconTables>,
    pub storage: Arc<Storage>,
    /// Settings as of the start of this query.
    pub settings: IconSettings,
    pub(crate) manager: Weak<StrategyManager>,
}

impl StrategyCtx {
    pub(crate) fn manager(&self) -> Weak<StrategyManager> {
        self.manager.clone()
    }
}

/// One unit of classification logic bound to a single detection signal.
///
/// The manager's ordering is authoritative: strategies are evaluated in
/// descending [`Strategy::priority`] and the first committed match wins.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn priority(&self) -> u8;

    fn matches_files(&self) -> bool {
        true
    }

    fn matches_dirs(&self) -> bool {
        false
    }

    /// Strategies without user-facing configuration are always enabled.
    fn configurable(&self) -> bool {
        true
    }

    /// Whether this strategy reads a byte-range header from the resource.
    fn needs_header(&self) -> bool {
        false
    }

    /// Minimum number of opening bytes this strategy wants loaded.
    fn min_scan_size(&self) -> usize {
        0
    }

    /// Inspects `resource` and returns a match to commit, or `None` to let
    /// the next strategy run. Must return synchronously; strategies that
    /// depend on data not yet available register a continuation and decline.
    fn check(&self, resource: &Arc<Resource>, ctx: &StrategyCtx) -> Option<IconMatch>;
}
