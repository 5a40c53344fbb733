use std::sync::Arc;

use glyph_core::Resource;

use crate::strategy::{IconMatch, Strategy, StrategyCtx};

/// Classifies by the resource's full path, then by its name. Applies to
/// files and directories, runs last, and has no user-facing switch.
#[derive(Debug, Default)]
pub struct PathStrategy;

impl Strategy for PathStrategy {
    fn name(&self) -> &'static str {
        "path"
    }

    fn priority(&self) -> u8 {
        1
    }

    fn matches_dirs(&self) -> bool {
        true
    }

    fn configurable(&self) -> bool {
        false
    }

    fn check(&self, resource: &Arc<Resource>, ctx: &StrategyCtx) -> Option<IconMatch> {
        let directory = resource.is_directory();
        if let Some(icon) = ctx.tables.match_path(&resource.path_key(), directory) {
            return Some(icon.into());
        }
        ctx.tables
            .match_name(resource.name(), directory)
            .map(IconMatch::from)
    }
}
