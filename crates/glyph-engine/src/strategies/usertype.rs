use std::sync::Arc;

use glyph_core::Resource;

use crate::strategy::{IconMatch, Strategy, StrategyCtx};

/// Classifies by the user's `custom_types` setting, which maps a file
/// extension to a grammar scope.
#[derive(Debug, Default)]
pub struct UsertypeStrategy;

impl Strategy for UsertypeStrategy {
    fn name(&self) -> &'static str {
        "usertype"
    }

    fn priority(&self) -> u8 {
        3
    }

    fn check(&self, resource: &Arc<Resource>, ctx: &StrategyCtx) -> Option<IconMatch> {
        let name = resource.name();
        let (stem, extension) = name.rsplit_once('.')?;
        if stem.is_empty() {
            // Dotfiles like `.profile` have no extension to map.
            return None;
        }
        let scope = ctx.settings.custom_types.get(&extension.to_lowercase())?;
        ctx.tables.match_scope(scope, false).map(IconMatch::from)
    }
}
