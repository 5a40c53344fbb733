use std::sync::Arc;

use glyph_core::Resource;

use crate::strategy::{IconMatch, Strategy, StrategyCtx};

/// Classifies by the grammar scope the host editor assigned to the resource.
#[derive(Debug, Default)]
pub struct GrammarStrategy;

impl Strategy for GrammarStrategy {
    fn name(&self) -> &'static str {
        "grammar"
    }

    fn priority(&self) -> u8 {
        2
    }

    fn check(&self, resource: &Arc<Resource>, ctx: &StrategyCtx) -> Option<IconMatch> {
        let scope = resource.scope()?;
        ctx.tables.match_scope(&scope, false).map(IconMatch::from)
    }
}
