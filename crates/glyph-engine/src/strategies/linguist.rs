use std::sync::Arc;

use glyph_core::Resource;

use crate::strategy::{IconMatch, Strategy, StrategyCtx};

/// Classifies by an externally-reported language (e.g. a
/// `linguist-language` gitattributes override surfaced by the host).
#[derive(Debug, Default)]
pub struct LinguistStrategy;

impl Strategy for LinguistStrategy {
    fn name(&self) -> &'static str {
        "linguist"
    }

    fn priority(&self) -> u8 {
        4
    }

    fn check(&self, resource: &Arc<Resource>, ctx: &StrategyCtx) -> Option<IconMatch> {
        let language = resource.language()?;
        ctx.tables
            .match_language(&language, false)
            .map(IconMatch::from)
    }
}
