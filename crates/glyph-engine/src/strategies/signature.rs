use std::sync::Arc;

use glyph_core::Resource;
use glyph_tables::SIGNATURE_SCAN_LIMIT;

use crate::strategy::{IconMatch, Strategy, StrategyCtx};

/// Matches raw content against the byte-signature index. Evaluated first.
///
/// Unlike the other header strategies this one never excludes binary-looking
/// content; detecting binaries is its job, via the table's null-byte
/// fallback.
#[derive(Debug, Default)]
pub struct SignatureStrategy;

impl SignatureStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for SignatureStrategy {
    fn name(&self) -> &'static str {
        "signature"
    }

    fn priority(&self) -> u8 {
        7
    }

    fn needs_header(&self) -> bool {
        true
    }

    fn min_scan_size(&self) -> usize {
        SIGNATURE_SCAN_LIMIT
    }

    fn check(&self, resource: &Arc<Resource>, ctx: &StrategyCtx) -> Option<IconMatch> {
        let data = resource.ensure_header(self.min_scan_size())?;
        ctx.tables.match_signature(&data).map(IconMatch::from)
    }
}
