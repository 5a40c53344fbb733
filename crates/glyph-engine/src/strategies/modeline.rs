use std::sync::Arc;

use glyph_core::Resource;
use regex::Regex;

use crate::header::{contains_null, first_line};
use crate::strategy::{IconMatch, Strategy, StrategyCtx};

/// Classifies by an editor modeline on the first line: Emacs
/// `-*- mode: X -*-` or Vim `filetype=`/`ft=`/`syntax=`.
pub struct ModelineStrategy {
    emacs: Regex,
    vim: Regex,
}

impl Default for ModelineStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelineStrategy {
    pub fn new() -> Self {
        // Fixed patterns; a compile failure here is a programming error.
        Self {
            emacs: Regex::new(r"-\*-\s*(?:[Mm]ode\s*:\s*)?([^\s;:]+)\s*;?[^*]*?-\*-")
                .expect("emacs modeline pattern compiles"),
            vim: Regex::new(r"\b(?:filetype|ft|syntax)\s*=\s*([A-Za-z0-9_.-]+)")
                .expect("vim modeline pattern compiles"),
        }
    }

    fn captured_mode<'a>(&self, line: &'a str) -> Option<&'a str> {
        if let Some(captures) = self.emacs.captures(line) {
            return captures.get(1).map(|m| m.as_str());
        }
        self.vim
            .captures(line)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str())
    }
}

impl Strategy for ModelineStrategy {
    fn name(&self) -> &'static str {
        "modeline"
    }

    fn priority(&self) -> u8 {
        5
    }

    fn needs_header(&self) -> bool {
        true
    }

    fn min_scan_size(&self) -> usize {
        256
    }

    fn check(&self, resource: &Arc<Resource>, ctx: &StrategyCtx) -> Option<IconMatch> {
        let data = resource.ensure_header(self.min_scan_size())?;
        let line = first_line(&data);
        if contains_null(line) {
            return None;
        }
        let line = std::str::from_utf8(line).ok()?;
        let mode = self.captured_mode(line)?;

        // `fundamental` is Emacs for "no particular mode"; it carries no
        // classification signal.
        if mode.eq_ignore_ascii_case("fundamental") {
            return None;
        }

        ctx.tables.match_language(mode, false).map(IconMatch::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_emacs_mode() {
        let strategy = ModelineStrategy::new();
        assert_eq!(
            strategy.captured_mode("# -*- mode: python -*-"),
            Some("python")
        );
        assert_eq!(strategy.captured_mode("/* -*- C++ -*- */"), Some("C++"));
        assert_eq!(strategy.captured_mode("no modeline here"), None);
    }

    #[test]
    fn captures_vim_filetype() {
        let strategy = ModelineStrategy::new();
        assert_eq!(strategy.captured_mode("# vim: set ft=sh :"), Some("sh"));
        assert_eq!(
            strategy.captured_mode("// vim: syntax=javascript"),
            Some("javascript")
        );
        assert_eq!(strategy.captured_mode("# vim: filetype=ruby"), Some("ruby"));
    }
}
