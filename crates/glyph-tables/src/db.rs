//! Source representation of the compiled rule database.
//!
//! The database ships inside the binary as JSON, already deduplicated and
//! ordered most-specific-first. Consistency of the rules themselves is not
//! validated beyond what compilation requires; a malformed document is a
//! build defect reported as [`TablesError`].

use regex::bytes::RegexBuilder as BytesRegexBuilder;
use regex::Regex;
use serde::Deserialize;

use crate::error::TablesError;
use crate::icon::Icon;

pub(crate) const ICONDB_JSON: &str = include_str!("../assets/icondb.json");
pub(crate) const ICONDB_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
pub(crate) struct DbSource {
    pub version: u32,
    pub files: Vec<RuleSource>,
    pub directories: Vec<RuleSource>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RuleSource {
    pub icon: String,
    pub class: String,
    #[serde(default)]
    pub colour: Option<String>,
    #[serde(rename = "match")]
    pub matchers: MatcherSource,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MatcherSource {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub interpreter: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
}

impl MatcherSource {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.path.is_none()
            && self.interpreter.is_none()
            && self.language.is_none()
            && self.scope.is_none()
            && self.signature.is_none()
    }
}

pub(crate) fn parse_source(json: &str) -> Result<DbSource, TablesError> {
    let source: DbSource = serde_json::from_str(json)?;
    if source.version != ICONDB_VERSION {
        return Err(TablesError::UnsupportedVersion {
            expected: ICONDB_VERSION,
            found: source.version,
        });
    }
    Ok(source)
}

pub(crate) fn compile_rule(rule: &RuleSource, index: usize) -> Result<Icon, TablesError> {
    if rule.matchers.is_empty() {
        return Err(TablesError::EmptyRule {
            slug: rule.icon.clone(),
        });
    }

    let match_name = compile_text(&rule.icon, "name", rule.matchers.name.as_deref())?;
    let match_path = compile_text(&rule.icon, "path", rule.matchers.path.as_deref())?;
    let match_interpreter =
        compile_text(&rule.icon, "interpreter", rule.matchers.interpreter.as_deref())?;
    let match_language = compile_text(&rule.icon, "language", rule.matchers.language.as_deref())?;
    let match_scope = compile_text(&rule.icon, "scope", rule.matchers.scope.as_deref())?;
    let match_signature = match rule.matchers.signature.as_deref() {
        Some(pattern) => Some(
            // Signatures match raw bytes; unicode mode is off so `.` and
            // escapes like \x7f apply to single bytes.
            BytesRegexBuilder::new(pattern)
                .unicode(false)
                .build()
                .map_err(|source| TablesError::BadPattern {
                    slug: rule.icon.clone(),
                    kind: "signature",
                    source,
                })?,
        ),
        None => None,
    };

    Ok(Icon::new(
        rule.icon.clone(),
        index,
        rule.class.clone(),
        rule.colour.clone(),
        match_name,
        match_path,
        match_interpreter,
        match_language,
        match_scope,
        match_signature,
    ))
}

fn compile_text(
    slug: &str,
    kind: &'static str,
    pattern: Option<&str>,
) -> Result<Option<Regex>, TablesError> {
    match pattern {
        Some(pattern) => Regex::new(pattern)
            .map(Some)
            .map_err(|source| TablesError::BadPattern {
                slug: slug.to_string(),
                kind,
                source,
            }),
        None => Ok(None),
    }
}
