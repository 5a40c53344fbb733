use thiserror::Error;

/// Fatal configuration errors raised while loading the compiled rule
/// database. These indicate a bad build artifact, not a runtime condition,
/// and are never recovered.
#[derive(Debug, Error)]
pub enum TablesError {
    #[error("malformed icon database: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported icon database version: expected {expected}, found {found}")]
    UnsupportedVersion { expected: u32, found: u32 },

    #[error("icon rule `{slug}` declares no matchers")]
    EmptyRule { slug: String },

    #[error("icon rule `{slug}` has an invalid {kind} pattern: {source}")]
    BadPattern {
        slug: String,
        kind: &'static str,
        source: regex::Error,
    },
}
