//! Compiled icon rule database and indexed lookup.
//!
//! The rule source is an embedded, precompiled JSON document. Loading walks
//! it once, compiles every matcher, and builds per-match-kind indices for
//! files and directories. Malformed data is a fatal configuration error
//! surfaced from [`IconTables::load`]; nothing is recovered at runtime.
//!
//! Each lookup operation is independently memoized, including negative
//! results, so repeated queries for the same key never rescan the indices.

mod db;
mod error;
mod icon;
mod tables;

pub use error::TablesError;
pub use icon::Icon;
pub use tables::{IconTables, SIGNATURE_SCAN_LIMIT};
