//! The icon resolution pipeline.
//!
//! A [`StrategyManager`] runs a resource through an ordered list of detection
//! strategies (signature, hashbang, modeline, declared language, user type,
//! grammar scope, path) until one commits an icon; the result is written back
//! onto the resource and into the session cache. [`IconService`] is the thin
//! public surface integration glue talks to.

mod header;
mod manager;
mod service;
mod strategy;
pub mod strategies;

pub use manager::StrategyManager;
pub use service::{IconHints, IconService, IconTarget};
pub use strategy::{IconMatch, Strategy, StrategyCtx};
