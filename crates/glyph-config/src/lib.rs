//! Typed, observable configuration for the Glyph icon engine.
//!
//! The host editor materializes its settings into [`IconSettings`] and pushes
//! updates through a shared [`ConfigHandle`]; engine components subscribe for
//! changes instead of polling. This crate also owns the `tracing-subscriber`
//! bootstrap so the rest of the workspace only depends on `tracing`.

mod logging;
mod settings;

pub use logging::init_tracing;
pub use settings::{ConfigHandle, IconSettings, SettingsChange, StrategyToggles};
