//! Core shared types for Glyph.
//!
//! This crate is intentionally small: event plumbing, path normalization
//! helpers, and the [`Resource`] entity that the host editor owns and the
//! icon engine reads from.

mod events;
mod paths;
mod resource;

pub use events::{DisposeBag, Emitter, Subscription};
pub use paths::{file_name_of, normalize_path_key, path_contained_in};
pub use resource::{
    IconAssignment, Resource, ResourceIcon, ResourceKind, ResourceStats, VcsStatus,
};
