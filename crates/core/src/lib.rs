//! Manifest synchronization core for csync
//!
//! This crate provides:
//! - Lossless manifest parsing and serialization
//! - Manifest discovery by walking up the directory tree
//! - A per-path document cache with single-flight loads
//! - Item entry mutation (add / remove / lookup)
//! - Atomic persistence

pub mod cache;
pub mod document;
pub mod error;
pub mod locator;
pub mod mutator;
pub mod persist;

// Re-exports
pub use cache::{ManifestCache, SharedDocument};
pub use document::{Element, Indent, ItemEntry, LineEnding, ManifestDocument};
pub use error::{Result, SyncError};
pub use locator::ManifestLocator;
pub use mutator::{
    add_entry, covers_entry, has_entry, item_type_for_file, remove_entry, DEFAULT_ITEM_TYPE,
};
pub use persist::persist;
