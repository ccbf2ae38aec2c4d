//! Common utilities for integration tests

pub mod cli;
pub mod fixtures;

// Re-export commonly used items
#[allow(unused_imports)]
pub use fixtures::{ScriptedPrompter, TestWorkspace, MANIFEST};
