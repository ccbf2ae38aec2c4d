//! Shared utilities for CLI commands

use crate::config;
use crate::engine::Engine;
use crate::prompt::{Prompter, TerminalPrompter};
use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use watcher::IgnoreList;

/// Workspace root: `--root` if given, else the current directory
pub fn workspace_root(root: Option<PathBuf>) -> Result<PathBuf> {
    let root = match root {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    root.canonicalize()
        .with_context(|| format!("Workspace root {} does not exist", root.display()))
}

/// Absolute form of `path` with symlinks in its existing part resolved.
///
/// Works for paths that no longer exist, so deleted files can still be named.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(path)
    };

    let mut existing = joined.as_path();
    let mut rest = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = existing
        .canonicalize()
        .with_context(|| format!("Cannot resolve {}", path.display()))?;
    for name in rest.iter().rev() {
        resolved.push(name);
    }
    Ok(normalize(&resolved))
}

/// Engine for a one-shot command against the workspace at `root`
pub fn open_engine(root: &Path, assume_yes: bool) -> Result<Engine> {
    let config = config::load()?;
    let ignore = IgnoreList::load(&config::ignore_list_path(root))?;
    let prompter: Arc<dyn Prompter> = Arc::new(TerminalPrompter::new(assume_yes));
    let (engine, _removals) = Engine::new(config, ignore, prompter)?;
    Ok(engine)
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
