//! File system watching for csync
//!
//! This crate provides:
//! - A notify-backed recursive watcher translated into [`WatchEvent`]s
//! - Debounced batching (deletion bursts, repeated saves)
//! - The path eligibility filter and its persisted ignore list
//! - Directory walking for bulk adds

pub mod debounce;
pub mod filter;
pub mod ignore_list;
pub mod walk;

pub use debounce::{
    confirmation_message, Debouncer, DeletionBatcher, KeyedDebouncer, PendingRemoval,
};
pub use filter::{FilterPatterns, PathFilter};
pub use ignore_list::IgnoreList;

use anyhow::{Context, Result};
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// File system watcher
pub struct Watcher {
    root: PathBuf,
    inner: Option<RecommendedWatcher>,
    tx: mpsc::UnboundedSender<WatchEvent>,
}

impl Watcher {
    /// Create a new watcher for the given path and the receiver its events arrive on
    pub fn new(path: &Path) -> Result<(Self, mpsc::UnboundedReceiver<WatchEvent>)> {
        let root = path
            .canonicalize()
            .with_context(|| format!("Cannot watch {}", path.display()))?;
        let (tx, rx) = mpsc::unbounded_channel();
        Ok((
            Self {
                root,
                inner: None,
                tx,
            },
            rx,
        ))
    }

    /// Start watching for events
    pub fn start(&mut self) -> Result<()> {
        if self.inner.is_some() {
            return Ok(());
        }

        let tx = self.tx.clone();
        let mut inner = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    for translated in translate(event) {
                        if tx.send(translated).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => warn!("Watch error: {}", e),
            }
        })
        .context("Failed to create file watcher")?;

        inner
            .watch(&self.root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", self.root.display()))?;
        debug!("Watching {}", self.root.display());

        self.inner = Some(inner);
        Ok(())
    }

    /// Stop watching
    pub fn stop(&mut self) -> Result<()> {
        if let Some(mut inner) = self.inner.take() {
            inner
                .unwatch(&self.root)
                .with_context(|| format!("Failed to unwatch {}", self.root.display()))?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// File system event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Path that changed
    pub path: PathBuf,
    /// Type of change
    pub kind: EventKind,
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, kind: EventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Type of file system event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// File or directory created, or moved into place
    Create { is_dir: bool },
    /// File contents written
    Modify,
    /// File or directory deleted, or moved away.
    ///
    /// `is_dir` is `None` when the platform cannot tell.
    Delete { is_dir: Option<bool> },
}

/// Whether a deleted path was a directory.
///
/// Uses the platform's answer when there is one; otherwise a path without an
/// extension is assumed to have been a directory, which is only approximate.
pub fn infer_directory(path: &Path, reported: Option<bool>) -> bool {
    reported.unwrap_or_else(|| path.extension().is_none())
}

/// Map one notify event onto zero or more [`WatchEvent`]s
pub fn translate(event: notify::Event) -> Vec<WatchEvent> {
    use notify::EventKind as N;

    let created = |path: &PathBuf, is_dir: bool| WatchEvent::new(path.clone(), EventKind::Create { is_dir });
    let deleted = |path: &PathBuf, is_dir: Option<bool>| WatchEvent::new(path.clone(), EventKind::Delete { is_dir });

    match event.kind {
        N::Create(kind) => event
            .paths
            .iter()
            .map(|p| {
                let is_dir = match kind {
                    CreateKind::Folder => true,
                    CreateKind::File => false,
                    _ => p.is_dir(),
                };
                created(p, is_dir)
            })
            .collect(),
        N::Remove(kind) => event
            .paths
            .iter()
            .map(|p| {
                let is_dir = match kind {
                    RemoveKind::Folder => Some(true),
                    RemoveKind::File => Some(false),
                    _ => None,
                };
                deleted(p, is_dir)
            })
            .collect(),
        N::Modify(ModifyKind::Name(mode)) => match (mode, event.paths.as_slice()) {
            (RenameMode::Both, [from, to, ..]) => vec![deleted(from, None), created(to, to.is_dir())],
            (RenameMode::From, paths) => paths.iter().map(|p| deleted(p, None)).collect(),
            (RenameMode::To, paths) => paths.iter().map(|p| created(p, p.is_dir())).collect(),
            (_, paths) => paths
                .iter()
                .map(|p| {
                    if p.exists() {
                        created(p, p.is_dir())
                    } else {
                        deleted(p, None)
                    }
                })
                .collect(),
        },
        N::Modify(_) => event
            .paths
            .iter()
            .filter(|p| !p.is_dir())
            .map(|p| WatchEvent::new(p.clone(), EventKind::Modify))
            .collect(),
        _ => Vec::new(),
    }
}
