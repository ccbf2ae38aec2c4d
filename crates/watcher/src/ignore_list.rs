//! Persisted per-workspace ignore list
//!
//! Paths the user chose never to be asked about again. Stored as a JSON array
//! of absolute paths and rewritten on every change, so the choice survives
//! cache invalidation and restarts until the list is cleared.

use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct IgnoreList {
    /// Backing file, e.g. `<root>/.csync/ignore.json`
    path: PathBuf,
    entries: RwLock<BTreeSet<PathBuf>>,
}

impl IgnoreList {
    /// Load the list, treating a missing file as empty
    pub fn load(path: &Path) -> Result<Self> {
        let entries = match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str::<BTreeSet<PathBuf>>(&text)
                .with_context(|| format!("Invalid ignore list at {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read ignore list {}", path.display()))
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries: RwLock::new(entries),
        })
    }

    /// An empty list that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            entries: RwLock::new(BTreeSet::new()),
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.read().contains(path)
    }

    /// Add `path` and persist; returns false if it was already listed.
    /// Memory only changes once the file is written.
    pub fn insert(&self, path: &Path) -> Result<bool> {
        let mut entries = self.entries.write();
        if entries.contains(path) {
            return Ok(false);
        }
        let mut updated = entries.clone();
        updated.insert(path.to_path_buf());
        self.save(&updated)?;
        *entries = updated;
        debug!("Ignoring {}", path.display());
        Ok(true)
    }

    /// Remove every path and persist
    pub fn clear(&self) -> Result<()> {
        let mut entries = self.entries.write();
        self.save(&BTreeSet::new())?;
        entries.clear();
        Ok(())
    }

    pub fn list(&self) -> Vec<PathBuf> {
        self.entries.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, entries: &BTreeSet<PathBuf>) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(entries)
            .context("Failed to serialize ignore list")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write ignore list {}", self.path.display()))
    }
}
