//! Process-wide cache of parsed manifests
//!
//! One live [`ManifestDocument`] per manifest path. Concurrent misses for the
//! same path share a single load; a failed load leaves no entry behind.

use crate::document::ManifestDocument;
use crate::error::{Result, SyncError};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

/// A cached document; the mutex serializes every reader and writer of one path
pub type SharedDocument = Arc<Mutex<ManifestDocument>>;

type Slot = Arc<OnceCell<SharedDocument>>;

#[derive(Default)]
pub struct ManifestCache {
    entries: DashMap<PathBuf, Slot>,
}

impl ManifestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached document for `path`, loading and parsing it on a miss
    pub async fn get(&self, path: &Path) -> Result<SharedDocument> {
        // Clone the slot out so no map guard is held across the load
        let slot: Slot = self
            .entries
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let loaded = slot
            .get_or_try_init(|| async {
                let doc = load(path).await?;
                debug!("Loaded manifest {}", path.display());
                Ok::<_, SyncError>(Arc::new(Mutex::new(doc)))
            })
            .await;

        match loaded {
            Ok(doc) => Ok(doc.clone()),
            Err(e) => {
                self.entries
                    .remove_if(path, |_, cell| Arc::ptr_eq(cell, &slot) && !cell.initialized());
                Err(e)
            }
        }
    }

    /// Drop the entry for `path`; no-op when absent
    pub fn invalidate(&self, path: &Path) {
        if self.entries.remove(path).is_some() {
            debug!("Invalidated manifest {}", path.display());
        }
    }

    /// Drop every entry
    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    /// Invalidate `path` unless the file on disk still matches the cached document.
    ///
    /// Writes issued by this process leave the disk identical to the cached
    /// serialization and are recognized that way. Returns whether the entry was
    /// dropped.
    pub async fn invalidate_if_changed(&self, path: &Path) -> bool {
        let Some(doc) = self.peek(path) else {
            return false;
        };

        let on_disk = tokio::fs::read(path).await.ok();
        let unchanged = match on_disk {
            Some(bytes) => doc.lock().await.to_bytes() == bytes,
            None => false,
        };

        if unchanged {
            debug!("Ignoring own write to {}", path.display());
            false
        } else {
            self.invalidate(path);
            true
        }
    }

    /// Loaded document for `path` without triggering a load
    pub fn peek(&self, path: &Path) -> Option<SharedDocument> {
        self.entries
            .get(path)
            .and_then(|slot| slot.get().cloned())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.peek(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.value().initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

async fn load(path: &Path) -> Result<ManifestDocument> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| SyncError::io(path, e))?;
    let text = String::from_utf8(bytes).map_err(|e| SyncError::ManifestParse {
        path: path.to_path_buf(),
        offset: e.utf8_error().valid_up_to(),
        message: "manifest is not valid UTF-8".to_string(),
    })?;
    ManifestDocument::parse(path, &text)
}
