//! Manifest discovery by walking up the directory tree

use crate::error::{Result, SyncError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Finds the nearest manifest above a starting directory
#[derive(Debug, Clone)]
pub struct ManifestLocator {
    /// Extensions without the leading dot, e.g. `csproj`
    extensions: Vec<String>,
}

impl ManifestLocator {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Whether `path` names a manifest file
    pub fn is_manifest(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
    }

    /// Walk from `start_dir` towards the root and return the first manifest found.
    ///
    /// Within one directory the lexicographically first match wins. Listing
    /// failures are returned as-is without retry.
    pub async fn locate(&self, start_dir: &Path) -> Result<PathBuf> {
        let start = if start_dir.is_absolute() {
            start_dir.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| SyncError::io(start_dir, e))?
                .join(start_dir)
        };

        let mut current = start.as_path();
        loop {
            if let Some(found) = self.find_in(current).await? {
                debug!("Manifest for {} is {}", start.display(), found.display());
                return Ok(found);
            }

            match current.parent() {
                Some(parent) if parent != current => current = parent,
                _ => return Err(SyncError::ManifestNotFound { start }),
            }
        }
    }

    async fn find_in(&self, dir: &Path) -> Result<Option<PathBuf>> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| SyncError::io(dir, e))?;

        let mut matches = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SyncError::io(dir, e))?
        {
            let path = entry.path();
            if self.is_manifest(&path) {
                let is_file = entry
                    .file_type()
                    .await
                    .map(|t| t.is_file() || t.is_symlink())
                    .unwrap_or(false);
                if is_file {
                    matches.push(path);
                }
            }
        }

        matches.sort();
        Ok(matches.into_iter().next())
    }
}
