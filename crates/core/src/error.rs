//! Error taxonomy for manifest synchronization

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the locator, cache, mutator and persistence layers
#[derive(Debug, Error)]
pub enum SyncError {
    /// No manifest between the start directory and the filesystem root.
    ///
    /// Expected for files outside any tracked project; never shown to the user.
    #[error("no manifest found above {}", start.display())]
    ManifestNotFound { start: PathBuf },

    /// Manifest content is not well-formed XML
    #[error("failed to parse {} at byte {offset}: {message}", path.display())]
    ManifestParse {
        path: PathBuf,
        offset: usize,
        message: String,
    },

    /// Writing the serialized manifest back to disk failed
    #[error("failed to write {}", path.display())]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory listing or manifest read failed
    #[error("failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file does not live below the manifest's directory
    #[error("{} is not inside {}", file.display(), manifest_dir.display())]
    OutsideManifest {
        file: PathBuf,
        manifest_dir: PathBuf,
    },
}

impl SyncError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for conditions that are logged but never surfaced
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::ManifestNotFound { .. })
    }
}

/// Result type for manifest operations
pub type Result<T> = std::result::Result<T, SyncError>;
