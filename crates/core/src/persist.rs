//! Writing manifests back to disk

use crate::document::ManifestDocument;
use crate::error::{Result, SyncError};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Serialize `doc` and overwrite its file.
///
/// On failure the document is untouched, so the caller can retry the write
/// without redoing the mutation.
pub async fn persist(doc: &ManifestDocument) -> Result<()> {
    let bytes = doc.to_bytes();
    atomic_write(doc.path(), &bytes)
        .await
        .map_err(|source| SyncError::ManifestWrite {
            path: doc.path().to_path_buf(),
            source,
        })?;
    debug!("Wrote {} ({} bytes)", doc.path().display(), bytes.len());
    Ok(())
}

/// Atomic write helper
///
/// Writes data to a sibling temporary file, fsyncs it, then renames it over the target.
pub async fn atomic_write(target: &Path, data: &[u8]) -> std::io::Result<()> {
    let tmp = temp_path(target);

    let result = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, target).await
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp).await;
    }
    result
}

fn temp_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.csync-tmp", name))
}
