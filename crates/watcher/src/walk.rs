//! Directory walking for bulk adds
//!
//! When a whole directory appears (created, moved in, or added explicitly)
//! every file below it is a candidate entry. The walk honours `.gitignore`
//! and skips hidden files, the same way the build output and VCS metadata of
//! a project are normally kept out of its manifest.

use anyhow::Result;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// All regular files below `dir`, in sorted order
pub fn collect_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("Not a directory: {}", dir.display());
    }

    let mut files = Vec::new();
    let walker = WalkBuilder::new(dir)
        .follow_links(false)
        .require_git(false)
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                continue;
            }
        };
        if entry.file_type().is_some_and(|t| t.is_file()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    debug!("Found {} files under {}", files.len(), dir.display());
    Ok(files)
}
