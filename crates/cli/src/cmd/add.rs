//! Add a file or directory to its manifest

use crate::{engine, util};
use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(root: &Path, path: &Path, prompt: bool, yes: bool) -> Result<()> {
    let engine = util::open_engine(root, yes)?;
    let path = util::absolute(path)?;

    let result = if path.is_dir() {
        engine.add_directory(&path, prompt).await
    } else if path.exists() {
        engine.add_file(&path, prompt).await.map(|m| m.into_iter().collect())
    } else {
        anyhow::bail!("{} does not exist", path.display());
    };

    match result {
        Ok(modified) => {
            if modified.is_empty() {
                println!("{}", "No manifest changed".dimmed());
            }
            Ok(())
        }
        Err(e) if engine::is_expected(&e) => {
            println!("{} {}", no_manifest_note(&path), format!("({:#})", e).dimmed());
            Ok(())
        }
        Err(e) => Err(e),
    }
}

pub(crate) fn no_manifest_note(path: &Path) -> String {
    format!("{} is not inside any project", path.display())
        .yellow()
        .to_string()
}
