//! Remove a file or directory from its manifest

use crate::{engine, util};
use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(
    root: &Path,
    path: &Path,
    manifest: Option<&Path>,
    silent: bool,
    yes: bool,
) -> Result<()> {
    let engine = util::open_engine(root, yes)?;
    let path = util::absolute(path)?;
    let manifest = manifest.map(util::absolute).transpose()?;

    match engine.remove_file(&path, manifest.as_deref(), silent).await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => {
            println!("{}", "No manifest changed".dimmed());
            Ok(())
        }
        Err(e) if engine::is_expected(&e) => {
            println!("{}", super::add::no_manifest_note(&path));
            Ok(())
        }
        Err(e) => Err(e),
    }
}
