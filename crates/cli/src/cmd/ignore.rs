//! Inspect and reset the per-workspace ignore list

use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run_list(root: &Path) -> Result<()> {
    let engine = util::open_engine(root, false)?;
    let ignored = engine.filter().ignore_list().list();

    if ignored.is_empty() {
        println!("{}", "No ignored paths".dimmed());
        return Ok(());
    }
    for path in ignored {
        println!("{}", path.display());
    }
    Ok(())
}

pub async fn run_clear(root: &Path) -> Result<()> {
    let engine = util::open_engine(root, false)?;
    let count = engine.filter().ignore_list().len();
    engine.clear_ignore_list()?;
    println!("{} Cleared {} ignored paths", "✓".green(), count);
    Ok(())
}
