//! Show whether a file is tracked and whether a watcher is running

use crate::config;
use crate::locks::WatchLock;
use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(root: &Path, path: &Path) -> Result<()> {
    let engine = util::open_engine(root, false)?;
    let path = util::absolute(path)?;

    match engine.active_file_changed(Some(&path)).await? {
        Some(tracking) if tracking.contained => {
            println!("{} {}", "✓".green(), tracking.label());
        }
        Some(tracking) => {
            println!("{} {}", "+".yellow(), tracking.label().yellow());
        }
        None => {
            println!("{}", "Not tracked (outside any project, or excluded)".dimmed());
        }
    }

    match WatchLock::holder(&config::state_dir(root)) {
        Some(holder) => println!("Watcher:  {} (pid {})", "Running".green(), holder.pid),
        None => println!("Watcher:  {}", "Not running".dimmed()),
    }

    Ok(())
}
