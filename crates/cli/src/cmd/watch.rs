//! Watch a workspace in the foreground

use crate::config;
use crate::daemon;
use crate::prompt::{Prompter, TerminalPrompter};
use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::Path;
use std::sync::Arc;

pub async fn run(root: &Path, yes: bool) -> Result<()> {
    let config = config::load()?;
    if !config.enabled {
        println!(
            "{}",
            "Synchronization is disabled (csync config set enabled true)".yellow()
        );
        return Ok(());
    }

    println!("Watching {} {}", root.display().to_string().cyan(), "(Ctrl-C to stop)".dimmed());
    let prompter: Arc<dyn Prompter> = Arc::new(TerminalPrompter::new(yes));
    daemon::run(root, config, prompter).await
}
