//! Foreground watch loop
//!
//! Feeds filesystem events into the [`Engine`]: saves are coalesced per path,
//! deletions go through the engine's batcher, manifest edits invalidate the
//! cache. Runs until Ctrl-C.

use crate::config::{self, SyncConfig};
use crate::engine::Engine;
use crate::locks::WatchLock;
use crate::prompt::Prompter;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use watcher::{EventKind, IgnoreList, KeyedDebouncer, WatchEvent, Watcher};

/// Quiet period before a burst of writes to one file counts as one save
pub const SAVE_WINDOW: Duration = Duration::from_millis(300);

/// Where a raw event goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Our own state, or nothing to do
    Drop,
    /// Straight to the engine
    Immediate,
    /// Through the save debouncer
    Coalesce,
}

/// Decide how the loop handles `event`
pub fn route(event: &WatchEvent, state_dir: &Path, is_manifest: bool) -> Route {
    if event.path.starts_with(state_dir) {
        return Route::Drop;
    }
    match event.kind {
        EventKind::Modify | EventKind::Create { is_dir: false } if !is_manifest => {
            Route::Coalesce
        }
        _ => Route::Immediate,
    }
}

/// Watch `root` until interrupted
pub async fn run(root: &Path, config: SyncConfig, prompter: Arc<dyn Prompter>) -> Result<()> {
    let (mut watcher, mut events) = Watcher::new(root)?;
    let root = watcher.root().to_path_buf();
    let state_dir = config::state_dir(&root);

    let _lock = WatchLock::acquire(&state_dir)?;
    let ignore = IgnoreList::load(&config::ignore_list_path(&root))?;
    let (engine, mut removals) = Engine::new(config, ignore, prompter)?;
    let (saves, mut saved) = KeyedDebouncer::new(SAVE_WINDOW);

    watcher.start().context("Failed to start watcher")?;
    info!("Watching {}", root.display());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    // Prompts are answered one at a time, so every branch runs to completion
    // before the next event is looked at.
    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                match route(&event, &state_dir, engine.is_manifest(&event.path)) {
                    Route::Drop => {}
                    Route::Immediate => engine.handle_event(event).await,
                    Route::Coalesce => saves.push(event.path.clone(), event),
                }
            }
            Some(event) = saved.recv() => {
                if event.path.exists() {
                    engine.handle_event(event).await;
                } else {
                    debug!("{} is gone before its save was handled", event.path.display());
                }
            }
            Some(batch) = removals.recv() => {
                let outcome = engine.process_batch(batch).await;
                debug!(
                    "Deletion batch: {} removed, {} failed, declined: {}",
                    outcome.removed, outcome.failed, outcome.declined
                );
            }
            result = &mut shutdown => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("Stopping");
                break;
            }
            else => break,
        }
    }

    watcher.stop()?;
    engine.shutdown();
    Ok(())
}
