//! Debounced batching
//!
//! A [`Debouncer`] collects items and emits them as one batch once no new
//! item has arrived for a full window. Every push restarts the window, so a
//! steady stream defers the batch until the stream stops.
//!
//! [`DeletionBatcher`] builds on it to coalesce delete events into a single
//! confirmation per burst. [`KeyedDebouncer`] keeps one window per key, so a
//! key that never goes quiet only delays itself.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Default quiet period before a deletion batch fires
pub const DEFAULT_DELETE_WINDOW: Duration = Duration::from_millis(2000);

struct State<T> {
    pending: Vec<T>,
    /// Bumped on every push; a timer only fires for the generation it was armed with
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

pub struct Debouncer<T> {
    window: Duration,
    state: Arc<Mutex<State<T>>>,
    tx: mpsc::UnboundedSender<Vec<T>>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a debouncer and the receiver its batches are delivered on
    pub fn new(window: Duration) -> (Self, mpsc::UnboundedReceiver<Vec<T>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Self {
            window,
            state: Arc::new(Mutex::new(State {
                pending: Vec::new(),
                generation: 0,
                timer: None,
            })),
            tx,
        };
        (debouncer, rx)
    }

    /// Queue `item` and restart the window. Must be called inside a tokio runtime.
    pub fn push(&self, item: T) {
        let mut state = self.state.lock();
        state.pending.push(item);
        state.generation += 1;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }

        let generation = state.generation;
        let shared = Arc::clone(&self.state);
        let tx = self.tx.clone();
        let window = self.window;
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;

            // Swap the list out before anyone sees the batch, so pushes that
            // arrive while it is being handled start a fresh one
            let batch = {
                let mut state = shared.lock();
                if state.generation != generation {
                    return;
                }
                state.timer = None;
                std::mem::take(&mut state.pending)
            };
            if !batch.is_empty() {
                let _ = tx.send(batch);
            }
        }));
    }

    /// Number of items waiting for the window to close
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Take the pending items immediately and disarm the timer
    pub fn flush(&self) -> Vec<T> {
        let mut state = self.state.lock();
        state.generation += 1;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        std::mem::take(&mut state.pending)
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(timer) = self.state.lock().timer.take() {
            timer.abort();
        }
    }
}

struct Slot<T> {
    latest: T,
    generation: u64,
    timer: JoinHandle<()>,
}

/// Debouncer with an independent window per key.
///
/// Each key delivers only its latest item, once that key has been quiet for a
/// full window.
pub struct KeyedDebouncer<K, T> {
    window: Duration,
    slots: Arc<Mutex<HashMap<K, Slot<T>>>>,
    next_generation: Mutex<u64>,
    tx: mpsc::UnboundedSender<T>,
}

impl<K, T> KeyedDebouncer<K, T>
where
    K: Eq + Hash + Clone + Send + 'static,
    T: Send + 'static,
{
    pub fn new(window: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Self {
            window,
            slots: Arc::new(Mutex::new(HashMap::new())),
            next_generation: Mutex::new(0),
            tx,
        };
        (debouncer, rx)
    }

    /// Replace the pending item for `key` and restart only that key's window.
    /// Must be called inside a tokio runtime.
    pub fn push(&self, key: K, item: T) {
        let generation = {
            let mut next = self.next_generation.lock();
            *next += 1;
            *next
        };

        let shared = Arc::clone(&self.slots);
        let tx = self.tx.clone();
        let window = self.window;
        let timer_key = key.clone();
        let mut slots = self.slots.lock();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let fired = {
                let mut slots = shared.lock();
                match slots.get(&timer_key) {
                    Some(slot) if slot.generation == generation => slots.remove(&timer_key),
                    _ => None,
                }
            };
            if let Some(slot) = fired {
                let _ = tx.send(slot.latest);
            }
        });

        if let Some(previous) = slots.insert(
            key,
            Slot {
                latest: item,
                generation,
                timer,
            },
        ) {
            previous.timer.abort();
        }
    }

    /// Number of keys waiting for their window to close
    pub fn pending_len(&self) -> usize {
        self.slots.lock().len()
    }
}

impl<K, T> Drop for KeyedDebouncer<K, T> {
    fn drop(&mut self) {
        for (_, slot) in self.slots.lock().drain() {
            slot.timer.abort();
        }
    }
}

/// A deletion waiting for the batch to fire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRemoval {
    /// Manifest owning the deleted path
    pub manifest_path: PathBuf,
    /// Absolute path that was deleted
    pub file_path: PathBuf,
    /// The path was a directory, so every entry below it goes
    pub was_directory: bool,
}

/// Coalesces delete events into one batch per quiet window
pub struct DeletionBatcher {
    inner: Debouncer<PendingRemoval>,
}

impl DeletionBatcher {
    pub fn new(window: Duration) -> (Self, mpsc::UnboundedReceiver<Vec<PendingRemoval>>) {
        let (inner, rx) = Debouncer::new(window);
        (Self { inner }, rx)
    }

    pub fn record(&self, removal: PendingRemoval) {
        debug!(
            "Queued removal of {} from {}",
            removal.file_path.display(),
            removal.manifest_path.display()
        );
        self.inner.push(removal);
    }

    pub fn pending_len(&self) -> usize {
        self.inner.pending_len()
    }

    /// Pending removals, taken now instead of at the end of the window
    pub fn flush(&self) -> Vec<PendingRemoval> {
        self.inner.flush()
    }
}

/// Prompt text for a batch: names the file and manifest for one removal,
/// only the count for several
pub fn confirmation_message(batch: &[PendingRemoval]) -> String {
    match batch {
        [single] => format!(
            "{} was deleted. Remove it from {}?",
            display_name(&single.file_path),
            display_name(&single.manifest_path)
        ),
        many => format!(
            "{} files were deleted. Remove them from their manifests?",
            many.len()
        ),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
