//! Synchronization engine
//!
//! Owns every piece of long-lived state (document cache, deletion batcher,
//! filter, status) and exposes the commands the host invokes. Errors from the
//! locator, cache and mutator bubble up to the command boundary, where
//! [`Engine::report`] decides what the user sees.

use crate::config::SyncConfig;
use crate::prompt::{Choice, Notice, Prompter};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sync_core::{
    add_entry, covers_entry, has_entry, item_type_for_file, persist, remove_entry, ManifestCache,
    ManifestDocument, ManifestLocator, SyncError,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use watcher::{
    confirmation_message, infer_directory, walk, DeletionBatcher, EventKind, IgnoreList,
    PathFilter, PendingRemoval, WatchEvent,
};

/// Whether a file is tracked by its owning manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracking {
    pub manifest: PathBuf,
    pub include: String,
    pub contained: bool,
}

impl Tracking {
    pub fn manifest_name(&self) -> String {
        self.manifest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Status line text
    pub fn label(&self) -> String {
        if self.contained {
            format!("Contained in {}", self.manifest_name())
        } else {
            format!("Add to {}", self.manifest_name())
        }
    }
}

/// Result of handling one deletion batch
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Removals that changed a manifest
    pub removed: usize,
    /// Removals that failed and were skipped
    pub failed: usize,
    /// The user declined the whole batch
    pub declined: bool,
}

pub struct Engine {
    config: SyncConfig,
    locator: ManifestLocator,
    cache: ManifestCache,
    filter: PathFilter,
    prompter: Arc<dyn Prompter>,
    batcher: DeletionBatcher,
    /// Manifests whose last write failed; retried before the next mutation
    unsaved: Mutex<HashSet<PathBuf>>,
    status: Mutex<Option<Tracking>>,
}

impl Engine {
    /// Build an engine and the receiver deletion batches are delivered on
    pub fn new(
        config: SyncConfig,
        ignore: IgnoreList,
        prompter: Arc<dyn Prompter>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Vec<PendingRemoval>>)> {
        config.validate()?;
        let filter = PathFilter::new(config.filter_patterns()?, ignore);
        let (batcher, batches) = DeletionBatcher::new(config.delete_window());

        let engine = Self {
            locator: ManifestLocator::new(&config.manifest_extensions),
            cache: ManifestCache::new(),
            filter,
            prompter,
            batcher,
            unsaved: Mutex::new(HashSet::new()),
            status: Mutex::new(None),
            config,
        };
        Ok((engine, batches))
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn cache(&self) -> &ManifestCache {
        &self.cache
    }

    pub fn filter(&self) -> &PathFilter {
        &self.filter
    }

    pub fn is_manifest(&self, path: &Path) -> bool {
        self.locator.is_manifest(path)
    }

    /// Add `path` to its manifest.
    ///
    /// With `prompt` (save-triggered) the user is asked first and an
    /// already-tracked file is skipped quietly. Without it (explicit command)
    /// the file is added directly and re-adding a tracked file warns.
    /// Returns the manifest that was modified.
    pub async fn add_file(&self, path: &Path, prompt: bool) -> Result<Option<PathBuf>> {
        if !self.config.enabled || self.is_manifest(path) {
            return Ok(None);
        }
        if !self.filter.is_eligible(path) {
            debug!("Skipping ineligible {}", path.display());
            return Ok(None);
        }

        let manifest_path = self.locate_for(path).await?;
        let shared = self.cache.get(&manifest_path).await?;

        let (include, name) = {
            let doc = shared.lock().await;
            self.retry_unsaved(&doc).await?;
            let include = doc.relative_include(path)?;
            if has_entry(&doc, &include) {
                if !prompt {
                    self.prompter.notify(
                        Notice::Warning,
                        &format!("{} is already in {}", include, doc.name()),
                    );
                }
                return Ok(None);
            }
            (include, doc.name())
        };

        if prompt {
            match self.prompter.choose_add(&include, &name).await {
                Choice::Confirm => {}
                Choice::Defer => return Ok(None),
                Choice::Suppress => {
                    self.filter.ignore_list().insert(path)?;
                    return Ok(None);
                }
            }
        }

        let mut doc = shared.lock().await;
        // The document may have changed while the prompt was open
        if has_entry(&doc, &include) {
            return Ok(None);
        }
        let item_type = item_type_for_file(&file_name(path), &self.config.item_types);
        add_entry(&mut doc, &include, &item_type)?;
        self.write(&doc).await?;

        info!("Added {} to {} as {}", include, manifest_path.display(), item_type);
        self.prompter.notify(
            Notice::Info,
            &format!("Added {} to {}", include, manifest_path.display()),
        );
        self.refresh_status(&doc);
        Ok(Some(manifest_path))
    }

    /// Add every untracked file below `dir`, asking once and writing once per manifest.
    ///
    /// Returns the manifests that were modified.
    pub async fn add_directory(&self, dir: &Path, prompt: bool) -> Result<Vec<PathBuf>> {
        if !self.config.enabled {
            return Ok(Vec::new());
        }

        let root = dir.to_path_buf();
        let files = tokio::task::spawn_blocking(move || walk::collect_files(&root))
            .await
            .context("Directory walk panicked")??;

        // Group candidates by owning manifest, resolving each directory once
        let mut owners: HashMap<PathBuf, Option<PathBuf>> = HashMap::new();
        let mut by_manifest: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
        for file in files {
            if self.is_manifest(&file) || !self.filter.is_eligible(&file) {
                continue;
            }
            let parent = file.parent().unwrap_or(dir).to_path_buf();
            let owner = match owners.get(&parent) {
                Some(owner) => owner.clone(),
                None => {
                    let owner = match self.locator.locate(&parent).await {
                        Ok(found) => Some(found),
                        Err(e) if e.is_expected() => None,
                        Err(e) => return Err(e.into()),
                    };
                    owners.insert(parent, owner.clone());
                    owner
                }
            };
            if let Some(manifest) = owner {
                by_manifest.entry(manifest).or_default().push(file);
            }
        }

        let mut modified = Vec::new();
        for (manifest_path, files) in by_manifest {
            let shared = self.cache.get(&manifest_path).await?;

            let (missing, name) = {
                let doc = shared.lock().await;
                self.retry_unsaved(&doc).await?;
                let mut missing = Vec::new();
                for file in files {
                    let include = doc.relative_include(&file)?;
                    if !has_entry(&doc, &include) {
                        missing.push((file, include));
                    }
                }
                (missing, doc.name())
            };
            if missing.is_empty() {
                continue;
            }

            if prompt {
                let subject = format!("{} files under {}", missing.len(), dir.display());
                match self.prompter.choose_add(&subject, &name).await {
                    Choice::Confirm => {}
                    Choice::Defer => continue,
                    Choice::Suppress => {
                        for (file, _) in &missing {
                            self.filter.ignore_list().insert(file)?;
                        }
                        continue;
                    }
                }
            }

            let mut doc = shared.lock().await;
            let mut added = 0;
            for (file, include) in &missing {
                if has_entry(&doc, include) {
                    continue;
                }
                let item_type = item_type_for_file(&file_name(file), &self.config.item_types);
                add_entry(&mut doc, include, &item_type)?;
                added += 1;
            }
            if added == 0 {
                continue;
            }
            self.write(&doc).await?;
            self.refresh_status(&doc);

            info!("Added {} files to {}", added, manifest_path.display());
            self.prompter.notify(
                Notice::Info,
                &format!("Added {} files to {}", added, manifest_path.display()),
            );
            modified.push(manifest_path);
        }

        Ok(modified)
    }

    /// Remove `path` (a file, or a directory and everything below it) from its manifest.
    ///
    /// Asks first unless `silent`. Returns the manifest that was modified.
    pub async fn remove_file(
        &self,
        path: &Path,
        known_manifest: Option<&Path>,
        silent: bool,
    ) -> Result<Option<PathBuf>> {
        if !self.config.enabled || self.is_manifest(path) {
            return Ok(None);
        }

        let manifest_path = match known_manifest {
            Some(manifest) => manifest.to_path_buf(),
            None => self.locate_for(path).await?,
        };
        let reported = path.exists().then(|| path.is_dir());
        let removal = PendingRemoval {
            manifest_path,
            file_path: path.to_path_buf(),
            was_directory: infer_directory(path, reported),
        };

        if !silent {
            let message = confirmation_message(std::slice::from_ref(&removal));
            if !self.prompter.confirm_removal(&message).await {
                return Ok(None);
            }
        }

        if self.apply_removal(&removal).await? {
            Ok(Some(removal.manifest_path))
        } else {
            Ok(None)
        }
    }

    /// Forget every ignored path
    pub fn clear_ignore_list(&self) -> Result<()> {
        self.filter.ignore_list().clear()?;
        info!("Ignore list cleared");
        Ok(())
    }

    /// Queue a deleted path for the next removal batch.
    ///
    /// Paths no manifest entry refers to are dropped here so they never reach
    /// a confirmation.
    pub async fn file_deleted(&self, path: &Path, was_directory: bool) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        if self.is_manifest(path) {
            self.cache.invalidate(path);
            return Ok(());
        }
        if !self.filter.is_eligible(path) {
            return Ok(());
        }

        let manifest_path = self.locate_for(path).await?;
        let shared = self.cache.get(&manifest_path).await?;
        let tracked = {
            let doc = shared.lock().await;
            let include = doc.relative_include(path)?;
            covers_entry(&doc, &include, was_directory)
        };
        if !tracked {
            debug!("Deleted {} was not tracked", path.display());
            return Ok(());
        }

        self.batcher.record(PendingRemoval {
            manifest_path,
            file_path: path.to_path_buf(),
            was_directory,
        });
        Ok(())
    }

    /// Confirm and apply one batch of deletions.
    ///
    /// Per-item failures are logged and skipped; the batch is best-effort.
    pub async fn process_batch(&self, batch: Vec<PendingRemoval>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        if batch.is_empty() {
            return outcome;
        }

        let confirmed = self.config.silent_deletion
            || self
                .prompter
                .confirm_removal(&confirmation_message(&batch))
                .await;
        if !confirmed {
            info!("Kept {} deleted paths in their manifests", batch.len());
            outcome.declined = true;
            return outcome;
        }

        for removal in &batch {
            match self.apply_removal(removal).await {
                Ok(true) => outcome.removed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        "Failed to remove {} from {}: {:#}",
                        removal.file_path.display(),
                        removal.manifest_path.display(),
                        e
                    );
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }

    /// A manifest file changed on disk; drop its cached document unless the
    /// change was our own write
    pub async fn manifest_changed(&self, path: &Path) {
        if self.cache.invalidate_if_changed(path).await {
            info!("Reloading {} after external change", path.display());
            self.unsaved.lock().remove(path);
        }
    }

    /// Track the file the user is looking at; `None` clears the status
    pub async fn active_file_changed(&self, path: Option<&Path>) -> Result<Option<Tracking>> {
        let tracking = match path {
            Some(path) => self.status_for(path).await?,
            None => None,
        };
        *self.status.lock() = tracking.clone();
        Ok(tracking)
    }

    /// Last status computed for the active file
    pub fn status(&self) -> Option<Tracking> {
        self.status.lock().clone()
    }

    /// Whether `path` is tracked, or `None` when it is outside every manifest
    /// or not eligible
    pub async fn status_for(&self, path: &Path) -> Result<Option<Tracking>> {
        if !self.config.enabled || self.is_manifest(path) || !self.filter.is_eligible(path) {
            return Ok(None);
        }
        let manifest = match self.locate_for(path).await {
            Ok(manifest) => manifest,
            Err(e) if is_expected(&e) => return Ok(None),
            Err(e) => return Err(e),
        };
        let shared = self.cache.get(&manifest).await?;
        let doc = shared.lock().await;
        let include = doc.relative_include(path)?;
        let contained = has_entry(&doc, &include);
        Ok(Some(Tracking {
            manifest,
            include,
            contained,
        }))
    }

    /// Dispatch one (already debounced) filesystem event
    pub async fn handle_event(&self, event: WatchEvent) {
        let path = event.path.as_path();
        let result = match event.kind {
            EventKind::Modify | EventKind::Create { is_dir: false } if self.is_manifest(path) => {
                self.manifest_changed(path).await;
                Ok(())
            }
            EventKind::Modify | EventKind::Create { is_dir: false } => {
                self.add_file(path, true).await.map(|_| ())
            }
            EventKind::Create { is_dir: true } => self.add_directory(path, true).await.map(|_| ()),
            EventKind::Delete { is_dir } => {
                self.file_deleted(path, infer_directory(path, is_dir)).await
            }
        };

        if let Err(e) = result {
            self.report(&e);
        }
    }

    /// Decide what the user sees for a command failure.
    ///
    /// "No manifest found" is expected for files outside any project and is
    /// only logged. Everything else is shown verbatim. Returns whether the
    /// error was surfaced.
    pub fn report(&self, err: &anyhow::Error) -> bool {
        if is_expected(err) {
            debug!("{:#}", err);
            return false;
        }
        warn!("{:#}", err);
        self.prompter.notify(Notice::Error, &format!("{:#}", err));
        true
    }

    /// Pending deletions not yet handed to a batch
    pub fn pending_removals(&self) -> usize {
        self.batcher.pending_len()
    }

    /// Drop all cached state
    pub fn shutdown(&self) {
        let dropped = self.batcher.flush();
        if !dropped.is_empty() {
            info!("Discarding {} queued removals on shutdown", dropped.len());
        }
        self.cache.invalidate_all();
        *self.status.lock() = None;
    }

    async fn apply_removal(&self, removal: &PendingRemoval) -> Result<bool> {
        let shared = self.cache.get(&removal.manifest_path).await?;
        let mut doc = shared.lock().await;
        self.retry_unsaved(&doc).await?;

        let include = doc.relative_include(&removal.file_path)?;
        if !remove_entry(&mut doc, &include, removal.was_directory)? {
            debug!("{} was not in {}", include, doc.name());
            return Ok(false);
        }
        self.write(&doc).await?;
        self.refresh_status(&doc);

        info!("Removed {} from {}", include, removal.manifest_path.display());
        Ok(true)
    }

    /// Manifest owning `path`, searched from its nearest existing ancestor
    async fn locate_for(&self, path: &Path) -> Result<PathBuf> {
        let mut dir = path.parent().unwrap_or(path);
        while !dir.exists() {
            match dir.parent() {
                Some(parent) => dir = parent,
                None => break,
            }
        }
        Ok(self.locator.locate(dir).await?)
    }

    async fn write(&self, doc: &ManifestDocument) -> Result<()> {
        match persist(doc).await {
            Ok(()) => {
                self.unsaved.lock().remove(doc.path());
                Ok(())
            }
            Err(e) => {
                self.unsaved.lock().insert(doc.path().to_path_buf());
                Err(e.into())
            }
        }
    }

    /// Re-attempt a write that failed earlier, before mutating again
    async fn retry_unsaved(&self, doc: &ManifestDocument) -> Result<()> {
        let pending = self.unsaved.lock().contains(doc.path());
        if pending {
            debug!("Retrying write of {}", doc.path().display());
            self.write(doc).await?;
        }
        Ok(())
    }

    /// Recompute the status line when `doc` owns the active file
    fn refresh_status(&self, doc: &ManifestDocument) {
        let mut status = self.status.lock();
        if let Some(tracking) = status.as_mut().filter(|s| s.manifest == doc.path()) {
            tracking.contained = has_entry(doc, &tracking.include);
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// True when `err` is a [`SyncError`] that is logged but never shown
pub fn is_expected(err: &anyhow::Error) -> bool {
    err.downcast_ref::<SyncError>()
        .is_some_and(SyncError::is_expected)
}
