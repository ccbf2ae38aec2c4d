//! User configuration
//!
//! Stored as TOML at `<config dir>/csync/config.toml` (or `$CSYNC_CONFIG`).
//! A missing file means defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use watcher::FilterPatterns;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "CSYNC_CONFIG";

/// Per-workspace state directory name
pub const STATE_DIR: &str = ".csync";

/// Default exclude pattern: VCS metadata, csync state and build output
pub const DEFAULT_EXCLUDE: &str = r"(^|[/\\])(\.git|\.csync|bin|obj)([/\\]|$)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Master switch for synchronization
    pub enabled: bool,

    /// Remove deleted files without asking
    pub silent_deletion: bool,

    /// Quiet period before a deletion batch fires
    pub debounce_ms: u64,

    /// Manifest file extensions, without the dot
    pub manifest_extensions: Vec<String>,

    /// Paths must match this to be synchronized
    pub include: String,

    /// Paths matching this are never synchronized
    pub exclude: Option<String>,

    /// Item type per extension (`.ts`), `*` for everything else
    pub item_types: BTreeMap<String, String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let mut item_types = BTreeMap::new();
        item_types.insert("*".to_string(), "Content".to_string());
        item_types.insert(".ts".to_string(), "TypeScriptCompile".to_string());

        Self {
            enabled: true,
            silent_deletion: false,
            debounce_ms: 2000,
            manifest_extensions: vec!["csproj".to_string()],
            include: watcher::filter::INCLUDE_ALL.to_string(),
            exclude: Some(DEFAULT_EXCLUDE.to_string()),
            item_types,
        }
    }
}

impl SyncConfig {
    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(50..=60_000).contains(&self.debounce_ms) {
            anyhow::bail!(
                "debounce_ms must be between 50 and 60000 (got {})",
                self.debounce_ms
            );
        }
        if self.manifest_extensions.iter().all(|e| e.trim().is_empty()) {
            anyhow::bail!("manifest_extensions must name at least one extension");
        }
        if self.item_types.values().any(|t| t.trim().is_empty()) {
            anyhow::bail!("item_types values must not be empty");
        }
        self.filter_patterns()?;
        Ok(())
    }

    /// Compiled include/exclude patterns
    pub fn filter_patterns(&self) -> Result<FilterPatterns> {
        FilterPatterns::new(&self.include, self.exclude.as_deref())
    }

    pub fn delete_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Location of the config file
pub fn config_file_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("csync").join("config.toml"))
}

/// Load the config, falling back to defaults when the file does not exist
pub fn load() -> Result<SyncConfig> {
    match config_file_path() {
        Some(path) => load_from(&path),
        None => Ok(SyncConfig::default()),
    }
}

pub fn load_from(path: &Path) -> Result<SyncConfig> {
    if !path.exists() {
        return Ok(SyncConfig::default());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: SyncConfig = toml::from_str(&text)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config {}", path.display()))?;
    Ok(config)
}

pub fn save(config: &SyncConfig) -> Result<()> {
    let path = config_file_path().context("Could not determine config file path")?;
    save_to(config, &path)
}

pub fn save_to(config: &SyncConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let text = toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, text).with_context(|| format!("Failed to write config {}", path.display()))
}

/// Write the default config if no file exists yet
pub fn init_if_missing() -> Result<PathBuf> {
    let path = config_file_path().context("Could not determine config file path")?;
    if !path.exists() {
        save_to(&SyncConfig::default(), &path)?;
    }
    Ok(path)
}

/// Annotated example config
pub fn example_config() -> String {
    format!(
        r#"# csync configuration

# Master switch
enabled = true

# Remove deleted files from the manifest without asking
silent_deletion = false

# Quiet period (ms) before a burst of deletions is handled (50-60000)
debounce_ms = 2000

# Manifest file extensions
manifest_extensions = ["csproj"]

# Only paths matching `include` and not matching `exclude` are synchronized
include = ".*"
exclude = '{}'

# Item type per file extension; "*" applies to everything else
[item_types]
"*" = "Content"
".ts" = "TypeScriptCompile"
"#,
        DEFAULT_EXCLUDE
    )
}

/// `<root>/.csync`
pub fn state_dir(root: &Path) -> PathBuf {
    root.join(STATE_DIR)
}

/// `<root>/.csync/ignore.json`
pub fn ignore_list_path(root: &Path) -> PathBuf {
    state_dir(root).join("ignore.json")
}
