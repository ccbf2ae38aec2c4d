//! Configuration management command
//!
//! Provides CLI interface to view and edit the user configuration.

use crate::config::{self, SyncConfig};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

/// Keys accepted by `get` and `set`
pub const KEYS: &[&str] = &[
    "enabled",
    "silent_deletion",
    "debounce_ms",
    "manifest_extensions",
    "include",
    "exclude",
    "item_types.<ext>",
];

/// List all configuration values
pub async fn run_list() -> Result<()> {
    let config = config::load()?;
    let config_path = config::config_file_path().context("Could not determine config file path")?;

    println!("{}", "Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), config_path.display().dimmed());

    for key in ["enabled", "silent_deletion", "debounce_ms", "manifest_extensions", "include", "exclude"] {
        println!("  {} = {}", key.cyan(), get_value(&config, key)?);
    }

    println!("\n{}", "[item_types]".yellow());
    for (ext, item_type) in &config.item_types {
        println!("  {} = {}", ext.cyan(), item_type);
    }

    println!("\n{}", "Valid Ranges:".bold());
    println!("  debounce_ms: 50-60000");

    Ok(())
}

/// Get a single configuration value
pub async fn run_get(key: &str) -> Result<()> {
    let config = config::load()?;
    println!("{}", get_value(&config, key)?);
    Ok(())
}

/// Set a configuration value
pub async fn run_set(key: &str, value: &str) -> Result<()> {
    let path = config::config_file_path().context("Could not determine config file path")?;
    let mut config = config::load_from(&path)?;
    set_value(&mut config, key, value)?;

    config.validate().context("Invalid configuration value")?;
    config::save_to(&config, &path)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), value);
    println!("{}", "Note: restart running watchers for changes to take effect".yellow());
    Ok(())
}

/// Show the config file path and optionally create it
pub async fn run_path(create: bool) -> Result<()> {
    let config_path = config::config_file_path().context("Could not determine config file path")?;

    if create && !config_path.exists() {
        config::init_if_missing()?;
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else if config_path.exists() {
        println!("{}", config_path.display());
    } else {
        println!("{}", config_path.display());
        println!("{}", "File does not exist. Use --create to create it.".yellow());
    }

    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    println!("{}", config::example_config());
    Ok(())
}

fn get_value(config: &SyncConfig, key: &str) -> Result<String> {
    let value = match key {
        "enabled" => config.enabled.to_string(),
        "silent_deletion" => config.silent_deletion.to_string(),
        "debounce_ms" => config.debounce_ms.to_string(),
        "manifest_extensions" => config.manifest_extensions.join(","),
        "include" => config.include.clone(),
        "exclude" => config.exclude.clone().unwrap_or_default(),
        _ => match key.strip_prefix("item_types.") {
            Some(ext) => config
                .item_types
                .get(ext)
                .cloned()
                .with_context(|| format!("No item type configured for {}", ext))?,
            None => unknown_key(key)?,
        },
    };
    Ok(value)
}

fn set_value(config: &mut SyncConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "enabled" => {
            config.enabled = value
                .parse()
                .context("Invalid value: must be 'true' or 'false'")?;
        }
        "silent_deletion" => {
            config.silent_deletion = value
                .parse()
                .context("Invalid value: must be 'true' or 'false'")?;
        }
        "debounce_ms" => {
            config.debounce_ms = value
                .parse()
                .context("Invalid value: must be a positive integer")?;
        }
        "manifest_extensions" => {
            config.manifest_extensions = value
                .split(',')
                .map(|ext| ext.trim().to_string())
                .filter(|ext| !ext.is_empty())
                .collect();
        }
        "include" => config.include = value.to_string(),
        // An empty exclude turns excluding off
        "exclude" => config.exclude = Some(value.to_string()).filter(|v| !v.is_empty()),
        _ => match key.strip_prefix("item_types.") {
            Some(ext) if !ext.is_empty() => {
                config.item_types.insert(ext.to_string(), value.to_string());
            }
            _ => unknown_key(key)?,
        },
    }
    Ok(())
}

fn unknown_key<T>(key: &str) -> Result<T> {
    anyhow::bail!(
        "Unknown config key: {}. Known keys: {}",
        key,
        KEYS.join(", ")
    )
}
