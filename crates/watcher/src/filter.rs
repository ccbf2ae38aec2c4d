//! Eligibility gate for synchronization
//!
//! A path is eligible when, in order:
//! 1. it is not on the ignore list
//! 2. it matches the include pattern
//! 3. it does not match the exclude pattern (when one is set)
//!
//! Nothing is cached; patterns can be swapped between calls.

use crate::ignore_list::IgnoreList;
use anyhow::{Context, Result};
use parking_lot::RwLock;
use regex::Regex;
use std::path::Path;

/// Default include pattern: everything
pub const INCLUDE_ALL: &str = ".*";

/// Compiled include/exclude patterns
#[derive(Debug, Clone)]
pub struct FilterPatterns {
    include: Regex,
    exclude: Option<Regex>,
}

impl FilterPatterns {
    pub fn new(include: &str, exclude: Option<&str>) -> Result<Self> {
        let include = Regex::new(include)
            .with_context(|| format!("Invalid include pattern: {}", include))?;
        let exclude = exclude
            .filter(|p| !p.is_empty())
            .map(|p| Regex::new(p).with_context(|| format!("Invalid exclude pattern: {}", p)))
            .transpose()?;
        Ok(Self { include, exclude })
    }

    fn matches(&self, path: &str) -> bool {
        self.include.is_match(path)
            && !self.exclude.as_ref().is_some_and(|re| re.is_match(path))
    }
}

impl Default for FilterPatterns {
    fn default() -> Self {
        Self {
            include: Regex::new(INCLUDE_ALL).expect("static pattern"),
            exclude: None,
        }
    }
}

pub struct PathFilter {
    patterns: RwLock<FilterPatterns>,
    ignore: IgnoreList,
}

impl PathFilter {
    pub fn new(patterns: FilterPatterns, ignore: IgnoreList) -> Self {
        Self {
            patterns: RwLock::new(patterns),
            ignore,
        }
    }

    /// Whether `path` should be synchronized at all
    pub fn is_eligible(&self, path: &Path) -> bool {
        if self.ignore.contains(path) {
            return false;
        }
        self.patterns.read().matches(&path.to_string_lossy())
    }

    /// Replace the include/exclude patterns
    pub fn set_patterns(&self, patterns: FilterPatterns) {
        *self.patterns.write() = patterns;
    }

    pub fn ignore_list(&self) -> &IgnoreList {
        &self.ignore
    }
}
