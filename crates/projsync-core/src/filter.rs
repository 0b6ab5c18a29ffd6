//! Path filter
//!
//! Decides whether a filesystem path participates in sync. A path is ignored
//! when its base name matches an ignore pattern (a glob such as `*.log` or
//! `build-*`, or a plain name), or, for files only, when its extension is not
//! allow-listed. Extension-less files pass only when their name is listed in
//! `allowed_names`.

use std::collections::HashSet;
use std::path::{Component, Path};

use glob::Pattern;
use tracing::warn;

use crate::config::FilterConfig;

/// Compiles ignore patterns; invalid patterns are logged and skipped
fn compile_ignore(patterns: &[String]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|raw| match Pattern::new(raw) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                warn!(pattern = %raw, error = %e, "Skipping invalid ignore pattern");
                None
            }
        })
        .collect()
}

/// Name and extension policy applied at selection time and to watcher events
#[derive(Debug, Clone)]
pub struct PathFilter {
    rules: Vec<Pattern>,
    extensions: HashSet<String>,
    names: HashSet<String>,
}

impl PathFilter {
    /// Builds a filter from the `filter` configuration section
    pub fn from_config(config: &FilterConfig) -> Self {
        Self {
            rules: compile_ignore(&config.ignore),
            extensions: config
                .allowed_extensions
                .iter()
                .map(|e| e.to_ascii_lowercase())
                .collect(),
            names: config.allowed_names.iter().cloned().collect(),
        }
    }

    /// Returns true if `name` matches an ignore rule
    pub fn is_ignored_name(&self, name: &str) -> bool {
        self.rules.iter().any(|pattern| pattern.matches(name))
    }

    /// Pure name/extension decision for `path`
    ///
    /// Directories are rejected only on name grounds.
    pub fn should_ignore(&self, path: &Path, is_dir: bool) -> bool {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
            return false;
        };

        if self.is_ignored_name(&name) {
            return true;
        }
        if is_dir {
            return false;
        }

        match path.extension() {
            Some(ext) => !self
                .extensions
                .contains(&ext.to_string_lossy().to_ascii_lowercase()),
            None => !self.names.contains(name.as_ref()),
        }
    }

    /// Like [`should_ignore`](Self::should_ignore), stat'ing `path` to learn
    /// whether it is a directory. Unreadable paths are ignored.
    pub fn should_ignore_path(&self, path: &Path) -> bool {
        match std::fs::metadata(path) {
            Ok(meta) => self.should_ignore(path, meta.is_dir()),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Ignoring unreadable path");
                true
            }
        }
    }

    /// Filters `path` as seen from beneath `root`
    ///
    /// Also rejects the path when any directory between `root` and `path`
    /// matches a name rule, so `root/node_modules/x.js` is ignored.
    pub fn is_ignored_below(&self, root: &Path, path: &Path, is_dir: bool) -> bool {
        if let Ok(relative) = path.strip_prefix(root) {
            let mut components = relative.components().peekable();
            while let Some(component) = components.next() {
                if components.peek().is_none() {
                    break;
                }
                if let Component::Normal(name) = component {
                    if self.is_ignored_name(&name.to_string_lossy()) {
                        return true;
                    }
                }
            }
        }
        self.should_ignore(path, is_dir)
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        Self::from_config(&FilterConfig::default())
    }
}
