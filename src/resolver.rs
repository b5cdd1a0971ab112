//! Plugin resolution: map a manifest entry (or a bare directory) to a
//! [`PluginDescriptor`] by walking the plugin tree once.
//!
//! Resolution never reads file contents; that is left to the rules.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::{Result, ValidatorError};
use crate::fs_util::{is_regular_dir, to_slash};
use crate::manifest::{ManifestEntry, PluginSource};

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &[".git"];

/// A path the walk could not read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadableEntry {
    /// Plugin-relative path (`/`-separated); empty for the root itself.
    pub path: String,
    /// Error text.
    pub message: String,
}

/// Everything known about a plugin's layout after one directory walk.
#[derive(Debug, Clone)]
pub struct PluginDescriptor {
    /// Plugin name (manifest entry name, or directory name in single mode).
    pub name: String,
    /// Resolved plugin root.
    pub root: PathBuf,
    pub has_commands: bool,
    pub has_skills: bool,
    pub has_hooks: bool,
    pub has_agents: bool,
    /// Every regular file under the root, `/`-separated and sorted.
    pub declared_files: BTreeSet<String>,
    /// Paths the walk could not read.
    pub unreadable: Vec<UnreadableEntry>,
}

impl PluginDescriptor {
    /// Returns `true` if any capability directory exists.
    #[must_use]
    pub fn has_capabilities(&self) -> bool {
        self.has_commands || self.has_skills || self.has_hooks || self.has_agents
    }

    /// Returns `true` if the relative file was found by the walk.
    #[must_use]
    pub fn has_file(&self, relative: &str) -> bool {
        self.declared_files.contains(relative)
    }

    /// Declared files below a relative directory prefix (without trailing `/`).
    pub fn files_under<'a>(&'a self, dir: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.declared_files
            .iter()
            .map(String::as_str)
            .filter(move |f| f.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/')))
    }
}

/// Resolve a manifest entry relative to `base_dir`.
///
/// Fails with [`ValidatorError::PluginNotFound`] if the source path does not
/// exist or is not a directory, and with [`ValidatorError::NotLocal`] for a
/// remote source.
pub fn resolve(entry: &ManifestEntry, base_dir: &Path) -> Result<PluginDescriptor> {
    match &entry.source {
        PluginSource::Local(path) => describe(entry.name.clone(), base_dir.join(path)),
        PluginSource::Remote(remote) => Err(ValidatorError::NotLocal {
            location: remote.to_string(),
        }),
    }
}

/// Resolve a plugin directory outside of any manifest. The plugin is named
/// after the directory.
pub fn resolve_dir(dir: &Path) -> Result<PluginDescriptor> {
    let name = dir
        .canonicalize()
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .or_else(|| dir.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string());
    describe(name, dir.to_path_buf())
}

fn describe(name: String, root: PathBuf) -> Result<PluginDescriptor> {
    if !root.is_dir() {
        return Err(ValidatorError::PluginNotFound { path: root });
    }

    let mut declared_files = BTreeSet::new();
    let mut unreadable = Vec::new();
    let walker = WalkDir::new(&root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            !(e.depth() > 0
                && e.file_type().is_dir()
                && SKIPPED_DIRS.iter().any(|d| e.file_name() == *d))
        });

    for item in walker {
        match item {
            Ok(entry) if entry.file_type().is_file() => {
                if let Ok(relative) = entry.path().strip_prefix(&root) {
                    declared_files.insert(to_slash(relative));
                }
            }
            Ok(_) => {}
            Err(e) => {
                let path = e
                    .path()
                    .and_then(|p| p.strip_prefix(&root).ok())
                    .map(to_slash)
                    .unwrap_or_default();
                warn!(plugin = %name, path = %path, error = %e, "cannot read plugin entry");
                unreadable.push(UnreadableEntry {
                    path,
                    message: e.to_string(),
                });
            }
        }
    }

    let has = |dir: &str| is_regular_dir(&root.join(dir));
    let descriptor = PluginDescriptor {
        has_commands: has("commands"),
        has_skills: has("skills"),
        has_hooks: has("hooks"),
        has_agents: has("agents"),
        name,
        root,
        declared_files,
        unreadable,
    };
    debug!(
        plugin = %descriptor.name,
        files = descriptor.declared_files.len(),
        "resolved plugin"
    );
    Ok(descriptor)
}
