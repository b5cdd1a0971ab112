//! Symlink-safe filesystem helpers used while resolving plugin trees.
//!
//! Capability directories are detected with `symlink_metadata()` so a
//! symlinked `commands/` pointing outside the plugin is not treated as part
//! of it.

use std::path::{Component, Path};

/// Returns `true` if the path is a regular directory (not a symlink).
#[must_use]
pub(crate) fn is_regular_dir(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|m| m.file_type().is_dir())
        .unwrap_or(false)
}

/// Render a relative path with `/` separators regardless of platform, so
/// declared file sets and report output are identical everywhere.
#[must_use]
pub(crate) fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Returns `true` if a relative path climbs above its starting directory
/// (e.g. `../x` or `a/../../x`).
#[must_use]
pub(crate) fn escapes_base(path: &Path) -> bool {
    let mut depth: usize = 0;
    for component in path.components() {
        match component {
            Component::ParentDir => {
                if depth == 0 {
                    return true;
                }
                depth -= 1;
            }
            Component::Normal(_) => depth += 1,
            _ => {}
        }
    }
    false
}
