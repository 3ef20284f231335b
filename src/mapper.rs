//! Path mapping and the exclusion list
//!
//! Translates a changed source path inside a monorepo package tree into
//! its destination inside the consumer's node_modules, by splitting on
//! the package's `urn-<name>` directory marker and remounting the suffix
//! under the consumer-facing package name.

use std::path::{Path, PathBuf};

use crate::error::{SyncError, SyncResult};
use crate::repo::Repo;

/// Relative paths (package-root relative) that must never be copied.
///
/// `dist/client/toml.js` is hand-maintained at the destination and would
/// be clobbered by the generated build output.
pub const DO_NOT_TRANSFER: &[&str] = &["dist/client/toml.js"];

/// A resolved destination for one change event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapped {
    /// Absolute path to write/remove inside the consumer repo
    pub destination: PathBuf,
    /// Path relative to the package root, no leading separator
    pub relative: String,
}

/// Map a source path under `urn-<repo>` to its node_modules destination.
///
/// A source path that does not contain the marker segment violates the
/// supervisor's watch-root invariant and is surfaced as an explicit
/// error, never as a silent no-op.
pub fn map_destination(
    source_path: &Path,
    repo: Repo,
    is_final: bool,
    repo_path: &Path,
) -> SyncResult<Mapped> {
    let marker = repo.dir_name();
    let source = source_path.to_string_lossy();
    let suffix = match source.find(marker) {
        Some(idx) => &source[idx + marker.len()..],
        None => {
            return Err(SyncError::MarkerNotFound {
                marker: marker.to_string(),
                path: source_path.to_path_buf(),
            })
        }
    };
    let destination = PathBuf::from(format!(
        "{}/node_modules/{}{}",
        repo_path.display(),
        repo.node_modules_name(is_final),
        suffix
    ));
    Ok(Mapped {
        destination,
        relative: suffix.trim_start_matches('/').to_string(),
    })
}

/// Exact-match membership test against the static exclusion list.
///
/// No globbing, no prefix matching. Applied to add/change events only;
/// removals bypass this filter so a deleted source still clears its
/// destination copy.
pub fn is_excluded(relative_path: &str) -> bool {
    DO_NOT_TRANSFER.contains(&relative_path)
}
