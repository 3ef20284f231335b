//! Configuration probing for uranio-sync
//!
//! Everything here runs once at startup, before any watcher starts:
//! validate the consumer repo (`.uranio/.uranio.json`), validate the
//! monorepo (`package.json` with a `uranio` marker field), read the
//! selected package identity, and build the binary registry from each
//! watched package's declared `bin` entry points.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{SyncError, SyncResult};
use crate::repo::Repo;

/// Contents of `.uranio/.uranio.json` inside the consumer repo
#[derive(Debug, Deserialize)]
pub struct RepoState {
    pub repo: Repo,
}

/// Monorepo root package.json; only the marker field matters
#[derive(Debug, Deserialize)]
struct MonorepoManifest {
    uranio: Option<serde_json::Value>,
}

/// Per-package package.json; only the bin map matters
#[derive(Debug, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    bin: Option<BTreeMap<String, String>>,
}

/// Expand a leading or embedded `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(home) = dirs::home_dir() {
        PathBuf::from(path.replace('~', &home.to_string_lossy()))
    } else {
        PathBuf::from(path)
    }
}

/// Check that the consumer repo exists and has been `uranio init`ed.
pub fn check_repo_initialized(repo_path: &Path) -> SyncResult<()> {
    if !repo_path.is_dir() {
        return Err(SyncError::InvalidPath {
            path: repo_path.to_path_buf(),
        });
    }
    if !repo_path.join(".uranio").is_dir() {
        return Err(SyncError::RepoNotInitialized {
            path: repo_path.to_path_buf(),
        });
    }
    if !repo_path.join(".uranio").join(".uranio.json").is_file() {
        return Err(SyncError::RepoBroken {
            path: repo_path.to_path_buf(),
        });
    }
    Ok(())
}

/// Check that the given path is a Uranio monorepo root: a directory
/// whose package.json parses and carries the `uranio` marker field.
pub fn check_monorepo(monorepo_path: &Path) -> SyncResult<()> {
    if !monorepo_path.is_dir() {
        return Err(SyncError::InvalidPath {
            path: monorepo_path.to_path_buf(),
        });
    }
    let package_path = monorepo_path.join("package.json");
    if !package_path.is_file() {
        return Err(SyncError::MissingManifest {
            path: monorepo_path.to_path_buf(),
        });
    }
    let manifest: MonorepoManifest = read_json(&package_path)?;
    if manifest.uranio.is_none() {
        return Err(SyncError::NotUranio {
            path: monorepo_path.to_path_buf(),
        });
    }
    Ok(())
}

/// Read which package identity the consumer repo currently has installed.
pub fn selected_repo(repo_path: &Path) -> SyncResult<Repo> {
    let state_path = repo_path.join(".uranio").join(".uranio.json");
    let state: RepoState = read_json(&state_path)?;
    Ok(state.repo)
}

/// Build the binary registry: the set of destination paths that must be
/// marked executable after replication. One entry per `bin` declaration
/// in each watched package's manifest.
pub fn binary_destinations(
    repo_path: &Path,
    monorepo_path: &Path,
    selected: Repo,
) -> SyncResult<HashSet<PathBuf>> {
    let mut destinations = HashSet::new();
    for (repo, is_final) in selected.sync_chain() {
        let manifest_path = monorepo_path.join(repo.dir_name()).join("package.json");
        let manifest: PackageManifest = read_json(&manifest_path)?;
        if let Some(bin) = manifest.bin {
            for bin_path in bin.values() {
                destinations.insert(
                    repo_path
                        .join("node_modules")
                        .join(repo.node_modules_name(is_final))
                        .join(bin_path),
                );
            }
        }
    }
    Ok(destinations)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> SyncResult<T> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| SyncError::JsonParse {
        path: path.to_path_buf(),
        source,
    })
}
