//! Change kinds, notify-event classification, and observability events

use std::path::Path;
use std::sync::Arc;

use notify::event::{CreateKind, EventKind, ModifyKind, RemoveKind, RenameMode};
use serde::Serialize;

/// What a filesystem notification means for one path.
///
/// Kind names serialize to the chokidar-style names (`add`, `change`,
/// `unlink`, `unlinkDir`) that appear in the operator log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeKind {
    #[serde(rename = "add")]
    Added,
    #[serde(rename = "change")]
    Modified,
    #[serde(rename = "unlink")]
    RemovedFile,
    #[serde(rename = "unlinkDir")]
    RemovedDir,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "add",
            ChangeKind::Modified => "change",
            ChangeKind::RemovedFile => "unlink",
            ChangeKind::RemovedDir => "unlinkDir",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw classification of a notify event kind, before the removal
/// file/directory ambiguity is resolved against the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Classified {
    Added,
    Modified,
    Removed(RemoveHint),
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RemoveHint {
    File,
    Dir,
    /// Backend did not say; decide by looking at the destination.
    Any,
}

pub(crate) fn classify(kind: EventKind) -> Classified {
    match kind {
        // Destination directories are created on demand by file copies.
        EventKind::Create(CreateKind::Folder) => Classified::Ignored,
        EventKind::Create(_) => Classified::Added,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            Classified::Removed(RemoveHint::Any)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Classified::Added,
        EventKind::Modify(_) => Classified::Modified,
        EventKind::Remove(RemoveKind::Folder) => Classified::Removed(RemoveHint::Dir),
        EventKind::Remove(RemoveKind::File) => Classified::Removed(RemoveHint::File),
        EventKind::Remove(_) => Classified::Removed(RemoveHint::Any),
        EventKind::Any => Classified::Modified,
        EventKind::Access(_) | EventKind::Other => Classified::Ignored,
    }
}

/// Observability events, printed human-readable or as NDJSON.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    Started { watched: Vec<String> },
    Change { kind: ChangeKind, path: String },
    Copied { from: String, to: String },
    Removed { kind: ChangeKind, to: String },
    Excluded { path: String },
    MarkedExecutable { path: String },
    Command { line: String },
    CommandFailed { command: String },
    Error { message: String },
    Interrupted,
    Stopped { target: String },
    Shutdown,
}

impl SyncEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Shared callback every component reports through.
pub type EventSink = Arc<dyn Fn(SyncEvent) + Send + Sync>;

/// Abbreviate a monorepo-side path for log output.
pub fn print_monorepo(path: &Path, monorepo_path: &Path) -> String {
    abbrev(path, monorepo_path, "__uranio")
}

/// Abbreviate a consumer-repo-side path for log output.
pub fn print_repo(path: &Path, repo_path: &Path) -> String {
    abbrev(path, repo_path, "__root")
}

fn abbrev(path: &Path, root: &Path, tag: &str) -> String {
    match path.strip_prefix(root) {
        Ok(rest) => format!("{}/{}", tag, rest.display()),
        Err(_) => path.display().to_string(),
    }
}
