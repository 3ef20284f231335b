//! Replication engine
//!
//! Applies one change event to its resolved destination: overwrite the
//! destination with the source bytes, or remove the destination file or
//! subtree. After a successful copy the binary registry is consulted and
//! known entry points get their executable bit back, best-effort.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::SyncResult;
use crate::watcher::event::{print_monorepo, print_repo, ChangeKind, EventSink, SyncEvent};

/// Applies replication actions and emits the per-event log lines.
pub struct Replicator {
    repo_path: PathBuf,
    monorepo_path: PathBuf,
    binaries: Arc<HashSet<PathBuf>>,
    sink: EventSink,
}

impl Replicator {
    pub fn new(
        repo_path: PathBuf,
        monorepo_path: PathBuf,
        binaries: Arc<HashSet<PathBuf>>,
        sink: EventSink,
    ) -> Self {
        Self {
            repo_path,
            monorepo_path,
            binaries,
            sink,
        }
    }

    /// Perform the filesystem mutation for one event.
    ///
    /// Copy failures propagate to the caller; the executable-bit pass
    /// never fails the event, it only logs.
    pub fn apply(&self, kind: ChangeKind, source: &Path, destination: &Path) -> SyncResult<()> {
        match kind {
            ChangeKind::Added | ChangeKind::Modified => {
                if let Some(parent) = destination.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(source, destination)?;
                (self.sink)(SyncEvent::Copied {
                    from: print_monorepo(source, &self.monorepo_path),
                    to: print_repo(destination, &self.repo_path),
                });
                self.mark_executable(destination);
            }
            ChangeKind::RemovedFile => {
                remove_if_present(destination, |path| fs::remove_file(path))?;
                (self.sink)(SyncEvent::Removed {
                    kind,
                    to: print_repo(destination, &self.repo_path),
                });
            }
            ChangeKind::RemovedDir => {
                remove_if_present(destination, |path| fs::remove_dir_all(path))?;
                (self.sink)(SyncEvent::Removed {
                    kind,
                    to: print_repo(destination, &self.repo_path),
                });
            }
        }
        Ok(())
    }

    /// Reapply the executable bit when the destination is a declared
    /// entry point. Best-effort: failure is logged, never fatal.
    fn mark_executable(&self, destination: &Path) {
        if !self.binaries.contains(destination) {
            return;
        }
        match set_executable(destination) {
            Ok(()) => (self.sink)(SyncEvent::MarkedExecutable {
                path: print_repo(destination, &self.repo_path),
            }),
            Err(err) => (self.sink)(SyncEvent::Error {
                message: format!("chmod +x failed for {}: {}", destination.display(), err),
            }),
        }
    }
}

fn remove_if_present(
    path: &Path,
    remove: impl Fn(&Path) -> io::Result<()>,
) -> io::Result<()> {
    match remove(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(unix)]
fn set_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o111);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::tempdir;

    fn collecting_sink() -> (EventSink, Arc<Mutex<Vec<SyncEvent>>>) {
        let events: Arc<Mutex<Vec<SyncEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_events = events.clone();
        let sink: EventSink = Arc::new(move |event| sink_events.lock().unwrap().push(event));
        (sink, events)
    }

    fn replicator(binaries: HashSet<PathBuf>) -> (Replicator, Arc<Mutex<Vec<SyncEvent>>>) {
        let (sink, events) = collecting_sink();
        (
            Replicator::new(
                PathBuf::from("/repo"),
                PathBuf::from("/mono"),
                Arc::new(binaries),
                sink,
            ),
            events,
        )
    }

    #[test]
    fn copy_makes_destination_byte_identical() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("x.js");
        let dest = dir.path().join("out/nested/x.js");
        fs::write(&source, b"export const x = 1;\n").unwrap();

        let (engine, events) = replicator(HashSet::new());
        engine.apply(ChangeKind::Added, &source, &dest).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"export const x = 1;\n");
        assert!(matches!(
            events.lock().unwrap()[0],
            SyncEvent::Copied { .. }
        ));
    }

    #[test]
    fn modify_overwrites_existing_destination() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("x.js");
        let dest = dir.path().join("x.out.js");
        fs::write(&source, "new").unwrap();
        fs::write(&dest, "old content that is longer").unwrap();

        let (engine, _) = replicator(HashSet::new());
        engine.apply(ChangeKind::Modified, &source, &dest).unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "new");
    }

    #[test]
    fn remove_file_tolerates_absent_destination() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("gone.js");

        let (engine, _) = replicator(HashSet::new());
        engine
            .apply(ChangeKind::RemovedFile, Path::new("/mono/src"), &dest)
            .unwrap();

        fs::write(&dest, "x").unwrap();
        engine
            .apply(ChangeKind::RemovedFile, Path::new("/mono/src"), &dest)
            .unwrap();
        assert!(!dest.exists());
    }

    #[test]
    fn remove_dir_deletes_subtree_recursively() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("lib");
        fs::create_dir_all(dest.join("deep")).unwrap();
        fs::write(dest.join("deep/a.js"), "a").unwrap();

        let (engine, _) = replicator(HashSet::new());
        engine
            .apply(ChangeKind::RemovedDir, Path::new("/mono/src"), &dest)
            .unwrap();
        assert!(!dest.exists());

        // absent subtree is not an error
        engine
            .apply(ChangeKind::RemovedDir, Path::new("/mono/src"), &dest)
            .unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn registered_entry_point_becomes_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let source = dir.path().join("index.js");
        let bin_dest = dir.path().join("bin/index.js");
        let plain_dest = dir.path().join("lib/plain.js");
        fs::write(&source, "#!/usr/bin/env node\n").unwrap();

        let (engine, events) = replicator(HashSet::from([bin_dest.clone()]));
        engine.apply(ChangeKind::Added, &source, &bin_dest).unwrap();
        engine
            .apply(ChangeKind::Added, &source, &plain_dest)
            .unwrap();

        let bin_mode = fs::metadata(&bin_dest).unwrap().permissions().mode();
        let plain_mode = fs::metadata(&plain_dest).unwrap().permissions().mode();
        assert_eq!(bin_mode & 0o111, 0o111);
        assert_eq!(plain_mode & 0o100, 0);
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, SyncEvent::MarkedExecutable { .. })));
    }

    #[test]
    fn copy_of_missing_source_is_an_error() {
        let dir = tempdir().unwrap();
        let (engine, _) = replicator(HashSet::new());
        let err = engine.apply(
            ChangeKind::Added,
            &dir.path().join("missing.js"),
            &dir.path().join("out.js"),
        );
        assert!(err.is_err());
    }
}
