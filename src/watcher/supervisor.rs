//! Watch supervisor
//!
//! Owns one notify watcher per package, covering the package's `src/`
//! and `dist/` trees. Each target gets a dedicated dispatch thread that
//! drains the target's channel in arrival order and pushes every event
//! through exclusion -> mapping -> replication, so replication of one
//! event always completes before the next event from the same target is
//! taken. There is no ordering guarantee across targets.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::event::{
    classify, print_monorepo, ChangeKind, Classified, EventSink, RemoveHint, SyncEvent,
};
use crate::error::{SyncError, SyncResult};
use crate::mapper::{is_excluded, map_destination};
use crate::replicate::Replicator;
use crate::repo::Repo;
use crate::shutdown::{Registry, WatchTarget};

/// Paths the supervisor works between
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Consumer repo root (contains node_modules)
    pub repo_path: PathBuf,
    /// Uranio monorepo root (contains urn-* packages)
    pub monorepo_path: PathBuf,
}

/// Starts watch targets and registers them for shutdown.
pub struct Supervisor {
    options: WatchOptions,
    binaries: Arc<HashSet<PathBuf>>,
    registry: Arc<Registry>,
    running: Arc<AtomicBool>,
    sink: EventSink,
}

impl Supervisor {
    pub fn new(
        options: WatchOptions,
        binaries: Arc<HashSet<PathBuf>>,
        registry: Arc<Registry>,
        running: Arc<AtomicBool>,
        sink: EventSink,
    ) -> Self {
        Self {
            options,
            binaries,
            registry,
            running,
            sink,
        }
    }

    /// Create the watch target for one package and begin dispatching
    /// its events. Failure to attach is fatal: a missing directory means
    /// the dependency chain's assumptions about the monorepo are wrong.
    pub fn start(&self, repo: Repo, is_final: bool) -> SyncResult<()> {
        let package_dir = self.options.monorepo_path.join(repo.dir_name());
        let src_dir = package_dir.join("src");
        let dist_dir = package_dir.join("dist");

        let (tx, rx) = channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    let _ = tx.send(event);
                }
            },
            Config::default(),
        )
        .map_err(|source| SyncError::WatchSetup {
            path: package_dir.clone(),
            source,
        })?;

        for dir in [&src_dir, &dist_dir] {
            watcher
                .watch(dir, RecursiveMode::Recursive)
                .map_err(|source| SyncError::WatchSetup {
                    path: dir.clone(),
                    source,
                })?;
        }

        (self.sink)(SyncEvent::Started {
            watched: vec![
                print_monorepo(&src_dir, &self.options.monorepo_path),
                print_monorepo(&dist_dir, &self.options.monorepo_path),
            ],
        });

        let dispatcher = Dispatcher {
            repo,
            is_final,
            repo_path: self.options.repo_path.clone(),
            monorepo_path: self.options.monorepo_path.clone(),
            replicator: Replicator::new(
                self.options.repo_path.clone(),
                self.options.monorepo_path.clone(),
                self.binaries.clone(),
                self.sink.clone(),
            ),
            sink: self.sink.clone(),
        };
        let running = self.running.clone();
        let worker = thread::spawn(move || dispatch_loop(&rx, &running, &dispatcher));

        self.registry.add_watcher(WatchTarget {
            watcher,
            label: format!("watcher for {}/src|dist directories", repo.dir_name()),
            worker: Some(worker),
        });
        Ok(())
    }
}

fn dispatch_loop(rx: &Receiver<Event>, running: &AtomicBool, dispatcher: &Dispatcher) {
    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(event) => {
                if !dispatcher.handle(event) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Per-target event pipeline: classification, exclusion, mapping,
/// replication, error containment.
struct Dispatcher {
    repo: Repo,
    is_final: bool,
    repo_path: PathBuf,
    monorepo_path: PathBuf,
    replicator: Replicator,
    sink: EventSink,
}

impl Dispatcher {
    /// Returns false when the target must stop (invariant violation).
    fn handle(&self, event: Event) -> bool {
        // A completed rename arrives with both halves in one event:
        // the old path disappears, the new one appears.
        if event.kind == EventKind::Modify(ModifyKind::Name(RenameMode::Both))
            && event.paths.len() == 2
        {
            return self.dispatch(Classified::Removed(RemoveHint::Any), &event.paths[0])
                && self.dispatch(Classified::Added, &event.paths[1]);
        }

        let class = classify(event.kind);
        event.paths.iter().all(|path| self.dispatch(class, path))
    }

    fn dispatch(&self, class: Classified, path: &Path) -> bool {
        if path.extension().map(|e| e == "swp").unwrap_or(false) {
            return true;
        }
        let class = match class {
            Classified::Ignored => return true,
            // Some backends report folder creation as a generic create;
            // destination directories appear on demand, so skip any
            // source path that is a directory.
            Classified::Added | Classified::Modified if path.is_dir() => return true,
            other => other,
        };

        let mapped = match map_destination(path, self.repo, self.is_final, &self.repo_path) {
            Ok(mapped) => mapped,
            Err(err) => {
                (self.sink)(SyncEvent::Error {
                    message: format!("{err} - stopping this watch target"),
                });
                return false;
            }
        };

        let kind = match class {
            Classified::Added => ChangeKind::Added,
            Classified::Modified => ChangeKind::Modified,
            Classified::Removed(RemoveHint::File) => ChangeKind::RemovedFile,
            Classified::Removed(RemoveHint::Dir) => ChangeKind::RemovedDir,
            Classified::Removed(RemoveHint::Any) => {
                if mapped.destination.is_dir() {
                    ChangeKind::RemovedDir
                } else {
                    ChangeKind::RemovedFile
                }
            }
            Classified::Ignored => unreachable!(),
        };

        (self.sink)(SyncEvent::Change {
            kind,
            path: print_monorepo(path, &self.monorepo_path),
        });

        // Removals bypass the exclusion list: a file deleted at the
        // source still gets its destination copy cleared.
        if matches!(kind, ChangeKind::Added | ChangeKind::Modified)
            && is_excluded(&mapped.relative)
        {
            (self.sink)(SyncEvent::Excluded {
                path: mapped.relative,
            });
            return true;
        }

        if let Err(err) = self.replicator.apply(kind, path, &mapped.destination) {
            (self.sink)(SyncEvent::Error {
                message: format!(
                    "{} failed for [{}] -> [{}]: {}",
                    kind,
                    path.display(),
                    mapped.destination.display(),
                    err
                ),
            });
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use std::time::Instant;
    use tempfile::tempdir;

    fn collecting_sink() -> (EventSink, Arc<Mutex<Vec<SyncEvent>>>) {
        let events: Arc<Mutex<Vec<SyncEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_events = events.clone();
        let sink: EventSink = Arc::new(move |event| sink_events.lock().unwrap().push(event));
        (sink, events)
    }

    fn wait_for(mut check: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if check() {
                return true;
            }
            thread::sleep(Duration::from_millis(50));
        }
        false
    }

    #[test]
    fn start_fails_on_missing_package_directory() {
        let repo_dir = tempdir().unwrap();
        let mono_dir = tempdir().unwrap();
        let (sink, _) = collecting_sink();

        let supervisor = Supervisor::new(
            WatchOptions {
                repo_path: repo_dir.path().to_path_buf(),
                monorepo_path: mono_dir.path().to_path_buf(),
            },
            Arc::new(HashSet::new()),
            Arc::new(Registry::new()),
            Arc::new(AtomicBool::new(true)),
            sink,
        );

        let err = supervisor.start(Repo::Core, true).unwrap_err();
        assert!(matches!(err, SyncError::WatchSetup { .. }));
    }

    #[test]
    fn started_target_replicates_a_new_file() {
        let repo_dir = tempdir().unwrap();
        let mono_dir = tempdir().unwrap();
        let package = mono_dir.path().join("urn-core");
        fs::create_dir_all(package.join("src")).unwrap();
        fs::create_dir_all(package.join("dist")).unwrap();
        fs::create_dir_all(repo_dir.path().join("node_modules/uranio-core")).unwrap();

        let (sink, _) = collecting_sink();
        let registry = Arc::new(Registry::new());
        let running = Arc::new(AtomicBool::new(true));
        let supervisor = Supervisor::new(
            WatchOptions {
                repo_path: repo_dir.path().to_path_buf(),
                monorepo_path: mono_dir.path().to_path_buf(),
            },
            Arc::new(HashSet::new()),
            registry.clone(),
            running.clone(),
            sink,
        );
        supervisor.start(Repo::Core, false).unwrap();
        assert_eq!(registry.watcher_count(), 1);

        // give the watcher a moment to attach before generating events
        thread::sleep(Duration::from_millis(300));
        fs::write(package.join("src/x.js"), "export const x = 1;\n").unwrap();

        let dest = repo_dir.path().join("node_modules/uranio-core/src/x.js");
        assert!(wait_for(|| dest.is_file()), "destination never appeared");
        assert_eq!(
            fs::read_to_string(&dest).unwrap(),
            "export const x = 1;\n"
        );

        running.store(false, Ordering::SeqCst);
    }

    #[test]
    fn dispatcher_skips_excluded_relative_path() {
        let repo_dir = tempdir().unwrap();
        let mono_dir = tempdir().unwrap();
        let source = mono_dir.path().join("urn-core/dist/client/toml.js");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, "generated").unwrap();

        let (sink, events) = collecting_sink();
        let dispatcher = Dispatcher {
            repo: Repo::Core,
            is_final: false,
            repo_path: repo_dir.path().to_path_buf(),
            monorepo_path: mono_dir.path().to_path_buf(),
            replicator: Replicator::new(
                repo_dir.path().to_path_buf(),
                mono_dir.path().to_path_buf(),
                Arc::new(HashSet::new()),
                sink.clone(),
            ),
            sink,
        };

        assert!(dispatcher.dispatch(Classified::Modified, &source));
        let events = events.lock().unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, SyncEvent::Excluded { .. })));
        assert!(!events.iter().any(|e| matches!(e, SyncEvent::Copied { .. })));
        assert!(!repo_dir
            .path()
            .join("node_modules/uranio-core/dist/client/toml.js")
            .exists());
    }

    #[test]
    fn dispatcher_removal_of_excluded_path_still_propagates() {
        let repo_dir = tempdir().unwrap();
        let mono_dir = tempdir().unwrap();
        let dest = repo_dir
            .path()
            .join("node_modules/uranio-core/dist/client/toml.js");
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        fs::write(&dest, "hand-maintained").unwrap();

        let (sink, _) = collecting_sink();
        let dispatcher = Dispatcher {
            repo: Repo::Core,
            is_final: false,
            repo_path: repo_dir.path().to_path_buf(),
            monorepo_path: mono_dir.path().to_path_buf(),
            replicator: Replicator::new(
                repo_dir.path().to_path_buf(),
                mono_dir.path().to_path_buf(),
                Arc::new(HashSet::new()),
                sink.clone(),
            ),
            sink,
        };

        let source = mono_dir.path().join("urn-core/dist/client/toml.js");
        assert!(dispatcher.dispatch(Classified::Removed(RemoveHint::File), &source));
        assert!(!dest.exists());
    }

    #[test]
    fn dispatcher_stops_target_on_marker_violation() {
        let repo_dir = tempdir().unwrap();
        let mono_dir = tempdir().unwrap();
        let (sink, events) = collecting_sink();
        let dispatcher = Dispatcher {
            repo: Repo::Core,
            is_final: false,
            repo_path: repo_dir.path().to_path_buf(),
            monorepo_path: mono_dir.path().to_path_buf(),
            replicator: Replicator::new(
                repo_dir.path().to_path_buf(),
                mono_dir.path().to_path_buf(),
                Arc::new(HashSet::new()),
                sink.clone(),
            ),
            sink,
        };

        let outside = mono_dir.path().join("elsewhere/lib.js");
        assert!(!dispatcher.dispatch(Classified::Modified, &outside));
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, SyncEvent::Error { .. })));
    }
}
