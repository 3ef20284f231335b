//! Watcher registry and coordinated shutdown
//!
//! The registry is the only shared mutable state in the process: it is
//! appended to during startup (watch targets, spawned build processes)
//! and drained exactly once when the interrupt signal arrives. The
//! Ctrl+C handler's sole job is to call [`Coordinator::notify`]; the
//! main thread then runs the actual teardown.

use std::process::Child;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use notify::RecommendedWatcher;

use crate::watcher::event::{EventSink, SyncEvent};

/// A live filesystem-watching resource for one package
pub struct WatchTarget {
    /// Keeps event delivery alive; dropping it stops the watcher and
    /// disconnects the dispatch channel.
    pub watcher: RecommendedWatcher,
    /// Human-readable description, reported when stopped
    pub label: String,
    /// Dispatch thread draining this target's events
    pub worker: Option<JoinHandle<()>>,
}

/// A spawned per-package build process
pub struct ChildHandle {
    pub command: String,
    pub child: Arc<Mutex<Child>>,
}

/// Live set of watch targets and subprocess handles.
///
/// Appended to only during the startup phase, never concurrently with
/// dispatch; drained once on shutdown.
#[derive(Default)]
pub struct Registry {
    watchers: Mutex<Vec<WatchTarget>>,
    children: Mutex<Vec<ChildHandle>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_watcher(&self, target: WatchTarget) {
        self.watchers.lock().unwrap().push(target);
    }

    pub fn add_child(&self, handle: ChildHandle) {
        self.children.lock().unwrap().push(handle);
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.lock().unwrap().len()
    }

    pub fn child_count(&self) -> usize {
        self.children.lock().unwrap().len()
    }
}

/// Shutdown coordinator: owns the registry and the running flag.
pub struct Coordinator {
    registry: Arc<Registry>,
    running: Arc<AtomicBool>,
    sink: EventSink,
}

impl Coordinator {
    pub fn new(registry: Arc<Registry>, running: Arc<AtomicBool>, sink: EventSink) -> Self {
        Self {
            registry,
            running,
            sink,
        }
    }

    /// Signal-handler entry point: trip the running flag so every
    /// dispatch loop and the main thread wind down.
    pub fn notify(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Stop every watch target and terminate every spawned subprocess,
    /// reporting each. Invoked once, from the main thread, after the
    /// running flag has tripped.
    pub fn run(&self) {
        (self.sink)(SyncEvent::Interrupted);

        let targets: Vec<WatchTarget> = self.registry.watchers.lock().unwrap().drain(..).collect();
        let mut workers = Vec::with_capacity(targets.len());
        for target in targets {
            let WatchTarget {
                watcher,
                label,
                worker,
            } = target;
            // Dropping the watcher disconnects the target's channel and
            // lets its dispatch thread exit.
            drop(watcher);
            (self.sink)(SyncEvent::Stopped { target: label });
            if let Some(handle) = worker {
                workers.push(handle);
            }
        }
        for handle in workers {
            let _ = handle.join();
        }

        let children: Vec<ChildHandle> = self.registry.children.lock().unwrap().drain(..).collect();
        for handle in children {
            let mut child = handle.child.lock().unwrap();
            match child.try_wait() {
                Ok(Some(_)) => {}
                _ => {
                    if child.kill().is_ok() {
                        let _ = child.wait();
                    }
                    (self.sink)(SyncEvent::Stopped {
                        target: format!("command [{}]", handle.command),
                    });
                }
            }
        }

        (self.sink)(SyncEvent::Shutdown);
    }
}
