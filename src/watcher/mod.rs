//! Filesystem watching and event dispatch
//!
//! One watch target per package (src + dist trees), one dispatch thread
//! per target, exclusion -> mapping -> replication per event, graceful
//! Ctrl+C shutdown through the registry.

pub mod event;
mod supervisor;

pub use event::{ChangeKind, EventSink, SyncEvent};
pub use supervisor::{Supervisor, WatchOptions};
