//! uranio-sync - mirror a Uranio monorepo into a consumer repo
//!
//! Watches the source and build trees of every package the consumer
//! depends on and replicates each change into the matching location
//! under the consumer's node_modules, without `npm link`. Uranio
//! overwrites linked repositories at runtime, so linking would make the
//! monorepo impossible to develop against.

pub mod config;
pub mod error;
pub mod mapper;
pub mod replicate;
pub mod repo;
pub mod shutdown;
pub mod spawn;
pub mod watcher;

// Re-exports for convenience
pub use error::{SyncError, SyncResult};
pub use mapper::{is_excluded, map_destination, DO_NOT_TRANSFER};
pub use repo::{Repo, ALL_REPOS};
pub use shutdown::{Coordinator, Registry};
pub use watcher::{ChangeKind, Supervisor, SyncEvent, WatchOptions};
