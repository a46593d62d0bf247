//! Keeping the projection in sync with the catalog.
//!
//! ```text
//! metadata.db write → CatalogWatcher → ReloadHandle → ReloadScheduler
//!                                                      └─ (debounced) load → publish
//! ```

pub mod scheduler;
pub mod watcher;

pub use scheduler::{ChangeEvent, ChangeKind, ReloadError, ReloadHandle, ReloadScheduler};
pub use watcher::CatalogWatcher;
