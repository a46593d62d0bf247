//! File-system watcher feeding the reload scheduler.

use std::path::Path;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::scheduler::{ChangeEvent, ChangeKind, ReloadError, ReloadHandle};

/// Watches a catalog root and forwards metadata-file changes.
///
/// Watching stops when this value is dropped.
pub struct CatalogWatcher {
    _watcher: RecommendedWatcher,
}

impl CatalogWatcher {
    /// Start watching `root` recursively
    pub fn start(root: &Path, handle: ReloadHandle) -> Result<Self, ReloadError> {
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) => {
                    for change in change_events(&event) {
                        handle.notify_change(&change);
                    }
                }
                Err(e) => tracing::warn!("Watcher error: {:?}", e),
            }
        })?;

        watcher.watch(root, RecursiveMode::Recursive)?;
        tracing::info!("Watching {} for catalog changes", root.display());

        Ok(Self { _watcher: watcher })
    }
}

/// Classify a notify event kind
pub fn change_kind(kind: &EventKind) -> ChangeKind {
    match kind {
        EventKind::Create(_)
        | EventKind::Modify(ModifyKind::Data(_))
        | EventKind::Modify(ModifyKind::Any) => ChangeKind::Content,
        EventKind::Modify(ModifyKind::Metadata(_)) => ChangeKind::Metadata,
        _ => ChangeKind::Other,
    }
}

/// Split a notify event into one change per affected path
pub fn change_events(event: &Event) -> Vec<ChangeEvent> {
    let kind = change_kind(&event.kind);
    event
        .paths
        .iter()
        .map(|path| ChangeEvent {
            path: path.clone(),
            kind,
        })
        .collect()
}
