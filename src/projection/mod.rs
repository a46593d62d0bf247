//! The projection engine.
//!
//! [`Projection`] holds the current [`Snapshot`] behind an atomically
//! swappable reference. Every query captures the reference once at entry and
//! works on that snapshot only, so a concurrent reload never produces a torn
//! view; callers simply see the old tree until the new one is published.
//!
//! # Architecture
//!
//! ```text
//! CatalogReader → TreeBuilder → Snapshot ─publish→ Projection
//!                                                  ├─ resolve()       (resolver)
//!                                                  ├─ list_children() (enumerator)
//!                                                  └─ open_stream()   (stream)
//! ```

use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

pub mod builder;
pub mod enumerator;
pub mod loader;
pub mod pattern;
pub mod resolver;
pub mod stream;

pub use builder::TreeBuilder;
pub use enumerator::{ContinuationToken, DirEntry, Listing, NotADirectory, ResumeFrom};
pub use loader::{CatalogLoader, LoadError, SnapshotLoader};
pub use pattern::NamePattern;
pub use stream::{BookStream, StreamError};

use crate::domain::{Attributes, Node, Snapshot};

/// Volume-level information for the adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeInfo {
    pub label: String,
    pub total_size: u64,
    pub free_space: u64,
    pub read_only: bool,
}

/// Queryable, reloadable view of the catalog
#[derive(Debug)]
pub struct Projection {
    label: String,
    current: RwLock<Arc<Snapshot>>,
}

impl Projection {
    /// Create a projection serving an empty tree
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_snapshot(label, Snapshot::empty())
    }

    /// Create a projection serving `snapshot` as generation 1
    pub fn with_snapshot(label: impl Into<String>, mut snapshot: Snapshot) -> Self {
        snapshot.generation = 1;
        Self {
            label: label.into(),
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Capture the current snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replace the current snapshot, returning its generation
    pub fn publish(&self, mut snapshot: Snapshot) -> u64 {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        snapshot.generation = guard.generation + 1;
        let generation = snapshot.generation;
        *guard = Arc::new(snapshot);
        drop(guard);

        tracing::info!("Published snapshot generation {}", generation);
        generation
    }

    /// Resolve a virtual path; `None` means not found
    pub fn resolve(&self, path: &str) -> Option<Node> {
        resolver::resolve(&self.snapshot(), path)
    }

    /// Next child of a directory node
    pub fn list_children(
        &self,
        node: &Node,
        pattern: Option<&str>,
        from: &ResumeFrom,
    ) -> Result<Listing, NotADirectory> {
        enumerator::list_children(node, &NamePattern::from_option(pattern), from)
    }

    /// All children of a directory node
    pub fn list_all(
        &self,
        node: &Node,
        pattern: Option<&str>,
    ) -> Result<Vec<DirEntry>, NotADirectory> {
        enumerator::list_all(node, &NamePattern::from_option(pattern))
    }

    pub fn attributes(&self, node: &Node) -> Attributes {
        node.attributes()
    }

    /// Prepare a read stream for a book node
    pub fn open_stream(&self, node: &Node) -> Result<BookStream, StreamError> {
        BookStream::open(node)
    }

    /// Volume label and sizes of the current snapshot
    pub fn volume(&self) -> VolumeInfo {
        VolumeInfo {
            label: self.label.clone(),
            total_size: self.snapshot().total_size,
            free_space: 0,
            read_only: true,
        }
    }
}
