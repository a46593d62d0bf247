//! Produces complete snapshots from a catalog root.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::builder::TreeBuilder;
use crate::catalog::CatalogReader;
use crate::domain::Snapshot;

/// Errors that fail a whole load; single-library failures never do
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Catalog root unreadable: {}: {source}", .path.display())]
    RootUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Snapshot load task failed: {0}")]
    Task(String),
}

/// Source of fresh snapshots
pub trait SnapshotLoader: Send + Sync + 'static {
    fn load(&self) -> Result<Snapshot, LoadError>;
}

/// Loads every library under a catalog root
#[derive(Debug, Clone)]
pub struct CatalogLoader {
    reader: CatalogReader,
}

impl CatalogLoader {
    pub fn new(reader: CatalogReader) -> Self {
        Self { reader }
    }

    pub fn reader(&self) -> &CatalogReader {
        &self.reader
    }
}

impl SnapshotLoader for CatalogLoader {
    fn load(&self) -> Result<Snapshot, LoadError> {
        let sources = self
            .reader
            .discover()
            .map_err(|source| LoadError::RootUnavailable {
                path: self.reader.root().to_path_buf(),
                source,
            })?;

        let mut builder = TreeBuilder::new();
        let mut skipped = 0;
        for source in &sources {
            match self.reader.read_library(source) {
                Ok(rows) => {
                    builder.add_library(source.name.clone(), source.dir.clone(), &rows);
                }
                Err(e) => {
                    tracing::warn!("Skipping library {}: {}", source.name, e);
                    skipped += 1;
                }
            }
        }

        let snapshot = builder.finish();
        tracing::info!(
            "Loaded {} libraries ({} books, {} skipped) from {}",
            snapshot.libraries.len(),
            snapshot.book_count(),
            skipped,
            self.reader.root().display()
        );

        Ok(snapshot)
    }
}
