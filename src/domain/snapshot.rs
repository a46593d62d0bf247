//! Immutable, fully built projection tree.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::tree::Library;

/// Data-quality problems found while building a snapshot.
///
/// None of these fail the build; the offending row or name is adjusted or
/// dropped and the warning is kept on the snapshot for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildWarning {
    /// Two rows of one series rendered to the same file name; the later row was dropped
    DuplicateVirtualName {
        library: String,
        series: String,
        virtual_name: String,
        dropped_title: String,
    },

    /// Two series ids share a display name; the later one was renamed
    SeriesNameCollision {
        library: String,
        name: String,
        series_id: i64,
        renamed_to: String,
    },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildWarning::DuplicateVirtualName {
                library,
                series,
                virtual_name,
                dropped_title,
            } => write!(
                f,
                "{}/{}: {:?} already projected, dropping {:?}",
                library, series, virtual_name, dropped_title
            ),
            BuildWarning::SeriesNameCollision {
                library,
                name,
                series_id,
                renamed_to,
            } => write!(
                f,
                "{}: series {} also named {:?}, projected as {:?}",
                library, series_id, name, renamed_to
            ),
        }
    }
}

/// One complete tree of libraries, series and books.
///
/// Snapshots are published whole and never edited afterwards.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Libraries sorted by name (ordinal)
    pub libraries: Vec<Arc<Library>>,

    /// Sum of every book's size
    pub total_size: u64,

    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,

    /// When the tree was built
    pub built_at: DateTime<Utc>,

    /// Publish counter, assigned by the projection
    pub generation: u64,

    pub warnings: Vec<BuildWarning>,
}

impl Snapshot {
    /// A tree with no libraries
    pub fn empty() -> Self {
        let now = Utc::now();
        Self {
            libraries: Vec::new(),
            total_size: 0,
            created_at: now,
            modified_at: now,
            built_at: now,
            generation: 0,
            warnings: Vec::new(),
        }
    }

    /// Find a library by exact name
    pub fn find_library(&self, name: &str) -> Option<&Arc<Library>> {
        self.libraries
            .binary_search_by(|library| library.name.as_str().cmp(name))
            .ok()
            .map(|idx| &self.libraries[idx])
    }

    /// Number of books across all libraries
    pub fn book_count(&self) -> usize {
        self.libraries.iter().map(|l| l.book_count()).sum()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}
