//! Library and series levels of the projected tree.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::book::Book;

/// A named grouping of books inside a library
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// Catalog series id
    pub id: i64,

    /// Display name, unique within its library
    pub name: String,

    /// Books sorted by virtual name (ordinal)
    pub books: Vec<Arc<Book>>,

    pub total_size: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Series {
    /// Find a book by its exact virtual name
    pub fn find_book(&self, virtual_name: &str) -> Option<&Arc<Book>> {
        self.books
            .binary_search_by(|book| book.virtual_name().cmp(virtual_name))
            .ok()
            .map(|idx| &self.books[idx])
    }
}

/// One catalog instance, projected as a top-level folder
#[derive(Debug, Clone, PartialEq)]
pub struct Library {
    /// Directory name of the catalog
    pub name: String,

    /// Absolute catalog directory
    pub root: PathBuf,

    /// Series sorted by name (ordinal)
    pub series: Vec<Arc<Series>>,

    pub total_size: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Library {
    /// Find a series by its exact display name
    pub fn find_series(&self, name: &str) -> Option<&Arc<Series>> {
        self.series
            .binary_search_by(|series| series.name.as_str().cmp(name))
            .ok()
            .map(|idx| &self.series[idx])
    }

    /// Location of a book's physical file
    pub fn book_path(&self, book: &Book) -> PathBuf {
        self.root.join(&book.relative_path).join(book.physical_name())
    }

    /// Number of books across all series
    pub fn book_count(&self) -> usize {
        self.series.iter().map(|s| s.books.len()).sum()
    }
}
