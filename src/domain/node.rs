//! Resolved tree positions and their synthesized attributes.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::book::Book;
use super::snapshot::Snapshot;
use super::tree::{Library, Series};

/// File attributes reported to filesystem consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Attributes {
    pub is_directory: bool,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Attributes {
    fn directory(size: u64, created_at: DateTime<Utc>, modified_at: DateTime<Utc>) -> Self {
        Self {
            is_directory: true,
            size,
            created_at,
            modified_at,
        }
    }
}

/// A resolved position in one snapshot.
///
/// Nodes keep their snapshot data alive, so a node obtained before a reload
/// stays valid after it.
#[derive(Debug, Clone)]
pub enum Node {
    Root(Arc<Snapshot>),
    Library(Arc<Library>),
    Series {
        library: Arc<Library>,
        series: Arc<Series>,
    },
    Book {
        library: Arc<Library>,
        series: Arc<Series>,
        book: Arc<Book>,
    },
}

impl Node {
    /// File name of the node; empty for the root
    pub fn name(&self) -> &str {
        match self {
            Node::Root(_) => "",
            Node::Library(library) => &library.name,
            Node::Series { series, .. } => &series.name,
            Node::Book { book, .. } => book.virtual_name(),
        }
    }

    pub fn is_directory(&self) -> bool {
        !matches!(self, Node::Book { .. })
    }

    /// Synthesize the node's attributes
    pub fn attributes(&self) -> Attributes {
        match self {
            Node::Root(snapshot) => snapshot.attributes(),
            Node::Library(library) => library.attributes(),
            Node::Series { series, .. } => series.attributes(),
            Node::Book { book, .. } => book.attributes(),
        }
    }

    /// Physical file backing a book node
    pub fn physical_path(&self) -> Option<PathBuf> {
        match self {
            Node::Book { library, book, .. } => Some(library.book_path(book)),
            _ => None,
        }
    }
}

/// Anything that can appear as a directory entry
pub trait Entry {
    /// Name the entry is listed and sorted under
    fn entry_name(&self) -> &str;

    fn attributes(&self) -> Attributes;
}

impl Entry for Snapshot {
    fn entry_name(&self) -> &str {
        ""
    }

    fn attributes(&self) -> Attributes {
        Attributes::directory(self.total_size, self.created_at, self.modified_at)
    }
}

impl Entry for Library {
    fn entry_name(&self) -> &str {
        &self.name
    }

    fn attributes(&self) -> Attributes {
        Attributes::directory(self.total_size, self.created_at, self.modified_at)
    }
}

impl Entry for Series {
    fn entry_name(&self) -> &str {
        &self.name
    }

    fn attributes(&self) -> Attributes {
        Attributes::directory(self.total_size, self.created_at, self.modified_at)
    }
}

impl Entry for Book {
    fn entry_name(&self) -> &str {
        self.virtual_name()
    }

    fn attributes(&self) -> Attributes {
        Attributes {
            is_directory: false,
            size: self.file_size,
            created_at: self.created_at,
            modified_at: self.modified_at,
        }
    }
}
