//! Domain types for the projected tree.
//!
//! This module contains the core data structures:
//! - Book: One projected ebook file
//! - Series, Library: The directory levels above it
//! - Snapshot: One immutable, fully built tree
//! - Node: A resolved position in a snapshot

pub mod book;
pub mod node;
pub mod snapshot;
pub mod tree;

// Re-export commonly used types
pub use book::Book;
pub use node::{Attributes, Entry, Node};
pub use snapshot::{BuildWarning, Snapshot};
pub use tree::{Library, Series};
