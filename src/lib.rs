//! bookfs - Series-organized, read-only view of ebook catalogs
//!
//! Projects one or more catalog libraries (each a directory with a SQLite
//! metadata database) into a virtual three-level tree that a filesystem
//! adapter can serve:
//!
//! ```text
//! \<Library>\<Series>\<Series> - <Index>.<ext>
//! ```
//!
//! # Architecture
//!
//! The tree is built once into an immutable snapshot:
//! - Catalog rows are read per library and never mutated
//! - Queries capture the current snapshot and never see a torn tree
//! - Catalog changes are debounced into a single rebuild, then swapped in
//!
//! # Modules
//!
//! - `catalog`: Reading library databases (CatalogReader, BookFormat)
//! - `domain`: Data structures (Book, Series, Library, Snapshot, Node)
//! - `projection`: Tree building and queries (Projection, TreeBuilder, BookStream)
//! - `reload`: Change watching and debounced rebuilds (ReloadScheduler)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # List the series of a library
//! bookfs --root ~/Calibre ls '\MyLib'
//!
//! # Copy a book out of the projection
//! bookfs cat '\MyLib\Foo\Foo - 01.epub' > foo.epub
//!
//! # Keep a projection live while the catalog changes
//! bookfs watch
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod domain;
pub mod projection;
pub mod reload;

// Re-export main types at crate root for convenience
pub use catalog::{BookFormat, CatalogError, CatalogReader, CatalogRow};
pub use domain::{Attributes, Book, Library, Node, Series, Snapshot};
pub use projection::{
    BookStream, CatalogLoader, Listing, Projection, ResumeFrom, SnapshotLoader, StreamError,
    TreeBuilder,
};
pub use reload::{CatalogWatcher, ChangeEvent, ChangeKind, ReloadHandle, ReloadScheduler};
