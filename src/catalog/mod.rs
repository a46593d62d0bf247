//! Catalog access.
//!
//! A catalog root holds one directory per library, each with its own SQLite
//! metadata database:
//!
//! ```text
//! <root>/
//! ├── Comics/
//! │   ├── metadata.db
//! │   └── Author Name/Title (12)/Title - Author Name.cbz
//! └── Novels/
//!     └── metadata.db
//! ```

use std::path::PathBuf;

use thiserror::Error;

pub mod format;
pub mod reader;

pub use format::BookFormat;
pub use reader::{CatalogReader, CatalogRow, LibrarySource, DEFAULT_METADATA_FILE};

/// Errors that fail the load of a single library
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog unavailable: {}: {source}", .path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Unsupported format code {code:?} in library {library}")]
    UnsupportedFormat { library: String, code: String },
}
