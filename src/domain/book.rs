//! A single projected ebook file.

use chrono::{DateTime, Utc};

use crate::catalog::{BookFormat, CatalogRow};

/// One ebook file of a series.
///
/// A book has two names: the physical name locates the real file on disk,
/// the virtual name is what filesystem consumers see.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub title: String,
    pub author: String,
    /// Sanitized series display name
    pub series_name: String,
    /// Rendered index, e.g. `03` or `SP01`
    pub series_index: String,
    pub file_base_name: String,
    pub format: BookFormat,
    /// Folder of the file, relative to the library directory
    pub relative_path: String,
    pub file_size: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    virtual_name: String,
    physical_name: String,
}

impl Book {
    /// Build a book from a catalog row and its derived series display values
    pub fn from_row(row: &CatalogRow, series_name: &str, series_index: String) -> Self {
        let virtual_name = format!("{} - {}.{}", series_name, series_index, row.format);
        let physical_name = format!("{}.{}", row.file_base_name, row.format);

        Self {
            title: row.title.clone(),
            author: row.author_sort.clone(),
            series_name: series_name.to_string(),
            series_index,
            file_base_name: row.file_base_name.clone(),
            format: row.format,
            relative_path: row.relative_path.clone(),
            file_size: row.file_size,
            created_at: row.created_at,
            modified_at: row.modified_at,
            virtual_name,
            physical_name,
        }
    }

    /// Projected file name: `{series} - {index}.{ext}`
    pub fn virtual_name(&self) -> &str {
        &self.virtual_name
    }

    /// On-disk file name: `{file_base_name}.{ext}`
    pub fn physical_name(&self) -> &str {
        &self.physical_name
    }
}
