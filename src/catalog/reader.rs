//! Reads normalized rows out of each library's metadata database.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};

use super::format::BookFormat;
use super::CatalogError;

/// Default metadata file name inside every library directory
pub const DEFAULT_METADATA_FILE: &str = "metadata.db";

/// How long to wait on a catalog that is locked by its writer
const BUSY_TIMEOUT: Duration = Duration::from_millis(750);

/// One book file joined with its series, as stored in the catalog.
///
/// A book carrying several formats yields one row per format.
const BOOKS_QUERY: &str = "
    SELECT b.title, b.author_sort, b.series_index, b.path, b.timestamp, b.last_modified,
           d.name, d.format, d.uncompressed_size, s.name, s.id
    FROM books AS b
    JOIN books_series_link AS l ON l.book = b.id
    JOIN series AS s ON s.id = l.series
    JOIN data AS d ON d.book = b.id
    ORDER BY b.id, d.id
";

/// A library directory that holds a metadata file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySource {
    /// Directory name, used as the library's folder name
    pub name: String,

    /// Absolute library directory
    pub dir: PathBuf,

    /// Path to the metadata database
    pub metadata_path: PathBuf,
}

/// A normalized catalog row
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRow {
    pub title: String,
    pub author_sort: String,
    /// Raw series index; missing values read as 0
    pub series_index: f64,
    /// Folder of the book, relative to the library directory
    pub relative_path: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    /// Physical file name without extension
    pub file_base_name: String,
    pub format: BookFormat,
    pub file_size: u64,
    pub series_name: String,
    pub series_id: i64,
}

/// Row as it comes out of SQLite, before the format code is vetted
struct RawRow {
    title: String,
    author_sort: String,
    series_index: f64,
    relative_path: String,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
    file_base_name: String,
    format_code: String,
    file_size: u64,
    series_name: String,
    series_id: i64,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            title: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
            author_sort: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            series_index: row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
            relative_path: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            created_at: timestamp_or_epoch(row.get_ref(4)?),
            modified_at: timestamp_or_epoch(row.get_ref(5)?),
            file_base_name: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            format_code: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
            file_size: row
                .get::<_, Option<i64>>(8)?
                .map(|size| size.max(0) as u64)
                .unwrap_or(0),
            series_name: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
            series_id: row.get(10)?,
        })
    }

    fn into_row(self, library: &str) -> Result<CatalogRow, CatalogError> {
        let format = BookFormat::from_code(&self.format_code).ok_or_else(|| {
            CatalogError::UnsupportedFormat {
                library: library.to_string(),
                code: self.format_code.clone(),
            }
        })?;

        Ok(CatalogRow {
            title: self.title,
            author_sort: self.author_sort,
            series_index: self.series_index,
            relative_path: self.relative_path,
            created_at: self.created_at,
            modified_at: self.modified_at,
            file_base_name: self.file_base_name,
            format,
            file_size: self.file_size,
            series_name: self.series_name,
            series_id: self.series_id,
        })
    }
}

/// Scans a catalog root for libraries and reads their rows
#[derive(Debug, Clone)]
pub struct CatalogReader {
    root: PathBuf,
    metadata_file: String,
}

impl CatalogReader {
    /// Create a reader for the given catalog root
    pub fn new(root: impl Into<PathBuf>, metadata_file: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            metadata_file: metadata_file.into(),
        }
    }

    /// Catalog root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Metadata file name looked up in each library directory
    pub fn metadata_file(&self) -> &str {
        &self.metadata_file
    }

    /// List library directories containing a metadata file, sorted by name
    pub fn discover(&self) -> io::Result<Vec<LibrarySource>> {
        let mut sources = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let dir = entry.path();

            if !dir.is_dir() {
                continue;
            }

            let metadata_path = dir.join(&self.metadata_file);
            if !metadata_path.is_file() {
                continue;
            }

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    tracing::warn!("Skipping library with non UTF-8 name: {:?}", raw);
                    continue;
                }
            };

            sources.push(LibrarySource {
                name,
                dir,
                metadata_path,
            });
        }

        sources.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sources)
    }

    /// Read every row of one library.
    ///
    /// The first unknown format code aborts the whole library.
    pub fn read_library(&self, source: &LibrarySource) -> Result<Vec<CatalogRow>, CatalogError> {
        let unavailable = |source_err: rusqlite::Error| CatalogError::Unavailable {
            path: source.metadata_path.clone(),
            source: source_err,
        };

        let conn = Connection::open_with_flags(
            &source.metadata_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(unavailable)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(unavailable)?;

        let mut stmt = conn.prepare(BOOKS_QUERY).map_err(unavailable)?;
        let raw_rows = stmt.query_map([], RawRow::from_row).map_err(unavailable)?;

        let mut rows = Vec::new();
        for raw in raw_rows {
            let raw = raw.map_err(unavailable)?;
            rows.push(raw.into_row(&source.name)?);
        }

        tracing::debug!("Read {} rows from {}", rows.len(), source.metadata_path.display());
        Ok(rows)
    }
}

/// Parse a catalog timestamp, falling back to the Unix epoch
fn timestamp_or_epoch(value: ValueRef<'_>) -> DateTime<Utc> {
    let parsed = match value {
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok().and_then(parse_timestamp),
        ValueRef::Integer(secs) => DateTime::from_timestamp(secs, 0),
        ValueRef::Real(secs) => DateTime::from_timestamp(secs.trunc() as i64, 0),
        ValueRef::Null | ValueRef::Blob(_) => None,
    };

    parsed.unwrap_or_else(|| {
        tracing::debug!("Unparseable catalog timestamp {:?}, using epoch", value);
        DateTime::<Utc>::default()
    })
}

/// Parse the textual timestamp forms SQLite catalogs use
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    // "2023-04-01 10:00:00.123456+00:00"
    if let Ok(dt) = DateTime::parse_from_rfc3339(&text.replacen(' ', "T", 1)) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
