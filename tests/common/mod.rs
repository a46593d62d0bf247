//! Shared fixtures: real SQLite catalogs in temporary directories.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use tempfile::TempDir;

const SCHEMA: &str = "
    CREATE TABLE books (id INTEGER PRIMARY KEY, title TEXT NOT NULL, author_sort TEXT,
        series_index REAL, path TEXT NOT NULL DEFAULT '', timestamp TIMESTAMP,
        last_modified TIMESTAMP);
    CREATE TABLE series (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
    CREATE TABLE books_series_link (id INTEGER PRIMARY KEY, book INTEGER, series INTEGER);
    CREATE TABLE data (id INTEGER PRIMARY KEY, book INTEGER, format TEXT,
        uncompressed_size INTEGER, name TEXT);
";

/// A catalog root with any number of libraries
pub struct CatalogFixture {
    temp: TempDir,
}

impl CatalogFixture {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Create a library directory with an empty catalog database
    pub fn library(&self, name: &str) -> LibraryFixture {
        let dir = self.temp.path().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        let conn = Connection::open(dir.join("metadata.db")).unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        LibraryFixture { dir, conn }
    }

    /// Create a library directory whose metadata file is not a database
    pub fn corrupt_library(&self, name: &str) {
        let dir = self.temp.path().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("metadata.db"), b"this is not sqlite").unwrap();
    }
}

/// One library's catalog database
pub struct LibraryFixture {
    dir: PathBuf,
    conn: Connection,
}

impl LibraryFixture {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Insert a book with one file and write `size` bytes of content for it.
    ///
    /// Returns the physical path of the file.
    pub fn add_book(
        &self,
        title: &str,
        series: (i64, &str),
        index: f64,
        format: &str,
        size: usize,
    ) -> PathBuf {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO series (id, name) VALUES (?1, ?2)",
                params![series.0, series.1],
            )
            .unwrap();

        let relative = format!("Author/{}", title);
        self.conn
            .execute(
                "INSERT INTO books
                     (title, author_sort, series_index, path, timestamp, last_modified)
                 VALUES (?1, 'Author', ?2, ?3,
                     '2023-04-01 10:00:00+00:00', '2023-05-01 10:00:00+00:00')",
                params![title, index, relative],
            )
            .unwrap();
        let book_id = self.conn.last_insert_rowid();

        self.conn
            .execute(
                "INSERT INTO books_series_link (book, series) VALUES (?1, ?2)",
                params![book_id, series.0],
            )
            .unwrap();
        self.conn
            .execute(
                "INSERT INTO data (book, format, uncompressed_size, name) VALUES (?1, ?2, ?3, ?4)",
                params![book_id, format, size as i64, title],
            )
            .unwrap();

        let folder = self.dir.join(&relative);
        std::fs::create_dir_all(&folder).unwrap();
        let path = folder.join(format!("{}.{}", title, format.to_lowercase()));
        std::fs::write(&path, content(size)).unwrap();
        path
    }
}

/// Deterministic file content of the given length
pub fn content(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}
