//! Byte-range access to the physical file behind a book.
//!
//! A [`BookStream`] is created per caller-visible open. The file itself is
//! opened on the first read and released when the stream is closed or
//! dropped. Files are opened for shared access so the catalog application
//! can keep working on them.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::domain::Node;

/// Errors surfaced to the protocol adapter
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Not a file: {0}")]
    NotAFile(String),

    #[error("End of file: offset {offset} is at or beyond length {length}")]
    EndOfFile { offset: u64, length: u64 },

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Read handle for one book file
#[derive(Debug)]
pub struct BookStream {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl BookStream {
    /// Prepare a stream for a book node; nothing is opened yet
    pub fn open(node: &Node) -> Result<Self, StreamError> {
        let path = node
            .physical_path()
            .ok_or_else(|| StreamError::NotAFile(node.name().to_string()))?;

        Ok(Self::from_path(path))
    }

    /// Prepare a stream for an arbitrary physical path
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    /// Physical file this stream reads from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the physical file has been opened yet
    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Read up to `buf.len()` bytes starting at `offset`.
    ///
    /// Returns the number of bytes transferred, which is less than requested
    /// only at the true end of the file.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, StreamError> {
        self.positioned(offset, |file, _remaining| self.fill(file, buf))
    }

    /// Read up to `length` bytes starting at `offset` into a new buffer.
    ///
    /// The buffer never exceeds what is left of the file past `offset`.
    pub fn read(&self, offset: u64, length: usize) -> Result<Vec<u8>, StreamError> {
        self.positioned(offset, |file, remaining| {
            let capacity = usize::try_from(remaining).map_or(length, |left| left.min(length));
            let mut buf = vec![0u8; capacity];
            let transferred = self.fill(file, &mut buf)?;
            buf.truncate(transferred);
            Ok(buf)
        })
    }

    /// Open lazily, check `offset` against the file length and seek to it.
    ///
    /// `op` receives the file and the number of bytes left past `offset`.
    fn positioned<T>(
        &self,
        offset: u64,
        op: impl FnOnce(&mut File, u64) -> Result<T, StreamError>,
    ) -> Result<T, StreamError> {
        let mut guard = self.lock();

        let file = match guard.take() {
            Some(file) => file,
            None => {
                let file = open_shared(&self.path).map_err(|e| self.io_error(e))?;
                tracing::debug!("Opened {}", self.path.display());
                file
            }
        };
        let file = guard.insert(file);

        let length = file.metadata().map_err(|e| self.io_error(e))?.len();
        if offset >= length {
            return Err(StreamError::EndOfFile { offset, length });
        }

        file.seek(SeekFrom::Start(offset)).map_err(|e| self.io_error(e))?;

        op(file, length - offset)
    }

    /// Read until `buf` is full or the file ends
    fn fill(&self, file: &mut File, buf: &mut [u8]) -> Result<usize, StreamError> {
        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.io_error(e)),
            }
        }
        Ok(filled)
    }

    /// Release the physical file
    pub fn close(self) {
        if self.lock().take().is_some() {
            tracing::debug!("Closed {}", self.path.display());
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<File>> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn io_error(&self, source: io::Error) -> StreamError {
        StreamError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Open for reading while letting other processes read, write or delete
#[cfg(windows)]
fn open_shared(path: &Path) -> io::Result<File> {
    use std::os::windows::fs::OpenOptionsExt;

    const FILE_SHARE_READ: u32 = 0x0000_0001;
    const FILE_SHARE_WRITE: u32 = 0x0000_0002;
    const FILE_SHARE_DELETE: u32 = 0x0000_0004;

    OpenOptions::new()
        .read(true)
        .share_mode(FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE)
        .open(path)
}

#[cfg(not(windows))]
fn open_shared(path: &Path) -> io::Result<File> {
    OpenOptions::new().read(true).open(path)
}
