//! Catalog format codes and the file extensions they project to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Ebook formats a catalog is allowed to describe.
///
/// The table is closed on purpose: a library holding any other code is not
/// loaded at all (see [`super::CatalogError::UnsupportedFormat`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookFormat {
    Epub,
    Pdf,
    Mobi,
    Azw3,
    Cbz,
    Cbr,
    Txt,
}

impl BookFormat {
    /// All known formats, in table order
    pub const ALL: [BookFormat; 7] = [
        BookFormat::Epub,
        BookFormat::Pdf,
        BookFormat::Mobi,
        BookFormat::Azw3,
        BookFormat::Cbz,
        BookFormat::Cbr,
        BookFormat::Txt,
    ];

    /// Code as stored in the catalog's `data.format` column
    pub fn code(self) -> &'static str {
        match self {
            BookFormat::Epub => "EPUB",
            BookFormat::Pdf => "PDF",
            BookFormat::Mobi => "MOBI",
            BookFormat::Azw3 => "AZW3",
            BookFormat::Cbz => "CBZ",
            BookFormat::Cbr => "CBR",
            BookFormat::Txt => "TXT",
        }
    }

    /// Lowercase file extension, without the dot
    pub fn extension(self) -> &'static str {
        match self {
            BookFormat::Epub => "epub",
            BookFormat::Pdf => "pdf",
            BookFormat::Mobi => "mobi",
            BookFormat::Azw3 => "azw3",
            BookFormat::Cbz => "cbz",
            BookFormat::Cbr => "cbr",
            BookFormat::Txt => "txt",
        }
    }

    /// Look up a catalog code (case-insensitive, surrounding whitespace ignored)
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|format| format.code().eq_ignore_ascii_case(code))
    }
}

impl fmt::Display for BookFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Error returned when parsing an unknown format code
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown format code: {0}")]
pub struct UnknownFormat(pub String);

impl FromStr for BookFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| UnknownFormat(s.to_string()))
    }
}
