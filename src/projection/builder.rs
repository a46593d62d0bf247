//! Builds immutable snapshots out of catalog rows.
//!
//! Rows are grouped by series id, deduplicated on (title, format), renamed
//! into their projected form and sorted ordinally so that enumeration order
//! is stable for as long as the snapshot lives.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::catalog::{BookFormat, CatalogRow};
use crate::domain::{Book, BuildWarning, Library, Series, Snapshot};

/// Series indices at or above this value mark specials
pub const SPECIALS_BASE: u64 = 10_000;

/// Characters that cannot appear in a projected file name
pub const UNSAFE_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Replacement for [`UNSAFE_CHARS`]
pub const PLACEHOLDER: char = '_';

/// Replace path-unsafe characters in a series display name
pub fn sanitize_series_name(name: &str) -> String {
    name.chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { PLACEHOLDER } else { c })
        .collect()
}

/// Render a raw series index for use in a virtual name.
///
/// Regular indices become two-digit, zero-padded integers. Indices at or
/// above [`SPECIALS_BASE`] are specials and render as `SP` plus the
/// remainder, which sorts them after every regular volume.
pub fn format_series_index(raw: f64) -> String {
    if !raw.is_finite() {
        return "00".to_string();
    }

    if raw >= SPECIALS_BASE as f64 {
        let special = raw.trunc() as u64 % SPECIALS_BASE;
        format!("SP{:02}", special)
    } else {
        format!("{:02}", raw.round().max(0.0) as u64)
    }
}

/// Rows of one series id, in catalog order
struct SeriesGroup<'a> {
    id: i64,
    rows: Vec<&'a CatalogRow>,
}

/// Accumulates libraries and produces a [`Snapshot`]
#[derive(Debug)]
pub struct TreeBuilder {
    libraries: Vec<Library>,
    warnings: Vec<BuildWarning>,
    built_at: DateTime<Utc>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    /// Start an empty build
    pub fn new() -> Self {
        Self {
            libraries: Vec::new(),
            warnings: Vec::new(),
            built_at: Utc::now(),
        }
    }

    /// Warnings recorded so far
    pub fn warnings(&self) -> &[BuildWarning] {
        &self.warnings
    }

    /// Add one library built from its catalog rows
    pub fn add_library(
        &mut self,
        name: impl Into<String>,
        root: impl Into<PathBuf>,
        rows: &[CatalogRow],
    ) -> &mut Self {
        let name = name.into();

        let mut groups: Vec<SeriesGroup<'_>> = Vec::new();
        let mut by_id: HashMap<i64, usize> = HashMap::new();
        for row in rows {
            let idx = *by_id.entry(row.series_id).or_insert_with(|| {
                groups.push(SeriesGroup {
                    id: row.series_id,
                    rows: Vec::new(),
                });
                groups.len() - 1
            });
            groups[idx].rows.push(row);
        }

        let mut taken_names = HashSet::new();
        let mut series = Vec::with_capacity(groups.len());
        for group in groups {
            let display = sanitize_series_name(&group.rows[0].series_name);
            let display = if taken_names.contains(&display) {
                let mut renamed = format!("{} [{}]", display, group.id);
                while taken_names.contains(&renamed) {
                    renamed.push(PLACEHOLDER);
                }
                self.warn(BuildWarning::SeriesNameCollision {
                    library: name.clone(),
                    name: display,
                    series_id: group.id,
                    renamed_to: renamed.clone(),
                });
                renamed
            } else {
                display
            };
            taken_names.insert(display.clone());

            series.push(Arc::new(self.build_series(&name, display, group)));
        }

        series.sort_by(|a, b| a.name.cmp(&b.name));

        let total_size = series.iter().map(|s| s.total_size).sum();
        let (created_at, modified_at) = span(
            series.iter().map(|s| (s.created_at, s.modified_at)),
            self.built_at,
        );

        tracing::debug!(
            "Built library {} with {} series ({} bytes)",
            name,
            series.len(),
            total_size
        );

        self.libraries.push(Library {
            name,
            root: root.into(),
            series,
            total_size,
            created_at,
            modified_at,
        });
        self
    }

    fn build_series(&mut self, library: &str, name: String, group: SeriesGroup<'_>) -> Series {
        let mut pairs: HashSet<(&str, BookFormat)> = HashSet::new();
        let mut virtual_names: HashSet<String> = HashSet::new();
        let mut books = Vec::with_capacity(group.rows.len());

        for row in group.rows {
            if !pairs.insert((row.title.as_str(), row.format)) {
                tracing::debug!(
                    "Dropping duplicate {:?} ({}) in {}/{}",
                    row.title,
                    row.format,
                    library,
                    name
                );
                continue;
            }

            let book = Book::from_row(row, &name, format_series_index(row.series_index));
            if !virtual_names.insert(book.virtual_name().to_string()) {
                self.warn(BuildWarning::DuplicateVirtualName {
                    library: library.to_string(),
                    series: name.clone(),
                    virtual_name: book.virtual_name().to_string(),
                    dropped_title: book.title.clone(),
                });
                continue;
            }

            books.push(Arc::new(book));
        }

        books.sort_by(|a, b| a.virtual_name().cmp(b.virtual_name()));

        let total_size = books.iter().map(|b| b.file_size).sum();
        let (created_at, modified_at) = span(
            books.iter().map(|b| (b.created_at, b.modified_at)),
            self.built_at,
        );

        Series {
            id: group.id,
            name,
            books,
            total_size,
            created_at,
            modified_at,
        }
    }

    fn warn(&mut self, warning: BuildWarning) {
        tracing::warn!("Catalog data problem: {}", warning);
        self.warnings.push(warning);
    }

    /// Finish the build
    pub fn finish(self) -> Snapshot {
        let mut libraries = self.libraries;
        libraries.sort_by(|a, b| a.name.cmp(&b.name));
        libraries.dedup_by(|later, earlier| {
            let duplicate = later.name == earlier.name;
            if duplicate {
                tracing::warn!("Library {} added twice, keeping the first", later.name);
            }
            duplicate
        });

        let libraries: Vec<Arc<Library>> = libraries.into_iter().map(Arc::new).collect();
        let total_size = libraries.iter().map(|l| l.total_size).sum();
        let (created_at, modified_at) = span(
            libraries.iter().map(|l| (l.created_at, l.modified_at)),
            self.built_at,
        );

        Snapshot {
            libraries,
            total_size,
            created_at,
            modified_at,
            built_at: self.built_at,
            generation: 0,
            warnings: self.warnings,
        }
    }
}

/// Earliest creation and latest modification, or `fallback` for no items
fn span(
    times: impl Iterator<Item = (DateTime<Utc>, DateTime<Utc>)>,
    fallback: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    times
        .reduce(|(c1, m1), (c2, m2)| (c1.min(c2), m1.max(m2)))
        .unwrap_or((fallback, fallback))
}
