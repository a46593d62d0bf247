//! Resumable, filtered directory listings.
//!
//! Entries are produced one at a time in the level's canonical order: names
//! at library and series level, virtual names at book level, always compared
//! ordinally. Filtering happens before pagination, so positions and markers
//! always refer to the filtered sequence.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use super::pattern::NamePattern;
use crate::domain::{Attributes, Entry, Node};

/// Opaque position inside a filtered listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContinuationToken(usize);

impl ContinuationToken {
    /// Token pointing at a zero-based position
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Where a listing call starts
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResumeFrom {
    /// First entry
    #[default]
    Start,

    /// Just after the named entry, or at its insertion point when it is gone
    After(String),

    /// Directly at a previously returned position
    Token(ContinuationToken),
}

/// One listed child
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirEntry {
    pub name: String,
    #[serde(flatten)]
    pub attributes: Attributes,
}

/// Result of one listing call
#[derive(Debug, Clone, PartialEq)]
pub enum Listing {
    /// An entry plus the token that continues after it
    Entry {
        entry: DirEntry,
        next: ContinuationToken,
    },

    /// Nothing left; callers stop enumerating this handle
    End,
}

/// Listing was requested on a file
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Not a directory: {0}")]
pub struct NotADirectory(pub String);

/// Produce the next child of `node` matching `pattern`, starting at `from`
pub fn list_children(
    node: &Node,
    pattern: &NamePattern,
    from: &ResumeFrom,
) -> Result<Listing, NotADirectory> {
    match node {
        Node::Root(snapshot) => Ok(next_entry(&snapshot.libraries, pattern, from)),
        Node::Library(library) => Ok(next_entry(&library.series, pattern, from)),
        Node::Series { series, .. } => Ok(next_entry(&series.books, pattern, from)),
        Node::Book { book, .. } => Err(NotADirectory(book.virtual_name().to_string())),
    }
}

/// Every child of `node` matching `pattern`, in canonical order
pub fn list_all(node: &Node, pattern: &NamePattern) -> Result<Vec<DirEntry>, NotADirectory> {
    match node {
        Node::Root(snapshot) => Ok(all_entries(&snapshot.libraries, pattern)),
        Node::Library(library) => Ok(all_entries(&library.series, pattern)),
        Node::Series { series, .. } => Ok(all_entries(&series.books, pattern)),
        Node::Book { book, .. } => Err(NotADirectory(book.virtual_name().to_string())),
    }
}

fn dir_entry<T: Entry>(child: &T) -> DirEntry {
    DirEntry {
        name: child.entry_name().to_string(),
        attributes: child.attributes(),
    }
}

fn next_entry<T: Entry>(children: &[Arc<T>], pattern: &NamePattern, from: &ResumeFrom) -> Listing {
    let filtered: Vec<&T> = children
        .iter()
        .map(|child| child.as_ref())
        .filter(|child| pattern.matches(child.entry_name()))
        .collect();

    let index = match from {
        ResumeFrom::Start => 0,
        ResumeFrom::After(marker) => {
            match filtered.binary_search_by(|child| child.entry_name().cmp(marker.as_str())) {
                Ok(found) => found + 1,
                Err(insertion) => insertion,
            }
        }
        ResumeFrom::Token(token) => token.index(),
    };

    match filtered.get(index) {
        Some(child) => Listing::Entry {
            entry: dir_entry(*child),
            next: ContinuationToken(index + 1),
        },
        None => Listing::End,
    }
}

fn all_entries<T: Entry>(children: &[Arc<T>], pattern: &NamePattern) -> Vec<DirEntry> {
    children
        .iter()
        .filter(|child| pattern.matches(child.entry_name()))
        .map(|child| dir_entry(child.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BookFormat, CatalogRow};
    use crate::domain::Snapshot;
    use crate::projection::builder::TreeBuilder;
    use crate::projection::resolver::resolve;
    use chrono::{DateTime, Utc};

    fn row(series_id: i64, series: &str, index: f64, format: BookFormat) -> CatalogRow {
        CatalogRow {
            title: format!("{} #{}", series, index),
            author_sort: String::new(),
            series_index: index,
            relative_path: series.to_string(),
            created_at: DateTime::<Utc>::default(),
            modified_at: DateTime::<Utc>::default(),
            file_base_name: format!("{}-{}", series, index),
            format,
            file_size: index as u64,
            series_name: series.to_string(),
            series_id,
        }
    }

    fn snapshot(indices: &[f64]) -> Arc<Snapshot> {
        let mut rows: Vec<_> = indices
            .iter()
            .map(|&i| row(1, "Foo", i, BookFormat::Epub))
            .collect();
        rows.push(row(1, "Foo", 1.0, BookFormat::Pdf));
        rows.push(row(2, "Bar", 1.0, BookFormat::Cbz));
        rows.push(row(3, "Baz", 1.0, BookFormat::Cbz));

        let mut builder = TreeBuilder::new();
        builder
            .add_library("MyLib", "/c/MyLib", &rows)
            .add_library("Other", "/c/Other", &[]);
        Arc::new(builder.finish())
    }

    fn series_node(snapshot: &Arc<Snapshot>) -> Node {
        resolve(snapshot, "\\MyLib\\Foo").unwrap()
    }

    fn names(entries: &[DirEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    fn entry_name(listing: Listing) -> Option<String> {
        match listing {
            Listing::Entry { entry, .. } => Some(entry.name),
            Listing::End => None,
        }
    }

    #[test]
    fn test_list_each_level() {
        let snapshot = snapshot(&[2.0, 1.0]);
        let any = NamePattern::any();

        let root = resolve(&snapshot, "").unwrap();
        assert_eq!(names(&list_all(&root, &any).unwrap()), vec!["MyLib", "Other"]);

        let library = resolve(&snapshot, "\\MyLib").unwrap();
        assert_eq!(
            names(&list_all(&library, &any).unwrap()),
            vec!["Bar", "Baz", "Foo"]
        );

        assert_eq!(
            names(&list_all(&series_node(&snapshot), &any).unwrap()),
            vec!["Foo - 01.epub", "Foo - 01.pdf", "Foo - 02.epub"]
        );
    }

    #[test]
    fn test_entries_carry_attributes() {
        let snapshot = snapshot(&[3.0]);
        let entries = list_all(&series_node(&snapshot), &NamePattern::any()).unwrap();

        let book = entries.iter().find(|e| e.name == "Foo - 03.epub").unwrap();
        assert!(!book.attributes.is_directory);
        assert_eq!(book.attributes.size, 3);

        let library = resolve(&snapshot, "\\MyLib").unwrap();
        let series = list_all(&library, &NamePattern::any()).unwrap();
        assert!(series.iter().all(|e| e.attributes.is_directory));
    }

    #[test]
    fn test_enumeration_ends_past_last_entry() {
        let snapshot = snapshot(&[1.0]);
        let node = series_node(&snapshot);
        let any = NamePattern::any();

        let last = ResumeFrom::Token(ContinuationToken::from_index(2));
        assert_eq!(list_children(&node, &any, &last).unwrap(), Listing::End);

        let past = ResumeFrom::Token(ContinuationToken::from_index(50));
        assert_eq!(list_children(&node, &any, &past).unwrap(), Listing::End);

        let after_last = ResumeFrom::After("Foo - 01.pdf".to_string());
        assert_eq!(list_children(&node, &any, &after_last).unwrap(), Listing::End);
    }

    #[test]
    fn test_resume_after_marker() {
        let snapshot = snapshot(&[1.0, 2.0, 3.0]);
        let node = series_node(&snapshot);
        let any = NamePattern::any();

        let from = ResumeFrom::After("Foo - 01.pdf".to_string());
        assert_eq!(
            entry_name(list_children(&node, &any, &from).unwrap()).as_deref(),
            Some("Foo - 02.epub")
        );
    }

    #[test]
    fn test_resume_after_missing_marker_uses_insertion_point() {
        let snapshot = snapshot(&[1.0, 3.0]);
        let node = series_node(&snapshot);
        let any = NamePattern::any();

        // Entry 02 was deleted between calls
        let from = ResumeFrom::After("Foo - 02.epub".to_string());
        assert_eq!(
            entry_name(list_children(&node, &any, &from).unwrap()).as_deref(),
            Some("Foo - 03.epub")
        );

        let from = ResumeFrom::After("A".to_string());
        assert_eq!(
            entry_name(list_children(&node, &any, &from).unwrap()).as_deref(),
            Some("Foo - 01.epub")
        );
    }

    #[test]
    fn test_marker_walk_matches_full_listing() {
        let indices: Vec<f64> = (1..=15).map(f64::from).chain([10_001.0, 10_005.0]).collect();
        let snapshot = snapshot(&indices);
        let node = series_node(&snapshot);
        let any = NamePattern::any();

        let full = names(&list_all(&node, &any).unwrap())
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();

        let mut by_marker = Vec::new();
        let mut from = ResumeFrom::Start;
        while let Listing::Entry { entry, .. } = list_children(&node, &any, &from).unwrap() {
            from = ResumeFrom::After(entry.name.clone());
            by_marker.push(entry.name);
        }

        let mut by_token = Vec::new();
        let mut from = ResumeFrom::Start;
        while let Listing::Entry { entry, next } = list_children(&node, &any, &from).unwrap() {
            from = ResumeFrom::Token(next);
            by_token.push(entry.name);
        }

        assert_eq!(by_marker, full);
        assert_eq!(by_token, full);
        assert!(full.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(full.last().map(String::as_str), Some("Foo - SP05.epub"));
    }

    #[test]
    fn test_token_and_marker_agree() {
        let indices: Vec<f64> = (1..=9).map(f64::from).collect();
        let snapshot = snapshot(&indices);
        let node = series_node(&snapshot);
        let any = NamePattern::any();
        let full = list_all(&node, &any).unwrap();

        for k in 1..full.len() {
            let by_token = list_children(
                &node,
                &any,
                &ResumeFrom::Token(ContinuationToken::from_index(k)),
            )
            .unwrap();
            let by_marker =
                list_children(&node, &any, &ResumeFrom::After(full[k - 1].name.clone())).unwrap();

            assert_eq!(by_token, by_marker);
            assert_eq!(entry_name(by_token).as_deref(), Some(full[k].name.as_str()));
        }
    }

    #[test]
    fn test_pattern_applies_before_pagination() {
        let snapshot = snapshot(&[1.0, 2.0, 3.0]);
        let node = series_node(&snapshot);
        let epub = NamePattern::new("*.epub");

        let filtered = list_all(&node, &epub).unwrap();
        assert_eq!(
            names(&filtered),
            vec!["Foo - 01.epub", "Foo - 02.epub", "Foo - 03.epub"]
        );

        // Position 1 of the filtered sequence, not of the raw one
        let second = list_children(
            &node,
            &epub,
            &ResumeFrom::Token(ContinuationToken::from_index(1)),
        )
        .unwrap();
        assert_eq!(entry_name(second).as_deref(), Some("Foo - 02.epub"));

        // A marker that the filter excludes still finds its place
        let from = ResumeFrom::After("Foo - 01.pdf".to_string());
        assert_eq!(
            entry_name(list_children(&node, &epub, &from).unwrap()).as_deref(),
            Some("Foo - 02.epub")
        );
    }

    #[test]
    fn test_no_match_ends_immediately() {
        let snapshot = snapshot(&[1.0]);
        let node = series_node(&snapshot);
        let pattern = NamePattern::new("*.mobi");

        assert_eq!(
            list_children(&node, &pattern, &ResumeFrom::Start).unwrap(),
            Listing::End
        );
    }

    #[test]
    fn test_book_is_not_a_directory() {
        let snapshot = snapshot(&[1.0]);
        let book = resolve(&snapshot, "\\MyLib\\Foo\\Foo - 01.epub").unwrap();

        assert_eq!(
            list_children(&book, &NamePattern::any(), &ResumeFrom::Start),
            Err(NotADirectory("Foo - 01.epub".to_string()))
        );
    }
}
