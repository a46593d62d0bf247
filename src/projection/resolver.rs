//! Maps virtual paths onto snapshot nodes.
//!
//! ```text
//! \                              -> root
//! \MyLib                         -> library
//! \MyLib\Foo                     -> series
//! \MyLib\Foo\Foo - 01.epub       -> book
//! ```
//!
//! A miss is an ordinary outcome and yields `None`; adapters report it as
//! their protocol's not-found status.

use std::sync::Arc;

use crate::domain::{Node, Snapshot};

/// Separator used when rendering virtual paths
pub const SEPARATOR: char = '\\';

/// Split a virtual path into its non-empty segments.
///
/// Both `\` and `/` separate segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split(|c: char| c == '\\' || c == '/')
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Resolve a virtual path against one snapshot
pub fn resolve(snapshot: &Arc<Snapshot>, path: &str) -> Option<Node> {
    let segments = split_path(path);

    let (library_name, rest) = match segments.split_first() {
        None => return Some(Node::Root(Arc::clone(snapshot))),
        Some(split) => split,
    };

    let library = Arc::clone(snapshot.find_library(library_name)?);

    match rest {
        [] => Some(Node::Library(library)),
        [series_name] => {
            let series = Arc::clone(library.find_series(series_name)?);
            Some(Node::Series { library, series })
        }
        [series_name, book_name] => {
            let series = Arc::clone(library.find_series(series_name)?);
            let book = Arc::clone(series.find_book(book_name)?);
            Some(Node::Book {
                library,
                series,
                book,
            })
        }
        _ => None,
    }
}

/// Render the virtual path of a node, e.g. `\MyLib\Foo\Foo - 01.epub`
pub fn virtual_path(node: &Node) -> String {
    let segments: Vec<&str> = match node {
        Node::Root(_) => Vec::new(),
        Node::Library(library) => vec![library.name.as_str()],
        Node::Series { library, series } => vec![library.name.as_str(), series.name.as_str()],
        Node::Book {
            library,
            series,
            book,
        } => vec![
            library.name.as_str(),
            series.name.as_str(),
            book.virtual_name(),
        ],
    };

    if segments.is_empty() {
        return SEPARATOR.to_string();
    }

    segments.iter().fold(String::new(), |mut path, segment| {
        path.push(SEPARATOR);
        path.push_str(segment);
        path
    })
}
