//! Projection Integration Tests
//!
//! Loads real SQLite catalogs and exercises resolve, list and read.

mod common;

use std::sync::Arc;

use bookfs::domain::Snapshot;
use bookfs::projection::{CatalogLoader, Listing, ResumeFrom, StreamError};
use bookfs::{CatalogReader, Projection, SnapshotLoader};

use common::{content, CatalogFixture};

fn load(fixture: &CatalogFixture) -> Projection {
    let loader = CatalogLoader::new(CatalogReader::new(fixture.root(), "metadata.db"));
    Projection::with_snapshot("Books", loader.load().unwrap())
}

fn names(projection: &Projection, path: &str, pattern: Option<&str>) -> Vec<String> {
    let node = projection.resolve(path).unwrap();
    projection
        .list_all(&node, pattern)
        .unwrap()
        .into_iter()
        .map(|entry| entry.name)
        .collect()
}

#[test]
fn test_single_library_scenario() {
    let fixture = CatalogFixture::new();
    let lib = fixture.library("MyLib");
    lib.add_book("Foo Vol 1", (1, "Foo"), 1.0, "EPUB", 100);
    lib.add_book("Foo Vol 2", (1, "Foo"), 2.0, "EPUB", 200);

    let projection = load(&fixture);

    assert_eq!(names(&projection, "\\", None), vec!["MyLib"]);
    assert_eq!(names(&projection, "\\MyLib", None), vec!["Foo"]);
    assert_eq!(
        names(&projection, "\\MyLib\\Foo", None),
        vec!["Foo - 01.epub", "Foo - 02.epub"]
    );

    let book = projection.resolve("\\MyLib\\Foo\\Foo - 02.epub").unwrap();
    let attributes = projection.attributes(&book);
    assert!(!attributes.is_directory);
    assert_eq!(attributes.size, 200);

    let series = projection.resolve("\\MyLib\\Foo").unwrap();
    assert!(projection.attributes(&series).is_directory);
    assert_eq!(projection.attributes(&series).size, 300);
    assert_eq!(projection.volume().total_size, 300);
}

#[test]
fn test_forward_slashes_resolve_too() {
    let fixture = CatalogFixture::new();
    fixture
        .library("MyLib")
        .add_book("Foo Vol 1", (1, "Foo"), 1.0, "PDF", 10);

    let projection = load(&fixture);

    let node = projection.resolve("/MyLib/Foo/Foo - 01.pdf").unwrap();
    assert_eq!(node.name(), "Foo - 01.pdf");
    assert!(projection.resolve("\\MyLib\\Foo\\Foo - 01.epub").is_none());
    assert!(projection.resolve("\\MyLibrary").is_none());
}

#[test]
fn test_specials_sort_after_regular_volumes() {
    let fixture = CatalogFixture::new();
    let lib = fixture.library("MyLib");
    lib.add_book("Special", (1, "Foo"), 10005.0, "CBZ", 10);
    lib.add_book("One", (1, "Foo"), 1.0, "CBZ", 10);
    lib.add_book("Twelve", (1, "Foo"), 12.0, "CBZ", 10);

    let projection = load(&fixture);

    assert_eq!(
        names(&projection, "\\MyLib\\Foo", None),
        vec!["Foo - 01.cbz", "Foo - 12.cbz", "Foo - SP05.cbz"]
    );
}

#[test]
fn test_unsafe_series_names_are_sanitized() {
    let fixture = CatalogFixture::new();
    fixture
        .library("MyLib")
        .add_book("Odd", (3, "What? Who: Why"), 1.0, "EPUB", 10);

    let projection = load(&fixture);

    assert_eq!(names(&projection, "\\MyLib", None), vec!["What_ Who_ Why"]);
    assert!(projection
        .resolve("\\MyLib\\What_ Who_ Why\\What_ Who_ Why - 01.epub")
        .is_some());
}

#[test]
fn test_broken_libraries_are_skipped() {
    let fixture = CatalogFixture::new();
    fixture
        .library("Good")
        .add_book("Foo Vol 1", (1, "Foo"), 1.0, "EPUB", 10);
    fixture.corrupt_library("Corrupt");
    fixture
        .library("Strange")
        .add_book("Scan", (1, "Bar"), 1.0, "DJVU", 10);

    let projection = load(&fixture);

    assert_eq!(names(&projection, "\\", None), vec!["Good"]);
    assert!(projection.resolve("\\Corrupt").is_none());
    assert!(projection.resolve("\\Strange").is_none());
}

#[test]
fn test_missing_root_fails_the_load() {
    let fixture = CatalogFixture::new();
    let loader = CatalogLoader::new(CatalogReader::new(
        fixture.root().join("does-not-exist"),
        "metadata.db",
    ));

    assert!(loader.load().is_err());
}

#[test]
fn test_pattern_filters_before_resume() {
    let fixture = CatalogFixture::new();
    let lib = fixture.library("MyLib");
    lib.add_book("A1", (1, "Alpha"), 1.0, "EPUB", 10);
    lib.add_book("B1", (2, "Beta"), 1.0, "EPUB", 10);
    lib.add_book("G1", (3, "Gamma"), 1.0, "EPUB", 10);

    let projection = load(&fixture);
    let library = projection.resolve("\\MyLib").unwrap();

    assert_eq!(names(&projection, "\\MyLib", Some("*a")), vec!["Alpha", "Beta", "Gamma"]);
    assert_eq!(names(&projection, "\\MyLib", Some("G*")), vec!["Gamma"]);

    let first = projection
        .list_children(&library, Some("*ta"), &ResumeFrom::Start)
        .unwrap();
    let Listing::Entry { entry, next } = first else {
        panic!("expected an entry");
    };
    assert_eq!(entry.name, "Beta");
    assert_eq!(
        projection
            .list_children(&library, Some("*ta"), &ResumeFrom::Token(next))
            .unwrap(),
        Listing::End
    );
}

#[test]
fn test_stream_reads_physical_file() {
    let fixture = CatalogFixture::new();
    fixture
        .library("MyLib")
        .add_book("Foo Vol 1", (1, "Foo"), 1.0, "EPUB", 1000);

    let projection = load(&fixture);
    let node = projection.resolve("\\MyLib\\Foo\\Foo - 01.epub").unwrap();
    let stream = projection.open_stream(&node).unwrap();
    let expected = content(1000);

    assert_eq!(stream.read(0, 1000).unwrap(), expected);
    assert_eq!(stream.read(990, 100).unwrap(), &expected[990..]);
    assert_eq!(stream.read(0, usize::MAX).unwrap(), expected);
    assert!(matches!(
        stream.read(1000, 1),
        Err(StreamError::EndOfFile { offset: 1000, length: 1000 })
    ));

    stream.close();
}

#[test]
fn test_nodes_and_streams_survive_reload() {
    let fixture = CatalogFixture::new();
    fixture
        .library("MyLib")
        .add_book("Foo Vol 1", (1, "Foo"), 1.0, "EPUB", 64);

    let projection = load(&fixture);
    let node = projection.resolve("\\MyLib\\Foo\\Foo - 01.epub").unwrap();
    let stream = projection.open_stream(&node).unwrap();
    assert_eq!(stream.read(0, 8).unwrap().len(), 8);

    projection.publish(Snapshot::empty());

    assert!(projection.resolve("\\MyLib").is_none());
    assert_eq!(node.attributes().size, 64);
    assert_eq!(stream.read(8, 8).unwrap(), &content(64)[8..16]);
}

#[test]
fn test_readers_never_see_a_torn_snapshot() {
    let small = CatalogFixture::new();
    small
        .library("MyLib")
        .add_book("Foo Vol 1", (1, "Foo"), 1.0, "EPUB", 10);

    let large = CatalogFixture::new();
    let lib = large.library("MyLib");
    for i in 1..=20 {
        lib.add_book(&format!("Foo Vol {}", i), (1, "Foo"), i as f64, "EPUB", 10);
    }
    lib.add_book("Bar Vol 1", (2, "Bar"), 1.0, "EPUB", 10);

    let small_snapshot = CatalogLoader::new(CatalogReader::new(small.root(), "metadata.db"))
        .load()
        .unwrap();
    let large_snapshot = CatalogLoader::new(CatalogReader::new(large.root(), "metadata.db"))
        .load()
        .unwrap();

    let projection = Arc::new(Projection::with_snapshot("Books", small_snapshot.clone()));

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let projection = Arc::clone(&projection);
            scope.spawn(move || {
                for _ in 0..500 {
                    let snapshot = projection.snapshot();
                    let size: u64 = snapshot.libraries.iter().map(|l| l.total_size).sum();
                    assert_eq!(size, snapshot.total_size);
                    assert_eq!(snapshot.book_count() as u64 * 10, snapshot.total_size);
                }
            });
        }

        for i in 0..200 {
            let next = if i % 2 == 0 {
                large_snapshot.clone()
            } else {
                small_snapshot.clone()
            };
            projection.publish(next);
        }
    });

    assert_eq!(projection.snapshot().generation, 201);
}
