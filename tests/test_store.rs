//! Tests for the document root collaborator

mod common;

use std::io::ErrorKind;

use common::TempDir;
use warden::files::{DocumentRoot, ResolveError};

#[test]
fn test_open_requires_directory() {
    let dir = TempDir::new();
    dir.write("file.txt", b"x");

    assert!(DocumentRoot::open(dir.path()).is_ok());
    assert!(DocumentRoot::open(dir.path().join("file.txt")).is_err());
    assert!(DocumentRoot::open(dir.path().join("missing")).is_err());
}

#[test]
fn test_resolve_stays_under_root() {
    let dir = TempDir::new();
    let root = DocumentRoot::new(dir.path());

    let resolved = root.resolve("/a/b.txt").unwrap();
    assert!(resolved.starts_with(dir.path()));
    assert!(resolved.ends_with("a/b.txt"));

    assert!(matches!(
        root.resolve("/a/../../outside.txt"),
        Err(ResolveError::Traversal(_))
    ));
}

#[tokio::test]
async fn test_read_and_size_agree() {
    let dir = TempDir::new();
    dir.write("docs/page.html", b"<p>hello</p>");
    let root = DocumentRoot::new(dir.path());
    let path = root.resolve("/docs/page.html").unwrap();

    let contents = root.read(&path).await.unwrap();
    let size = root.size(&path).await.unwrap();

    assert_eq!(contents, b"<p>hello</p>");
    assert_eq!(size, contents.len() as u64);
}

#[tokio::test]
async fn test_size_of_directory_is_not_found() {
    let dir = TempDir::new();
    dir.write("docs/page.html", b"x");
    let root = DocumentRoot::new(dir.path());

    let err = root.size(&root.resolve("/docs").unwrap()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_write_creates_parents_and_overwrites() {
    let dir = TempDir::new();
    let root = DocumentRoot::new(dir.path());
    let path = root.resolve("/new/deep/tree/file.txt").unwrap();

    root.write(&path, b"first version").await.unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"first version");

    root.write(&path, b"v2").await.unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"v2");
}

#[tokio::test]
async fn test_remove() {
    let dir = TempDir::new();
    dir.write("gone.txt", b"bye");
    let root = DocumentRoot::new(dir.path());
    let path = root.resolve("/gone.txt").unwrap();

    root.remove(&path).await.unwrap();
    assert!(!path.exists());

    let err = root.remove(&path).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
