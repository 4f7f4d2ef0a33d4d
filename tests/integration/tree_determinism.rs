//! Integration tests for build determinism

use super::test_utils::{nested_tree, sample_tree};
use branchtree::tree::builder::TreeBuilder;
use branchtree::tree::hasher;
use std::fs;
use tempfile::TempDir;

/// Rebuilding an unchanged directory yields an equal tree
#[test]
fn test_rebuild_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    nested_tree(temp_dir.path(), 3, 2);

    let builder = TreeBuilder::new();
    let first = builder.build(temp_dir.path()).unwrap();
    let second = builder.build(temp_dir.path()).unwrap();

    assert_eq!(first, second);
    assert_eq!(hasher::fingerprint(&first), hasher::fingerprint(&second));
}

/// Separate builders agree too
#[test]
fn test_independent_builders_agree() {
    let temp_dir = TempDir::new().unwrap();
    sample_tree(temp_dir.path());

    let first = TreeBuilder::new().build(temp_dir.path()).unwrap();
    let second = TreeBuilder::new().build(temp_dir.path()).unwrap();
    assert_eq!(first, second);
}

/// Creation order does not affect the result
#[test]
fn test_creation_order_irrelevant() {
    let one = TempDir::new().unwrap();
    let two = TempDir::new().unwrap();

    for name in ["zeta.txt", "alpha.txt", "mid.txt"] {
        fs::write(one.path().join(name), name).unwrap();
    }
    for name in ["mid.txt", "zeta.txt", "alpha.txt"] {
        fs::write(two.path().join(name), name).unwrap();
    }

    let first = TreeBuilder::new().build(one.path()).unwrap();
    let second = TreeBuilder::new().build(two.path()).unwrap();
    let names = |t: &branchtree::FsNode| -> Vec<String> {
        t.children().iter().map(|c| c.name.clone()).collect()
    };
    assert_eq!(names(&first), names(&second));
    assert_eq!(names(&first), vec!["alpha.txt", "mid.txt", "zeta.txt"]);
}

/// Structural changes move the fingerprint; content changes do not
#[test]
fn test_fingerprint_tracks_structure_only() {
    let temp_dir = TempDir::new().unwrap();
    sample_tree(temp_dir.path());
    let builder = TreeBuilder::new();

    let before = hasher::fingerprint(&builder.build(temp_dir.path()).unwrap());

    fs::write(temp_dir.path().join("a.txt"), "different content").unwrap();
    let edited = hasher::fingerprint(&builder.build(temp_dir.path()).unwrap());
    assert_eq!(before, edited);

    fs::write(temp_dir.path().join("b").join("new.txt"), "n").unwrap();
    let grown = hasher::fingerprint(&builder.build(temp_dir.path()).unwrap());
    assert_ne!(before, grown);
}
