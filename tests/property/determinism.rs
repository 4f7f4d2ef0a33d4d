//! Property-based tests for build determinism and ordering

use branchtree::tree::builder::TreeBuilder;
use branchtree::tree::hasher;
use branchtree::tree::node::sibling_order;
use branchtree::FsNode;
use proptest::prelude::*;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Relative file paths of one to four short segments
fn file_paths() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(prop::collection::vec("[a-e]{1,2}", 1..4), 0..24)
}

/// Materialize `paths` under `root`; paths that clash with an existing entry
/// of the other kind are skipped. Returns the files actually written.
fn materialize(root: &Path, paths: &[Vec<String>]) -> Vec<PathBuf> {
    let mut written = Vec::new();
    for segments in paths {
        let path = segments.iter().fold(root.to_path_buf(), |p, s| p.join(s));
        if let Some(parent) = path.parent() {
            if fs::create_dir_all(parent).is_err() {
                continue;
            }
        }
        if path.is_dir() {
            continue;
        }
        if fs::write(&path, segments.join("/")).is_ok() {
            written.push(path);
        }
    }
    written
}

fn assert_well_formed(node: &FsNode) {
    assert_eq!(node.children.is_some(), node.is_dir);
    for pair in node.children().windows(2) {
        assert_eq!(sibling_order(&pair[0], &pair[1]), Ordering::Less);
    }
    for child in node.children() {
        assert_eq!(child.path, node.path.join(&child.name));
        assert_well_formed(child);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_rebuild_is_identical(paths in file_paths()) {
        let temp_dir = TempDir::new().unwrap();
        materialize(temp_dir.path(), &paths);

        let builder = TreeBuilder::new();
        let first = builder.build(temp_dir.path()).unwrap();
        let second = builder.build(temp_dir.path()).unwrap();

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(hasher::fingerprint(&first), hasher::fingerprint(&second));
    }

    #[test]
    fn prop_tree_is_ordered_and_prefixed(paths in file_paths()) {
        let temp_dir = TempDir::new().unwrap();
        materialize(temp_dir.path(), &paths);

        let tree = TreeBuilder::new().build(temp_dir.path()).unwrap();
        prop_assert_eq!(&tree.path, &temp_dir.path().to_path_buf());
        assert_well_formed(&tree);
    }

    #[test]
    fn prop_every_file_is_present(paths in file_paths()) {
        let temp_dir = TempDir::new().unwrap();
        let written = materialize(temp_dir.path(), &paths);

        let tree = TreeBuilder::new().build(temp_dir.path()).unwrap();
        for file in &written {
            let node = tree.find(file);
            prop_assert!(node.is_some(), "missing {}", file.display());
            prop_assert!(!node.unwrap().is_dir);
        }
        let files = tree.iter().filter(|n| !n.is_dir).count();
        let mut distinct = written.clone();
        distinct.sort();
        distinct.dedup();
        prop_assert_eq!(files, distinct.len());
    }
}
