//! Integration tests for symbolic link cycles
#![cfg(unix)]

use super::test_utils::child_names;
use branchtree::error::WalkErrorKind;
use branchtree::service::QueryService;
use branchtree::tree::builder::TreeBuilder;
use std::fs;
use std::os::unix::fs::symlink;
use tempfile::TempDir;

/// root/a/b/c with c/loop -> root: the walk terminates, the loop is left out,
/// and its siblings are kept
#[test]
fn test_cycle_under_three_levels() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().to_path_buf();
    let c = root.join("a").join("b").join("c");
    fs::create_dir_all(&c).unwrap();
    fs::write(c.join("leaf.txt"), "leaf").unwrap();
    fs::write(root.join("a").join("top.txt"), "top").unwrap();
    symlink(&root, c.join("loop")).unwrap();

    let built = TreeBuilder::new().build_tree(&root).unwrap();
    let c_node = built.root.find(&c).unwrap();

    assert_eq!(child_names(c_node), vec!["leaf.txt"]);
    assert_eq!(child_names(built.root.child("a").unwrap()), vec!["b", "top.txt"]);
    assert_eq!(built.report.count(WalkErrorKind::CyclicLink), 1);
    assert_eq!(built.report.skipped[0].path, c.join("loop"));
}

/// Two links pointing at each other's parents: x/to_y/to_x closes a cycle,
/// and y/to_x aliases x, which was already walked
#[test]
fn test_mutual_links() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().to_path_buf();
    fs::create_dir(root.join("x")).unwrap();
    fs::create_dir(root.join("y")).unwrap();
    symlink(root.join("y"), root.join("x").join("to_y")).unwrap();
    symlink(root.join("x"), root.join("y").join("to_x")).unwrap();

    let built = TreeBuilder::new().build_tree(&root).unwrap();
    assert_eq!(child_names(&built.root), vec!["x", "y"]);
    assert_eq!(built.report.count(WalkErrorKind::CyclicLink), 1);
    assert_eq!(built.report.count(WalkErrorKind::AliasedLink), 1);

    let x = built.root.child("x").unwrap();
    assert!(child_names(x.child("to_y").unwrap()).is_empty());
    assert!(child_names(built.root.child("y").unwrap()).is_empty());
}

/// A dangling link is skipped without failing the build
#[test]
fn test_dangling_link() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().to_path_buf();
    fs::write(root.join("real.txt"), "r").unwrap();
    symlink(root.join("gone"), root.join("dangling")).unwrap();

    let tree = TreeBuilder::new().build(&root).unwrap();
    assert_eq!(child_names(&tree), vec!["real.txt"]);
}

/// Cyclic branches are reported on the cached snapshot
#[tokio::test]
async fn test_snapshot_reports_cycle() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().to_path_buf();
    fs::create_dir(root.join("a")).unwrap();
    symlink(&root, root.join("a").join("up")).unwrap();

    let service = QueryService::new(TreeBuilder::new());
    let snapshot = service.read_folder(&root).await.unwrap();
    assert!(!snapshot.report.is_clean());
    assert_eq!(snapshot.report.count(WalkErrorKind::CyclicLink), 1);
}
