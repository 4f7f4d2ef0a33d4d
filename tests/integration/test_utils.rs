//! Shared fixtures for integration tests

use std::fs;
use std::path::Path;

/// `{a.txt, b/, c/d.txt}`
pub fn sample_tree(root: &Path) {
    fs::write(root.join("a.txt"), "a").unwrap();
    fs::create_dir(root.join("b")).unwrap();
    fs::create_dir(root.join("c")).unwrap();
    fs::write(root.join("c").join("d.txt"), "d").unwrap();
}

/// Nested directories with a few files at every level.
pub fn nested_tree(root: &Path, depth: usize, width: usize) {
    fn fill(dir: &Path, depth: usize, width: usize) {
        for i in 0..width {
            fs::write(dir.join(format!("file{}.txt", i)), format!("{}", i)).unwrap();
        }
        if depth == 0 {
            return;
        }
        for i in 0..width {
            let sub = dir.join(format!("dir{}", i));
            fs::create_dir(&sub).unwrap();
            fill(&sub, depth - 1, width);
        }
    }
    fill(root, depth, width);
}

/// Names of a node's direct children, in tree order.
pub fn child_names(node: &branchtree::FsNode) -> Vec<String> {
    node.children().iter().map(|c| c.name.clone()).collect()
}

/// Run `f` with the given environment variables set (or removed when `None`),
/// restoring the previous values afterwards.
pub fn with_env<F: FnOnce()>(vars: &[(&str, Option<&str>)], f: F) {
    let saved: Vec<(String, Option<String>)> = vars
        .iter()
        .map(|(k, _)| (k.to_string(), std::env::var(k).ok()))
        .collect();
    for (k, v) in vars {
        match v {
            Some(v) => std::env::set_var(k, v),
            None => std::env::remove_var(k),
        }
    }

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

    for (k, v) in saved {
        match v {
            Some(v) => std::env::set_var(&k, v),
            None => std::env::remove_var(&k),
        }
    }
    if let Err(panic) = result {
        std::panic::resume_unwind(panic);
    }
}
