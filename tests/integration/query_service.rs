//! Integration tests for caching, coalescing and branch-driven refresh

use super::test_utils::{child_names, sample_tree};
use branchtree::branch::BranchId;
use branchtree::service::{QueryService, TreeEvent};
use branchtree::tree::builder::TreeBuilder;
use branchtree::watch::{path_changed, ChangeWatcher, WatchEvent};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn service() -> Arc<QueryService> {
    Arc::new(QueryService::new(TreeBuilder::new()))
}

/// Two concurrent first reads share one walk
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_reads_coalesce() {
    let temp_dir = TempDir::new().unwrap();
    sample_tree(temp_dir.path());
    let service = service();

    let (first, second) = tokio::join!(
        service.read_folder(temp_dir.path()),
        service.read_folder(temp_dir.path())
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(service.builder().builds_started(), 1);
    assert!(Arc::ptr_eq(&first, &second));
}

/// Many concurrent readers still produce a single walk
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_spawned_reads_coalesce() {
    let temp_dir = TempDir::new().unwrap();
    sample_tree(temp_dir.path());
    let service = service();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            let root = temp_dir.path().to_path_buf();
            tokio::spawn(async move { service.read_folder(&root).await })
        })
        .collect();
    let mut sequences = Vec::new();
    for task in tasks {
        sequences.push(task.await.unwrap().unwrap().sequence);
    }

    assert_eq!(service.builder().builds_started(), 1);
    assert!(sequences.iter().all(|s| *s == sequences[0]));
}

/// Cached snapshots are served until invalidated, then rebuilt
#[tokio::test]
async fn test_fresh_after_invalidate() {
    let temp_dir = TempDir::new().unwrap();
    sample_tree(temp_dir.path());
    let service = service();

    let first = service.read_folder(temp_dir.path()).await.unwrap();
    fs::write(temp_dir.path().join("e.txt"), "e").unwrap();

    // Still cached
    let cached = service.read_folder(temp_dir.path()).await.unwrap();
    assert!(Arc::ptr_eq(&first, &cached));
    assert!(cached.tree().child("e.txt").is_none());

    service.invalidate(temp_dir.path());
    let fresh = service.read_folder(temp_dir.path()).await.unwrap();
    assert!(fresh.sequence > first.sequence);
    assert_eq!(child_names(fresh.tree()), vec!["b", "c", "a.txt", "e.txt"]);
    assert_eq!(service.builder().builds_started(), 2);
}

/// After a checkout to "feature-x" the snapshot built under "main" is never served
#[tokio::test]
async fn test_checkout_rebuilds_under_new_branch() {
    let temp_dir = TempDir::new().unwrap();
    sample_tree(temp_dir.path());
    let service = service();
    service.switch_branch(BranchId::new("main"));

    let main = service.read_folder(temp_dir.path()).await.unwrap();
    assert_eq!(main.request.branch.as_str(), "main");

    let mut events = service.subscribe();
    let (tx, watcher) = ChangeWatcher::channel(Arc::clone(&service));
    tx.send(WatchEvent::BranchCheckout(BranchId::new("feature-x")))
        .unwrap();
    drop(tx);
    let _ = watcher.run().await;

    match events.recv().await.unwrap() {
        TreeEvent::BranchCheckout(branch) => assert_eq!(branch.as_str(), "feature-x"),
        other => panic!("unexpected event: {:?}", other),
    }
    let pushed = match events.recv().await.unwrap() {
        TreeEvent::TreeRefreshed(snapshot) => snapshot,
        other => panic!("unexpected event: {:?}", other),
    };
    assert_eq!(pushed.request.branch.as_str(), "feature-x");
    assert!(pushed.sequence > main.sequence);

    let read = service.read_folder(temp_dir.path()).await.unwrap();
    assert!(Arc::ptr_eq(&read, &pushed));
    assert_eq!(service.builder().builds_started(), 2);
}

/// A branch switch alone makes the next read walk again
#[tokio::test]
async fn test_branch_is_part_of_cache_key() {
    let temp_dir = TempDir::new().unwrap();
    let service = service();

    service.switch_branch(BranchId::new("main"));
    service.read_folder(temp_dir.path()).await.unwrap();
    service.switch_branch(BranchId::new("feature-x"));
    let snapshot = service.read_folder(temp_dir.path()).await.unwrap();

    assert_eq!(snapshot.request.branch.as_str(), "feature-x");
    assert_eq!(service.builder().builds_started(), 2);
}

/// File changes push a new tree only when the structure changed
#[tokio::test]
async fn test_path_changes_push_refresh() {
    let temp_dir = TempDir::new().unwrap();
    sample_tree(temp_dir.path());
    let service = service();
    let first = service.read_folder(temp_dir.path()).await.unwrap();
    let mut events = service.subscribe();

    let (tx, watcher) = ChangeWatcher::channel(Arc::clone(&service));
    // Content-only edit: same structure, nothing pushed
    fs::write(temp_dir.path().join("a.txt"), "edited").unwrap();
    tx.send(path_changed(&temp_dir.path().join("a.txt"))).unwrap();
    // New file: pushed
    fs::write(temp_dir.path().join("b").join("new.txt"), "n").unwrap();
    tx.send(path_changed(&temp_dir.path().join("b").join("new.txt")))
        .unwrap();
    drop(tx);
    let _ = watcher.run().await;

    let pushed = match events.recv().await.unwrap() {
        TreeEvent::TreeRefreshed(snapshot) => snapshot,
        other => panic!("unexpected event: {:?}", other),
    };
    assert!(events.try_recv().is_err());
    assert_ne!(pushed.fingerprint, first.fingerprint);
    assert_eq!(
        child_names(pushed.tree().child("b").unwrap()),
        vec!["new.txt"]
    );

    let read = service.read_folder(temp_dir.path()).await.unwrap();
    assert!(Arc::ptr_eq(&read, &pushed));
}

/// Once notifications stop the service keeps answering from its cache
#[tokio::test]
async fn test_degraded_service_serves_cache() {
    let temp_dir = TempDir::new().unwrap();
    sample_tree(temp_dir.path());
    let service = service();
    let first = service.read_folder(temp_dir.path()).await.unwrap();

    let (tx, watcher) = ChangeWatcher::channel(Arc::clone(&service));
    drop(tx);
    assert!(watcher.run().await.is_err());
    assert!(service.is_degraded());

    let again = service.read_folder(temp_dir.path()).await.unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert!(Arc::ptr_eq(
        &service.last_good(temp_dir.path()).unwrap(),
        &first
    ));
}

#[tokio::test]
async fn test_missing_root_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let service = service();
    let err = service
        .read_folder(&temp_dir.path().join("missing"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), branchtree::error::WalkErrorKind::RootNotFound);
}

/// A root deleted on disk is reported once its change arrives, not served from cache
#[tokio::test]
async fn test_deleted_root_not_served_after_change() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("repo");
    fs::create_dir(&root).unwrap();
    sample_tree(&root);
    let service = service();
    service.read_folder(&root).await.unwrap();

    fs::remove_dir_all(&root).unwrap();
    let (tx, watcher) = ChangeWatcher::channel(Arc::clone(&service));
    tx.send(path_changed(&root)).unwrap();
    drop(tx);
    let _ = watcher.run().await;

    let err = service.read_folder(&root).await.unwrap_err();
    assert_eq!(err.kind(), branchtree::error::WalkErrorKind::RootNotFound);
    assert!(service.last_good(&root).is_none());
}
