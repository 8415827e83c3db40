use dirscope_core::tree::update_loading;
use dirscope_core::{DeleteError, FileTree, Node};
use dirscope_ops::{DeleteMode, DeletionResult, delete_node, start_deletion};
use dirscope_scan::{ScanConfig, Scanner};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

/// R/{a: 100 bytes, b: 50 bytes, c/{d: 25 bytes}}
fn create_sample_tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::write(root.join("a"), vec![0u8; 100]).unwrap();
    fs::write(root.join("b"), vec![0u8; 50]).unwrap();
    fs::create_dir(root.join("c")).unwrap();
    fs::write(root.join("c/d"), vec![0u8; 25]).unwrap();
    temp
}

async fn scan(temp: &TempDir) -> FileTree {
    Scanner::new()
        .scan(temp.path(), |_| {})
        .await
        .unwrap()
        .into_tree()
}

fn find(tree: &FileTree, temp: &TempDir, relative: &str) -> Arc<Node> {
    tree.find(temp.path().join(relative)).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_file_updates_tree_and_disk() {
    let temp = create_sample_tree();
    let tree = scan(&temp).await;
    let d = find(&tree, &temp, "c/d");
    let c = find(&tree, &temp, "c");

    let outcome = delete_node(&tree, &d, DeleteMode::Permanent).await.unwrap();

    assert_eq!(outcome.bytes_freed, 25);
    assert!(!temp.path().join("c/d").exists());
    assert!(d.is_removed());
    assert_eq!(c.size(), 0);
    assert_eq!(c.children().unwrap().len(), 0);
    assert_eq!(tree.total_size(), 150);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_directory_recursively() {
    let temp = create_sample_tree();
    let tree = scan(&temp).await;
    let c = find(&tree, &temp, "c");
    let d = find(&tree, &temp, "c/d");

    delete_node(&tree, &c, DeleteMode::Permanent).await.unwrap();

    assert!(!temp.path().join("c").exists());
    assert!(d.is_orphaned());
    assert_eq!(tree.total_size(), 150);
    assert!(tree.find(temp.path().join("c")).is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_collapsed_package_permanently() {
    let temp = create_sample_tree();
    let package = temp.path().join("Tool.app");
    fs::create_dir_all(package.join("Contents")).unwrap();
    fs::write(package.join("Contents/binary"), vec![0u8; 500]).unwrap();

    let config = ScanConfig::builder()
        .treat_packages_as_files(true)
        .build()
        .unwrap();
    let tree = Scanner::with_config(config)
        .scan(temp.path(), |_| {})
        .await
        .unwrap()
        .into_tree();
    let app = find(&tree, &temp, "Tool.app");
    assert!(!app.is_dir());
    assert_eq!(tree.total_size(), 675);

    let outcome = delete_node(&tree, &app, DeleteMode::Permanent).await.unwrap();

    assert_eq!(outcome.bytes_freed, 500);
    assert!(!package.exists());
    assert!(app.is_orphaned());
    assert_eq!(tree.total_size(), 175);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_refuses_loading_subtree() {
    let temp = create_sample_tree();
    let tree = scan(&temp).await;
    let c = find(&tree, &temp, "c");
    let d = find(&tree, &temp, "c/d");
    update_loading(&c, true);

    let err = delete_node(&tree, &d, DeleteMode::Permanent)
        .await
        .unwrap_err();

    assert!(matches!(err, DeleteError::ConcurrentMutation { .. }));
    assert!(temp.path().join("c/d").exists());
    assert_eq!(tree.total_size(), 175);
    assert!(!d.is_removed());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_filesystem_failure_leaves_tree_unchanged() {
    let temp = create_sample_tree();
    let tree = scan(&temp).await;
    let a = find(&tree, &temp, "a");
    fs::remove_file(temp.path().join("a")).unwrap();

    let err = delete_node(&tree, &a, DeleteMode::Permanent)
        .await
        .unwrap_err();

    assert!(matches!(err, DeleteError::Filesystem { .. }));
    assert_eq!(tree.total_size(), 175);
    assert!(!a.is_removed());
    assert_eq!(tree.root().unwrap().children().unwrap().len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_root_empties_tree() {
    let temp = create_sample_tree();
    let target = temp.path().join("c");
    let tree = Scanner::new()
        .scan(&target, |_| {})
        .await
        .unwrap()
        .into_tree();
    let root = tree.root().unwrap();

    delete_node(&tree, &root, DeleteMode::Permanent).await.unwrap();

    assert!(tree.is_empty());
    assert_eq!(tree.total_size(), 0);
    assert!(!target.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_detached_node_is_noop() {
    let temp = create_sample_tree();
    let tree = scan(&temp).await;
    let c = find(&tree, &temp, "c");
    let d = find(&tree, &temp, "c/d");
    delete_node(&tree, &c, DeleteMode::Permanent).await.unwrap();

    let outcome = delete_node(&tree, &d, DeleteMode::Permanent).await.unwrap();
    assert_eq!(outcome.bytes_freed, 0);
    assert_eq!(tree.total_size(), 150);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_batch_deletion_reports_progress() {
    let temp = create_sample_tree();
    let tree = Arc::new(scan(&temp).await);
    let a = find(&tree, &temp, "a");
    let b = find(&tree, &temp, "b");
    fs::remove_file(temp.path().join("b")).unwrap();

    let mut rx = start_deletion(tree.clone(), vec![a, b], DeleteMode::Permanent);

    let mut progress_updates = 0;
    let mut complete = None;
    while let Some(result) = rx.recv().await {
        match result {
            DeletionResult::Progress(p) => {
                assert_eq!(p.total, 2);
                progress_updates += 1;
            }
            DeletionResult::Complete(c) => complete = Some(c),
        }
    }

    let complete = complete.unwrap();
    assert_eq!(progress_updates, 3);
    assert_eq!(complete.deleted, 1);
    assert_eq!(complete.failed, 1);
    assert_eq!(complete.bytes_freed, 100);
    assert_eq!(complete.errors.len(), 1);
    assert_eq!(tree.total_size(), 75);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_batch_completes() {
    let temp = create_sample_tree();
    let tree = Arc::new(scan(&temp).await);

    let mut rx = start_deletion(tree, Vec::new(), DeleteMode::Permanent);

    let mut last = None;
    while let Some(result) = rx.recv().await {
        last = Some(result);
    }
    match last {
        Some(DeletionResult::Complete(c)) => {
            assert_eq!(c.deleted, 0);
            assert!(c.is_success());
        }
        other => panic!("expected completion, got {other:?}"),
    }
}
