use std::sync::Arc;
use std::thread;

use dirscope_core::tree::{self, attach_children, propagate_delta, update_loading, update_size};
use dirscope_core::{DeleteError, EntryInfo, FileTree, Node, ScanConfig, SortOrder};
use tempfile::TempDir;

/// Build root -> { big (300), docs/ -> { a (100), b (50) }, empty/ } with
/// aggregate sizes filled in the way a finished scan leaves them.
fn finished_tree(temp: &TempDir) -> (Arc<Node>, Arc<Node>, Arc<Node>) {
    let root = tree::create_root(temp.path()).unwrap();
    let base = root.path().to_path_buf();

    let top = attach_children(
        &root,
        vec![
            EntryInfo::file(base.join("big"), 300, None),
            EntryInfo::directory(base.join("docs"), None),
            EntryInfo::directory(base.join("empty"), None),
        ],
    );
    let docs = top[1].clone();
    let files = attach_children(
        &docs,
        vec![
            EntryInfo::file(base.join("docs/a"), 100, None),
            EntryInfo::file(base.join("docs/b"), 50, None),
        ],
    );
    attach_children(&top[2], Vec::new());
    update_size(&docs, 150);
    update_size(&root, 450);

    (root, docs, files[1].clone())
}

fn assert_aggregates(node: &Node) {
    if !node.is_dir() || node.is_loading() {
        return;
    }
    let Some(children) = node.children() else {
        return;
    };
    let sum: u64 = children.iter().map(|c| c.size()).sum();
    assert_eq!(node.size(), sum, "aggregate mismatch at {}", node.path().display());
    for child in children.iter() {
        assert_aggregates(child);
    }
}

#[test]
fn test_finished_tree_satisfies_aggregate_invariant() {
    let temp = TempDir::new().unwrap();
    let (root, _, _) = finished_tree(&temp);
    assert_aggregates(&root);
}

#[test]
fn test_enumerated_empty_differs_from_unenumerated() {
    let temp = TempDir::new().unwrap();
    let (root, docs, _) = finished_tree(&temp);

    let children = root.children().unwrap();
    let empty = children.iter().find(|c| c.name() == "empty").unwrap();
    assert_eq!(empty.children().map(|c| c.len()), Some(0));

    let file = docs.children().unwrap()[0].clone();
    assert!(file.children().is_none());
}

#[test]
fn test_removing_leaf_updates_every_ancestor() {
    let temp = TempDir::new().unwrap();
    let (root, docs, b) = finished_tree(&temp);
    let tree = FileTree::new(root.clone());

    tree.remove(&b).unwrap();

    assert_eq!(docs.size(), 100);
    assert_eq!(root.size(), 400);
    assert!(docs.children().unwrap().iter().all(|c| c.name() != "b"));
    assert_aggregates(&root);
}

#[test]
fn test_removing_directory_discards_subtree() {
    let temp = TempDir::new().unwrap();
    let (root, docs, b) = finished_tree(&temp);
    let tree = FileTree::new(root.clone());

    tree.remove(&docs).unwrap();

    assert_eq!(root.size(), 300);
    assert!(b.is_orphaned());
    assert!(tree.find(temp.path().join("docs")).is_none());
    // Removing an already-detached node is a no-op.
    tree.remove(&b).unwrap();
    assert_eq!(root.size(), 300);
}

#[test]
fn test_remove_during_load_leaves_tree_untouched() {
    let temp = TempDir::new().unwrap();
    let (root, docs, b) = finished_tree(&temp);
    update_loading(&docs, true);

    let err = tree::remove(&b).unwrap_err();
    assert_eq!(
        err,
        DeleteError::ConcurrentMutation {
            path: b.path().to_path_buf()
        }
    );
    assert_eq!(docs.child_count(), 2);
    assert_eq!(root.size(), 450);
}

#[test]
fn test_parent_back_reference_does_not_keep_parent_alive() {
    let temp = TempDir::new().unwrap();
    let (root, docs, b) = finished_tree(&temp);
    drop(root);
    drop(docs);

    assert!(b.parent().is_none());
    assert!(b.is_orphaned());
    propagate_delta(&b, 10);
    assert_eq!(b.size(), 50);
}

#[test]
fn test_concurrent_deltas_are_serialized() {
    let temp = TempDir::new().unwrap();
    let root = tree::create_root(temp.path()).unwrap();
    let base = root.path().to_path_buf();
    let dirs = attach_children(
        &root,
        (0..8)
            .map(|i| EntryInfo::directory(base.join(format!("d{i}")), None))
            .collect(),
    );

    let handles: Vec<_> = dirs
        .iter()
        .cloned()
        .map(|dir| {
            thread::spawn(move || {
                for _ in 0..1_000 {
                    propagate_delta(&dir, 3);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(root.size(), 8 * 1_000 * 3);
    assert!(dirs.iter().all(|d| d.size() == 3_000));
}

#[test]
fn test_reader_sees_whole_child_lists() {
    let temp = TempDir::new().unwrap();
    let root = tree::create_root(temp.path()).unwrap();
    let base = root.path().to_path_buf();

    let writer_root = root.clone();
    let writer = thread::spawn(move || {
        for round in 0..200 {
            let entries = (0..16)
                .map(|i| EntryInfo::file(base.join(format!("f{round}-{i}")), 1, None))
                .collect();
            attach_children(&writer_root, entries);
        }
    });

    for _ in 0..200 {
        if let Some(children) = root.children() {
            assert_eq!(children.len(), 16);
        }
    }
    writer.join().unwrap();
}

#[test]
fn test_held_child_list_survives_concurrent_sort_and_remove() {
    let temp = TempDir::new().unwrap();
    let root = tree::create_root(temp.path()).unwrap();
    let base = root.path().to_path_buf();

    let files = attach_children(
        &root,
        (0..64u64)
            .map(|i| EntryInfo::file(base.join(format!("f{i:02}")), i + 1, None))
            .collect(),
    );
    update_size(&root, (1..=64).sum());
    let held = root.children().unwrap();

    let sorter_root = root.clone();
    let sorter = thread::spawn(move || {
        for round in 0..200 {
            let order = if round % 2 == 0 { SortOrder::Name } else { SortOrder::Size };
            tree::sort_children(&sorter_root, order);
        }
    });
    let doomed: Vec<_> = files.iter().step_by(2).cloned().collect();
    let remover = thread::spawn(move || {
        for node in &doomed {
            tree::remove(node).unwrap();
        }
    });

    for _ in 0..500 {
        let children = root.children().unwrap();
        assert!((32..=64).contains(&children.len()));
        let mut ids: Vec<_> = children.iter().map(|c| c.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), children.len());
    }
    sorter.join().unwrap();
    remover.join().unwrap();

    assert_eq!(held.len(), 64);
    assert!(held.iter().zip(&files).all(|(a, b)| Arc::ptr_eq(a, b)));

    let remaining = root.children().unwrap();
    assert_eq!(remaining.len(), 32);
    assert!(remaining.iter().all(|c| !c.is_orphaned()));
    let sum: u64 = remaining.iter().map(|c| c.size()).sum();
    assert_eq!(root.size(), sum);
}

#[test]
fn test_snapshot_mirrors_live_tree() {
    let temp = TempDir::new().unwrap();
    let (root, _, _) = finished_tree(&temp);

    let snapshot = root.snapshot();
    assert_eq!(snapshot.size, 450);
    let children = snapshot.children.as_ref().unwrap();
    assert_eq!(children.len(), 3);
    assert_eq!(children[1].children.as_ref().unwrap().len(), 2);
}

#[test]
fn test_default_config_skips_hidden() {
    let config = ScanConfig::default();
    assert!(config.should_skip_hidden(".cache"));
    assert!(!config.treat_packages_as_files);
}
