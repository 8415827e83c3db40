//! Tree mutation primitives and the tree container.
//!
//! The scanner and the deletion pathway mutate nodes only through the
//! functions in this module. Every operation on an orphaned node (one that was
//! removed, or whose ancestor was removed) is a silent no-op.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};

use crate::error::{DeleteError, TreeError};
use crate::node::{EntryInfo, Node};

/// Ordering applied to a directory's children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// Largest first; ties keep enumeration order.
    #[default]
    Size,
    /// Case-insensitive name, ascending.
    Name,
}

/// Build the root node for `path`.
///
/// The path is stat'ed (following symlinks) to fix `is_dir` for the node's
/// lifetime. The root starts with size 0 and no children.
pub fn create_root(path: impl AsRef<Path>) -> Result<Arc<Node>, TreeError> {
    let path = path.as_ref();
    let metadata = std::fs::metadata(path).map_err(|source| TreeError::PathUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Arc::new(Node::new_root(
        path.to_path_buf(),
        metadata.is_dir(),
        metadata.modified().ok(),
    )))
}

/// Create nodes for `entries` and publish them as `parent`'s children.
///
/// The previous child list is replaced in a single swap, so observers see
/// either the old list or the complete new one. Returns the new children in
/// entry order (empty if `parent` is orphaned).
pub fn attach_children(parent: &Arc<Node>, entries: Vec<EntryInfo>) -> Vec<Arc<Node>> {
    if parent.is_orphaned() {
        return Vec::new();
    }
    let children: Vec<Arc<Node>> = entries
        .into_iter()
        .map(|entry| Arc::new(Node::new_child(entry, parent)))
        .collect();
    parent.replace_children(Some(Arc::new(children.clone())));
    children
}

/// Replace the size of `node`.
pub fn update_size(node: &Node, value: u64) {
    if node.is_orphaned() {
        return;
    }
    node.store_size(value);
}

/// Replace the loading flag of `node`.
pub fn update_loading(node: &Node, loading: bool) {
    if node.is_orphaned() {
        return;
    }
    node.store_loading(loading);
}

/// Record that `node`'s directory listing failed.
pub fn mark_unreadable(node: &Node) {
    if node.is_orphaned() {
        return;
    }
    node.mark_unreadable();
}

/// Add `delta` to `node` and every ancestor up to the root.
pub fn propagate_delta(node: &Arc<Node>, delta: i64) {
    if delta == 0 || node.is_orphaned() {
        return;
    }
    node.add_size(delta);
    for ancestor in node.ancestors() {
        ancestor.add_size(delta);
    }
}

/// Check that `node` and all of its ancestors have finished loading.
pub fn ensure_settled(node: &Arc<Node>) -> Result<(), DeleteError> {
    let loading = node.is_loading() || node.ancestors().any(|a| a.is_loading());
    if loading {
        return Err(DeleteError::ConcurrentMutation {
            path: node.path().to_path_buf(),
        });
    }
    Ok(())
}

/// Detach `node` from its parent and subtract its size from every ancestor.
///
/// Removing a root only marks it removed; [`FileTree::remove`] additionally
/// empties the tree. Fails without modifying anything if the node or an
/// ancestor is still loading.
pub fn remove(node: &Arc<Node>) -> Result<(), DeleteError> {
    if node.is_orphaned() {
        return Ok(());
    }
    ensure_settled(node)?;

    let Some(parent) = node.parent() else {
        node.mark_removed();
        return Ok(());
    };

    let id = node.id();
    let detached = parent.update_children(|children| {
        children
            .iter()
            .any(|c| c.id() == id)
            .then(|| children.iter().filter(|c| c.id() != id).cloned().collect())
    });
    if !detached {
        return Ok(());
    }

    node.mark_removed();
    let size = i64::try_from(node.size()).unwrap_or(i64::MAX);
    propagate_delta(&parent, -size);
    Ok(())
}

/// Reorder `node`'s children according to `order`.
pub fn sort_children(node: &Node, order: SortOrder) {
    if node.is_orphaned() {
        return;
    }
    node.update_children(|children| {
        let mut sorted = children.to_vec();
        match order {
            SortOrder::Size => sorted.sort_by(|a, b| b.size().cmp(&a.size())),
            SortOrder::Name => sorted.sort_by(|a, b| compare_names(a.name(), b.name())),
        }
        Some(sorted)
    });
}

/// Reorder every directory in the subtree under `node`.
pub fn sort_recursive(node: &Node, order: SortOrder) {
    sort_children(node, order);
    if let Some(children) = node.children() {
        for child in children.iter().filter(|c| c.is_dir()) {
            sort_recursive(child, order);
        }
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Container owning the root of a live tree.
#[derive(Debug)]
pub struct FileTree {
    root: ArcSwapOption<Node>,
    root_path: PathBuf,
}

impl FileTree {
    /// Wrap an existing root node.
    pub fn new(root: Arc<Node>) -> Self {
        Self {
            root_path: root.path().to_path_buf(),
            root: ArcSwapOption::from(Some(root)),
        }
    }

    /// Stat `path` and build a tree holding just its root.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, TreeError> {
        create_root(path).map(Self::new)
    }

    /// The root node, or `None` once the root has been removed.
    pub fn root(&self) -> Option<Arc<Node>> {
        self.root.load_full()
    }

    /// Path the tree was rooted at.
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Whether the tree has no root.
    pub fn is_empty(&self) -> bool {
        self.root.load().is_none()
    }

    /// Size of the root (0 for an empty tree).
    pub fn total_size(&self) -> u64 {
        self.root().map_or(0, |r| r.size())
    }

    /// Remove `node` from the tree, emptying it if `node` is the root.
    pub fn remove(&self, node: &Arc<Node>) -> Result<(), DeleteError> {
        remove(node)?;
        self.root.rcu(|root| match root {
            Some(r) if Arc::ptr_eq(r, node) => None,
            other => other.clone(),
        });
        Ok(())
    }

    /// Find the node at `path` by descending from the root.
    pub fn find(&self, path: impl AsRef<Path>) -> Option<Arc<Node>> {
        let path = path.as_ref();
        let root = self.root()?;
        let relative = path.strip_prefix(root.path()).ok()?;

        let mut current = root;
        for component in relative.components() {
            let name = component.as_os_str();
            let next = current
                .children()?
                .iter()
                .find(|c| c.path().file_name() == Some(name))
                .cloned()?;
            current = next;
        }
        Some(current)
    }

    /// Visit every node in pre-order. `f` receives the node and its depth.
    pub fn visit<F>(&self, mut f: F)
    where
        F: FnMut(&Arc<Node>, usize),
    {
        let Some(root) = self.root() else {
            return;
        };
        let mut stack = vec![(root, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            f(&node, depth);
            if let Some(children) = node.children() {
                for child in children.iter().rev() {
                    stack.push((child.clone(), depth + 1));
                }
            }
        }
    }
}
