//! Live file and directory nodes.
//!
//! Every mutable field of a [`Node`] is an independently published cell:
//! sizes and flags are atomics, and the child list is an immutable vector
//! swapped as a whole through an atomic pointer. A reader never takes a lock
//! and can observe any field at any time while scanner tasks keep writing.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use arc_swap::ArcSwapOption;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a node within the process.
///
/// Ids are handed out from a global counter and never reused, so they stay
/// valid after the node's path changes or the node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Create a new NodeId from a u64.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocate the next process-wide id.
    pub fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One enumerated directory entry, before it becomes a node.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    /// Absolute path of the entry.
    pub path: PathBuf,
    /// Whether the entry will be expanded as a directory.
    pub is_dir: bool,
    /// Byte length for files (ignored for directories).
    pub size: u64,
    /// Last modification time, if the platform reports one.
    pub modified: Option<SystemTime>,
}

impl EntryInfo {
    /// Describe a file entry.
    pub fn file(path: impl Into<PathBuf>, size: u64, modified: Option<SystemTime>) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
            size,
            modified,
        }
    }

    /// Describe a directory entry.
    pub fn directory(path: impl Into<PathBuf>, modified: Option<SystemTime>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
            size: 0,
            modified,
        }
    }
}

/// Shared, immutable snapshot of a node's children.
pub type Children = Arc<Vec<Arc<Node>>>;

/// A single file or directory in the live tree.
pub struct Node {
    id: NodeId,
    path: PathBuf,
    name: CompactString,
    is_dir: bool,
    modified: Option<SystemTime>,

    /// Bytes (aggregate of descendants for directories).
    size: AtomicU64,
    is_loading: AtomicBool,
    /// Set when the directory listing failed.
    unreadable: AtomicBool,
    removed: AtomicBool,

    /// `None` until enumerated.
    children: ArcSwapOption<Vec<Arc<Node>>>,

    /// Back-reference for delta propagation only; never owns the parent.
    parent: Option<Weak<Node>>,
}

impl Node {
    pub(crate) fn new_root(path: PathBuf, is_dir: bool, modified: Option<SystemTime>) -> Self {
        let name = display_name(&path);
        Self {
            id: NodeId::next(),
            name,
            path,
            is_dir,
            modified,
            size: AtomicU64::new(0),
            is_loading: AtomicBool::new(false),
            unreadable: AtomicBool::new(false),
            removed: AtomicBool::new(false),
            children: ArcSwapOption::empty(),
            parent: None,
        }
    }

    pub(crate) fn new_child(entry: EntryInfo, parent: &Arc<Node>) -> Self {
        let name = display_name(&entry.path);
        Self {
            id: NodeId::next(),
            name,
            path: entry.path,
            is_dir: entry.is_dir,
            modified: entry.modified,
            size: AtomicU64::new(if entry.is_dir { 0 } else { entry.size }),
            is_loading: AtomicBool::new(false),
            unreadable: AtomicBool::new(false),
            removed: AtomicBool::new(false),
            children: ArcSwapOption::empty(),
            parent: Some(Arc::downgrade(parent)),
        }
    }

    /// Unique id of this node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Absolute path of this node.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Display name (last path component).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if this node is a directory.
    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Last modification time.
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    /// Current size in bytes.
    pub fn size(&self) -> u64 {
        self.size.load(Ordering::Acquire)
    }

    /// Whether the node's children are still being enumerated or sized.
    pub fn is_loading(&self) -> bool {
        self.is_loading.load(Ordering::Acquire)
    }

    /// Whether the directory listing failed during the scan.
    pub fn is_unreadable(&self) -> bool {
        self.unreadable.load(Ordering::Acquire)
    }

    /// Whether this node itself has been removed from its tree.
    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    /// Snapshot of the current child list.
    ///
    /// `None` means not yet enumerated; an empty slice means enumerated with
    /// no entries.
    pub fn children(&self) -> Option<Children> {
        self.children.load_full()
    }

    /// Number of direct children (0 when not enumerated).
    pub fn child_count(&self) -> usize {
        self.children.load().as_deref().map_or(0, Vec::len)
    }

    /// Parent node, if this is not a root and the parent is still alive.
    pub fn parent(&self) -> Option<Arc<Node>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Whether this node was created as a root.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Whether this node is detached from a live tree.
    ///
    /// True if the node or any ancestor was removed, or if an ancestor has
    /// already been dropped.
    pub fn is_orphaned(&self) -> bool {
        if self.is_removed() {
            return true;
        }
        let Some(weak) = &self.parent else {
            return false;
        };
        let mut current = match weak.upgrade() {
            Some(parent) => parent,
            None => return true,
        };
        loop {
            if current.is_removed() {
                return true;
            }
            let next = match &current.parent {
                None => return false,
                Some(weak) => match weak.upgrade() {
                    Some(parent) => parent,
                    None => return true,
                },
            };
            current = next;
        }
    }

    /// Iterate over live ancestors, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = Arc<Node>> + use<> {
        std::iter::successors(self.parent(), |node| node.parent())
    }

    /// Take an owned, serialisable copy of this subtree.
    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            id: self.id,
            name: self.name.clone(),
            path: self.path.clone(),
            is_dir: self.is_dir,
            size: self.size(),
            modified: self.modified,
            is_loading: self.is_loading(),
            unreadable: self.is_unreadable(),
            children: self
                .children()
                .map(|children| children.iter().map(|c| c.snapshot()).collect()),
        }
    }

    pub(crate) fn store_size(&self, size: u64) {
        self.size.store(size, Ordering::Release);
    }

    pub(crate) fn add_size(&self, delta: i64) {
        // fetch_update never fails here: the closure always returns Some.
        let _ = self
            .size
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |size| {
                Some(if delta >= 0 {
                    size.saturating_add(delta.unsigned_abs())
                } else {
                    size.saturating_sub(delta.unsigned_abs())
                })
            });
    }

    pub(crate) fn store_loading(&self, loading: bool) {
        self.is_loading.store(loading, Ordering::Release);
    }

    pub(crate) fn mark_unreadable(&self) {
        self.unreadable.store(true, Ordering::Release);
    }

    pub(crate) fn mark_removed(&self) {
        self.removed.store(true, Ordering::Release);
    }

    pub(crate) fn replace_children(&self, children: Option<Children>) {
        self.children.store(children);
    }

    /// Derive a new child list from the current one and publish it.
    ///
    /// `f` runs without any lock held and is retried if another writer
    /// published in between. Returning `None` leaves the list untouched.
    /// Returns whether a new list was published.
    pub(crate) fn update_children<F>(&self, mut f: F) -> bool
    where
        F: FnMut(&[Arc<Node>]) -> Option<Vec<Arc<Node>>>,
    {
        let mut changed = false;
        self.children.rcu(|current| {
            match current.as_deref().and_then(|list| f(list.as_slice())) {
                Some(next) => {
                    changed = true;
                    Some(Arc::new(next))
                }
                None => {
                    changed = false;
                    current.clone()
                }
            }
        });
        changed
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("is_dir", &self.is_dir)
            .field("size", &self.size())
            .field("is_loading", &self.is_loading())
            .field("children", &self.children.load().as_deref().map(Vec::len))
            .finish()
    }
}

/// Owned copy of a subtree, detached from the live atomics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub name: CompactString,
    pub path: PathBuf,
    pub is_dir: bool,
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub is_loading: bool,
    pub unreadable: bool,
    pub children: Option<Vec<NodeSnapshot>>,
}

fn display_name(path: &Path) -> CompactString {
    match path.file_name() {
        Some(name) => CompactString::new(name.to_string_lossy()),
        None => CompactString::new(path.to_string_lossy()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_ids_are_unique() {
        let a = NodeId::next();
        let b = NodeId::next();
        assert_ne!(a, b);
        assert_eq!(NodeId::new(42).0, 42);
    }

    #[test]
    fn test_root_defaults() {
        let node = Node::new_root(PathBuf::from("/data/photos"), true, None);
        assert_eq!(node.name(), "photos");
        assert!(node.is_dir());
        assert!(node.is_root());
        assert_eq!(node.size(), 0);
        assert!(node.children().is_none());
        assert!(!node.is_loading());
        assert!(!node.is_orphaned());
    }

    #[test]
    fn test_root_name_falls_back_to_path() {
        let node = Node::new_root(PathBuf::from("/"), true, None);
        assert_eq!(node.name(), "/");
    }

    #[test]
    fn test_directory_child_ignores_entry_size() {
        let root = Arc::new(Node::new_root(PathBuf::from("/r"), true, None));
        let mut entry = EntryInfo::directory("/r/sub", None);
        entry.size = 999;
        let child = Node::new_child(entry, &root);
        assert_eq!(child.size(), 0);
        assert!(Arc::ptr_eq(&child.parent().unwrap(), &root));
    }

    #[test]
    fn test_add_size_saturates() {
        let node = Node::new_root(PathBuf::from("/r"), false, None);
        node.store_size(10);
        node.add_size(-25);
        assert_eq!(node.size(), 0);
        node.add_size(7);
        assert_eq!(node.size(), 7);
    }

    #[test]
    fn test_child_orphaned_when_parent_dropped() {
        let root = Arc::new(Node::new_root(PathBuf::from("/r"), true, None));
        let child = Arc::new(Node::new_child(EntryInfo::file("/r/a", 1, None), &root));
        assert!(!child.is_orphaned());
        drop(root);
        assert!(child.is_orphaned());
        assert!(child.parent().is_none());
    }
}
