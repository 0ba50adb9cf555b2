//! Path-keyed metadata cache
//!
//! Every filesystem operation consults the [`NodeCache`]. Nodes are added
//! by directory listings, by remote stats on lookup, and by local creation;
//! they are only removed when a file is unlinked. There is no eviction and
//! no size bound.
//!
//! Each node sits behind its own async mutex so operations on one path
//! are serialised while operations on different paths proceed in parallel.
//! The map lock is never held across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::buffer::WriteBuffer;
use crate::repo::ContentEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

impl NodeKind {
    pub fn is_dir(&self) -> bool {
        matches!(self, NodeKind::Directory)
    }
}

/// Locally known state of one path
#[derive(Debug)]
pub struct Node {
    path: String,
    kind: NodeKind,
    /// Last known local-or-remote size
    pub size: u64,
    /// Whole remote object, fetched on first read and kept from then on
    pub content: Option<Bytes>,
    /// New content awaiting flush
    pub pending: Option<WriteBuffer>,
    /// Pending bytes not yet flushed
    pub dirty: bool,
    /// Known to exist in the remote repository
    pub remote: bool,
}

impl Node {
    /// A file created locally, with an empty pending buffer
    pub fn new_file(path: impl Into<String>, max_bytes: usize) -> Self {
        Self {
            path: path.into(),
            kind: NodeKind::File,
            size: 0,
            content: None,
            pending: Some(WriteBuffer::new(0, max_bytes)),
            dirty: false,
            remote: false,
        }
    }

    /// A directory created locally
    pub fn new_dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: NodeKind::Directory,
            size: 0,
            content: None,
            pending: None,
            dirty: false,
            remote: false,
        }
    }

    /// A node discovered in the remote repository
    pub fn discovered(path: impl Into<String>, kind: NodeKind, size: u64) -> Self {
        Self {
            path: path.into(),
            kind,
            size,
            content: None,
            pending: None,
            dirty: false,
            remote: true,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

pub type NodeHandle = Arc<Mutex<Node>>;

#[derive(Debug, Default)]
pub struct NodeCache {
    nodes: RwLock<HashMap<String, NodeHandle>>,
}

impl NodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<NodeHandle> {
        self.nodes.read().get(path).cloned()
    }

    pub fn has(&self, path: &str) -> bool {
        self.nodes.read().contains_key(path)
    }

    /// Insert `node`, replacing whatever was cached at its path
    pub fn put(&self, node: Node) -> NodeHandle {
        let path = node.path.clone();
        let handle = Arc::new(Mutex::new(node));
        self.nodes.write().insert(path, handle.clone());
        handle
    }

    pub fn remove(&self, path: &str) -> Option<NodeHandle> {
        self.nodes.write().remove(path)
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    /// Record the nodes named by one directory listing.
    ///
    /// A cached node of the same kind keeps its content and pending buffer
    /// and takes the listed size, unless it holds unflushed writes. A
    /// missing node, or one of a different kind, is replaced. Cached
    /// children absent from the listing are left alone.
    pub async fn apply_listing(&self, dir: &str, entries: &[ContentEntry]) {
        for entry in entries {
            let path = child_path(dir, &entry.name);
            let kind = if entry.kind.is_dir() {
                NodeKind::Directory
            } else {
                NodeKind::File
            };

            if let Some(handle) = self.get(&path) {
                let mut node = handle.lock().await;
                if node.kind == kind {
                    if !node.dirty {
                        node.size = entry.size;
                    }
                    node.remote = true;
                    continue;
                }
            }

            self.put(Node::discovered(path, kind, entry.size));
        }
    }
}

/// Absolute path of `name` inside directory `dir`
pub fn child_path(dir: &str, name: &str) -> String {
    if dir == "/" || dir.is_empty() {
        format!("/{}", name)
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}
