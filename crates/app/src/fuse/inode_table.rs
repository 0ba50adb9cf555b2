//! Inode to path mapping for the FUSE filesystem
//!
//! FUSE identifies files by inode (u64), the adapter by absolute path.
//! Inodes are handed out on first sight of a path and stay stable for the
//! life of the mount, unless the path is unlinked.

use std::collections::HashMap;

/// Bidirectional mapping between inodes and paths
#[derive(Debug)]
pub struct InodeTable {
    path_to_inode: HashMap<String, u64>,
    inode_to_path: HashMap<u64, String>,
    next_inode: u64,
}

impl InodeTable {
    pub const ROOT_INODE: u64 = 1;

    /// Create a new inode table with the root directory at inode 1
    pub fn new() -> Self {
        let mut table = Self {
            path_to_inode: HashMap::new(),
            inode_to_path: HashMap::new(),
            next_inode: Self::ROOT_INODE + 1,
        };

        table.path_to_inode.insert("/".to_string(), Self::ROOT_INODE);
        table.inode_to_path.insert(Self::ROOT_INODE, "/".to_string());

        table
    }

    /// Get inode for a path, creating one if it doesn't exist
    pub fn get_or_create(&mut self, path: &str) -> u64 {
        if let Some(&ino) = self.path_to_inode.get(path) {
            return ino;
        }

        let ino = self.next_inode;
        self.next_inode += 1;
        self.path_to_inode.insert(path.to_string(), ino);
        self.inode_to_path.insert(ino, path.to_string());
        ino
    }

    pub fn get_inode(&self, path: &str) -> Option<u64> {
        self.path_to_inode.get(path).copied()
    }

    pub fn get_path(&self, inode: u64) -> Option<&str> {
        self.inode_to_path.get(&inode).map(String::as_str)
    }

    /// Forget a deleted path. The root is never removed.
    pub fn remove_by_path(&mut self, path: &str) -> Option<u64> {
        if path == "/" {
            return None;
        }
        let ino = self.path_to_inode.remove(path)?;
        self.inode_to_path.remove(&ino);
        Some(ino)
    }

    /// Parent directory of an absolute path
    pub fn parent_path(path: &str) -> String {
        match path.trim_end_matches('/').rfind('/') {
            Some(0) | None => "/".to_string(),
            Some(i) => path[..i].to_string(),
        }
    }

    /// Absolute path of `name` inside `parent`
    pub fn join(parent: &str, name: &str) -> String {
        if parent == "/" {
            format!("/{}", name)
        } else {
            format!("{}/{}", parent, name)
        }
    }
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}
