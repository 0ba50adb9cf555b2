//! Filesystem operation contract and its implementation
//!
//! [`FilesystemOps`] enumerates every callback a filesystem driver
//! framework invokes, addressed by absolute path. [`GitFs`] implements it
//! on top of a [`ContentStore`](crate::repo::ContentStore): metadata comes
//! from the [`NodeCache`](crate::cache::NodeCache), content is fetched
//! whole on first read, and writes are buffered in memory until
//! [`FilesystemOps::release`] flushes them as one remote write.
//!
//! Paths reaching these operations have already been validated by the
//! driver framework.

mod adapter;
mod error;

use async_trait::async_trait;

use crate::cache::{Node, NodeKind};

pub use adapter::{GitFs, GitFsConfig, DEFAULT_MAX_FILE_BYTES};
pub use error::FsError;

/// Attributes reported for one path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeAttr {
    pub kind: NodeKind,
    pub size: u64,
}

impl NodeAttr {
    pub fn directory() -> Self {
        Self {
            kind: NodeKind::Directory,
            size: 0,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

impl From<&Node> for NodeAttr {
    fn from(node: &Node) -> Self {
        Self {
            kind: node.kind(),
            size: node.size,
        }
    }
}

/// Volume figures reported by `statfs`. They are fixed and not derived
/// from the remote repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsStats {
    pub block_size: u32,
    pub fragment_size: u32,
    pub blocks: u64,
    pub blocks_free: u64,
    pub blocks_available: u64,
    pub files: u64,
    pub files_free: u64,
    pub files_available: u64,
    pub name_max: u32,
}

impl Default for FsStats {
    fn default() -> Self {
        const FRAGMENT: u64 = 4096;
        Self {
            block_size: 4096,
            fragment_size: FRAGMENT as u32,
            blocks: (8u64 << 50) / FRAGMENT * 1024 - 1,
            blocks_free: (1u64 << 50) / FRAGMENT * 1024,
            blocks_available: (2u64 << 50) / FRAGMENT * 1024,
            files: 2_240_224,
            files_free: 1_927_486,
            files_available: 9_900_000,
            name_max: 255,
        }
    }
}

#[async_trait]
pub trait FilesystemOps: Send + Sync {
    /// Create an empty file, replacing any cached entry at `path`
    async fn create(&self, path: &str) -> Result<(), FsError>;

    /// Write `data` at `offset` into the file's pending buffer
    async fn write(&self, path: &str, data: &[u8], offset: i64) -> Result<usize, FsError>;

    async fn open(&self, path: &str, flags: i32) -> Result<(), FsError>;

    /// Read up to `buf.len()` bytes at `offset`; `0` at or past the end
    async fn read(&self, path: &str, buf: &mut [u8], offset: i64) -> Result<usize, FsError>;

    async fn mkdir(&self, path: &str) -> Result<(), FsError>;

    async fn unlink(&self, path: &str) -> Result<(), FsError>;

    async fn rmdir(&self, path: &str) -> Result<(), FsError>;

    async fn opendir(&self, path: &str) -> Result<(), FsError>;

    /// Emit `.`, `..` and every entry of the remote directory
    async fn readdir(
        &self,
        path: &str,
        filler: &mut (dyn for<'n> FnMut(&'n str) + Send),
    ) -> Result<(), FsError>;

    /// Attributes from the cache only
    async fn getattr(&self, path: &str) -> Result<NodeAttr, FsError>;

    /// Flush pending writes; the only point a write becomes durable
    async fn release(&self, path: &str) -> Result<(), FsError>;

    async fn statfs(&self, path: &str) -> Result<FsStats, FsError>;

    /// Attributes from the cache, falling back to a remote stat
    async fn lookup(&self, path: &str) -> Result<NodeAttr, FsError>;

    async fn truncate(&self, path: &str, size: u64) -> Result<(), FsError>;
}
