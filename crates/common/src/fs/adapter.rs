use async_trait::async_trait;
use bytes::Bytes;

use crate::buffer::WriteBuffer;
use crate::cache::{Node, NodeCache, NodeHandle, NodeKind};
use crate::repo::ContentStore;

use super::{FilesystemOps, FsError, FsStats, NodeAttr};

/// Default cap on a single file's pending buffer
pub const DEFAULT_MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GitFsConfig {
    /// Upper bound for a file's pending buffer; `0` disables the bound
    pub max_file_bytes: usize,
}

impl Default for GitFsConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

/// Filesystem adapter over a remote [`ContentStore`]
pub struct GitFs<S> {
    store: S,
    nodes: NodeCache,
    config: GitFsConfig,
}

impl<S: ContentStore> GitFs<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, GitFsConfig::default())
    }

    pub fn with_config(store: S, config: GitFsConfig) -> Self {
        Self {
            store,
            nodes: NodeCache::new(),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn nodes(&self) -> &NodeCache {
        &self.nodes
    }

    pub fn config(&self) -> &GitFsConfig {
        &self.config
    }

    fn node(&self, path: &str) -> Result<NodeHandle, FsError> {
        self.nodes
            .get(path)
            .ok_or_else(|| FsError::NotFound(path.to_string()))
    }

    /// Whole remote content of `node`, fetched at most once
    async fn load_content(&self, path: &str, node: &mut Node) -> Result<Bytes, FsError> {
        if let Some(content) = &node.content {
            return Ok(content.clone());
        }

        let content = self.store.open_content(path).await?;
        tracing::debug!(path, bytes = content.len(), "fetched remote content");
        if node.pending.is_none() {
            node.size = content.len() as u64;
        }
        node.content = Some(content.clone());
        Ok(content)
    }

    /// A pending buffer holding the file's current content
    async fn seed_buffer(&self, path: &str, node: &mut Node) -> Result<WriteBuffer, FsError> {
        let seed = if node.remote {
            self.load_content(path, node).await?.to_vec()
        } else {
            Vec::new()
        };
        Ok(WriteBuffer::from_bytes(seed, self.config.max_file_bytes))
    }
}

/// Copy `src[start..]` into `buf`, returning the number of bytes copied
fn copy_at(src: &[u8], start: usize, buf: &mut [u8]) -> usize {
    if start >= src.len() {
        return 0;
    }
    let n = buf.len().min(src.len() - start);
    buf[..n].copy_from_slice(&src[start..start + n]);
    n
}

#[async_trait]
impl<S: ContentStore> FilesystemOps for GitFs<S> {
    async fn create(&self, path: &str) -> Result<(), FsError> {
        tracing::debug!(path, "create");
        self.nodes
            .put(Node::new_file(path, self.config.max_file_bytes));
        Ok(())
    }

    async fn write(&self, path: &str, data: &[u8], offset: i64) -> Result<usize, FsError> {
        let handle = self.node(path)?;
        let mut node = handle.lock().await;
        if node.is_dir() {
            return Err(FsError::IsDirectory(path.to_string()));
        }

        let mut buffer = match node.pending.take() {
            Some(buffer) => buffer,
            None => self.seed_buffer(path, &mut node).await?,
        };
        let result = buffer.write_at(data, offset);
        node.size = buffer.len() as u64;
        node.pending = Some(buffer);

        let written = result.map_err(|source| FsError::Buffer {
            path: path.to_string(),
            source,
        })?;
        node.dirty = true;

        tracing::trace!(path, offset, written, "write");
        Ok(written)
    }

    async fn open(&self, path: &str, flags: i32) -> Result<(), FsError> {
        let handle = self.node(path)?;
        if flags & libc::O_TRUNC == 0 {
            return Ok(());
        }

        let mut node = handle.lock().await;
        if !node.is_dir() {
            tracing::debug!(path, "open with truncation");
            node.pending = Some(WriteBuffer::new(0, self.config.max_file_bytes));
            node.size = 0;
            node.dirty = true;
        }
        Ok(())
    }

    async fn read(&self, path: &str, buf: &mut [u8], offset: i64) -> Result<usize, FsError> {
        let start = usize::try_from(offset).map_err(|_| FsError::InvalidOffset {
            path: path.to_string(),
            offset,
        })?;

        let handle = self.node(path)?;
        let mut node = handle.lock().await;
        if node.is_dir() {
            return Err(FsError::IsDirectory(path.to_string()));
        }

        if let Some(pending) = &node.pending {
            return Ok(copy_at(pending.bytes(), start, buf));
        }

        let content = self.load_content(path, &mut node).await?;
        Ok(copy_at(&content, start, buf))
    }

    async fn mkdir(&self, path: &str) -> Result<(), FsError> {
        // The remote store has no empty directories; this one exists only
        // locally until a file is flushed beneath it
        tracing::debug!(path, "mkdir");
        self.nodes.put(Node::new_dir(path));
        Ok(())
    }

    async fn unlink(&self, path: &str) -> Result<(), FsError> {
        tracing::debug!(path, "unlink");
        let Some(handle) = self.nodes.get(path) else {
            self.store.remove(path).await?;
            return Ok(());
        };

        let node = handle.lock().await;
        if node.is_dir() {
            return Err(FsError::IsDirectory(path.to_string()));
        }
        // Remote absence is only acceptable for a node that was never flushed
        match self.store.remove(path).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() && !node.remote => {
                tracing::debug!(path, "unlinked file was never persisted");
            }
            Err(e) => return Err(e.into()),
        }
        self.nodes.remove(path);
        Ok(())
    }

    async fn rmdir(&self, _path: &str) -> Result<(), FsError> {
        Ok(())
    }

    async fn opendir(&self, _path: &str) -> Result<(), FsError> {
        Ok(())
    }

    async fn readdir(
        &self,
        path: &str,
        filler: &mut (dyn for<'n> FnMut(&'n str) + Send),
    ) -> Result<(), FsError> {
        filler(".");
        filler("..");

        let entries = self.store.list_directory(path).await.map_err(|e| {
            tracing::warn!(path, error = %e, "failed to list remote directory");
            e
        })?;
        self.nodes.apply_listing(path, &entries).await;

        for entry in &entries {
            filler(&entry.name);
        }
        tracing::debug!(path, entries = entries.len(), "readdir");
        Ok(())
    }

    async fn getattr(&self, path: &str) -> Result<NodeAttr, FsError> {
        if path == "/" {
            return Ok(NodeAttr::directory());
        }

        let handle = self.node(path)?;
        let node = handle.lock().await;
        Ok(NodeAttr::from(&*node))
    }

    async fn release(&self, path: &str) -> Result<(), FsError> {
        let Some(handle) = self.nodes.get(path) else {
            return Ok(());
        };
        let mut node = handle.lock().await;

        let result = match node.pending.as_ref() {
            Some(buffer) if node.dirty && (!buffer.is_empty() || node.remote) => {
                tracing::debug!(path, bytes = buffer.len(), "flushing pending writes");
                self.store.create_or_update(path, buffer.bytes()).await
            }
            _ => return Ok(()),
        };

        if let Err(e) = result {
            tracing::warn!(path, error = %e, "flush failed, keeping pending writes");
            return Err(e.into());
        }

        node.dirty = false;
        node.remote = true;
        Ok(())
    }

    async fn statfs(&self, _path: &str) -> Result<FsStats, FsError> {
        Ok(FsStats::default())
    }

    async fn lookup(&self, path: &str) -> Result<NodeAttr, FsError> {
        if path == "/" {
            return Ok(NodeAttr::directory());
        }
        if self.nodes.has(path) {
            return self.getattr(path).await;
        }

        let meta = match self.store.stat(path).await {
            Ok(meta) => meta,
            Err(e) if e.is_not_found() => return Err(FsError::NotFound(path.to_string())),
            Err(e) => return Err(e.into()),
        };

        // A concurrent create may have won the race while stat was in flight
        if let Some(handle) = self.nodes.get(path) {
            return Ok(NodeAttr::from(&*handle.lock().await));
        }

        let kind = if meta.kind.is_dir() {
            NodeKind::Directory
        } else {
            NodeKind::File
        };
        let node = Node::discovered(path, kind, meta.size);
        let attr = NodeAttr::from(&node);
        self.nodes.put(node);
        Ok(attr)
    }

    async fn truncate(&self, path: &str, size: u64) -> Result<(), FsError> {
        let handle = self.node(path)?;
        let mut node = handle.lock().await;
        if node.is_dir() {
            return Err(FsError::IsDirectory(path.to_string()));
        }

        let mut buffer = match node.pending.take() {
            Some(buffer) => buffer,
            None if size == 0 => WriteBuffer::new(0, self.config.max_file_bytes),
            None => self.seed_buffer(path, &mut node).await?,
        };
        let result = buffer.truncate(usize::try_from(size).unwrap_or(usize::MAX));
        node.size = buffer.len() as u64;
        node.pending = Some(buffer);

        result.map_err(|source| FsError::Buffer {
            path: path.to_string(),
            source,
        })?;
        node.dirty = true;
        Ok(())
    }
}
