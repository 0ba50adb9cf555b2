//! In-memory [`ContentStore`] for exercising the filesystem adapter
//! without a network.
//!
//! Every call is recorded so tests can assert how many remote round trips
//! an operation made. Setting the store to failing makes every subsequent
//! call return a server error.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::StatusCode;

use crate::repo::{
    ContentEntry, ContentStore, DirectoryListing, EntryKind, RemoteFileMetadata, RepoError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    ListDirectory(String),
    OpenContent(String),
    Stat(String),
    CreateOrUpdate(String, Vec<u8>),
    Remove(String),
}

#[derive(Debug, Default)]
struct Inner {
    /// Keyed by absolute path; value is content and version token
    files: BTreeMap<String, (Bytes, String)>,
    calls: Vec<StoreCall>,
    failing: bool,
    revision: u64,
}

impl Inner {
    fn next_sha(&mut self) -> String {
        self.revision += 1;
        format!("{:040x}", self.revision)
    }

    fn is_dir(&self, path: &str) -> bool {
        let prefix = dir_prefix(path);
        self.files.keys().any(|p| p.starts_with(&prefix))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with files, bypassing call recording
    pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a [u8])>) -> Self {
        let store = Self::new();
        for (path, content) in files {
            store.insert(path, content);
        }
        store
    }

    pub fn insert(&self, path: &str, content: &[u8]) {
        let mut inner = self.inner.lock();
        let sha = inner.next_sha();
        inner
            .files
            .insert(path.to_string(), (Bytes::copy_from_slice(content), sha));
    }

    /// Current content of the file at `path`
    pub fn file(&self, path: &str) -> Option<Bytes> {
        self.inner.lock().files.get(path).map(|(c, _)| c.clone())
    }

    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().failing = failing;
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.inner.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    pub fn count(&self, matches: impl Fn(&StoreCall) -> bool) -> usize {
        self.inner.lock().calls.iter().filter(|c| matches(c)).count()
    }

    fn record(&self, call: StoreCall) -> Result<parking_lot::MutexGuard<'_, Inner>, RepoError> {
        let mut inner = self.inner.lock();
        inner.calls.push(call);
        if inner.failing {
            return Err(RepoError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "injected failure".to_string(),
            });
        }
        Ok(inner)
    }
}

fn not_found(path: &str) -> RepoError {
    RepoError::Status {
        status: StatusCode::NOT_FOUND,
        body: format!("{} not found", path),
    }
}

fn dir_prefix(path: &str) -> String {
    if path == "/" {
        "/".to_string()
    } else {
        format!("{}/", path.trim_end_matches('/'))
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn list_directory(&self, path: &str) -> Result<DirectoryListing, RepoError> {
        let inner = self.record(StoreCall::ListDirectory(path.to_string()))?;
        if path != "/" && !inner.is_dir(path) {
            return Err(not_found(path));
        }

        let prefix = dir_prefix(path);
        let mut children: BTreeMap<String, ContentEntry> = BTreeMap::new();
        for (file, (content, sha)) in inner.files.iter() {
            let Some(rest) = file.strip_prefix(&prefix) else {
                continue;
            };
            let entry = match rest.split_once('/') {
                Some((dir, _)) => ContentEntry {
                    name: dir.to_string(),
                    path: format!("{}{}", prefix, dir).trim_start_matches('/').to_string(),
                    sha: String::new(),
                    size: 0,
                    url: None,
                    html_url: None,
                    git_url: None,
                    download_url: None,
                    kind: EntryKind::Dir,
                    links: Default::default(),
                },
                None => ContentEntry {
                    name: rest.to_string(),
                    path: file.trim_start_matches('/').to_string(),
                    sha: sha.clone(),
                    size: content.len() as u64,
                    url: None,
                    html_url: None,
                    git_url: None,
                    download_url: None,
                    kind: EntryKind::File,
                    links: Default::default(),
                },
            };
            children.entry(entry.name.clone()).or_insert(entry);
        }

        Ok(children.into_values().collect())
    }

    async fn open_content(&self, path: &str) -> Result<Bytes, RepoError> {
        let inner = self.record(StoreCall::OpenContent(path.to_string()))?;
        inner
            .files
            .get(path)
            .map(|(content, _)| content.clone())
            .ok_or_else(|| not_found(path))
    }

    async fn stat(&self, path: &str) -> Result<RemoteFileMetadata, RepoError> {
        let inner = self.record(StoreCall::Stat(path.to_string()))?;
        if let Some((content, sha)) = inner.files.get(path) {
            return Ok(RemoteFileMetadata {
                name: path.rsplit('/').next().unwrap_or_default().to_string(),
                path: path.trim_start_matches('/').to_string(),
                sha: sha.clone(),
                size: content.len() as u64,
                kind: EntryKind::File,
                content: None,
                encoding: None,
            });
        }
        if inner.is_dir(path) {
            return Ok(RemoteFileMetadata::directory(path));
        }
        Err(not_found(path))
    }

    async fn create_or_update(&self, path: &str, content: &[u8]) -> Result<(), RepoError> {
        let mut inner = self.record(StoreCall::CreateOrUpdate(
            path.to_string(),
            content.to_vec(),
        ))?;
        let sha = inner.next_sha();
        inner
            .files
            .insert(path.to_string(), (Bytes::copy_from_slice(content), sha));
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), RepoError> {
        let mut inner = self.record(StoreCall::Remove(path.to_string()))?;
        inner
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }
}
