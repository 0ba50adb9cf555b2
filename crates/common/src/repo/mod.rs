//! Remote repository access
//!
//! [`ContentStore`] is the contract the filesystem adapter needs from a
//! remote repository: list a directory, fetch a whole object, stat an
//! object, create-or-update and remove. [`GithubClient`] implements it
//! against the GitHub REST "contents" API.
//!
//! Objects are addressed by absolute, `/`-separated paths relative to the
//! repository root (`/`, `/src`, `/src/main.rs`).

mod client;
mod error;
mod types;

use async_trait::async_trait;
use bytes::Bytes;

pub use client::{GithubClient, GithubConfig, DEFAULT_API_URL, DEFAULT_COMMIT_MESSAGE};
pub use error::RepoError;
pub use types::{
    ContentEntry, DeleteRequest, DirectoryListing, EntryKind, EntryLinks, RemoteFileMetadata,
    UploadRequest,
};

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// List the entries of one remote directory
    async fn list_directory(&self, path: &str) -> Result<DirectoryListing, RepoError>;

    /// Fetch the entire object at `path`
    async fn open_content(&self, path: &str) -> Result<Bytes, RepoError>;

    /// Fetch metadata, including the current version token
    async fn stat(&self, path: &str) -> Result<RemoteFileMetadata, RepoError>;

    /// Write `content` as the new whole object at `path`, creating it if
    /// the remote store does not know it yet
    async fn create_or_update(&self, path: &str, content: &[u8]) -> Result<(), RepoError>;

    /// Delete the object at `path`
    async fn remove(&self, path: &str) -> Result<(), RepoError>;
}
