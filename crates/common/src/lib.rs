/**
 * Offset-addressable in-memory write buffer
 *  that accumulates a file's new content
 *  until it is flushed.
 */
pub mod buffer;
/**
 * Path-keyed cache of locally known files
 *  and directories.
 */
pub mod cache;
/**
 * The filesystem operation contract and the
 *  adapter implementing it over a remote
 *  content store.
 */
pub mod fs;
/**
 * Remote repository access: the content store
 *  contract and a GitHub contents API client.
 */
pub mod repo;
#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub mod prelude {
    pub use crate::buffer::{BufferError, WriteBuffer};
    pub use crate::cache::{Node, NodeCache, NodeKind};
    pub use crate::fs::{FilesystemOps, FsError, FsStats, GitFs, GitFsConfig, NodeAttr};
    pub use crate::repo::{ContentStore, GithubClient, GithubConfig, RepoError};
}
