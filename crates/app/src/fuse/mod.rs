//! FUSE mount for a repository branch
//!
//! [`GitFuse`] drives any [`FilesystemOps`](common::fs::FilesystemOps)
//! implementation from the kernel's inode-addressed callbacks.

pub mod gitfs_fuse;
pub mod inode_table;

pub use gitfs_fuse::GitFuse;
pub use inode_table::InodeTable;
