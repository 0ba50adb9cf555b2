use crate::buffer::BufferError;
use crate::repo::RepoError;

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("no such file or directory: {0}")]
    NotFound(String),
    #[error("is a directory: {0}")]
    IsDirectory(String),
    #[error("invalid offset {offset} for {path}")]
    InvalidOffset { path: String, offset: i64 },
    #[error("write to {path} rejected: {source}")]
    Buffer {
        path: String,
        #[source]
        source: BufferError,
    },
    #[error("remote repository error: {0}")]
    Remote(#[from] RepoError),
}

impl FsError {
    /// Positive errno for the driver framework; callers negate it where
    /// the framework expects negative codes.
    pub fn errno(&self) -> libc::c_int {
        match self {
            FsError::NotFound(_) => libc::ENOENT,
            FsError::IsDirectory(_) => libc::EISDIR,
            FsError::InvalidOffset { .. } => libc::EINVAL,
            FsError::Buffer {
                source: BufferError::NegativeOffset(_),
                ..
            } => libc::EINVAL,
            FsError::Buffer {
                source: BufferError::CapacityExceeded { .. },
                ..
            } => libc::EFBIG,
            FsError::Remote(e) if e.is_not_found() => libc::ENOENT,
            FsError::Remote(e) if e.is_conflict() => libc::EBUSY,
            FsError::Remote(_) => libc::EIO,
        }
    }
}
