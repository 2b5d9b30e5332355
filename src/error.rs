//! Typed error model for the filesystem dispatcher (§7 of the spec).
//!
//! Every fallible path in the crate ends up as an [`FsError`], which knows
//! how to turn itself into the `libc` errno the kernel expects.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("key not found")]
    NotFound,

    #[error("object store transport error: {0}")]
    Transport(String),

    #[error("local cache I/O error: {0}")]
    LocalIo(#[from] std::io::Error),

    #[error("bad request: {0}")]
    BadRequest(&'static str),

    #[error("operation not supported")]
    Unsupported,
}

impl FsError {
    /// Maps this error to the `libc` errno returned to the kernel (§6, §7).
    pub fn to_errno(&self) -> i32 {
        match self {
            FsError::NotFound => libc::ENOENT,
            FsError::Transport(_) => libc::EIO,
            FsError::LocalIo(_) => libc::EIO,
            FsError::BadRequest(_) => libc::EINVAL,
            FsError::Unsupported => libc::EOPNOTSUPP,
        }
    }
}

pub type FsResult<T> = Result<T, FsError>;
