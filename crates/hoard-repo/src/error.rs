use std::path::PathBuf;

use hoard_pack::PackError;
use hoard_refs::RefError;
use hoard_store::StoreError;
use thiserror::Error;

/// Errors from opening, locking and writing to a repository.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("not a hoard repository: {}", .0.display())]
    NotARepository(PathBuf),

    #[error("repository already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// Another process holds the repository lock.
    #[error("repository is locked by another process: {}", .0.display())]
    LockUnavailable(PathBuf),

    #[error("failed to lock {}: {errno}", .path.display())]
    Lock { path: PathBuf, errno: nix::errno::Errno },

    #[error(transparent)]
    Pack(#[from] PackError),

    #[error(transparent)]
    Refs(#[from] RefError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;
