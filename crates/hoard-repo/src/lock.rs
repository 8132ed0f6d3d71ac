//! Advisory repository lock.
//!
//! Collection and reference removal take the lock exclusively for their
//! whole run. The lock is a `flock` on `<repo>/lock`, released when the
//! [`StoreLock`] is dropped or the process exits.

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use nix::fcntl::{flock, FlockArg};

use crate::error::{RepoError, RepoResult};

/// Name of the lock file inside a repository.
pub const LOCK_FILE: &str = "lock";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockKind {
    Shared,
    Exclusive,
}

/// A held repository lock.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
    kind: LockKind,
    _file: File,
}

impl StoreLock {
    /// Take the lock without waiting.
    ///
    /// Fails with [`RepoError::LockUnavailable`] if a conflicting lock is
    /// held, by this or any other process.
    pub fn acquire(repo_dir: &Path, kind: LockKind) -> RepoResult<Self> {
        let path = repo_dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)?;

        let arg = match kind {
            LockKind::Shared => FlockArg::LockSharedNonblock,
            LockKind::Exclusive => FlockArg::LockExclusiveNonblock,
        };
        match flock(file.as_raw_fd(), arg) {
            Ok(()) => {}
            Err(nix::errno::Errno::EWOULDBLOCK) => return Err(RepoError::LockUnavailable(path)),
            Err(errno) => return Err(RepoError::Lock { path, errno }),
        }

        tracing::debug!(path = %path.display(), ?kind, "repository locked");
        Ok(Self {
            path,
            kind,
            _file: file,
        })
    }

    pub fn kind(&self) -> LockKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
