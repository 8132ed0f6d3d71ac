//! Local hoard repositories.
//!
//! Ties the pack set and the ref store of one directory together and
//! provides what the maintenance commands share: the repository lock, the
//! config file, the [`RepoHandle`] abstraction and the [`ErrorTally`].

pub mod config;
pub mod error;
pub mod handle;
pub mod lock;
pub mod repo;
pub mod tally;

pub use config::{load_section, parse_section, ConfigError, CONFIG_FILE};
pub use error::{RepoError, RepoResult};
pub use handle::{MemoryRepo, RepoHandle};
pub use lock::{LockKind, StoreLock, LOCK_FILE};
pub use repo::{LocalRepo, PACK_DIR};
pub use tally::ErrorTally;
