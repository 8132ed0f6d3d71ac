use hoard_pack::PackError;
use hoard_repo::{ConfigError, RepoError};
use hoard_store::StoreError;
use thiserror::Error;

/// Conditions that stop a collection cycle before it mutates the store.
///
/// Failures confined to one pack are not errors at this level; they are
/// tallied in the report and the cycle moves on.
#[derive(Debug, Error)]
pub enum GcError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Pack(#[from] PackError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{count} dangling references found (tolerance {tolerance}); refusing to collect")]
    DanglingReferences { count: usize, tolerance: usize },

    #[error("{count} reachable objects could not be read from any pack; refusing to collect")]
    CorruptObjects { count: usize },

    #[error("references changed while collecting; rerun to pick up the new roots")]
    RootsChanged,

    #[error("cannot {action} while the cycle is {state:?}")]
    OutOfOrder {
        action: &'static str,
        state: crate::cycle::CycleState,
    },
}

pub type GcResult<T> = Result<T, GcError>;
