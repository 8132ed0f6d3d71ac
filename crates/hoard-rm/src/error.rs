use hoard_refs::RefError;
use hoard_repo::{ConfigError, RepoError};
use hoard_store::StoreError;
use thiserror::Error;

/// Conditions that stop a removal batch before any name is processed.
#[derive(Debug, Error)]
pub enum RmError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type RmResult<T> = Result<T, RmError>;

/// Why one name of a batch could not be removed.
#[derive(Debug, Error)]
pub enum RemovalError {
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("{name} not found")]
    NotFound { name: String },

    #[error("history of branch {branch} is malformed: {reason}")]
    MalformedHistory { branch: String, reason: String },

    #[error(transparent)]
    Refs(#[from] RefError),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
