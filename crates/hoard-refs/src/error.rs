//! Error types for reference operations.

use hoard_types::ObjectId;
use thiserror::Error;

/// Errors that can occur during reference operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// The reference was not found.
    #[error("ref not found: {name}")]
    NotFound { name: String },

    /// The branch or tag name is invalid.
    #[error("invalid ref name: {name}: {reason}")]
    InvalidName { name: String, reason: String },

    /// A tag is immutable and cannot be overwritten.
    #[error("tag is immutable: {name}")]
    TagImmutable { name: String },

    /// A compare-and-swap update found a different value than expected.
    #[error("ref {name} changed concurrently: expected {}, found {}", show(.expected), show(.actual))]
    Conflict {
        name: String,
        expected: Option<ObjectId>,
        actual: Option<ObjectId>,
    },

    /// A ref file exists but does not hold a valid object id.
    #[error("corrupt ref {name}: {reason}")]
    Corrupt { name: String, reason: String },

    /// An in-memory store lock was poisoned by a panicking writer.
    #[error("ref store lock poisoned")]
    Poisoned,

    /// I/O error during file-based ref operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn show(id: &Option<ObjectId>) -> String {
    id.map_or_else(|| "nothing".to_string(), |id| id.short_hex())
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
