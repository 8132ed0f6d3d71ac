//! Foundation types for hoard.
//!
//! Every object in a hoard repository is identified by an [`ObjectId`], the
//! BLAKE3 digest of its kind, length and payload. [`ContentHasher`] computes
//! those digests with a per-kind domain tag so that a blob and a tree with
//! identical bytes never collide.

pub mod error;
pub mod hash;
pub mod object;

pub use error::TypeError;
pub use hash::ContentHasher;
pub use object::ObjectId;
