//! Content-addressed object model for hoard.
//!
//! Every piece of data in a hoard repository (file chunks, directory
//! listings, saves, annotated tags) is an immutable object identified by
//! the BLAKE3 hash of its kind, length and payload.
//!
//! # Object Types
//!
//! - [`Blob`] -- raw content
//! - [`Tree`] -- directory listing mapping names to object references
//! - [`Snapshot`] -- one save of a branch, linked to the previous save
//! - [`TagObject`] -- annotated tag pointing at another object
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait. The pack-backed store
//! lives in `hoard-pack`; [`InMemoryObjectStore`] serves tests.
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Objects are never deleted in place; a repack omits them.
//! 3. Concurrent reads are always safe.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectStore;
pub use object::{
    Blob, EntryMode, Object, ObjectKind, Snapshot, StoredObject, TagObject, Tree, TreeEntry,
};
pub use traits::ObjectStore;
