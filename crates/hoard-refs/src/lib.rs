//! Named references for hoard repositories.
//!
//! References are the roots of the object graph. A branch names the newest
//! save of a backup set; its older saves are reached through snapshot
//! parents. A tag pins one object and never moves.
//!
//! # Modules
//!
//! - [`error`] -- Error types for ref operations
//! - [`types`] -- The [`Ref`] type and canonical naming
//! - [`traits`] -- The [`RefStore`] trait defining the storage interface
//! - [`names`] -- Branch/tag name validation
//! - [`memory`] -- In-memory [`InMemoryRefStore`] for tests
//! - [`fs`] -- [`FsRefStore`] over a repository's `refs/` directory

pub mod error;
pub mod fs;
pub mod memory;
pub mod names;
pub mod traits;
pub mod types;

pub use error::{RefError, Result};
pub use fs::FsRefStore;
pub use memory::InMemoryRefStore;
pub use names::{validate_branch_name, validate_tag_name};
pub use traits::RefStore;
pub use types::{branch_ref_name, tag_ref_name, Ref, BRANCH_PREFIX, TAG_PREFIX};
