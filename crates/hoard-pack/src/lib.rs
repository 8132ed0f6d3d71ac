//! Pack files for hoard repositories.
//!
//! A pack bundles many zstd-compressed objects into one immutable,
//! checksummed file. Packs are only ever created whole and deleted whole;
//! the garbage collector reclaims space by writing a successor pack and
//! retiring the original.
//!
//! # Architecture
//!
//! - **Pack file** (`.pack`): header, compressed entries, BLAKE3 trailer
//! - **Pack index** (`.idx`): fan-out table + sorted IDs for O(log n) lookups
//! - **PackWriter**: builds packs and commits them durably
//! - **PackReader**: random-access and sequential reading through the index
//! - **PackManager**: the set of packs visible in a directory
//! - **retire**: atomic pack removal and crash recovery

pub mod entry;
pub mod error;
pub mod index;
pub mod manager;
pub mod reader;
pub mod retire;
pub mod writer;

pub use entry::PackObjectInfo;
pub use error::{PackError, PackResult};
pub use index::PackIndex;
pub use manager::{PackAnomaly, PackManager};
pub use reader::{PackDescriptor, PackReader};
pub use retire::{cleanup, retire, CleanupReport, GC_TEMP_PREFIX, RETIRED_PREFIX};
pub use writer::{pack_name, PackFile, PackWriter, DEFAULT_COMPRESSION, WRITER_TEMP_PREFIX};
