//! Garbage collection for hoard repositories.
//!
//! A cycle walks every object reachable from the branches and tags, loads
//! the result into a Bloom filter, estimates how much of each pack is dead,
//! and rewrites the packs whose dead share reaches the configured threshold.
//! Old packs are retired only after their successors are durable, so a
//! crash at any point loses nothing reachable.
//!
//! Entry point: [`run_gc`].

pub mod config;
pub mod cycle;
pub mod error;
pub mod filter;
pub mod plan;
pub mod repack;
pub mod walk;

pub use config::{DanglingPolicy, GcConfig, Threshold};
pub use cycle::{run_gc, Collector, CycleState, GcReport};
pub use error::{GcError, GcResult};
pub use filter::{BloomFilter, DEFAULT_FALSE_POSITIVE_RATE};
pub use hoard_repo::ConfigError;
pub use plan::{estimate, plan, GarbageEstimate};
pub use repack::{rewrite, RewriteOutcome};
pub use walk::{walk, Anomaly, Reachable};
