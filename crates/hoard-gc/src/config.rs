use std::path::Path;

use hoard_repo::{load_section, ConfigError};
use serde::{Deserialize, Serialize};

use crate::filter::DEFAULT_FALSE_POSITIVE_RATE;

/// Minimum share of garbage, in percent, that makes a pack worth
/// rewriting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Threshold(u8);

impl Threshold {
    pub const DEFAULT: Threshold = Threshold(10);

    /// Accepts integers in `0..=100`.
    pub fn new(percent: i64) -> Result<Self, ConfigError> {
        match u8::try_from(percent) {
            Ok(p) if p <= 100 => Ok(Self(p)),
            _ => Err(ConfigError::Invalid {
                field: "threshold",
                reason: format!("{percent} is not an integer percentage in 0..=100"),
            }),
        }
    }

    pub fn percent(self) -> u8 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for Threshold {
    type Error = ConfigError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Threshold> for i64 {
    fn from(t: Threshold) -> Self {
        i64::from(t.0)
    }
}

/// What to do when the walk finds references to missing objects.
///
/// Reachable objects that exist but cannot be read from any pack always
/// abort the cycle: their children are unknown, so nothing can be
/// proven unreachable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum DanglingPolicy {
    /// Stop before rewriting anything if more than `tolerance` anomalies
    /// were found.
    Abort {
        #[serde(default)]
        tolerance: usize,
    },
    /// Collect anyway, leaving every pack that holds an object with a
    /// broken reference untouched.
    SkipAffected,
}

impl Default for DanglingPolicy {
    fn default() -> Self {
        DanglingPolicy::Abort { tolerance: 0 }
    }
}

/// Settings for one collection run.
///
/// Read from the `[gc]` table of `<repo>/config.toml`; command-line flags
/// override file values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcConfig {
    pub threshold: Threshold,
    /// zstd level for rewritten packs; 0 selects zstd's default.
    pub compression: i32,
    pub verbosity: u8,
    /// Collection deletes data; the caller must opt in on every run.
    #[serde(skip)]
    pub acknowledge_unsafe: bool,
    pub false_positive_rate: f64,
    pub dangling: DanglingPolicy,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            threshold: Threshold::DEFAULT,
            compression: 1,
            verbosity: 0,
            acknowledge_unsafe: false,
            false_positive_rate: DEFAULT_FALSE_POSITIVE_RATE,
            dangling: DanglingPolicy::default(),
        }
    }
}

impl GcConfig {
    /// Defaults overlaid with the repository's `[gc]` table.
    pub fn load(repo_dir: &Path) -> Result<Self, ConfigError> {
        load_section(repo_dir, "gc")
    }

    /// Reject settings a run must not start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.acknowledge_unsafe {
            return Err(ConfigError::NotAcknowledged);
        }
        if !(0..=9).contains(&self.compression) {
            return Err(ConfigError::Invalid {
                field: "compression",
                reason: format!("{} is not a level in 0..=9", self.compression),
            });
        }
        if !(self.false_positive_rate > 0.0 && self.false_positive_rate < 1.0) {
            return Err(ConfigError::Invalid {
                field: "false_positive_rate",
                reason: format!("{} is not in (0, 1)", self.false_positive_rate),
            });
        }
        Ok(())
    }
}
