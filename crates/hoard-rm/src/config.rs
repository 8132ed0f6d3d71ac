use std::path::Path;

use hoard_repo::{load_section, ConfigError};
use serde::{Deserialize, Serialize};

/// Settings for one removal batch, read from the `[rm]` table of
/// `<repo>/config.toml`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RmConfig {
    /// zstd level for rewritten saves.
    pub compression: i32,
    pub verbosity: u8,
    #[serde(skip)]
    pub acknowledge_unsafe: bool,
}

impl Default for RmConfig {
    fn default() -> Self {
        Self {
            compression: 6,
            verbosity: 0,
            acknowledge_unsafe: false,
        }
    }
}

impl RmConfig {
    pub fn load(repo_dir: &Path) -> Result<Self, ConfigError> {
        load_section(repo_dir, "rm")
    }

    /// Reject a batch that must not start.
    pub fn validate(&self, names: &[Vec<u8>]) -> Result<(), ConfigError> {
        if !self.acknowledge_unsafe {
            return Err(ConfigError::NotAcknowledged);
        }
        if !(0..=9).contains(&self.compression) {
            return Err(ConfigError::Invalid {
                field: "compression",
                reason: format!("{} is not a level in 0..=9", self.compression),
            });
        }
        if names.is_empty() {
            return Err(ConfigError::NoNames);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoard_repo::parse_section;

    #[test]
    fn defaults() {
        let config = RmConfig::default();
        assert_eq!(config.compression, 6);
        assert!(!config.acknowledge_unsafe);
    }

    #[test]
    fn validate_checks_acknowledgement_then_names() {
        let names = vec![b"home".to_vec()];
        let mut config = RmConfig::default();
        assert!(matches!(config.validate(&names), Err(ConfigError::NotAcknowledged)));

        config.acknowledge_unsafe = true;
        config.validate(&names).unwrap();
        assert!(matches!(config.validate(&[]), Err(ConfigError::NoNames)));

        config.compression = -1;
        assert!(matches!(
            config.validate(&names),
            Err(ConfigError::Invalid { field: "compression", .. })
        ));
    }

    #[test]
    fn parse_rm_table() {
        let config: RmConfig = parse_section("[gc]\ncompression = 1\n[rm]\ncompression = 9\n", "rm").unwrap();
        assert_eq!(config.compression, 9);
    }
}
