//! The optional `<repo>/config.toml` file.
//!
//! Each command reads its own table (`[gc]`, `[rm]`); missing files,
//! missing tables and missing keys fall back to the command's defaults.

use std::path::Path;

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Name of the configuration file inside a repository.
pub const CONFIG_FILE: &str = "config.toml";

/// Problems with configuration, detected before the store is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// A destructive command was run without `--unsafe`.
    #[error("this command deletes data; pass --unsafe to acknowledge")]
    NotAcknowledged,

    #[error("no names given")]
    NoNames,
}

/// Read table `section` of the repository's config file into `T`.
pub fn load_section<T>(repo_dir: &Path, section: &str) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    let path = repo_dir.join(CONFIG_FILE);
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(e.into()),
    };
    parse_section(&text, section)
}

/// Parse table `section` out of a config document.
pub fn parse_section<T>(text: &str, section: &str) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    let mut table: toml::Table = toml::from_str(text)?;
    match table.remove(section) {
        Some(value) => Ok(value.try_into()?),
        None => Ok(T::default()),
    }
}
