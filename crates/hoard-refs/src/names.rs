//! Branch and tag name validation.
//!
//! Ref names double as file names under `refs/` and as the first component
//! of save paths (`<branch>/<save>`), so they are single path components.
//! A valid name:
//! - is non-empty
//! - contains no `/`, whitespace, control characters, `~`, `^`, `:`, `?`,
//!   `*`, `[` or `\`
//! - contains no `..` and no `@{`
//! - does not start with `.` and does not end with `.` or `.lock`

use crate::error::{RefError, Result};

/// Characters that are forbidden anywhere in a ref name.
const FORBIDDEN_CHARS: &[char] = &['/', '~', '^', ':', '?', '*', '[', '\\'];

fn reject(name: &str, reason: impl Into<String>) -> Result<()> {
    Err(RefError::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    })
}

fn validate(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return reject(name, format!("{kind} name must not be empty"));
    }
    if let Some(ch) = name
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || FORBIDDEN_CHARS.contains(c))
    {
        return reject(name, format!("contains forbidden character: {ch:?}"));
    }
    if name.contains("..") {
        return reject(name, "must not contain '..'");
    }
    if name.contains("@{") {
        return reject(name, "must not contain '@{'");
    }
    if name.starts_with('.') || name.ends_with('.') {
        return reject(name, "must not start or end with '.'");
    }
    if name.ends_with(".lock") {
        return reject(name, "must not end with '.lock'");
    }
    Ok(())
}

/// Validate a branch name.
///
/// # Examples
///
/// ```
/// use hoard_refs::names::validate_branch_name;
///
/// assert!(validate_branch_name("home").is_ok());
/// assert!(validate_branch_name("").is_err());
/// assert!(validate_branch_name("home/2024-01-01-000000").is_err());
/// ```
pub fn validate_branch_name(name: &str) -> Result<()> {
    validate("branch", name)
}

/// Validate a tag name. Same rules as branch names.
pub fn validate_tag_name(name: &str) -> Result<()> {
    validate("tag", name)
}
