//! Parsing of the names `rm` accepts.
//!
//! ```text
//! <branch>            the branch and all of its saves
//! <branch>/<save>     one save; `latest` is the tip
//! .tag/<tag>          a tag
//! ```
//!
//! A leading `/` is ignored.

use std::fmt;

use hoard_refs::{validate_branch_name, validate_tag_name};

use crate::error::RemovalError;

/// Directory-like prefix under which tags are addressed.
pub const TAG_DIR: &str = ".tag";

/// Save name that always means a branch's newest save.
pub const LATEST: &str = "latest";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SaveSelector {
    Latest,
    Named(String),
}

impl fmt::Display for SaveSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveSelector::Latest => f.write_str(LATEST),
            SaveSelector::Named(name) => f.write_str(name),
        }
    }
}

/// What one name asks to remove.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    Branch(String),
    Tag(String),
    Save { branch: String, save: SaveSelector },
}

impl Target {
    /// The branch this target lives on, if any.
    pub fn branch(&self) -> Option<&str> {
        match self {
            Target::Branch(branch) | Target::Save { branch, .. } => Some(branch),
            Target::Tag(_) => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Branch(branch) => f.write_str(branch),
            Target::Tag(tag) => write!(f, "{TAG_DIR}/{tag}"),
            Target::Save { branch, save } => write!(f, "{branch}/{save}"),
        }
    }
}

/// Parse one raw name.
pub fn parse_name(raw: &[u8]) -> Result<Target, RemovalError> {
    let invalid = |reason: &str| RemovalError::InvalidName {
        name: String::from_utf8_lossy(raw).into_owned(),
        reason: reason.into(),
    };
    let text = std::str::from_utf8(raw).map_err(|_| invalid("not valid UTF-8"))?;
    let text = text.strip_prefix('/').unwrap_or(text);

    let parts: Vec<&str> = text.split('/').collect();
    let target = match parts.as_slice() {
        [TAG_DIR, tag] => {
            validate_tag_name(tag).map_err(|e| invalid(&e.to_string()))?;
            Target::Tag((*tag).to_string())
        }
        [TAG_DIR] => return Err(invalid("missing tag name")),
        [branch] => {
            validate_branch_name(branch).map_err(|e| invalid(&e.to_string()))?;
            Target::Branch((*branch).to_string())
        }
        [branch, save] => {
            validate_branch_name(branch).map_err(|e| invalid(&e.to_string()))?;
            let save = match *save {
                "" => return Err(invalid("missing save name")),
                LATEST => SaveSelector::Latest,
                other => SaveSelector::Named(other.to_string()),
            };
            Target::Save {
                branch: (*branch).to_string(),
                save,
            }
        }
        _ => return Err(invalid("expected <branch>, <branch>/<save> or .tag/<tag>")),
    };
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn save(branch: &str, save: &str) -> Target {
        Target::Save {
            branch: branch.into(),
            save: SaveSelector::Named(save.into()),
        }
    }

    #[test]
    fn accepted_forms() {
        assert_eq!(parse_name(b"home").unwrap(), Target::Branch("home".into()));
        assert_eq!(parse_name(b"/home").unwrap(), Target::Branch("home".into()));
        assert_eq!(parse_name(b".tag/v1").unwrap(), Target::Tag("v1".into()));
        assert_eq!(parse_name(b"/.tag/v1").unwrap(), Target::Tag("v1".into()));
        assert_eq!(
            parse_name(b"home/2023-11-14-221320").unwrap(),
            save("home", "2023-11-14-221320")
        );
        assert_eq!(
            parse_name(b"home/latest").unwrap(),
            Target::Save {
                branch: "home".into(),
                save: SaveSelector::Latest
            }
        );
    }

    #[test]
    fn display_round_trips() {
        for raw in ["home", ".tag/v1", "home/latest", "home/2023-11-14-221320"] {
            assert_eq!(parse_name(raw.as_bytes()).unwrap().to_string(), raw);
        }
    }

    #[test]
    fn rejected_forms() {
        let bad: [&[u8]; 8] = [
            b"",
            b"/",
            b".tag",
            b".tag/",
            b"home/",
            b"a/b/c",
            b"bad~name",
            &[0x68, 0xFF],
        ];
        for raw in bad {
            assert!(
                matches!(parse_name(raw), Err(RemovalError::InvalidName { .. })),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn invalid_utf8_is_reported_lossily() {
        let err = parse_name(&[0x68, 0xFF]).unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }
}
