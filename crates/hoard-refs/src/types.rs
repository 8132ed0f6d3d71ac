//! Core reference types.
//!
//! References are the roots of the object graph: every object a branch or
//! tag can reach is live, everything else is garbage.

use hoard_types::ObjectId;

use crate::error::{RefError, Result};
use crate::names::{validate_branch_name, validate_tag_name};

/// Namespace of branch refs.
pub const BRANCH_PREFIX: &str = "refs/heads/";

/// Namespace of tag refs.
pub const TAG_PREFIX: &str = "refs/tags/";

/// A named reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ref {
    /// A branch points at its newest save; older saves hang off the
    /// snapshot parent chain.
    Branch {
        /// Branch name (e.g. "home", "laptop-etc").
        name: String,
        /// Id of the tip snapshot.
        target: ObjectId,
    },

    /// A tag pins any object. Once created, tags cannot be moved.
    Tag {
        /// Tag name (e.g. "before-upgrade").
        name: String,
        /// Id of the tagged object.
        target: ObjectId,
    },
}

impl Ref {
    pub fn branch(name: impl Into<String>, target: ObjectId) -> Self {
        Ref::Branch {
            name: name.into(),
            target,
        }
    }

    pub fn tag(name: impl Into<String>, target: ObjectId) -> Self {
        Ref::Tag {
            name: name.into(),
            target,
        }
    }

    /// Rebuild a ref from its canonical name, validating the short name.
    pub fn from_canonical(canonical: &str, target: ObjectId) -> Result<Self> {
        if let Some(name) = canonical.strip_prefix(BRANCH_PREFIX) {
            validate_branch_name(name)?;
            Ok(Self::branch(name, target))
        } else if let Some(name) = canonical.strip_prefix(TAG_PREFIX) {
            validate_tag_name(name)?;
            Ok(Self::tag(name, target))
        } else {
            Err(RefError::InvalidName {
                name: canonical.to_string(),
                reason: format!("not under {BRANCH_PREFIX} or {TAG_PREFIX}"),
            })
        }
    }

    /// Returns the canonical name for this ref (e.g. "refs/heads/main").
    pub fn canonical_name(&self) -> String {
        match self {
            Ref::Branch { name, .. } => format!("{BRANCH_PREFIX}{name}"),
            Ref::Tag { name, .. } => format!("{TAG_PREFIX}{name}"),
        }
    }

    /// Returns the short name of this ref (without the refs/ prefix).
    pub fn short_name(&self) -> &str {
        match self {
            Ref::Branch { name, .. } | Ref::Tag { name, .. } => name,
        }
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, Ref::Branch { .. })
    }

    pub fn is_tag(&self) -> bool {
        matches!(self, Ref::Tag { .. })
    }

    /// The object this ref points to.
    pub fn target(&self) -> ObjectId {
        match self {
            Ref::Branch { target, .. } | Ref::Tag { target, .. } => *target,
        }
    }

    /// The same ref pointed somewhere else.
    pub fn retarget(&self, target: ObjectId) -> Self {
        match self {
            Ref::Branch { name, .. } => Self::branch(name.clone(), target),
            Ref::Tag { name, .. } => Self::tag(name.clone(), target),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            Ref::Branch { name, .. } => validate_branch_name(name),
            Ref::Tag { name, .. } => validate_tag_name(name),
        }
    }
}

/// Canonical name of the branch called `name`.
pub fn branch_ref_name(name: &str) -> String {
    format!("{BRANCH_PREFIX}{name}")
}

/// Canonical name of the tag called `name`.
pub fn tag_ref_name(name: &str) -> String {
    format!("{TAG_PREFIX}{name}")
}
