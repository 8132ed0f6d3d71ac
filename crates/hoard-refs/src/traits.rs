//! The [`RefStore`] trait defining the reference storage interface.

use hoard_types::ObjectId;

use crate::error::{RefError, Result};
use crate::types::{Ref, BRANCH_PREFIX, TAG_PREFIX};

/// Storage backend for named references.
///
/// Implementations must be thread-safe (`Send + Sync`) and provide atomic
/// read/write/delete operations on named refs. The namespace is:
///
/// - `refs/heads/*` for branches
/// - `refs/tags/*` for tags
pub trait RefStore: Send + Sync {
    /// Read a ref by its canonical name (e.g. "refs/heads/main").
    ///
    /// Returns `Ok(None)` if the ref does not exist.
    fn read_ref(&self, name: &str) -> Result<Option<Ref>>;

    /// Write (create or update) a ref at the given canonical name.
    ///
    /// Fails with [`RefError::TagImmutable`] if a tag already exists there.
    fn write_ref(&self, name: &str, reference: &Ref) -> Result<()>;

    /// Delete a ref by canonical name.
    ///
    /// Returns `Ok(true)` if the ref existed and was deleted, `Ok(false)` if
    /// it did not exist.
    fn delete_ref(&self, name: &str) -> Result<bool>;

    /// List all refs whose canonical name starts with `prefix`, sorted by
    /// name.
    ///
    /// Pass `""` to list all refs. Pass `"refs/heads/"` for branches only.
    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, Ref)>>;

    /// Point `name` at `new` if it currently points at `expected`.
    ///
    /// `expected == None` means the ref must not exist yet. On mismatch
    /// nothing is written and [`RefError::Conflict`] is returned.
    fn update_ref(&self, name: &str, new: &Ref, expected: Option<ObjectId>) -> Result<()>;

    /// List all branch refs.
    fn branches(&self) -> Result<Vec<(String, Ref)>> {
        self.list_refs(BRANCH_PREFIX)
    }

    /// List all tag refs.
    fn tags(&self) -> Result<Vec<(String, Ref)>> {
        self.list_refs(TAG_PREFIX)
    }

    /// The target of every ref, in name order: the roots of the object
    /// graph.
    fn roots(&self) -> Result<Vec<ObjectId>> {
        Ok(self
            .list_refs("")?
            .into_iter()
            .map(|(_, r)| r.target())
            .collect())
    }
}

pub(crate) fn check_expected(
    name: &str,
    current: Option<&Ref>,
    expected: Option<ObjectId>,
) -> Result<()> {
    let actual = current.map(Ref::target);
    if actual == expected {
        Ok(())
    } else {
        Err(RefError::Conflict {
            name: name.to_string(),
            expected,
            actual,
        })
    }
}
