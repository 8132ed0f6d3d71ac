//! File-backed reference store.
//!
//! Each ref is a file under the repository directory at its canonical name
//! (`refs/heads/<branch>`, `refs/tags/<tag>`) holding the target id in hex
//! followed by a newline. Writes go through a temporary file in the same
//! directory and an atomic rename, so readers see either the old or the new
//! target.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use hoard_types::ObjectId;

use crate::error::{RefError, Result};
use crate::traits::{check_expected, RefStore};
use crate::types::{Ref, BRANCH_PREFIX, TAG_PREFIX};

const TEMP_PREFIX: &str = ".tmp-ref-";

/// A [`RefStore`] over the `refs/` directory of a repository.
///
/// Compare-and-swap is atomic within one process. Across processes it
/// relies on the caller holding the repository lock.
#[derive(Debug)]
pub struct FsRefStore {
    root: PathBuf,
    update_lock: Mutex<()>,
}

impl FsRefStore {
    /// Open the refs of the repository at `repo_dir`. Nothing is created
    /// until the first write.
    pub fn new(repo_dir: &Path) -> Self {
        Self {
            root: repo_dir.to_path_buf(),
            update_lock: Mutex::new(()),
        }
    }

    fn path_of(&self, canonical: &str) -> Result<PathBuf> {
        // validates the short name, so the join cannot escape the repository
        Ref::from_canonical(canonical, ObjectId::null())?;
        Ok(self.root.join(canonical))
    }

    fn load(&self, canonical: &str, path: &Path) -> Result<Option<Ref>> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let target = text.parse::<ObjectId>().map_err(|e| RefError::Corrupt {
            name: canonical.to_string(),
            reason: e.to_string(),
        })?;
        Ref::from_canonical(canonical, target).map(Some)
    }

    fn store(&self, path: &Path, target: ObjectId) -> Result<()> {
        let dir = path.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(dir)?;
        writeln!(tmp, "{}", target.to_hex())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| RefError::Io(e.error))?;
        Ok(())
    }

    fn write_unlocked(&self, name: &str, reference: &Ref, path: &Path) -> Result<()> {
        if name != reference.canonical_name() {
            return Err(RefError::InvalidName {
                name: name.to_string(),
                reason: format!("does not match ref {}", reference.canonical_name()),
            });
        }
        self.store(path, reference.target())?;
        tracing::debug!(name, target = %reference.target().short_hex(), "ref written");
        Ok(())
    }
}

impl RefStore for FsRefStore {
    fn read_ref(&self, name: &str) -> Result<Option<Ref>> {
        let path = self.path_of(name)?;
        self.load(name, &path)
    }

    fn write_ref(&self, name: &str, reference: &Ref) -> Result<()> {
        reference.validate()?;
        let path = self.path_of(name)?;
        let _guard = self.update_lock.lock().map_err(|_| RefError::Poisoned)?;
        if self.load(name, &path)?.is_some_and(|r| r.is_tag()) {
            return Err(RefError::TagImmutable {
                name: name.to_string(),
            });
        }
        self.write_unlocked(name, reference, &path)
    }

    fn delete_ref(&self, name: &str) -> Result<bool> {
        let path = self.path_of(name)?;
        let _guard = self.update_lock.lock().map_err(|_| RefError::Poisoned)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(name, "ref deleted");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, Ref)>> {
        let mut result = Vec::new();
        for namespace in [BRANCH_PREFIX, TAG_PREFIX] {
            let dir = self.root.join(namespace);
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            for entry in entries {
                let entry = entry?;
                if !entry.file_type()?.is_file() {
                    continue;
                }
                let file_name = entry.file_name().to_string_lossy().into_owned();
                if file_name.starts_with('.') {
                    continue;
                }
                let canonical = format!("{namespace}{file_name}");
                if !canonical.starts_with(prefix) {
                    continue;
                }
                if let Err(e) = Ref::from_canonical(&canonical, ObjectId::null()) {
                    tracing::warn!(error = %e, "ignoring file with invalid ref name");
                    continue;
                }
                if let Some(r) = self.load(&canonical, &entry.path())? {
                    result.push((canonical, r));
                }
            }
        }
        result.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(result)
    }

    fn update_ref(&self, name: &str, new: &Ref, expected: Option<ObjectId>) -> Result<()> {
        new.validate()?;
        let path = self.path_of(name)?;
        let _guard = self.update_lock.lock().map_err(|_| RefError::Poisoned)?;
        let current = self.load(name, &path)?;
        if new.is_tag() && current.is_some() {
            return Err(RefError::TagImmutable {
                name: name.to_string(),
            });
        }
        check_expected(name, current.as_ref(), expected)?;
        self.write_unlocked(name, new, &path)
    }
}
