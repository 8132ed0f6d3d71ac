use std::path::{Path, PathBuf};

use hoard_store::{ObjectStore, StoreResult, StoredObject};
use hoard_types::ObjectId;

use crate::error::{PackError, PackResult};
use crate::reader::PackReader;

/// A pack that could not be opened and was left out of the set.
#[derive(Debug)]
pub struct PackAnomaly {
    pub index_path: PathBuf,
    pub error: PackError,
}

/// The set of packs visible in one pack directory at load time.
///
/// A pack is visible when its `.idx` file exists. Packs whose index or
/// header is unreadable are recorded as [`PackAnomaly`] and excluded: they
/// are never read from and never considered for rewriting.
pub struct PackManager {
    pack_dir: PathBuf,
    packs: Vec<PackReader>,
    anomalies: Vec<PackAnomaly>,
}

impl PackManager {
    /// Load all packs from a pack directory.
    ///
    /// Fails only if the directory itself cannot be listed.
    pub fn load(pack_dir: &Path) -> PackResult<Self> {
        let mut index_paths = Vec::new();
        for entry in std::fs::read_dir(pack_dir)? {
            let path = entry?.path();
            let is_index = path.extension().is_some_and(|e| e == "idx");
            let is_hidden = path
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with('.'));
            if is_index && !is_hidden {
                index_paths.push(path);
            }
        }
        index_paths.sort();

        let mut packs = Vec::with_capacity(index_paths.len());
        let mut anomalies = Vec::new();
        for index_path in index_paths {
            match PackReader::open(&index_path) {
                Ok(reader) => packs.push(reader),
                Err(error) => {
                    tracing::warn!(path = %index_path.display(), %error, "skipping unreadable pack");
                    anomalies.push(PackAnomaly { index_path, error });
                }
            }
        }

        tracing::debug!(dir = %pack_dir.display(), packs = packs.len(), "pack set loaded");
        Ok(Self {
            pack_dir: pack_dir.to_path_buf(),
            packs,
            anomalies,
        })
    }

    pub fn pack_dir(&self) -> &Path {
        &self.pack_dir
    }

    /// The loaded packs, ordered by name.
    pub fn packs(&self) -> &[PackReader] {
        &self.packs
    }

    /// Packs that failed to open.
    pub fn anomalies(&self) -> &[PackAnomaly] {
        &self.anomalies
    }

    /// Find a loaded pack by name.
    pub fn find(&self, name: &str) -> Option<&PackReader> {
        self.packs.iter().find(|p| p.name() == name)
    }

    /// Read an object from the first pack holding an intact copy.
    ///
    /// A damaged copy is skipped in favour of later packs; its error is
    /// returned only when no pack yields the object.
    pub fn read_object(&self, id: &ObjectId) -> PackResult<Option<StoredObject>> {
        let mut first_error = None;
        for pack in &self.packs {
            match pack.read_object(id) {
                Ok(Some(obj)) => return Ok(Some(obj)),
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(pack = %pack.name(), %id, %error, "damaged object copy");
                    first_error.get_or_insert(error);
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(None),
        }
    }

    /// Check containment across all packs.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.packs.iter().any(|p| p.contains(id))
    }

    /// Total objects across all packs, counting duplicates.
    pub fn total_objects(&self) -> usize {
        self.packs.iter().map(|p| p.object_count()).sum()
    }

    /// Number of loaded packs.
    pub fn pack_count(&self) -> usize {
        self.packs.len()
    }
}

impl ObjectStore for PackManager {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        Ok(self.read_object(id)?)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.contains(id))
    }
}

impl std::fmt::Debug for PackManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackManager")
            .field("pack_dir", &self.pack_dir)
            .field("packs", &self.packs.len())
            .field("anomalies", &self.anomalies.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::PackWriter;
    use hoard_store::ObjectKind;

    fn write_pack(dir: &Path, contents: &[&[u8]]) -> crate::PackFile {
        let mut writer = PackWriter::new();
        for data in contents {
            writer
                .add_stored_object(&StoredObject::new(ObjectKind::Blob, data.to_vec()))
                .unwrap();
        }
        writer.finish(dir).unwrap()
    }

    /// Flip the last payload byte of the pack's final entry.
    fn damage_last_entry(pack: &crate::PackFile) {
        let mut bytes = std::fs::read(&pack.pack_path).unwrap();
        let at = bytes.len() - 33;
        bytes[at] ^= 0xff;
        std::fs::write(&pack.pack_path, bytes).unwrap();
    }

    #[test]
    fn empty_directory_reads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = PackManager::load(dir.path()).unwrap();
        assert_eq!(mgr.pack_count(), 0);
        assert_eq!(mgr.total_objects(), 0);
        assert!(mgr.read_object(&ObjectId::null()).unwrap().is_none());
    }

    #[test]
    fn damaged_copy_falls_back_to_intact_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_pack(dir.path(), &[b"shared"]);
        let second = write_pack(dir.path(), &[b"filler", b"shared"]);
        damage_last_entry(&first);
        damage_last_entry(&second);
        let id = StoredObject::new(ObjectKind::Blob, b"shared".to_vec()).compute_id();

        // both copies damaged: the read fails
        let mgr = PackManager::load(dir.path()).unwrap();
        assert!(mgr.read_object(&id).is_err());

        // one copy restored: whichever pack is listed first, the read succeeds
        let third = write_pack(dir.path(), &[b"other filler", b"shared"]);
        let mgr = PackManager::load(dir.path()).unwrap();
        assert_eq!(mgr.pack_count(), 3);
        assert!(mgr.find(&third.name).is_some());
        assert_eq!(mgr.read_object(&id).unwrap().unwrap().data, b"shared");
    }

    #[test]
    fn load_reads_across_packs() {
        let dir = tempfile::tempdir().unwrap();
        write_pack(dir.path(), &[b"one", b"two"]);
        write_pack(dir.path(), &[b"three"]);

        let mgr = PackManager::load(dir.path()).unwrap();
        assert_eq!(mgr.pack_count(), 2);
        assert_eq!(mgr.total_objects(), 3);

        let id = StoredObject::new(ObjectKind::Blob, b"three".to_vec()).compute_id();
        assert_eq!(mgr.read(&id).unwrap().unwrap().data, b"three");
        assert!(mgr.exists(&id).unwrap());
    }

    #[test]
    fn corrupt_index_is_reported_not_emptied() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_pack(dir.path(), &[b"good"]);
        let bad = write_pack(dir.path(), &[b"bad"]);
        std::fs::write(&bad.index_path, b"HRDI garbage").unwrap();

        let mgr = PackManager::load(dir.path()).unwrap();
        assert_eq!(mgr.pack_count(), 1);
        assert_eq!(mgr.packs()[0].name(), good.name);
        assert_eq!(mgr.anomalies().len(), 1);
        assert_eq!(mgr.anomalies()[0].index_path, bad.index_path);
        // the bad pack's data is untouched on disk
        assert!(bad.pack_path.exists());
    }

    #[test]
    fn pack_without_index_is_invisible() {
        let dir = tempfile::tempdir().unwrap();
        let pack = write_pack(dir.path(), &[b"half written"]);
        std::fs::remove_file(&pack.index_path).unwrap();

        let mgr = PackManager::load(dir.path()).unwrap();
        assert_eq!(mgr.pack_count(), 0);
        assert!(mgr.anomalies().is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PackManager::load(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, PackError::Io(_)));
    }
}
