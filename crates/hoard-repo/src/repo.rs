//! A repository on the local file system.
//!
//! Layout:
//!
//! ```text
//! <repo>/objects/pack/   pack-<checksum>.pack + .idx pairs
//! <repo>/refs/heads/     one file per branch
//! <repo>/refs/tags/      one file per tag
//! <repo>/lock            advisory lock file
//! <repo>/config.toml     optional settings
//! ```

use std::path::{Path, PathBuf};

use hoard_pack::{PackFile, PackManager, PackWriter};
use hoard_refs::{FsRefStore, RefStore};
use hoard_store::StoredObject;
use hoard_types::ObjectId;

use crate::error::{RepoError, RepoResult};
use crate::lock::{LockKind, StoreLock, LOCK_FILE};

/// Pack directory relative to the repository root.
pub const PACK_DIR: &str = "objects/pack";

/// A repository on disk: its pack set and its refs.
///
/// The pack set is loaded when the repository is opened and on
/// [`reload_packs`](Self::reload_packs); packs written by other processes
/// in between are not visible.
pub struct LocalRepo {
    root: PathBuf,
    packs: PackManager,
    refs: FsRefStore,
}

impl LocalRepo {
    /// Create an empty repository at `dir`.
    pub fn init(dir: &Path) -> RepoResult<Self> {
        if dir.join(PACK_DIR).exists() {
            return Err(RepoError::AlreadyExists(dir.to_path_buf()));
        }
        std::fs::create_dir_all(dir.join(PACK_DIR))?;
        std::fs::create_dir_all(dir.join("refs/heads"))?;
        std::fs::create_dir_all(dir.join("refs/tags"))?;
        std::fs::File::create(dir.join(LOCK_FILE))?;
        tracing::info!(path = %dir.display(), "initialized repository");
        Self::open(dir)
    }

    /// Open an existing repository.
    pub fn open(dir: &Path) -> RepoResult<Self> {
        let pack_dir = dir.join(PACK_DIR);
        if !pack_dir.is_dir() {
            return Err(RepoError::NotARepository(dir.to_path_buf()));
        }
        Ok(Self {
            root: dir.to_path_buf(),
            packs: PackManager::load(&pack_dir)?,
            refs: FsRefStore::new(dir),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pack_dir(&self) -> PathBuf {
        self.root.join(PACK_DIR)
    }

    /// The pack set as of the last load.
    pub fn packs(&self) -> &PackManager {
        &self.packs
    }

    pub fn refs(&self) -> &FsRefStore {
        &self.refs
    }

    /// Take the repository lock.
    pub fn lock(&self, kind: LockKind) -> RepoResult<StoreLock> {
        StoreLock::acquire(&self.root, kind)
    }

    /// Re-list the pack directory.
    pub fn reload_packs(&mut self) -> RepoResult<()> {
        self.packs = PackManager::load(&self.pack_dir())?;
        Ok(())
    }

    /// Every ref with its target, in name order.
    pub fn list_roots(&self) -> RepoResult<Vec<(String, ObjectId)>> {
        Ok(self
            .refs
            .list_refs("")?
            .into_iter()
            .map(|(name, r)| (name, r.target()))
            .collect())
    }

    pub fn read_object(&self, id: &ObjectId) -> RepoResult<Option<StoredObject>> {
        Ok(self.packs.read_object(id)?)
    }

    /// Write objects as one new pack, skipping any the store already
    /// holds. Returns `None` when nothing was new.
    pub fn write_pack(
        &mut self,
        objects: &[StoredObject],
        compression: i32,
    ) -> RepoResult<Option<PackFile>> {
        let mut writer = PackWriter::with_compression(compression);
        for obj in objects {
            let id = obj.compute_id();
            if self.packs.contains(&id) {
                continue;
            }
            writer.add_object(id, obj.kind, &obj.data)?;
        }
        if writer.is_empty() {
            return Ok(None);
        }
        let pack = writer.finish(&self.pack_dir())?;
        tracing::info!(pack = %pack.name, objects = pack.object_count, "wrote pack");
        self.reload_packs()?;
        Ok(Some(pack))
    }
}

impl std::fmt::Debug for LocalRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalRepo")
            .field("root", &self.root)
            .field("packs", &self.packs.pack_count())
            .finish()
    }
}
