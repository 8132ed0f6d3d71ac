//! The connection abstraction reference removal works through.

use hoard_refs::{InMemoryRefStore, RefStore};
use hoard_store::{InMemoryObjectStore, ObjectStore, StoredObject};
use hoard_types::ObjectId;

use crate::error::RepoResult;
use crate::repo::LocalRepo;

/// What a command needs from a repository: read objects, see and move
/// refs, and add objects.
pub trait RepoHandle {
    fn read_object(&self, id: &ObjectId) -> RepoResult<Option<StoredObject>>;

    fn refs(&self) -> &dyn RefStore;

    /// Durably add objects. When this returns they are readable and may be
    /// referenced.
    fn write_objects(&mut self, objects: &[StoredObject], compression: i32) -> RepoResult<()>;
}

impl RepoHandle for LocalRepo {
    fn read_object(&self, id: &ObjectId) -> RepoResult<Option<StoredObject>> {
        LocalRepo::read_object(self, id)
    }

    fn refs(&self) -> &dyn RefStore {
        LocalRepo::refs(self)
    }

    fn write_objects(&mut self, objects: &[StoredObject], compression: i32) -> RepoResult<()> {
        self.write_pack(objects, compression)?;
        Ok(())
    }
}

/// A repository held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryRepo {
    pub objects: InMemoryObjectStore,
    pub refs: InMemoryRefStore,
    /// Number of `write_objects` calls that wrote at least one object.
    pub batches_written: usize,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RepoHandle for MemoryRepo {
    fn read_object(&self, id: &ObjectId) -> RepoResult<Option<StoredObject>> {
        Ok(self.objects.read(id)?)
    }

    fn refs(&self) -> &dyn RefStore {
        &self.refs
    }

    fn write_objects(&mut self, objects: &[StoredObject], _compression: i32) -> RepoResult<()> {
        for obj in objects {
            self.objects.write(obj)?;
        }
        if !objects.is_empty() {
            self.batches_written += 1;
        }
        Ok(())
    }
}
