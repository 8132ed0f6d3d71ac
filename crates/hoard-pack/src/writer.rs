use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use hoard_store::{ObjectKind, StoredObject};
use hoard_types::ObjectId;

use crate::entry::type_byte;
use crate::error::{PackError, PackResult};
use crate::index::PackIndex;

pub(crate) const PACK_MAGIC: &[u8; 4] = b"HRDP";
pub(crate) const PACK_VERSION: u32 = 1;
pub(crate) const HEADER_LEN: usize = 12;
pub(crate) const TRAILER_LEN: usize = 32;

/// Prefix of the temporary files an ordinary writer stages packs in.
pub const WRITER_TEMP_PREFIX: &str = ".tmp-pack-";

/// Default zstd level for packs written outside collection.
pub const DEFAULT_COMPRESSION: i32 = 1;

/// A pack and index that have been durably committed to a pack directory.
#[derive(Clone, Debug)]
pub struct PackFile {
    /// `pack-<hex checksum>`, shared by the `.pack` and `.idx` files.
    pub name: String,
    pub pack_path: PathBuf,
    pub index_path: PathBuf,
    pub object_count: usize,
    pub size_bytes: u64,
    pub checksum: [u8; 32],
}

/// Builds a pack file from a sequence of objects.
///
/// Payloads are compressed as they are added, so the writer holds the
/// compressed pack body rather than the raw objects.
pub struct PackWriter {
    body: Vec<u8>,
    index_entries: Vec<(ObjectId, u32, u64)>,
    compression: i32,
    temp_prefix: &'static str,
}

impl PackWriter {
    /// Create a writer using [`DEFAULT_COMPRESSION`].
    pub fn new() -> Self {
        Self::with_compression(DEFAULT_COMPRESSION)
    }

    /// Create a writer with an explicit zstd level (0 selects zstd's default).
    pub fn with_compression(level: i32) -> Self {
        let mut body = Vec::new();
        body.extend_from_slice(PACK_MAGIC);
        body.extend_from_slice(&PACK_VERSION.to_be_bytes());
        body.extend_from_slice(&0u32.to_be_bytes()); // object count, patched in finish
        Self {
            body,
            index_entries: Vec::new(),
            compression: level,
            temp_prefix: WRITER_TEMP_PREFIX,
        }
    }

    /// Stage temporary files under a different prefix.
    ///
    /// The collector uses its own prefix so that its crash leftovers can be
    /// told apart from packs a concurrent writer is still producing.
    pub fn temp_prefix(mut self, prefix: &'static str) -> Self {
        self.temp_prefix = prefix;
        self
    }

    /// Append an object to the pack.
    pub fn add_object(&mut self, id: ObjectId, kind: ObjectKind, data: &[u8]) -> PackResult<()> {
        let compressed = zstd::encode_all(data, self.compression)
            .map_err(|e| PackError::CompressionFailed(e.to_string()))?;

        let offset = self.body.len() as u64;
        self.body.push(type_byte(kind));
        encode_varint(&mut self.body, data.len() as u64);
        encode_varint(&mut self.body, compressed.len() as u64);
        let crc = crc32fast::hash(&compressed);
        self.body.extend_from_slice(&compressed);

        self.index_entries.push((id, crc, offset));
        Ok(())
    }

    /// Append a stored object, computing its id.
    pub fn add_stored_object(&mut self, obj: &StoredObject) -> PackResult<ObjectId> {
        let id = obj.compute_id();
        self.add_object(id, obj.kind, &obj.data)?;
        Ok(id)
    }

    /// Number of objects queued.
    pub fn len(&self) -> usize {
        self.index_entries.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.index_entries.is_empty()
    }

    /// Build pack bytes and index in memory (no disk I/O).
    pub fn finish_to_bytes(self) -> PackResult<(Vec<u8>, PackIndex)> {
        let count = u32::try_from(self.index_entries.len()).map_err(|_| {
            PackError::CompressionFailed("too many objects for one pack".into())
        })?;
        let mut body = self.body;
        body[8..12].copy_from_slice(&count.to_be_bytes());

        let checksum = *blake3::hash(&body).as_bytes();
        body.extend_from_slice(&checksum);

        let index = PackIndex::build(self.index_entries, checksum);
        Ok((body, index))
    }

    /// Durably write the pack and its index into `pack_dir`.
    ///
    /// Both files are staged as temporaries, fsynced and renamed into
    /// place, pack first: a pack becomes visible to readers only once its
    /// index exists, and then it is complete.
    pub fn finish(self, pack_dir: &Path) -> PackResult<PackFile> {
        let prefix = self.temp_prefix;
        let (pack_data, index) = self.finish_to_bytes()?;

        let name = pack_name(&index.pack_checksum);
        let pack_path = pack_dir.join(format!("{name}.pack"));
        let index_path = pack_dir.join(format!("{name}.idx"));

        write_durably(pack_dir, prefix, &pack_path, &pack_data)?;
        write_durably(pack_dir, prefix, &index_path, &index.to_bytes())?;
        sync_dir(pack_dir)?;

        tracing::debug!(pack = %name, objects = index.object_count(), "pack committed");
        Ok(PackFile {
            name,
            pack_path,
            index_path,
            object_count: index.object_count(),
            size_bytes: pack_data.len() as u64,
            checksum: index.pack_checksum,
        })
    }
}

impl Default for PackWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// File stem for a pack with the given trailer checksum.
pub fn pack_name(checksum: &[u8; 32]) -> String {
    format!("pack-{}", hex::encode(checksum))
}

fn write_durably(dir: &Path, prefix: &str, dest: &Path, bytes: &[u8]) -> PackResult<()> {
    let mut tmp = tempfile::Builder::new().prefix(prefix).tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| PackError::Io(e.error))?;
    Ok(())
}

pub(crate) fn sync_dir(dir: &Path) -> PackResult<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

/// Encode a u64 as a variable-length integer.
pub(crate) fn encode_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decode a variable-length integer. Returns (value, bytes_consumed).
pub(crate) fn decode_varint(data: &[u8]) -> PackResult<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0;
    for (i, &byte) in data.iter().enumerate() {
        value |= ((byte & 0x7F) as u64) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        if shift >= 64 {
            return Err(PackError::CorruptEntry {
                offset: 0,
                reason: "varint overflow".into(),
            });
        }
    }
    Err(PackError::CorruptEntry {
        offset: 0,
        reason: "truncated varint".into(),
    })
}
