use std::fs::File;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use hoard_store::StoredObject;
use hoard_types::ObjectId;

use crate::entry::{kind_from_type_byte, PackObjectInfo};
use crate::error::{PackError, PackResult};
use crate::index::PackIndex;
use crate::writer::{decode_varint, pack_name, HEADER_LEN, PACK_MAGIC, PACK_VERSION, TRAILER_LEN};

/// Where a pack lives and how big it is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackDescriptor {
    /// `pack-<hex checksum>`.
    pub name: String,
    pub pack_path: PathBuf,
    pub index_path: PathBuf,
    pub object_count: usize,
    pub size_bytes: u64,
}

enum PackData {
    Owned(Vec<u8>),
    Mapped(Mmap),
}

impl Deref for PackData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Owned(bytes) => bytes,
            Self::Mapped(map) => map,
        }
    }
}

/// Reads objects from a pack file using an index for random access.
pub struct PackReader {
    data: PackData,
    index: PackIndex,
    descriptor: PackDescriptor,
}

impl PackReader {
    /// Open from raw bytes.
    pub fn from_bytes(pack_data: Vec<u8>, index: PackIndex) -> PackResult<Self> {
        let descriptor = PackDescriptor {
            name: pack_name(&index.pack_checksum),
            pack_path: PathBuf::new(),
            index_path: PathBuf::new(),
            object_count: index.object_count(),
            size_bytes: pack_data.len() as u64,
        };
        Self::validated(PackData::Owned(pack_data), index, descriptor)
    }

    /// Open a pack through its index file, memory-mapping the pack.
    pub fn open(index_path: &Path) -> PackResult<Self> {
        let index = PackIndex::from_bytes(&std::fs::read(index_path)?)?;
        let pack_path = index_path.with_extension("pack");
        let file = File::open(&pack_path)?;
        // SAFETY: packs are never modified after being renamed into place;
        // retirement unlinks the file, which leaves existing mappings valid.
        // The store lock only binds hoard itself: a file truncated by
        // another process faults (SIGBUS) on the next access to the lost
        // pages, so the pack directory must not be edited externally.
        let map = unsafe { Mmap::map(&file)? };

        let name = index_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| pack_name(&index.pack_checksum));
        let descriptor = PackDescriptor {
            name,
            pack_path,
            index_path: index_path.to_path_buf(),
            object_count: index.object_count(),
            size_bytes: map.len() as u64,
        };
        Self::validated(PackData::Mapped(map), index, descriptor)
    }

    fn validated(data: PackData, index: PackIndex, descriptor: PackDescriptor) -> PackResult<Self> {
        if data.len() < HEADER_LEN + TRAILER_LEN {
            return Err(PackError::CorruptEntry {
                offset: 0,
                reason: "pack data too short".into(),
            });
        }
        if &data[0..4] != PACK_MAGIC {
            return Err(PackError::InvalidMagic {
                expected: String::from_utf8_lossy(PACK_MAGIC).into(),
                actual: String::from_utf8_lossy(&data[0..4]).into(),
            });
        }
        let version = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        if version != PACK_VERSION {
            return Err(PackError::UnsupportedVersion(version));
        }
        if data[data.len() - TRAILER_LEN..] != index.pack_checksum {
            return Err(PackError::ChecksumMismatch);
        }
        Ok(Self {
            data,
            index,
            descriptor,
        })
    }

    /// Read an object by ID.
    pub fn read_object(&self, id: &ObjectId) -> PackResult<Option<StoredObject>> {
        let Some((offset, expected_crc)) = self.index.lookup(id) else {
            return Ok(None);
        };
        self.read_at_offset(id, offset, expected_crc).map(Some)
    }

    /// Check containment.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.index.contains(id)
    }

    /// Object count.
    pub fn object_count(&self) -> usize {
        self.index.object_count()
    }

    /// Access the index.
    pub fn index(&self) -> &PackIndex {
        &self.index
    }

    /// File locations, name and size of this pack.
    pub fn descriptor(&self) -> &PackDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// All object IDs, in id order.
    pub fn object_ids(&self) -> &[ObjectId] {
        &self.index.object_ids
    }

    /// Lazily list the objects of this pack in pack (offset) order.
    pub fn entries(&self) -> impl Iterator<Item = PackResult<PackObjectInfo>> + '_ {
        let mut order: Vec<(u64, ObjectId)> =
            self.index.iter().map(|(id, _, off)| (off, id)).collect();
        order.sort_unstable();
        order.into_iter().map(move |(offset, id)| {
            let header = self.entry_header(offset)?;
            Ok(PackObjectInfo {
                id,
                kind: header.kind,
                offset,
                size: header.size,
            })
        })
    }

    /// Recompute the trailer checksum over the whole pack body.
    pub fn verify_checksum(&self) -> PackResult<()> {
        let body_end = self.data.len() - TRAILER_LEN;
        if *blake3::hash(&self.data[..body_end]).as_bytes() != self.index.pack_checksum {
            return Err(PackError::ChecksumMismatch);
        }
        Ok(())
    }

    fn entry_header(&self, offset: u64) -> PackResult<EntryHeader> {
        let data = &self.data[..self.data.len() - TRAILER_LEN];
        let corrupt = |reason: &str| PackError::CorruptEntry {
            offset,
            reason: reason.into(),
        };

        let mut pos = usize::try_from(offset).map_err(|_| corrupt("offset overflow"))?;
        if pos < HEADER_LEN || pos >= data.len() {
            return Err(corrupt("offset outside pack body"));
        }

        let type_byte = data[pos];
        pos += 1;
        let kind = kind_from_type_byte(type_byte)
            .ok_or_else(|| corrupt(&format!("unknown type byte: {type_byte}")))?;

        let (size, consumed) = decode_varint(&data[pos..]).map_err(|_| corrupt("bad size"))?;
        pos += consumed;
        let (compressed_len, consumed) =
            decode_varint(&data[pos..]).map_err(|_| corrupt("bad compressed size"))?;
        pos += consumed;

        let end = usize::try_from(compressed_len)
            .ok()
            .and_then(|len| pos.checked_add(len))
            .filter(|&end| end <= data.len())
            .ok_or_else(|| corrupt("compressed data extends beyond pack"))?;

        Ok(EntryHeader {
            kind,
            size,
            payload: pos..end,
        })
    }

    fn read_at_offset(&self, id: &ObjectId, offset: u64, expected_crc: u32) -> PackResult<StoredObject> {
        let header = self.entry_header(offset)?;
        let compressed = &self.data[header.payload];

        if crc32fast::hash(compressed) != expected_crc {
            return Err(PackError::CrcMismatch { id: *id });
        }

        let decompressed = zstd::decode_all(compressed)
            .map_err(|e| PackError::DecompressionFailed(e.to_string()))?;
        if decompressed.len() as u64 != header.size {
            return Err(PackError::CorruptEntry {
                offset,
                reason: format!(
                    "size mismatch: expected {}, got {}",
                    header.size,
                    decompressed.len()
                ),
            });
        }

        let obj = StoredObject::new(header.kind, decompressed);
        if obj.compute_id() != *id {
            return Err(PackError::CorruptEntry {
                offset,
                reason: format!("content does not hash to {}", id.short_hex()),
            });
        }
        Ok(obj)
    }
}

impl std::fmt::Debug for PackReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackReader")
            .field("name", &self.descriptor.name)
            .field("object_count", &self.object_count())
            .finish()
    }
}

struct EntryHeader {
    kind: hoard_store::ObjectKind,
    size: u64,
    payload: std::ops::Range<usize>,
}
