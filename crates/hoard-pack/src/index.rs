use hoard_types::ObjectId;

use crate::error::{PackError, PackResult};

pub(crate) const INDEX_MAGIC: &[u8; 4] = b"HRDI";
pub(crate) const INDEX_VERSION: u32 = 1;

/// Pack index for fast random-access lookups.
///
/// Layout follows git's pack index v2:
/// - Fan-out table: 256 entries counting objects with first byte <= index
/// - Sorted ObjectId array
/// - CRC32 array of the compressed payloads (parallel)
/// - Offset array (parallel)
/// - Pack checksum
#[derive(Clone, Debug)]
pub struct PackIndex {
    pub fan_out: [u32; 256],
    pub object_ids: Vec<ObjectId>,
    pub crc32s: Vec<u32>,
    pub offsets: Vec<u64>,
    pub pack_checksum: [u8; 32],
}

impl PackIndex {
    /// Build an index from (id, crc32, offset) entries and a pack checksum.
    ///
    /// Duplicate ids keep their first occurrence.
    pub fn build(mut entries: Vec<(ObjectId, u32, u64)>, pack_checksum: [u8; 32]) -> Self {
        entries.sort_by(|a, b| a.0.cmp(&b.0).then(a.2.cmp(&b.2)));
        entries.dedup_by(|later, earlier| later.0 == earlier.0);

        let mut fan_out = [0u32; 256];
        for (id, _, _) in &entries {
            fan_out[id.as_bytes()[0] as usize] += 1;
        }
        let mut running = 0u32;
        for slot in fan_out.iter_mut() {
            running += *slot;
            *slot = running;
        }

        let (object_ids, rest): (Vec<_>, Vec<_>) =
            entries.into_iter().map(|(id, crc, off)| (id, (crc, off))).unzip();
        let (crc32s, offsets): (Vec<u32>, Vec<u64>) = rest.into_iter().unzip();

        Self {
            fan_out,
            object_ids,
            crc32s,
            offsets,
            pack_checksum,
        }
    }

    /// Look up an object's (offset, crc32) by ID.
    pub fn lookup(&self, id: &ObjectId) -> Option<(u64, u32)> {
        let first_byte = id.as_bytes()[0] as usize;
        let start = if first_byte == 0 {
            0
        } else {
            self.fan_out[first_byte - 1] as usize
        };
        let end = self.fan_out[first_byte] as usize;

        let pos = self.object_ids[start..end].binary_search(id).ok()?;
        let idx = start + pos;
        Some((self.offsets[idx], self.crc32s[idx]))
    }

    /// Total object count.
    pub fn object_count(&self) -> usize {
        self.object_ids.len()
    }

    /// Check if an object exists.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.lookup(id).is_some()
    }

    /// Iterate `(id, crc32, offset)` in id order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, u32, u64)> + '_ {
        self.object_ids
            .iter()
            .zip(&self.crc32s)
            .zip(&self.offsets)
            .map(|((id, crc), off)| (*id, *crc, *off))
    }

    /// Serialize to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let count = self.object_count();
        let mut buf = Vec::with_capacity(8 + 256 * 4 + count * 44 + 32);
        buf.extend_from_slice(INDEX_MAGIC);
        buf.extend_from_slice(&INDEX_VERSION.to_be_bytes());
        for &count in &self.fan_out {
            buf.extend_from_slice(&count.to_be_bytes());
        }
        for id in &self.object_ids {
            buf.extend_from_slice(id.as_bytes());
        }
        for &crc in &self.crc32s {
            buf.extend_from_slice(&crc.to_be_bytes());
        }
        for &offset in &self.offsets {
            buf.extend_from_slice(&offset.to_be_bytes());
        }
        buf.extend_from_slice(&self.pack_checksum);
        buf
    }

    /// Deserialize from bytes, validating the structure.
    pub fn from_bytes(data: &[u8]) -> PackResult<Self> {
        if data.len() < 8 {
            return Err(PackError::IndexCorrupted("too short".into()));
        }
        if &data[0..4] != INDEX_MAGIC {
            return Err(PackError::InvalidMagic {
                expected: String::from_utf8_lossy(INDEX_MAGIC).into(),
                actual: String::from_utf8_lossy(&data[0..4]).into(),
            });
        }
        let mut cursor = Cursor { data, pos: 4 };
        let version = cursor.u32()?;
        if version != INDEX_VERSION {
            return Err(PackError::UnsupportedVersion(version));
        }

        let mut fan_out = [0u32; 256];
        for entry in &mut fan_out {
            *entry = cursor.u32()?;
        }
        if fan_out.windows(2).any(|w| w[0] > w[1]) {
            return Err(PackError::IndexCorrupted("fan-out not monotonic".into()));
        }

        let count = fan_out[255] as usize;
        let needed = count
            .checked_mul(32 + 4 + 8)
            .and_then(|n| n.checked_add(cursor.pos + 32));
        if needed.map_or(true, |n| data.len() < n) {
            return Err(PackError::IndexCorrupted("data truncated".into()));
        }

        let object_ids = (0..count)
            .map(|_| cursor.array::<32>().map(ObjectId::from_hash))
            .collect::<PackResult<Vec<_>>>()?;
        if object_ids.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PackError::IndexCorrupted("object ids not sorted".into()));
        }
        let crc32s = (0..count).map(|_| cursor.u32()).collect::<PackResult<Vec<_>>>()?;
        let offsets = (0..count).map(|_| cursor.u64()).collect::<PackResult<Vec<_>>>()?;
        let pack_checksum = cursor.array::<32>()?;

        Ok(Self {
            fan_out,
            object_ids,
            crc32s,
            offsets,
            pack_checksum,
        })
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn array<const N: usize>(&mut self) -> PackResult<[u8; N]> {
        let end = self.pos + N;
        let slice = self
            .data
            .get(self.pos..end)
            .ok_or_else(|| PackError::IndexCorrupted("data truncated".into()))?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn u32(&mut self) -> PackResult<u32> {
        self.array::<4>().map(u32::from_be_bytes)
    }

    fn u64(&mut self) -> PackResult<u64> {
        self.array::<8>().map(u64::from_be_bytes)
    }
}
