//! Rewriting one pack without its dead objects.

use std::path::Path;

use hoard_pack::{retire, PackError, PackFile, PackReader, PackWriter, GC_TEMP_PREFIX};

use crate::filter::BloomFilter;

/// What happened to one pack on the worklist.
#[derive(Clone, Debug)]
pub enum RewriteOutcome {
    /// Every object was live; the pack was left alone.
    NoChangeNeeded,
    /// No object was live; the pack was retired without a successor.
    Emptied { dropped: usize },
    /// Live objects were copied into `successor` and the pack was retired.
    Rewritten {
        successor: PackFile,
        kept: usize,
        dropped: usize,
    },
}

impl RewriteOutcome {
    pub fn dropped(&self) -> usize {
        match self {
            RewriteOutcome::NoChangeNeeded => 0,
            RewriteOutcome::Emptied { dropped } | RewriteOutcome::Rewritten { dropped, .. } => {
                *dropped
            }
        }
    }

    /// Bytes released by replacing a pack of `old_size` bytes.
    pub fn bytes_freed(&self, old_size: u64) -> u64 {
        match self {
            RewriteOutcome::NoChangeNeeded => 0,
            RewriteOutcome::Emptied { .. } => old_size,
            RewriteOutcome::Rewritten { successor, .. } => {
                old_size.saturating_sub(successor.size_bytes)
            }
        }
    }
}

/// Copy the objects of `pack` the filter may still need into a new pack in
/// `pack_dir`, then retire `pack`.
///
/// Objects keep their pack order. The successor is durably committed before
/// the original is touched; on any error before that point the original is
/// left intact and the collector's temporaries are gone.
pub fn rewrite(
    pack: &PackReader,
    filter: &BloomFilter,
    compression: i32,
    pack_dir: &Path,
) -> Result<RewriteOutcome, PackError> {
    let mut live = Vec::new();
    let mut dropped = 0;
    for info in pack.entries() {
        let info = info?;
        if filter.maybe_contains(&info.id) {
            live.push(info.id);
        } else {
            tracing::trace!(pack = %pack.name(), id = %info.id.short_hex(), "dropping");
            dropped += 1;
        }
    }

    if dropped == 0 {
        tracing::debug!(pack = %pack.name(), "fully live, leaving as is");
        return Ok(RewriteOutcome::NoChangeNeeded);
    }

    if live.is_empty() {
        retire(pack.descriptor())?;
        tracing::debug!(pack = %pack.name(), dropped, "retired empty pack");
        return Ok(RewriteOutcome::Emptied { dropped });
    }

    let mut writer = PackWriter::with_compression(compression).temp_prefix(GC_TEMP_PREFIX);
    for id in &live {
        let obj = pack.read_object(id)?.ok_or(PackError::ObjectNotFound(*id))?;
        writer.add_object(*id, obj.kind, &obj.data)?;
    }
    let successor = writer.finish(pack_dir)?;

    // a successor with the same content is the same file
    if successor.name != pack.name() {
        retire(pack.descriptor())?;
    }
    tracing::debug!(
        pack = %pack.name(),
        successor = %successor.name,
        kept = live.len(),
        dropped,
        "rewrote pack"
    );
    Ok(RewriteOutcome::Rewritten {
        successor,
        kept: live.len(),
        dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoard_pack::PackManager;
    use hoard_store::{ObjectKind, StoredObject};
    use hoard_types::ObjectId;

    fn write_pack(dir: &Path, contents: &[&[u8]]) -> (PackFile, Vec<ObjectId>) {
        let mut writer = PackWriter::new();
        let ids = contents
            .iter()
            .map(|c| {
                writer
                    .add_stored_object(&StoredObject::new(ObjectKind::Blob, c.to_vec()))
                    .unwrap()
            })
            .collect();
        (writer.finish(dir).unwrap(), ids)
    }

    fn open_only(dir: &Path) -> PackReader {
        let mgr = PackManager::load(dir).unwrap();
        assert_eq!(mgr.pack_count(), 1);
        PackReader::open(&mgr.packs()[0].descriptor().index_path).unwrap()
    }

    fn filter_of(ids: &[ObjectId]) -> BloomFilter {
        BloomFilter::build(ids, 1_000, 1e-9)
    }

    #[test]
    fn fully_live_pack_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let (file, ids) = write_pack(dir.path(), &[b"a", b"b"]);
        let reader = open_only(dir.path());

        let outcome = rewrite(&reader, &filter_of(&ids), 1, dir.path()).unwrap();
        assert!(matches!(outcome, RewriteOutcome::NoChangeNeeded));
        assert!(file.pack_path.exists() && file.index_path.exists());
    }

    #[test]
    fn dead_pack_is_retired() {
        let dir = tempfile::tempdir().unwrap();
        let (file, _) = write_pack(dir.path(), &[b"a", b"b"]);
        let reader = open_only(dir.path());

        let outcome = rewrite(&reader, &filter_of(&[]), 1, dir.path()).unwrap();
        assert!(matches!(outcome, RewriteOutcome::Emptied { dropped: 2 }));
        assert_eq!(outcome.bytes_freed(file.size_bytes), file.size_bytes);
        assert!(!file.pack_path.exists());
        assert_eq!(PackManager::load(dir.path()).unwrap().pack_count(), 0);
    }

    #[test]
    fn partial_pack_is_rewritten_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let (file, ids) = write_pack(dir.path(), &[b"keep-1", b"drop", b"keep-2", b"drop-too"]);
        let reader = open_only(dir.path());
        let keep = [ids[0], ids[2]];

        let outcome = rewrite(&reader, &filter_of(&keep), 3, dir.path()).unwrap();
        let RewriteOutcome::Rewritten { successor, kept, dropped } = &outcome else {
            panic!("expected rewrite, got {outcome:?}");
        };
        assert_eq!((*kept, *dropped), (2, 2));
        assert!(!file.index_path.exists());

        let successor_reader = PackReader::open(&successor.index_path).unwrap();
        let order: Vec<ObjectId> = successor_reader.entries().map(|e| e.unwrap().id).collect();
        assert_eq!(order, keep.to_vec());
        assert_eq!(
            successor_reader.read_object(&ids[2]).unwrap().unwrap().data,
            b"keep-2"
        );
        assert!(!successor_reader.contains(&ids[1]));

        // only the successor remains, and no temporaries
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names.len(), 2, "{names:?}");
    }

    #[test]
    fn unreadable_object_leaves_original_intact() {
        let dir = tempfile::tempdir().unwrap();
        let (file, ids) = write_pack(dir.path(), &[b"keep me please", b"drop"]);

        // corrupt the first payload byte after its entry header
        let mut bytes = std::fs::read(&file.pack_path).unwrap();
        bytes[16] ^= 0xFF;
        std::fs::write(&file.pack_path, &bytes).unwrap();
        let reader = open_only(dir.path());

        let err = rewrite(&reader, &filter_of(&ids[..1]), 1, dir.path()).unwrap_err();
        assert!(matches!(err, PackError::CrcMismatch { .. }));
        assert!(file.pack_path.exists() && file.index_path.exists());
        let names: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(names.len(), 2);
    }
}
