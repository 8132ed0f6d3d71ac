//! Atomic retirement of superseded packs and recovery of interrupted
//! retirements.
//!
//! A pack is retired in four steps, each of which leaves the directory in a
//! state [`cleanup`] can finish:
//!
//! 1. `X.idx  -> .gc-retired-X.idx`  (the pack vanishes from new listings)
//! 2. `X.pack -> .gc-retired-X.pack`
//! 3. unlink `.gc-retired-X.pack`
//! 4. unlink `.gc-retired-X.idx`
//!
//! The retired index is removed last, so as long as any part of a
//! retirement remains on disk its marker does too.

use std::path::{Path, PathBuf};

use crate::error::PackResult;
use crate::reader::PackDescriptor;
use crate::writer::sync_dir;

/// Prefix of temporary files staged by the collector's pack writer.
pub const GC_TEMP_PREFIX: &str = ".gc-tmp-";

/// Prefix of pack and index files that are being retired.
pub const RETIRED_PREFIX: &str = ".gc-retired-";

/// Retire a pack whose objects are no longer needed or have been copied
/// into a durably committed successor. Returns the bytes released.
pub fn retire(pack: &PackDescriptor) -> PackResult<u64> {
    let dir = pack
        .index_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let retired_idx = dir.join(format!("{RETIRED_PREFIX}{}.idx", pack.name));
    let retired_pack = dir.join(format!("{RETIRED_PREFIX}{}.pack", pack.name));

    std::fs::rename(&pack.index_path, &retired_idx)?;
    sync_dir(&dir)?;
    std::fs::rename(&pack.pack_path, &retired_pack)?;
    std::fs::remove_file(&retired_pack)?;
    std::fs::remove_file(&retired_idx)?;
    sync_dir(&dir)?;

    tracing::debug!(pack = %pack.name, bytes = pack.size_bytes, "pack retired");
    Ok(pack.size_bytes)
}

/// What [`cleanup`] removed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
}

/// Remove leftovers of interrupted collections from a pack directory.
///
/// Only files the collector itself marked are touched: its temporaries,
/// retired files, and packs whose retired-index marker is still present.
/// Must be called with the repository lock held.
pub fn cleanup(pack_dir: &Path) -> PackResult<CleanupReport> {
    let mut report = CleanupReport::default();
    let mut interrupted = Vec::new();

    for entry in std::fs::read_dir(pack_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if let Some(rest) = name.strip_prefix(RETIRED_PREFIX) {
            if let Some(stem) = rest.strip_suffix(".idx") {
                interrupted.push(stem.to_string());
            }
            report.removed.push(path);
        } else if name.starts_with(GC_TEMP_PREFIX) {
            report.removed.push(path);
        }
    }

    // A retired index with the pack still under its live name means step 2
    // never ran.
    for stem in interrupted {
        let orphan = pack_dir.join(format!("{stem}.pack"));
        if orphan.exists() && !pack_dir.join(format!("{stem}.idx")).exists() {
            report.removed.push(orphan);
        }
    }

    // Marker indexes go last.
    report
        .removed
        .sort_by_key(|p| p.extension().is_some_and(|e| e == "idx"));
    for path in &report.removed {
        tracing::info!(path = %path.display(), "removing leftover from interrupted collection");
        std::fs::remove_file(path)?;
    }
    if !report.removed.is_empty() {
        sync_dir(pack_dir)?;
    }
    Ok(report)
}
