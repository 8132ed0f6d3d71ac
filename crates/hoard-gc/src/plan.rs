//! Per-pack garbage estimates and the rewrite worklist.

use hoard_pack::{PackDescriptor, PackReader};

use crate::config::Threshold;
use crate::filter::BloomFilter;

/// How much of one pack the filter considers live.
///
/// Recomputed every cycle and never stored. False positives make `live`
/// an overestimate, so garbage is never overstated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GarbageEstimate {
    pub pack: PackDescriptor,
    pub total: usize,
    pub live: usize,
}

impl GarbageEstimate {
    pub fn garbage(&self) -> usize {
        self.total - self.live
    }

    /// Share of dead objects in `[0, 1]`; an empty pack is all garbage.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.garbage() as f64 / self.total as f64
        }
    }

    /// Whether the pack's garbage share reaches `threshold` percent.
    pub fn meets(&self, threshold: Threshold) -> bool {
        let garbage = self.garbage() as u128 * 100;
        let bar = u128::from(threshold.percent()) * self.total as u128;
        garbage >= bar
    }
}

/// Count the live objects of `pack` by probing every id in its index.
pub fn estimate(pack: &PackReader, filter: &BloomFilter) -> GarbageEstimate {
    let live = pack
        .object_ids()
        .iter()
        .filter(|id| filter.maybe_contains(id))
        .count();
    let estimate = GarbageEstimate {
        pack: pack.descriptor().clone(),
        total: pack.object_count(),
        live,
    };
    tracing::debug!(
        pack = %estimate.pack.name,
        total = estimate.total,
        live = estimate.live,
        "estimated garbage"
    );
    estimate
}

/// Select the packs worth rewriting: those whose garbage share is at least
/// `threshold` percent. Order is preserved.
pub fn plan(estimates: Vec<GarbageEstimate>, threshold: Threshold) -> Vec<GarbageEstimate> {
    estimates
        .into_iter()
        .filter(|e| {
            let selected = e.meets(threshold);
            if !selected {
                tracing::debug!(pack = %e.pack.name, ratio = e.ratio(), "below threshold");
            }
            selected
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoard_pack::PackWriter;
    use hoard_store::{ObjectKind, StoredObject};
    use hoard_types::ObjectId;
    use std::path::PathBuf;

    fn fake(total: usize, live: usize) -> GarbageEstimate {
        GarbageEstimate {
            pack: PackDescriptor {
                name: format!("pack-{total}-{live}"),
                pack_path: PathBuf::new(),
                index_path: PathBuf::new(),
                object_count: total,
                size_bytes: 0,
            },
            total,
            live,
        }
    }

    fn threshold(p: i64) -> Threshold {
        Threshold::new(p).unwrap()
    }

    #[test]
    fn ratio_of_empty_pack_is_one() {
        assert_eq!(fake(0, 0).ratio(), 1.0);
        assert_eq!(fake(4, 1).ratio(), 0.75);
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        // 10 of 100 dead is exactly 10%
        assert!(fake(100, 90).meets(threshold(10)));
        // one object less is below
        assert!(!fake(100, 91).meets(threshold(10)));
        // 1 of 3 dead is 33.3%: meets 33, not 34
        assert!(fake(3, 2).meets(threshold(33)));
        assert!(!fake(3, 2).meets(threshold(34)));
    }

    #[test]
    fn extreme_thresholds() {
        assert!(fake(10, 10).meets(threshold(0)));
        assert!(!fake(10, 1).meets(threshold(100)));
        assert!(fake(10, 0).meets(threshold(100)));
        assert!(fake(0, 0).meets(threshold(100)));
    }

    #[test]
    fn plan_keeps_order_and_drops_clean_packs() {
        let worklist = plan(vec![fake(10, 0), fake(10, 10), fake(10, 5)], threshold(50));
        let names: Vec<_> = worklist.iter().map(|e| e.pack.name.as_str()).collect();
        assert_eq!(names, vec!["pack-10-0", "pack-10-5"]);
    }

    #[test]
    fn estimate_counts_filter_hits() {
        let mut writer = PackWriter::new();
        let mut ids = Vec::new();
        for i in 0..8u8 {
            ids.push(
                writer
                    .add_stored_object(&StoredObject::new(ObjectKind::Blob, vec![i; 4]))
                    .unwrap(),
            );
        }
        let (bytes, index) = writer.finish_to_bytes().unwrap();
        let reader = PackReader::from_bytes(bytes, index).unwrap();

        let live: Vec<ObjectId> = ids[..3].to_vec();
        // a huge filter for three ids leaves no room for false positives here
        let filter = BloomFilter::build(&live, 1_000, 1e-9);

        let est = estimate(&reader, &filter);
        assert_eq!(est.total, 8);
        assert_eq!(est.live, 3);
        assert_eq!(est.garbage(), 5);
    }
}
