//! Bloom filter over object ids.
//!
//! The filter answers "may this object be live?" during one cycle. It never
//! answers no for an inserted id; a false yes only keeps a dead object one
//! cycle longer.

use std::f64::consts::LN_2;

use hoard_types::ObjectId;

/// False-positive rate used when none is configured.
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.001;

const MIN_BITS: u64 = 64;
const MAX_HASHES: u32 = 16;

#[derive(Clone, PartialEq, Eq)]
pub struct BloomFilter {
    words: Vec<u64>,
    num_bits: u64,
    num_hashes: u32,
    inserted: usize,
}

impl BloomFilter {
    /// Size a filter for `expected` ids at false-positive rate `fp_rate`.
    ///
    /// Inserting more than `expected` ids raises the false-positive rate
    /// but never produces false negatives.
    pub fn with_rate(expected: usize, fp_rate: f64) -> Self {
        let n = expected.max(1) as f64;
        let p = fp_rate.clamp(1e-12, 0.5);
        let num_bits = ((-n * p.ln() / (LN_2 * LN_2)).ceil() as u64).max(MIN_BITS);
        let num_hashes = ((num_bits as f64 / n) * LN_2)
            .round()
            .clamp(1.0, f64::from(MAX_HASHES)) as u32;
        Self {
            words: vec![0; num_bits.div_ceil(64) as usize],
            num_bits,
            num_hashes,
            inserted: 0,
        }
    }

    /// Size a filter for exactly `expected` ids and insert them all.
    pub fn build<'a>(
        ids: impl IntoIterator<Item = &'a ObjectId>,
        expected: usize,
        fp_rate: f64,
    ) -> Self {
        let mut filter = Self::with_rate(expected, fp_rate);
        for id in ids {
            filter.insert(id);
        }
        filter
    }

    pub fn insert(&mut self, id: &ObjectId) {
        for bit in self.bit_positions(id) {
            self.words[(bit / 64) as usize] |= 1 << (bit % 64);
        }
        self.inserted += 1;
    }

    /// `false` means the id was certainly never inserted.
    pub fn maybe_contains(&self, id: &ObjectId) -> bool {
        self.bit_positions(id)
            .all(|bit| self.words[(bit / 64) as usize] & (1 << (bit % 64)) != 0)
    }

    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Number of insert calls, counting repeats.
    pub fn len(&self) -> usize {
        self.inserted
    }

    pub fn is_empty(&self) -> bool {
        self.inserted == 0
    }

    /// Memory held by the bit array.
    pub fn size_bytes(&self) -> usize {
        self.words.len() * 8
    }

    // Ids are BLAKE3 digests, already uniform: two of their words serve as
    // the independent hashes for double hashing.
    fn bit_positions(&self, id: &ObjectId) -> impl Iterator<Item = u64> {
        let bytes = id.as_bytes();
        let mut h1 = [0u8; 8];
        let mut h2 = [0u8; 8];
        h1.copy_from_slice(&bytes[0..8]);
        h2.copy_from_slice(&bytes[8..16]);
        let h1 = u64::from_le_bytes(h1);
        let h2 = u64::from_le_bytes(h2) | 1;
        let m = self.num_bits;
        (0..u64::from(self.num_hashes)).map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % m)
    }
}

impl std::fmt::Debug for BloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BloomFilter")
            .field("num_bits", &self.num_bits)
            .field("num_hashes", &self.num_hashes)
            .field("inserted", &self.inserted)
            .finish()
    }
}
