//! Bucket hash index: each hash cell is a small ring of recent
//! `(position, value)` entries instead of a single overwritten slot.
//!
//! Grounded on the same multiplicative-hash family as [`super::hash`], but
//! each cell keeps the `k` most recent colliding positions — the structure
//! the bucket parser (BUP) searches to pick the strictly longer of several
//! candidate matches.

use super::{hash_prefix, HashEntry, Mapper};

/// A fixed-capacity ring of `HashEntry` slots with a rotating insertion
/// cursor. An empty slot (`position == 0 && value == 0`) terminates a scan
/// early.
#[derive(Clone)]
pub struct Bucket {
    entries: Vec<HashEntry>,
    cursor: usize,
}

impl Bucket {
    fn new(depth: usize) -> Self {
        Bucket { entries: vec![HashEntry::EMPTY; depth], cursor: 0 }
    }

    fn insert(&mut self, entry: HashEntry) {
        self.entries[self.cursor] = entry;
        self.cursor = (self.cursor + 1) % self.entries.len();
    }

    /// All live entries, most-recently-inserted not necessarily first (ring
    /// order), stopping at the first empty slot.
    pub fn iter(&self) -> impl Iterator<Item = HashEntry> + '_ {
        self.entries.iter().copied().take_while(|e| !e.is_empty())
    }

    fn shift(&mut self, delta: u32) {
        for e in &mut self.entries {
            if e.is_empty() {
                continue;
            }
            if e.position < delta {
                *e = HashEntry::EMPTY;
            } else {
                e.position -= delta;
            }
        }
    }
}

pub struct BucketHashIndex {
    buckets: Vec<Bucket>,
    input_len: u32,
    hash_bits: u32,
}

impl BucketHashIndex {
    pub fn new(input_len: u32, hash_bits: u32, bucket_size: usize) -> Self {
        assert!((2..=8).contains(&input_len));
        assert!(hash_bits <= (8 * input_len).min(24));
        assert!(bucket_size > 0);
        BucketHashIndex {
            buckets: vec![Bucket::new(bucket_size); 1 << hash_bits],
            input_len,
            hash_bits,
        }
    }

    fn slot(&self, le64_value: u64) -> usize {
        hash_prefix(le64_value, self.input_len, self.hash_bits) as usize
    }

    /// Borrow the bucket a given prefix hashes to, for scans that need more
    /// than the bounded `Mapper::get` result (e.g. BUP's "pick the strictly
    /// longer match" policy).
    pub fn bucket_for(&self, le64_value: u64) -> &Bucket {
        &self.buckets[self.slot(le64_value)]
    }
}

impl Mapper for BucketHashIndex {
    fn put(&mut self, pos: u32, le64_value: u64) {
        let slot = self.slot(le64_value);
        self.buckets[slot].insert(HashEntry { position: pos, value: le64_value as u32 });
    }

    fn get(&self, le64_value: u64, out: &mut Vec<HashEntry>) {
        let bucket = &self.buckets[self.slot(le64_value)];
        out.extend(bucket.iter().filter(|e| e.value == le64_value as u32));
    }

    fn shift(&mut self, delta: u32) {
        for b in &mut self.buckets {
            b.shift(delta);
        }
    }

    fn reset(&mut self) {
        for b in &mut self.buckets {
            *b = Bucket::new(b.entries.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_preserves_k_most_recent_on_collision() {
        let mut idx = BucketHashIndex::new(4, 4, 3);
        // Force four puts into the exact same slot by reusing the hashed
        // value directly (input_len masks to the low 4 bytes, so varying
        // only the high bytes keeps the same slot and the same `value`).
        let base = 0x1234_5678u64;
        for i in 0..4u32 {
            idx.put(i + 1, base | ((i as u64) << 32));
        }
        let bucket = idx.bucket_for(base);
        // depth 3: the oldest insertion (position 1) should have been evicted.
        let positions: Vec<u32> = bucket.iter().map(|e| e.position).collect();
        assert_eq!(positions.len(), 3);
        assert!(!positions.contains(&1));
        assert!(positions.contains(&4));
    }

    #[test]
    fn get_filters_by_value_within_bucket() {
        let mut idx = BucketHashIndex::new(4, 4, 8);
        idx.put(1, 0xAAAA_AAAA_1111_1111);
        idx.put(2, 0xBBBB_BBBB_2222_2222);
        let mut out = Vec::new();
        idx.get(0xAAAA_AAAA_1111_1111, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].position, 1);
    }

    #[test]
    fn shift_evicts_and_renumbers_bucket_entries() {
        let mut idx = BucketHashIndex::new(4, 4, 4);
        idx.put(3, 0x42);
        idx.put(100, 0x42);
        idx.shift(50);
        let mut out = Vec::new();
        idx.get(0x42, &mut out);
        let positions: Vec<u32> = out.iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![50]);
    }
}
