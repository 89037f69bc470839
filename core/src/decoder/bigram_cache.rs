//! `BigramCache`: bounded memoisation of bigram probabilities keyed by
//! previous-word trie position, grounded on `multi_bigram_map.h`'s
//! `MultiBigramMap`/`BigramMap`. `bloom_filter.h` itself was not present in
//! the retrieved source pack, so the bit-array size/hash count below are
//! this crate's own reasonable choice rather than a transcription — see
//! DESIGN.md.

use ahash::AHashMap;
use lru::LruCache;
use std::num::NonZeroUsize;

use super::types::TriePos;

const BLOOM_BITS: usize = 1024;
const BLOOM_HASHES: usize = 4;

/// Small fixed-size bloom filter used to short-circuit misses in a
/// [`BigramMap`] before touching the backing hash map.
#[derive(Debug, Clone)]
struct BloomFilter {
    bits: Vec<u64>,
}

impl BloomFilter {
    fn new() -> Self {
        BloomFilter { bits: vec![0u64; BLOOM_BITS / 64] }
    }

    fn hash(seed: u32, key: TriePos) -> usize {
        let mut h = (key as u64) ^ ((seed as u64).wrapping_mul(0x9E3779B97F4A7C15));
        h ^= h >> 33;
        h = h.wrapping_mul(0xff51afd7ed558ccd);
        h ^= h >> 33;
        (h as usize) % BLOOM_BITS
    }

    fn set(&mut self, key: TriePos) {
        for seed in 0..BLOOM_HASHES as u32 {
            let bit = Self::hash(seed, key);
            self.bits[bit / 64] |= 1 << (bit % 64);
        }
    }

    /// `true` means "possibly present"; `false` means "definitely absent".
    fn maybe_contains(&self, key: TriePos) -> bool {
        (0..BLOOM_HASHES as u32).all(|seed| {
            let bit = Self::hash(seed, key);
            self.bits[bit / 64] & (1 << (bit % 64)) != 0
        })
    }
}

/// Cached bigram probabilities for a single previous-word context.
#[derive(Debug, Clone)]
struct BigramMap {
    probabilities: AHashMap<TriePos, i32>,
    bloom: BloomFilter,
}

impl BigramMap {
    fn new() -> Self {
        BigramMap { probabilities: AHashMap::new(), bloom: BloomFilter::new() }
    }

    fn insert(&mut self, next_word_pos: TriePos, probability: i32) {
        self.bloom.set(next_word_pos);
        self.probabilities.insert(next_word_pos, probability);
    }

    fn get(&self, next_word_pos: TriePos) -> Option<i32> {
        if !self.bloom.maybe_contains(next_word_pos) {
            return None;
        }
        self.probabilities.get(&next_word_pos).copied()
    }
}

/// Bounded cache over bigram maps for multiple previous-word contexts, so a
/// multi-word beam search only walks a dictionary's bigram list once per
/// distinct previous word, no matter how many child hypotheses need it.
pub struct BigramCache {
    maps: LruCache<TriePos, BigramMap>,
}

impl BigramCache {
    pub fn new(max_contexts: usize) -> Self {
        let cap = NonZeroUsize::new(max_contexts.max(1)).unwrap();
        BigramCache { maps: LruCache::new(cap) }
    }

    /// Record that `next_word_pos` follows `prev_word_pos` with the given
    /// encoded bigram probability. Lazily creates the context's map.
    pub fn record(&mut self, prev_word_pos: TriePos, next_word_pos: TriePos, probability: i32) {
        if !self.maps.contains(&prev_word_pos) {
            self.maps.put(prev_word_pos, BigramMap::new());
        }
        if let Some(map) = self.maps.get_mut(&prev_word_pos) {
            map.insert(next_word_pos, probability);
        }
    }

    /// Look up a previously recorded bigram probability, if any. Returns
    /// `None` both when the context has never been seen and when the
    /// context's bloom filter rules out `next_word_pos` outright.
    pub fn get(&mut self, prev_word_pos: TriePos, next_word_pos: TriePos) -> Option<i32> {
        self.maps.get(&prev_word_pos).and_then(|map| map.get(next_word_pos))
    }

    /// `true` if this previous-word context has been populated already,
    /// so callers can avoid re-walking the dictionary's bigram list for it.
    pub fn has_context(&mut self, prev_word_pos: TriePos) -> bool {
        self.maps.contains(&prev_word_pos)
    }

    pub fn clear(&mut self) {
        self.maps.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_retrieves_probability() {
        let mut cache = BigramCache::new(4);
        cache.record(1, 2, 200);
        assert_eq!(cache.get(1, 2), Some(200));
        assert_eq!(cache.get(1, 3), None);
    }

    #[test]
    fn evicts_oldest_context_beyond_capacity() {
        let mut cache = BigramCache::new(2);
        cache.record(1, 10, 1);
        cache.record(2, 20, 2);
        cache.record(3, 30, 3);
        assert!(!cache.has_context(1));
        assert!(cache.has_context(2) || cache.has_context(3));
    }
}
