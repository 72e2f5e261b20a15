//! Membership Filter
//!
//! A fixed-size bit array probed by `k` index functions derived from one
//! 64-bit hash pair (double hashing). Bits are packed into `u64` words and the
//! number of set bits is tracked incrementally so pop-count is O(1).
//!
//! Guarantees:
//! - **No false negatives**: an inserted value always tests `true`.
//! - **One-sided error**: a value never inserted may test `true`, with a
//!   probability that grows with the fill ratio.

use super::hash::{hash_pair, probe_index};
use crate::config::MAX_FILTER_BITS;
use crate::error::{EngineError, FilterShape, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitFilter {
    num_bits: u64,
    num_hashes: u16,
    seed: u64,
    bits_set: u64,
    words: Vec<u64>,
}

impl BitFilter {
    /// Creates an all-zero filter. `num_bits` and `num_hashes` must be non-zero;
    /// callers validate them through `SketchConfig::validate`.
    pub fn new(num_bits: u64, num_hashes: u16, seed: u64) -> Self {
        Self {
            num_bits,
            num_hashes,
            seed,
            bits_set: 0,
            words: vec![0; word_count(num_bits)],
        }
    }

    /// Rebuilds a filter from persisted parts, checking that the word array
    /// matches the declared size.
    pub fn from_parts(num_bits: u64, num_hashes: u16, seed: u64, words: Vec<u64>) -> Result<Self> {
        if num_bits == 0 {
            return Err(EngineError::corrupt("filter has zero bits"));
        }
        if num_bits > MAX_FILTER_BITS {
            return Err(EngineError::corrupt(format!(
                "filter declares {} bits, above the maximum of {}",
                num_bits, MAX_FILTER_BITS
            )));
        }
        if num_hashes == 0 {
            return Err(EngineError::corrupt("filter has zero hash functions"));
        }
        if words.len() != word_count(num_bits) {
            return Err(EngineError::corrupt(format!(
                "filter declares {} bits but carries {} words",
                num_bits,
                words.len()
            )));
        }
        let excess = num_bits % 64;
        if excess != 0 && words[words.len() - 1] >> excess != 0 {
            return Err(EngineError::corrupt("filter has bits set beyond its size"));
        }

        let bits_set = words.iter().map(|w| u64::from(w.count_ones())).sum();
        Ok(Self {
            num_bits,
            num_hashes,
            seed,
            bits_set,
            words,
        })
    }

    pub fn insert(&mut self, value: &[u8]) {
        let (h0, h1) = hash_pair(value, self.seed);
        for i in 1..=self.num_hashes {
            let idx = probe_index(h0, h1, i, self.num_bits);
            self.set_bit(idx);
        }
    }

    pub fn test(&self, value: &[u8]) -> bool {
        if self.bits_set == 0 {
            return false;
        }
        let (h0, h1) = hash_pair(value, self.seed);
        (1..=self.num_hashes).all(|i| self.get_bit(probe_index(h0, h1, i, self.num_bits)))
    }

    pub fn pop_count(&self) -> u64 {
        self.bits_set
    }

    /// Estimates the number of distinct inserted values from the fill ratio:
    /// `n = -(m / k) * ln(1 - X / m)` for `X` set bits.
    ///
    /// A completely full filter would diverge, so `X` is capped at `m - 1`;
    /// [`Self::max_cardinality`] is the resulting ceiling.
    pub fn approx_cardinality(&self) -> u64 {
        if self.bits_set == 0 {
            return 0;
        }
        let set = self.bits_set.min(self.num_bits.saturating_sub(1)).max(1);
        Self::solve_insertions(self.num_bits, self.num_hashes, set)
    }

    pub fn max_cardinality(&self) -> u64 {
        Self::solve_insertions(
            self.num_bits,
            self.num_hashes,
            self.num_bits.saturating_sub(1).max(1),
        )
    }

    fn solve_insertions(num_bits: u64, num_hashes: u16, bits_set: u64) -> u64 {
        let m = num_bits as f64;
        let k = f64::from(num_hashes);
        let x = bits_set as f64;
        if x >= m {
            // only reachable for a one-bit filter
            return 1;
        }
        let n = -(m / k) * (1.0 - x / m).ln();
        n.round() as u64
    }

    pub fn load_factor(&self) -> f64 {
        self.bits_set as f64 / self.num_bits as f64
    }

    /// Current false-positive probability `(1 - e^(-k n / m))^k`, with `n` taken
    /// from the filter's own cardinality estimate.
    pub fn estimated_fpp(&self) -> f64 {
        let k = f64::from(self.num_hashes);
        let n = self.approx_cardinality() as f64;
        let m = self.num_bits as f64;
        (1.0 - (-k * n / m).exp()).powf(k)
    }

    pub fn combine_and(&self, other: &BitFilter) -> Result<BitFilter> {
        self.combine(other, |a, b| a & b)
    }

    pub fn combine_or(&self, other: &BitFilter) -> Result<BitFilter> {
        self.combine(other, |a, b| a | b)
    }

    fn combine(&self, other: &BitFilter, op: impl Fn(u64, u64) -> u64) -> Result<BitFilter> {
        self.ensure_compatible(other)?;

        let mut bits_set = 0u64;
        let words = self
            .words
            .iter()
            .zip(&other.words)
            .map(|(a, b)| {
                let word = op(*a, *b);
                bits_set += u64::from(word.count_ones());
                word
            })
            .collect();

        Ok(BitFilter {
            num_bits: self.num_bits,
            num_hashes: self.num_hashes,
            seed: self.seed,
            bits_set,
            words,
        })
    }

    pub fn ensure_compatible(&self, other: &BitFilter) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(EngineError::DimensionMismatch {
                left: self.shape(),
                right: other.shape(),
            });
        }
        Ok(())
    }

    pub fn shape(&self) -> FilterShape {
        FilterShape {
            bits: self.num_bits,
            hashes: self.num_hashes,
            seed: self.seed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bits_set == 0
    }

    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    pub fn num_hashes(&self) -> u16 {
        self.num_hashes
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    #[inline]
    fn get_bit(&self, idx: u64) -> bool {
        let word = (idx >> 6) as usize;
        let mask = 1u64 << (idx & 63);
        self.words[word] & mask != 0
    }

    #[inline]
    fn set_bit(&mut self, idx: u64) {
        let word = (idx >> 6) as usize;
        let mask = 1u64 << (idx & 63);
        if self.words[word] & mask == 0 {
            self.words[word] |= mask;
            self.bits_set += 1;
        }
    }
}

fn word_count(num_bits: u64) -> usize {
    num_bits.div_ceil(64) as usize
}
