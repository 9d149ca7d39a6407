//! Bloom filter over raw identifier bytes.
//!
//! INVARIANTS:
//! - No false negatives: after `insert(x)`, `contains(x)` is true.
//! - FPR at the planned load is at most the target passed to `with_fpr`.

use bitvec::prelude::*;

use super::hash_functions::hash_positions;
use super::parameters::{calculate_fpr, calculate_optimal_parameters};
use crate::error::FilterError;

#[derive(Clone, Debug)]
pub struct BloomFilter {
    bits: BitVec<u8, Lsb0>,
    /// Number of hash functions (k)
    k: usize,
    /// Size in bits (m)
    m: usize,
    /// Number of elements inserted (n)
    n: usize,
}

impl BloomFilter {
    /// Create an empty filter of `m` bits and `k` hash functions.
    pub fn new(m: usize, k: usize) -> Result<Self, FilterError> {
        if m == 0 || k == 0 {
            return Err(FilterError::InvalidParameters(format!(
                "m and k must be positive (m={}, k={})",
                m, k
            )));
        }
        Ok(Self {
            bits: bitvec![u8, Lsb0; 0; m],
            k,
            m,
            n: 0,
        })
    }

    /// Create a filter sized for `expected_elements` at `target_fpr`.
    pub fn with_fpr(expected_elements: usize, target_fpr: f64) -> Result<Self, FilterError> {
        if !(target_fpr > 0.0 && target_fpr < 1.0) {
            return Err(FilterError::InvalidFpr { fpr: target_fpr });
        }
        let params = calculate_optimal_parameters(expected_elements, target_fpr);
        Self::new(params.size_bits, params.hash_count)
    }

    pub fn insert(&mut self, element: &[u8]) {
        for pos in hash_positions(element, self.k, self.m) {
            self.bits.set(pos, true);
        }
        self.n += 1;
    }

    /// `false` means definitely absent.
    pub fn contains(&self, element: &[u8]) -> bool {
        hash_positions(element, self.k, self.m).all(|pos| self.bits[pos])
    }

    pub fn false_positive_rate(&self) -> f64 {
        calculate_fpr(self.m, self.n, self.k)
    }

    pub fn bits_set(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn size_bits(&self) -> usize {
        self.m
    }

    pub fn hash_count(&self) -> usize {
        self.k
    }

    pub fn elements_inserted(&self) -> usize {
        self.n
    }
}
