//! Bloom filter sizing.
//!
//! - m = -n * ln(fpr) / (ln 2)^2
//! - k = (m / n) * ln 2
//! - FPR = (1 - e^(-kn/m))^k

use std::f64::consts::LN_2;

/// Sizing for one filter.
#[derive(Clone, Debug, PartialEq)]
pub struct BloomFilterParams {
    pub size_bits: usize,
    pub hash_count: usize,
    /// FPR predicted for `size_bits` and `hash_count` at the planned load.
    pub expected_fpr: f64,
}

/// Size a filter for `num_elements` identifiers at `target_fpr`.
///
/// An empty set gets a one-bit filter that rejects everything.
pub fn calculate_optimal_parameters(num_elements: usize, target_fpr: f64) -> BloomFilterParams {
    if num_elements == 0 {
        return BloomFilterParams {
            size_bits: 1,
            hash_count: 1,
            expected_fpr: 0.0,
        };
    }

    let n = num_elements as f64;
    let size_bits = ((-n * target_fpr.ln() / (LN_2 * LN_2)).ceil() as usize).max(1);
    let hash_count = (((size_bits as f64 / n) * LN_2).round() as usize).clamp(1, 32);

    BloomFilterParams {
        size_bits,
        hash_count,
        expected_fpr: calculate_fpr(size_bits, num_elements, hash_count),
    }
}

pub fn calculate_fpr(m: usize, n: usize, k: usize) -> f64 {
    if m == 0 {
        return 1.0;
    }
    let exponent = -(k as f64) * (n as f64) / (m as f64);
    (1.0 - exponent.exp()).powi(k as i32)
}
