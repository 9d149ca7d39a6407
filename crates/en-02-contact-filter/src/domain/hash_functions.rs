//! Hash positions for the Bloom filter.
//!
//! MurmurHash3 x64/128 with two seeds, combined by double hashing:
//! `h(i) = h1 + i * h2 (mod m)`.

use std::io::Cursor;

fn murmur_hash(element: &[u8], seed: u32) -> u64 {
    // Reading from an in-memory cursor cannot fail.
    murmur3::murmur3_x64_128(&mut Cursor::new(element), seed).unwrap_or(0) as u64
}

/// The `k` bit positions of `element` in a filter of `m` bits.
pub fn hash_positions(element: &[u8], k: usize, m: usize) -> impl Iterator<Item = usize> {
    let h1 = murmur_hash(element, 0);
    let h2 = murmur_hash(element, 1);
    let m = m.max(1) as u64;

    (0..k).map(move |i| (h1.wrapping_add((i as u64).wrapping_mul(h2)) % m) as usize)
}
