//! Stable sort-by-key over 32-bit keys with byte-strided values.
//!
//! Two paths, selected by input size: a bitonic network for small inputs and
//! a 4-bit-digit LSD radix sort for everything else. The radix path keeps
//! the device shape: per-block digit histograms laid out digit-major, one
//! exclusive scan to turn them into global destinations, then a stable
//! per-block scatter, four bits per pass from the LSB up to the highest bit
//! of the largest key. Bitonic networks are not order-preserving on equal
//! keys, so the small path compares `(key, input index)` pairs; both paths
//! therefore deliver the same stable ordering.

use rayon::prelude::*;
use tracing::trace;

use crate::scan::exclusive_scan;
use crate::ComputeParams;

const BITS_COUNT: u32 = 4;
const BITS_VALS: usize = 1 << BITS_COUNT;
const BITS_MASK: u32 = BITS_VALS as u32 - 1;

/// Stable sort of `keys` with `vals` carried along (`byte_size` bytes per
/// element; zero for pattern data).
pub fn sort_by_key(
    keys: &mut Vec<u32>,
    vals: &mut Vec<u8>,
    byte_size: usize,
    params: &ComputeParams,
) {
    let n = keys.len();
    if n <= 1 {
        return;
    }
    if n <= params.bitonic_max {
        sort_by_key_bitonic(keys, vals, byte_size);
    } else {
        sort_by_key_radix(keys, vals, byte_size, params, u32::MAX);
    }
}

/// Bitonic network path for small inputs.
///
/// Pads to a power of two with sentinel pairs that order after every real
/// element, runs the full merge network, then applies the resulting
/// permutation to the value bytes.
pub fn sort_by_key_bitonic(keys: &mut [u32], vals: &mut [u8], byte_size: usize) {
    let n = keys.len();
    if n <= 1 {
        return;
    }
    let cap = n.next_power_of_two();
    let mut items: Vec<(u32, u32)> = keys
        .iter()
        .copied()
        .zip(0..n as u32)
        .collect();
    items.resize(cap, (u32::MAX, u32::MAX));

    let mut k = 2;
    while k <= cap {
        let mut j = k / 2;
        while j > 0 {
            for i in 0..cap {
                let partner = i ^ j;
                if partner > i {
                    let ascending = (i & k) == 0;
                    if (ascending && items[i] > items[partner])
                        || (!ascending && items[i] < items[partner])
                    {
                        items.swap(i, partner);
                    }
                }
            }
            j /= 2;
        }
        k *= 2;
    }

    for (i, &(key, _)) in items.iter().take(n).enumerate() {
        keys[i] = key;
    }
    if byte_size > 0 {
        let src = vals.to_vec();
        for (i, &(_, from)) in items.iter().take(n).enumerate() {
            let from = from as usize * byte_size;
            vals[i * byte_size..(i + 1) * byte_size]
                .copy_from_slice(&src[from..from + byte_size]);
        }
    }
}

/// Radix LSD path: per-digit passes of histogram, scan, scatter.
///
/// `max_key` bounds the number of passes; callers that know their key range
/// (e.g. column indices below `n_cols`) pass it to skip dead digits.
pub fn sort_by_key_radix(
    keys: &mut Vec<u32>,
    vals: &mut Vec<u8>,
    byte_size: usize,
    params: &ComputeParams,
    max_key: u32,
) {
    let n = keys.len();
    if n <= 1 {
        return;
    }
    let block_size = params.block_size.max(1);
    let n_blocks = n.div_ceil(block_size);

    let bits_in_max_key = 32 - max_key.max(1).leading_zeros();
    let max_bits = bits_in_max_key.div_ceil(BITS_COUNT) * BITS_COUNT;
    let max_bits = max_bits.min(32);
    trace!(target: "compute.sort", n, n_blocks, max_bits, "radix sort");

    let mut in_keys = std::mem::take(keys);
    let mut in_vals = std::mem::take(vals);
    let mut out_keys = vec![0u32; n];
    let mut out_vals = vec![0u8; n * byte_size];

    let mut shift = 0u32;
    while shift < max_bits {
        // Per-block digit counts, collected in parallel, then laid out
        // digit-major so one exclusive scan yields global destinations
        // ordered by (digit, block).
        let block_counts: Vec<[u32; BITS_VALS]> = in_keys
            .par_chunks(block_size)
            .map(|chunk| {
                let mut counts = [0u32; BITS_VALS];
                for &key in chunk {
                    counts[((key >> shift) & BITS_MASK) as usize] += 1;
                }
                counts
            })
            .collect();

        let mut histogram = vec![0u32; BITS_VALS * n_blocks];
        for (block, counts) in block_counts.iter().enumerate() {
            for (digit, &count) in counts.iter().enumerate() {
                histogram[digit * n_blocks + block] = count;
            }
        }
        let bases = exclusive_scan(&histogram);

        // Stable scatter: blocks in order, input order within a block.
        for (block, chunk) in in_keys.chunks(block_size).enumerate() {
            let mut cursor = [0u32; BITS_VALS];
            for (offset, &key) in chunk.iter().enumerate() {
                let i = block * block_size + offset;
                let digit = ((key >> shift) & BITS_MASK) as usize;
                let dst = (bases[digit * n_blocks + block] + cursor[digit]) as usize;
                cursor[digit] += 1;
                out_keys[dst] = key;
                if byte_size > 0 {
                    out_vals[dst * byte_size..(dst + 1) * byte_size]
                        .copy_from_slice(&in_vals[i * byte_size..(i + 1) * byte_size]);
                }
            }
        }

        std::mem::swap(&mut in_keys, &mut out_keys);
        std::mem::swap(&mut in_vals, &mut out_vals);
        shift += BITS_COUNT;
    }

    *keys = in_keys;
    *vals = in_vals;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ComputeParams {
        ComputeParams::default()
    }

    #[test]
    fn radix_reference_scenario() {
        // keys [4,2,4,1] values [a,b,c,d] -> keys [1,2,4,4] values [d,b,a,c]
        let mut keys = vec![4u32, 2, 4, 1];
        let mut vals = vec![b'a', b'b', b'c', b'd'];
        sort_by_key_radix(&mut keys, &mut vals, 1, &params(), 4);
        assert_eq!(keys, vec![1, 2, 4, 4]);
        assert_eq!(vals, vec![b'd', b'b', b'a', b'c']);
    }

    #[test]
    fn bitonic_matches_radix_and_is_stable() {
        let mut keys_a = vec![7u32, 3, 7, 3, 0, 7];
        let mut vals_a = vec![0u8, 1, 2, 3, 4, 5];
        let mut keys_b = keys_a.clone();
        let mut vals_b = vals_a.clone();
        sort_by_key_bitonic(&mut keys_a, &mut vals_a, 1);
        sort_by_key_radix(&mut keys_b, &mut vals_b, 1, &params(), u32::MAX);
        assert_eq!(keys_a, vec![0, 3, 3, 7, 7, 7]);
        assert_eq!(vals_a, vec![4, 1, 3, 0, 2, 5]);
        assert_eq!(keys_a, keys_b);
        assert_eq!(vals_a, vals_b);
    }

    #[test]
    fn single_element_is_noop() {
        let mut keys = vec![9u32];
        let mut vals = vec![1u8, 2, 3, 4];
        sort_by_key(&mut keys, &mut vals, 4, &params());
        assert_eq!(keys, vec![9]);
        assert_eq!(vals, vec![1, 2, 3, 4]);
    }

    #[test]
    fn radix_with_many_blocks() {
        let small_blocks = ComputeParams {
            block_size: 4,
            bitonic_max: 0,
        };
        let mut keys: Vec<u32> = (0..257u32).rev().collect();
        let mut vals: Vec<u8> = (0..257u32).rev().map(|v| (v % 251) as u8).collect();
        sort_by_key(&mut keys, &mut vals, 1, &small_blocks);
        let sorted: Vec<u32> = (0..257).collect();
        assert_eq!(keys, sorted);
        assert_eq!(vals[0], 0);
        assert_eq!(vals[256], (256 % 251) as u8);
    }

    #[test]
    fn sentinel_keys_survive_bitonic() {
        let mut keys = vec![u32::MAX, 0, u32::MAX, 5];
        let mut vals = vec![10u8, 11, 12, 13];
        sort_by_key_bitonic(&mut keys, &mut vals, 1);
        assert_eq!(keys, vec![0, 5, u32::MAX, u32::MAX]);
        assert_eq!(vals, vec![11, 13, 10, 12]);
    }

    #[test]
    fn pattern_width_sort_keys_only() {
        let mut keys = vec![3u32, 1, 2];
        let mut vals = Vec::new();
        sort_by_key(&mut keys, &mut vals, 0, &params());
        assert_eq!(keys, vec![1, 2, 3]);
        assert!(vals.is_empty());
    }
}
