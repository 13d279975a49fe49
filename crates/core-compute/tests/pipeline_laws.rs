//! Property coverage for the primitive pipeline: scan sums, sort-by-key
//! permutation/ordering/stability, and reduce-by-key idempotence.

use core_compute::{exclusive_scan, reduce_by_key, sort_by_key, ComputeParams};
use core_types::functions::PLUS_UINT;
use core_types::Scalar;
use proptest::prelude::*;

fn tiny_blocks() -> ComputeParams {
    // Force multi-block radix behavior on small generated inputs.
    ComputeParams {
        block_size: 8,
        bitonic_max: 16,
    }
}

proptest! {
    #[test]
    fn exclusive_scan_partial_sums(input in proptest::collection::vec(0u32..100, 0..200)) {
        let out = exclusive_scan(&input);
        prop_assert_eq!(out.len(), input.len() + 1);
        prop_assert_eq!(out[0], 0);
        let mut acc = 0u32;
        for (i, &v) in input.iter().enumerate() {
            prop_assert_eq!(out[i], acc);
            acc += v;
        }
        prop_assert_eq!(*out.last().unwrap(), acc);
    }

    #[test]
    fn sort_by_key_is_a_stable_permutation(keys in proptest::collection::vec(0u32..32, 0..400)) {
        // Tag every element with its input position so stability is
        // observable through the value stream.
        let tags: Vec<u32> = (0..keys.len() as u32).collect();
        let mut sorted_keys = keys.clone();
        let mut sorted_tags = u32::encode_vec(&tags);
        sort_by_key(&mut sorted_keys, &mut sorted_tags, 4, &tiny_blocks());
        let sorted_tags = u32::decode_vec(&sorted_tags);

        // Permutation of the input.
        let mut expect = keys.clone();
        expect.sort_unstable();
        let mut got = sorted_keys.clone();
        got.sort_unstable();
        prop_assert_eq!(expect, got);

        // Non-decreasing keys; equal-key runs preserve input order.
        for i in 1..sorted_keys.len() {
            prop_assert!(sorted_keys[i - 1] <= sorted_keys[i]);
            if sorted_keys[i - 1] == sorted_keys[i] {
                prop_assert!(sorted_tags[i - 1] < sorted_tags[i]);
            }
        }
        for (i, &tag) in sorted_tags.iter().enumerate() {
            prop_assert_eq!(keys[tag as usize], sorted_keys[i]);
        }
    }

    #[test]
    fn reduce_after_sort_is_idempotent(keys in proptest::collection::vec(0u32..16, 0..120)) {
        let vals: Vec<u32> = (0..keys.len() as u32).collect();

        let mut k1 = keys.clone();
        let mut v1 = u32::encode_vec(&vals);
        sort_by_key(&mut k1, &mut v1, 4, &tiny_blocks());
        let (rk1, rv1) = reduce_by_key(&k1, &v1, 4, &PLUS_UINT);

        let mut k2 = k1.clone();
        let mut v2 = v1.clone();
        sort_by_key(&mut k2, &mut v2, 4, &tiny_blocks());
        let (rk2, rv2) = reduce_by_key(&k2, &v2, 4, &PLUS_UINT);

        prop_assert_eq!(rk1, rk2);
        prop_assert_eq!(rv1, rv2);
    }
}
