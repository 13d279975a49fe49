//! Keyed and full reductions over sorted key streams.

use core_types::OpBinary;

/// Collapse runs of equal keys in a sorted stream, reducing their values
/// with `op`. Returns the surviving keys and reduced value bytes.
pub fn reduce_by_key(
    keys: &[u32],
    vals: &[u8],
    byte_size: usize,
    op: &OpBinary,
) -> (Vec<u32>, Vec<u8>) {
    let mut out_keys = Vec::new();
    let mut out_vals = Vec::new();
    let mut acc = vec![0u8; byte_size];
    let mut tmp = vec![0u8; byte_size];

    let mut i = 0;
    while i < keys.len() {
        let key = keys[i];
        acc.copy_from_slice(&vals[i * byte_size..(i + 1) * byte_size]);
        let mut j = i + 1;
        while j < keys.len() && keys[j] == key {
            op.eval(&acc, &vals[j * byte_size..(j + 1) * byte_size], &mut tmp);
            acc.copy_from_slice(&tmp);
            j += 1;
        }
        out_keys.push(key);
        out_vals.extend_from_slice(&acc);
        i = j;
    }
    (out_keys, out_vals)
}

/// Pattern-path counterpart of [`reduce_by_key`]: drop duplicate keys from a
/// sorted stream, keeping the first occurrence.
pub fn reduce_duplicates(keys: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(keys.len());
    for &key in keys {
        if out.last() != Some(&key) {
            out.push(key);
        }
    }
    out
}

/// Fold every element of a value stream into `init` with `op`.
pub fn reduce_all(vals: &[u8], byte_size: usize, op: &OpBinary, init: &[u8]) -> Vec<u8> {
    let mut acc = init.to_vec();
    let mut tmp = vec![0u8; byte_size];
    for chunk in vals.chunks_exact(byte_size) {
        op.eval(&acc, chunk, &mut tmp);
        acc.copy_from_slice(&tmp);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::functions::PLUS_INT;
    use core_types::Scalar;

    #[test]
    fn reduce_by_key_collapses_runs() {
        let keys = [0u32, 0, 1, 3, 3, 3];
        let vals = i32::encode_vec(&[1, 2, 10, 1, 1, 1]);
        let (out_keys, out_vals) = reduce_by_key(&keys, &vals, 4, &PLUS_INT);
        assert_eq!(out_keys, vec![0, 1, 3]);
        assert_eq!(i32::decode_vec(&out_vals), vec![3, 10, 3]);
    }

    #[test]
    fn reduce_by_key_is_idempotent_on_reduced_streams() {
        let keys = [2u32, 2, 5];
        let vals = i32::encode_vec(&[4, 5, 6]);
        let (k1, v1) = reduce_by_key(&keys, &vals, 4, &PLUS_INT);
        let (k2, v2) = reduce_by_key(&k1, &v1, 4, &PLUS_INT);
        assert_eq!(k1, k2);
        assert_eq!(v1, v2);
    }

    #[test]
    fn reduce_duplicates_keeps_first() {
        assert_eq!(reduce_duplicates(&[0, 0, 1, 1, 1, 4]), vec![0, 1, 4]);
        assert!(reduce_duplicates(&[]).is_empty());
    }

    #[test]
    fn reduce_all_folds_with_init() {
        let vals = i32::encode_vec(&[1, 2, 3]);
        let init = i32::encode_vec(&[10]);
        let out = reduce_all(&vals, 4, &PLUS_INT, &init);
        assert_eq!(i32::decode_vec(&out), vec![16]);
    }
}
