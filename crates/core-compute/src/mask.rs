//! Mask application over sorted index streams.

/// Filter `keys`/`vals` against a sorted mask row set. With
/// `complement = false` only keys present in the mask survive; with
/// `complement = true` only keys absent from it do. Values are filtered in
/// lockstep by byte stride.
pub fn apply_mask(
    mask: &[u32],
    keys: &[u32],
    vals: &[u8],
    byte_size: usize,
    complement: bool,
) -> (Vec<u32>, Vec<u8>) {
    let mut out_keys = Vec::new();
    let mut out_vals = Vec::new();
    let mut m = 0;
    for (i, &key) in keys.iter().enumerate() {
        while m < mask.len() && mask[m] < key {
            m += 1;
        }
        let selected = m < mask.len() && mask[m] == key;
        if selected != complement {
            out_keys.push(key);
            if byte_size > 0 {
                out_vals.extend_from_slice(&vals[i * byte_size..(i + 1) * byte_size]);
            }
        }
    }
    (out_keys, out_vals)
}

/// Pattern-path mask: filter a sorted key stream only.
pub fn mask_keys(mask: &[u32], keys: &[u32], complement: bool) -> Vec<u32> {
    apply_mask(mask, keys, &[], 0, complement).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Scalar;

    #[test]
    fn intersect_keeps_masked_positions() {
        let vals = i32::encode_vec(&[10, 20, 30]);
        let (keys, out) = apply_mask(&[1, 4], &[0, 1, 4], &vals, 4, false);
        assert_eq!(keys, vec![1, 4]);
        assert_eq!(i32::decode_vec(&out), vec![20, 30]);
    }

    #[test]
    fn complement_drops_masked_positions() {
        let vals = i32::encode_vec(&[10, 20, 30]);
        let (keys, out) = apply_mask(&[1, 4], &[0, 1, 4], &vals, 4, true);
        assert_eq!(keys, vec![0]);
        assert_eq!(i32::decode_vec(&out), vec![10]);
    }

    #[test]
    fn empty_mask_without_complement_selects_nothing() {
        let (keys, vals) = apply_mask(&[], &[0, 1, 2], &[], 0, false);
        assert!(keys.is_empty());
        assert!(vals.is_empty());
    }

    #[test]
    fn empty_mask_with_complement_selects_everything() {
        assert_eq!(mask_keys(&[], &[0, 1, 2], true), vec![0, 1, 2]);
    }
}
