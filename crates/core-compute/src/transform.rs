//! Paired value transform (stage 7 of the product pipeline).

use rayon::prelude::*;

use core_types::OpBinary;

/// For every product slot `k`, gather `a_vals[a_locations[k]]` and
/// `b_vals[b_locations[k]]` and combine them with `mult` into the output
/// stream. Element widths of the three streams come from the operator's
/// parameter types.
pub fn transform_values(
    a_locations: &[u32],
    b_locations: &[u32],
    a_vals: &[u8],
    b_vals: &[u8],
    ta_size: usize,
    tb_size: usize,
    tw_size: usize,
    mult: &OpBinary,
) -> Vec<u8> {
    debug_assert_eq!(a_locations.len(), b_locations.len());
    let mut out = vec![0u8; a_locations.len() * tw_size];
    out.par_chunks_mut(tw_size)
        .enumerate()
        .for_each(|(k, dst)| {
            let a_at = a_locations[k] as usize * ta_size;
            let b_at = b_locations[k] as usize * tb_size;
            mult.eval(
                &a_vals[a_at..a_at + ta_size],
                &b_vals[b_at..b_at + tb_size],
                dst,
            );
        });
    out
}
