//! Index and byte-strided gathers.

use rayon::prelude::*;

/// `out[i] = src[indices[i]]`.
pub fn gather(indices: &[u32], src: &[u32]) -> Vec<u32> {
    indices.par_iter().map(|&i| src[i as usize]).collect()
}

/// Byte-strided gather: `out[i] = src[locations[i]]` where every element is
/// `byte_size` bytes wide.
pub fn gather_bytes(locations: &[u32], src: &[u8], byte_size: usize) -> Vec<u8> {
    if byte_size == 0 {
        return Vec::new();
    }
    let mut out = vec![0u8; locations.len() * byte_size];
    out.par_chunks_mut(byte_size)
        .zip(locations.par_iter())
        .for_each(|(dst, &loc)| {
            let at = loc as usize * byte_size;
            dst.copy_from_slice(&src[at..at + byte_size]);
        });
    out
}
