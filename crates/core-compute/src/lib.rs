//! Reusable sparse primitives executed on the host.
//!
//! These are the building blocks every high-level algorithm composes:
//! scans, gathers, conditional scatters, sort-by-key, keyed reductions,
//! mask application, value transforms, and index/offset conversion. The
//! implementations keep the same block-structured shapes as their device
//! counterparts (fixed-size blocks, per-block histograms, scan of block
//! sums) so both backends compute identical results; block-local stages run
//! under `rayon` where elements are independent.
//!
//! Values travel as raw bytes with an explicit element byte width. A width
//! of zero (pattern operands) degenerates every value stage to a no-op.

mod gather;
mod mask;
mod offsets;
mod reduce;
mod scan;
mod scatter;
mod sort;
mod transform;

pub use gather::{gather, gather_bytes};
pub use mask::{apply_mask, mask_keys};
pub use offsets::indices_to_row_offsets;
pub use reduce::{reduce_all, reduce_by_key, reduce_duplicates};
pub use scan::{exclusive_scan, inclusive_scan_max};
pub use scatter::scatter_if_counting;
pub use sort::{sort_by_key, sort_by_key_bitonic, sort_by_key_radix};
pub use transform::transform_values;

/// Tuning knobs threaded from engine configuration into the primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeParams {
    /// Elements per block for block-structured stages (radix histograms,
    /// scatter). Must be a power of two.
    pub block_size: usize,
    /// Largest input routed to the bitonic sort path; anything bigger takes
    /// the radix path.
    pub bitonic_max: usize,
}

impl Default for ComputeParams {
    fn default() -> Self {
        Self {
            block_size: 1024,
            bitonic_max: 1 << 15,
        }
    }
}
