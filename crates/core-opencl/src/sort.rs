//! Device sort-by-key: bitonic for small inputs, 4-bit radix LSD above.

use ocl::Buffer;

use core_program::{Program, ProgramBuilder};
use core_types::{Result, TypeRef};

use crate::accelerator::ClAccelerator;
use crate::alloc::ClAllocScratch;
use crate::compiler::map_cl_err;
use crate::kernels;
use crate::scan::cl_exclusive_scan;

const BITS_COUNT: u32 = 4;
const BITS_VALS: u32 = 1 << BITS_COUNT;
const BITS_MASK: u32 = BITS_VALS - 1;

fn floor_to_pow2(v: usize) -> usize {
    if v == 0 { 0 } else { 1 << (usize::BITS - 1 - v.leading_zeros()) }
}

/// Size-dispatching entry point; mirrors the host selector.
pub fn cl_sort_by_key(
    acc: &ClAccelerator,
    ty: &TypeRef,
    keys: &mut Buffer<u8>,
    values: &mut Buffer<u8>,
    n: u32,
    bitonic_max: u32,
    block_size: u32,
    scratch: &ClAllocScratch,
    max_key: u32,
) -> Result<()> {
    if n <= 1 {
        return Ok(());
    }
    if n <= bitonic_max {
        cl_sort_by_key_bitonic(acc, ty, keys, values, n)
    } else {
        cl_sort_by_key_radix(acc, ty, keys, values, n, block_size, scratch, max_key)
    }
}

/// One local pre-sort over power-of-two tiles sized by local memory, then a
/// single-group global merge.
pub fn cl_sort_by_key_bitonic(
    acc: &ClAccelerator,
    ty: &TypeRef,
    keys: &Buffer<u8>,
    values: &Buffer<u8>,
    n: u32,
) -> Result<()> {
    if n <= 1 {
        return Ok(());
    }
    let pair_size = 4 + ty.byte_size().max(1);
    let tile = floor_to_pow2(acc.local_mem_bytes() / pair_size).max(4);
    let threads = acc.max_wgs().min(tile / 2).max(1);

    let program = ProgramBuilder::new(acc.cache())
        .set_name("sort_bitonic")
        .add_define("BLOCK_SIZE", tile as i64)
        .add_type("TYPE", ty)
        .set_source(kernels::SORT_BITONIC)
        .acquire()?;

    let n_groups = (n as usize).div_ceil(tile);
    let local = program.make_kernel("bitonic_sort_local")?;
    let kernel = local
        .builder()
        .global_work_size(threads * n_groups)
        .local_work_size(threads)
        .arg(keys)
        .arg(values)
        .arg(n)
        .build()
        .map_err(map_cl_err)?;
    unsafe { kernel.enq().map_err(map_cl_err)? };

    if (n as usize) <= tile {
        return Ok(());
    }

    let global = program.make_kernel("bitonic_sort_global")?;
    let kernel = global
        .builder()
        .global_work_size(acc.max_wgs())
        .local_work_size(acc.max_wgs())
        .arg(keys)
        .arg(values)
        .arg(n)
        .arg(tile as u32 * 2)
        .build()
        .map_err(map_cl_err)?;
    unsafe { kernel.enq().map_err(map_cl_err)? };
    Ok(())
}

/// Per-digit histogram, scan, scatter passes from the LSB up to the
/// highest bit of `max_key`.
#[allow(clippy::too_many_arguments)]
pub fn cl_sort_by_key_radix(
    acc: &ClAccelerator,
    ty: &TypeRef,
    keys: &mut Buffer<u8>,
    values: &mut Buffer<u8>,
    n: u32,
    block_size: u32,
    scratch: &ClAllocScratch,
    max_key: u32,
) -> Result<()> {
    if n <= 1 {
        return Ok(());
    }
    let value_size = ty.byte_size().max(1);

    let program = ProgramBuilder::new(acc.cache())
        .set_name("sort_radix")
        .add_define("BLOCK_SIZE", i64::from(block_size))
        .add_define("BITS_VALS", i64::from(BITS_VALS))
        .add_define("BITS_MASK", i64::from(BITS_MASK))
        .add_type("TYPE", ty)
        .set_source(kernels::SORT_RADIX)
        .acquire()?;

    let n_blocks = n.div_ceil(block_size);
    let n_counts = n_blocks * BITS_VALS;

    // Double buffers co-located like the inputs they mirror.
    let (mut out_keys, mut out_values) = acc
        .general()
        .alloc_paired(n as usize * 4, n as usize * value_size)?;
    let ranks = scratch.alloc(n as usize * 4)?;
    let block_counts = scratch.alloc(n_counts as usize * 4)?;
    let digit_bases = scratch.alloc(n_counts as usize * 4)?;

    let bits_in_max_key = 32 - max_key.max(1).leading_zeros();
    let max_bits = (bits_in_max_key.div_ceil(BITS_COUNT) * BITS_COUNT).min(32);

    let local = program.make_kernel("radix_sort_local")?;
    let scatter = program.make_kernel("radix_sort_scatter")?;

    let mut in_keys = keys.clone();
    let mut in_values = values.clone();

    let mut shift = 0u32;
    while shift < max_bits {
        let kernel = local
            .builder()
            .global_work_size(n_blocks as usize)
            .arg(&in_keys)
            .arg(&ranks)
            .arg(&block_counts)
            .arg(n)
            .arg(shift)
            .build()
            .map_err(map_cl_err)?;
        unsafe { kernel.enq().map_err(map_cl_err)? };

        cl_exclusive_scan(acc, &block_counts, &digit_bases, n_counts, block_size, scratch)?;

        let kernel = scatter
            .builder()
            .global_work_size(n as usize)
            .arg(&in_keys)
            .arg(&in_values)
            .arg(&out_keys)
            .arg(&out_values)
            .arg(&ranks)
            .arg(&digit_bases)
            .arg(n)
            .arg(shift)
            .build()
            .map_err(map_cl_err)?;
        unsafe { kernel.enq().map_err(map_cl_err)? };

        std::mem::swap(&mut in_keys, &mut out_keys);
        std::mem::swap(&mut in_values, &mut out_values);
        shift += BITS_COUNT;
    }

    *keys = in_keys;
    *values = in_values;
    Ok(())
}
