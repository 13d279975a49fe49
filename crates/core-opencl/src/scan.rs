//! Device exclusive scan over uint counters.

use ocl::Buffer;

use core_program::{Program, ProgramBuilder};
use core_types::Result;

use crate::accelerator::ClAccelerator;
use crate::alloc::ClAllocScratch;
use crate::compiler::map_cl_err;
use crate::kernels;

/// Exclusive plus-scan of `n` uints stored in `input` (byte buffer), scan
/// written to `output`; returns the grand total. Hierarchical: per-block
/// scans, recursive scan of block sums, then propagation.
pub fn cl_exclusive_scan(
    acc: &ClAccelerator,
    input: &Buffer<u8>,
    output: &Buffer<u8>,
    n: u32,
    block_size: u32,
    scratch: &ClAllocScratch,
) -> Result<u32> {
    if n == 0 {
        return Ok(0);
    }
    let program = ProgramBuilder::new(acc.cache())
        .set_name("scan")
        .add_define("BLOCK_SIZE", i64::from(block_size))
        .set_source(kernels::SCAN)
        .acquire()?;

    let n_blocks = n.div_ceil(block_size);
    let block_sums = scratch.alloc(n_blocks as usize * 4)?;

    let scan_block = program.make_kernel("scan_block")?;
    let kernel = scan_block
        .builder()
        .global_work_size(n_blocks as usize)
        .arg(input)
        .arg(output)
        .arg(&block_sums)
        .arg(n)
        .build()
        .map_err(map_cl_err)?;
    unsafe { kernel.enq().map_err(map_cl_err)? };

    if n_blocks == 1 {
        let mut total = [0u8; 4];
        block_sums
            .cmd()
            .read(&mut total[..])
            .enq()
            .map_err(map_cl_err)?;
        return Ok(u32::from_le_bytes(total));
    }

    // Scan the block sums, then fold the scanned offsets back in.
    let block_offsets = scratch.alloc(n_blocks as usize * 4)?;
    let total = cl_exclusive_scan(acc, &block_sums, &block_offsets, n_blocks, block_size, scratch)?;

    let propagate = program.make_kernel("scan_propagate")?;
    let kernel = propagate
        .builder()
        .global_work_size(n as usize)
        .arg(output)
        .arg(&block_offsets)
        .arg(n)
        .build()
        .map_err(map_cl_err)?;
    unsafe { kernel.enq().map_err(map_cl_err)? };

    Ok(total)
}
