//! Accelerated masked vector-matrix product.
//!
//! Same eleven-stage pipeline as the host algorithm, with every stage
//! enqueued on the device queue: segment gather, scan, head scatter and
//! spread, location unfold, column gather, value transform, sort-by-key,
//! keyed reduction, and mask compaction. Host round-trips are limited to
//! the scans' totals (the product count and the surviving-entry counts)
//! and the final result read-back.

use core_opencl::ocl::Buffer;
use core_opencl::{
    cl_exclusive_scan, cl_sort_by_key, kernels, map_cl_err, ClAccelerator, ClAllocScratch,
};
use core_program::{Program, ProgramBuilder};
use core_storage::{CooVec, VectorStorage};
use core_types::{EngineError, Result, Scalar, UINT};
use tracing::trace;

use crate::algo::{check_type, matrix_rows_view};
use crate::dispatch::DispatchContext;
use crate::registry::RegistryAlgo;
use crate::task::Task;

pub struct AlgoVxmCl;

impl RegistryAlgo for AlgoVxmCl {
    fn name(&self) -> &str {
        "vxm_masked"
    }

    fn description(&self) -> &str {
        "masked sparse vector times matrix on the accelerated backend"
    }

    fn execute(&self, ctx: &DispatchContext<'_>) -> Result<()> {
        let Task::VxmMasked {
            w,
            a,
            b,
            add,
            mult,
            mask,
            complement,
        } = ctx.task
        else {
            return Err(EngineError::InvalidState(
                "vxm algorithm dispatched with mismatched task".into(),
            ));
        };
        let Some(acc) = ctx.accel else {
            return Err(EngineError::NoAcceleration);
        };

        if a.n_rows() != b.n_rows() || w.n_rows() != b.n_cols() {
            return Err(EngineError::InvalidArgument(format!(
                "vxm: shapes do not agree (a: {}, b: {}x{}, w: {})",
                a.n_rows(),
                b.n_rows(),
                b.n_cols(),
                w.n_rows()
            )));
        }
        let has_values = w.ttype().has_values();
        let ops = if has_values {
            let (Some(add), Some(mult)) = (add, mult) else {
                return Err(EngineError::InvalidArgument(
                    "vxm: typed product requires add and mult operators".into(),
                ));
            };
            check_type("vxm mult left", mult.ta(), a.ttype())?;
            check_type("vxm mult right", mult.tb(), b.ttype())?;
            check_type("vxm mult result", mult.tr(), w.ttype())?;
            check_type("vxm add", add.tr(), w.ttype())?;
            Some((add, mult))
        } else {
            None
        };

        if let Some(mask) = mask {
            if !complement && mask.nvals() == 0 {
                w.clear();
                return Ok(());
            }
        }
        if a.nvals() == 0 || b.nvals() == 0 {
            w.clear();
            return Ok(());
        }

        let a_storage = a.read();
        let VectorStorage::Coo(a_block) = &*a_storage else {
            w.clear();
            return Ok(());
        };
        let b_storage = b.read();
        let view = matrix_rows_view(&b_storage, b.n_rows() as usize)?;
        let n = a_block.rows.len() as u32;

        let scratch = acc.scratch();
        let block_size = ctx.params.block_size as u32;

        let a_rows_d = upload_u32(acc, &a_block.rows)?;
        let lengths_d = upload_u32(acc, &view.lengths)?;
        let offsets_d = upload_u32(acc, &view.offsets)?;
        let cols_d = upload_u32(acc, view.cols)?;

        let structure = ProgramBuilder::new(acc.cache())
            .set_name("vxm")
            .set_source(kernels::VXM)
            .acquire()?;

        // Stages 1-2: segment lengths and their exclusive scan.
        let segment_lengths_d = scratch.alloc(n as usize * 4)?;
        enq(
            structure
                .make_kernel("vxm_segment_lengths")?
                .builder()
                .global_work_size(n as usize)
                .arg(&a_rows_d)
                .arg(&lengths_d)
                .arg(&segment_lengths_d)
                .arg(n),
        )?;
        let output_ptr_d = scratch.alloc(n as usize * 4)?;
        let products = cl_exclusive_scan(
            acc,
            &segment_lengths_d,
            &output_ptr_d,
            n,
            block_size,
            &scratch,
        )?;
        trace!(target: "algo.vxm_cl", nvals = n, products, "expanded");
        if products == 0 {
            drop(a_storage);
            drop(b_storage);
            w.clear();
            return Ok(());
        }
        let z = products;

        // Stage 4: zero-filled heads, scatter, max-spread.
        let a_locations_d = acc.general().alloc(z as usize * 4)?;
        a_locations_d
            .cmd()
            .fill(0u8, None)
            .enq()
            .map_err(map_cl_err)?;
        enq(
            structure
                .make_kernel("vxm_scatter_heads")?
                .builder()
                .global_work_size(n as usize)
                .arg(&output_ptr_d)
                .arg(&segment_lengths_d)
                .arg(&a_locations_d)
                .arg(n),
        )?;
        let spread_tmp_d = scratch.alloc(z as usize * 4)?;
        enq(
            structure
                .make_kernel("vxm_spread_heads")?
                .builder()
                .global_work_size(acc.max_wgs())
                .local_work_size(acc.max_wgs())
                .arg(&a_locations_d)
                .arg(&spread_tmp_d)
                .arg(z),
        )?;

        // Stages 5-6: matrix entry locations and their column indices.
        let b_locations_d = scratch.alloc(z as usize * 4)?;
        enq(
            structure
                .make_kernel("vxm_b_locations")?
                .builder()
                .global_work_size(z as usize)
                .arg(&a_locations_d)
                .arg(&a_rows_d)
                .arg(&offsets_d)
                .arg(&output_ptr_d)
                .arg(&b_locations_d)
                .arg(z),
        )?;
        let mut product_cols_d = acc.general().alloc(z as usize * 4)?;
        enq(
            structure
                .make_kernel("vxm_gather_cols")?
                .builder()
                .global_work_size(z as usize)
                .arg(&b_locations_d)
                .arg(&cols_d)
                .arg(&product_cols_d)
                .arg(z),
        )?;

        let max_key = b.n_cols().saturating_sub(1).min(u32::MAX as u64) as u32;
        let mask_rows = mask.as_ref().map(|mask| mask.to_rows());

        let result = match ops {
            Some((add, mult)) => {
                let tw = w.ttype();
                let tw_size = tw.byte_size();

                // Stage 7: value transform with the compiled mult kernel.
                let a_vals_d = upload_bytes(acc, &a_block.vals)?;
                let b_vals_d = upload_bytes(acc, view.vals)?;
                let mut product_vals_d = acc.general().alloc(z as usize * tw_size)?;
                let transform = ProgramBuilder::new(acc.cache())
                    .set_name("vxm_transform")
                    .add_type("TA", a.ttype())
                    .add_type("TB", b.ttype())
                    .add_type("TW", tw)
                    .add_op("OP_MULT", mult.clone())
                    .set_source(kernels::VXM_TRANSFORM)
                    .acquire()?;
                enq(
                    transform
                        .make_kernel("vxm_transform")?
                        .builder()
                        .global_work_size(z as usize)
                        .arg(&a_locations_d)
                        .arg(&b_locations_d)
                        .arg(&a_vals_d)
                        .arg(&b_vals_d)
                        .arg(&product_vals_d)
                        .arg(z),
                )?;

                // Stages 8-9: sort products by column, reduce equal columns.
                cl_sort_by_key(
                    acc,
                    tw,
                    &mut product_cols_d,
                    &mut product_vals_d,
                    z,
                    ctx.params.bitonic_max as u32,
                    block_size,
                    &scratch,
                    max_key,
                )?;
                let reduce = ProgramBuilder::new(acc.cache())
                    .set_name("reduce_by_key")
                    .add_type("TW", tw)
                    .add_op("OP_ADD", add.clone())
                    .set_source(kernels::REDUCE_BY_KEY)
                    .acquire()?;
                let flags_d = scratch.alloc(z as usize * 4)?;
                enq(
                    reduce
                        .make_kernel("reduce_head_flags")?
                        .builder()
                        .global_work_size(z as usize)
                        .arg(&product_cols_d)
                        .arg(&flags_d)
                        .arg(z),
                )?;
                let positions_d = scratch.alloc(z as usize * 4)?;
                let reduced =
                    cl_exclusive_scan(acc, &flags_d, &positions_d, z, block_size, &scratch)?;
                let (keys_d, vals_d) = acc
                    .general()
                    .alloc_paired(reduced as usize * 4, reduced as usize * tw_size)?;
                enq(
                    reduce
                        .make_kernel("reduce_emit_keys")?
                        .builder()
                        .global_work_size(z as usize)
                        .arg(&product_cols_d)
                        .arg(&flags_d)
                        .arg(&positions_d)
                        .arg(&keys_d)
                        .arg(z),
                )?;
                enq(
                    reduce
                        .make_kernel("reduce_fold_values")?
                        .builder()
                        .global_work_size(z as usize)
                        .arg(&product_cols_d)
                        .arg(&product_vals_d)
                        .arg(&flags_d)
                        .arg(&positions_d)
                        .arg(&vals_d)
                        .arg(z),
                )?;

                // Stage 10: mask compaction.
                let (keys_d, vals_d, kept) = match &mask_rows {
                    Some(mask_rows) => apply_mask_device(
                        acc,
                        &scratch,
                        tw,
                        block_size,
                        mask_rows,
                        &keys_d,
                        &vals_d,
                        reduced,
                        *complement,
                    )?,
                    None => (keys_d, vals_d, reduced),
                };

                let rows = read_u32(&keys_d, kept)?;
                let vals = read_bytes(&vals_d, kept as usize * tw_size)?;
                CooVec::new(rows, vals)
            }
            None => {
                // Pattern path: order the column stream, drop duplicates.
                // Sort with a dummy uint value carrier; the type alias only
                // sizes the (unused) value moves.
                let mut dummy_vals_d = acc.general().alloc(z as usize * 4)?;
                cl_sort_by_key(
                    acc,
                    &UINT,
                    &mut product_cols_d,
                    &mut dummy_vals_d,
                    z,
                    ctx.params.bitonic_max as u32,
                    block_size,
                    &scratch,
                    max_key,
                )?;
                let reduce = ProgramBuilder::new(acc.cache())
                    .set_name("reduce_duplicates")
                    .set_source(kernels::REDUCE_DUPLICATES)
                    .acquire()?;
                let flags_d = scratch.alloc(z as usize * 4)?;
                enq(
                    reduce
                        .make_kernel("reduce_head_flags")?
                        .builder()
                        .global_work_size(z as usize)
                        .arg(&product_cols_d)
                        .arg(&flags_d)
                        .arg(z),
                )?;
                let positions_d = scratch.alloc(z as usize * 4)?;
                let reduced =
                    cl_exclusive_scan(acc, &flags_d, &positions_d, z, block_size, &scratch)?;
                let keys_d = acc.general().alloc(reduced as usize * 4)?;
                enq(
                    reduce
                        .make_kernel("reduce_emit_keys")?
                        .builder()
                        .global_work_size(z as usize)
                        .arg(&product_cols_d)
                        .arg(&flags_d)
                        .arg(&positions_d)
                        .arg(&keys_d)
                        .arg(z),
                )?;

                let (keys_d, _, kept) = match &mask_rows {
                    Some(mask_rows) => {
                        let dummy = acc.general().alloc(reduced as usize * 4)?;
                        apply_mask_device(
                            acc,
                            &scratch,
                            &UINT,
                            block_size,
                            mask_rows,
                            &keys_d,
                            &dummy,
                            reduced,
                            *complement,
                        )?
                    }
                    None => {
                        let dummy = acc.general().alloc(1)?;
                        (keys_d, dummy, reduced)
                    }
                };
                CooVec::new(read_u32(&keys_d, kept)?, Vec::new())
            }
        };
        drop(a_storage);
        drop(b_storage);

        w.store_coo(result)
    }
}

fn enq(builder: &mut core_opencl::ocl::builders::KernelBuilder<'_>) -> Result<()> {
    let kernel = builder.build().map_err(map_cl_err)?;
    unsafe { kernel.enq().map_err(map_cl_err) }
}

fn upload_bytes(acc: &ClAccelerator, bytes: &[u8]) -> Result<Buffer<u8>> {
    let buffer = acc.general().alloc(bytes.len().max(1))?;
    if !bytes.is_empty() {
        buffer.cmd().write(bytes).enq().map_err(map_cl_err)?;
    }
    Ok(buffer)
}

fn upload_u32(acc: &ClAccelerator, words: &[u32]) -> Result<Buffer<u8>> {
    upload_bytes(acc, &Scalar::encode_vec(words))
}

fn read_bytes(buffer: &Buffer<u8>, len: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; len];
    if len > 0 {
        buffer.cmd().read(&mut out).enq().map_err(map_cl_err)?;
    }
    Ok(out)
}

fn read_u32(buffer: &Buffer<u8>, n: u32) -> Result<Vec<u32>> {
    Ok(u32::decode_vec(&read_bytes(buffer, n as usize * 4)?))
}

/// Flag-scan-compact mask application on device; returns the surviving
/// keys/values buffers and their length.
#[allow(clippy::too_many_arguments)]
fn apply_mask_device(
    acc: &ClAccelerator,
    scratch: &ClAllocScratch,
    tw: &core_types::TypeRef,
    block_size: u32,
    mask_rows: &[u32],
    keys_d: &Buffer<u8>,
    vals_d: &Buffer<u8>,
    n: u32,
    complement: bool,
) -> Result<(Buffer<u8>, Buffer<u8>, u32)> {
    let tw_size = tw.byte_size().max(1);
    let program = ProgramBuilder::new(acc.cache())
        .set_name("apply_mask")
        .add_type("TW", tw)
        .set_source(kernels::APPLY_MASK)
        .acquire()?;

    let mask_d = upload_u32(acc, mask_rows)?;
    let flags_d = scratch.alloc(n as usize * 4)?;
    enq(
        program
            .make_kernel("mask_flags")?
            .builder()
            .global_work_size(n as usize)
            .arg(&mask_d)
            .arg(mask_rows.len() as u32)
            .arg(keys_d)
            .arg(n)
            .arg(u32::from(complement))
            .arg(&flags_d),
    )?;
    let positions_d = scratch.alloc(n as usize * 4)?;
    let kept = cl_exclusive_scan(acc, &flags_d, &positions_d, n, block_size, scratch)?;
    let (out_keys_d, out_vals_d) = acc
        .general()
        .alloc_paired(kept as usize * 4, kept as usize * tw_size)?;
    enq(
        program
            .make_kernel("mask_compact")?
            .builder()
            .global_work_size(n as usize)
            .arg(keys_d)
            .arg(vals_d)
            .arg(&flags_d)
            .arg(&positions_d)
            .arg(&out_keys_d)
            .arg(&out_vals_d)
            .arg(n),
    )?;
    Ok((out_keys_d, out_vals_d, kept))
}
