//! Masked sparse vector-matrix product on coordinate operands.
//!
//! The canonical product pipeline: gather per-nonzero segment lengths from
//! the matrix row lengths, scan them into product offsets, expand the
//! segments with a scatter + max-scan, gather column indices and multiply
//! paired values, sort the products by column, reduce equal columns with
//! the additive operator, then apply the mask. The pattern-only path skips
//! the value stages and deduplicates columns instead of reducing them.

use rayon::prelude::*;
use tracing::trace;

use core_storage::{CooVec, VectorStorage};
use core_types::{EngineError, Result};

use core_compute::{
    apply_mask, exclusive_scan, gather, inclusive_scan_max, mask_keys, reduce_by_key,
    reduce_duplicates, scatter_if_counting, sort_by_key, transform_values,
};

use crate::algo::{check_type, matrix_rows_view};
use crate::dispatch::DispatchContext;
use crate::registry::RegistryAlgo;
use crate::task::Task;

pub struct AlgoVxmCpu;

impl RegistryAlgo for AlgoVxmCpu {
    fn name(&self) -> &str {
        "vxm_masked"
    }

    fn description(&self) -> &str {
        "masked sparse vector times matrix over an (add, mult) semiring"
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

        // Empty mask without complement selects nothing.
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

        // Stage 1-2: per-nonzero product counts and their offsets.
        let segment_lengths = gather(&a_block.rows, &view.lengths);
        let output_ptr = exclusive_scan(&segment_lengths);
        let products = *output_ptr.last().unwrap() as usize;
        trace!(target: "algo.vxm", nvals = a_block.rows.len(), products, "expanded");
        if products == 0 {
            drop(a_storage);
            drop(b_storage);
            w.clear();
            return Ok(());
        }

        // Stage 4: segment heads scattered then propagated across runs.
        let mut a_locations = vec![0u32; products];
        scatter_if_counting(
            &output_ptr[..segment_lengths.len()],
            &segment_lengths,
            &mut a_locations,
        );
        inclusive_scan_max(&mut a_locations);

        // Stage 5: position of the matching matrix entry per product.
        let offsets = &view.offsets;
        let b_locations: Vec<u32> = (0..products)
            .into_par_iter()
            .map(|k| {
                let i = a_locations[k] as usize;
                let row = a_block.rows[i];
                let base = offsets[row as usize];
                let segment_start = output_ptr[i];
                base + (k as u32 - segment_start)
            })
            .collect();

        // Stage 6: column index of every product.
        let mut product_cols = gather(&b_locations, view.cols);

        let mask_rows = mask.as_ref().map(|mask| mask.to_rows());
        let result = match ops {
            Some((add, mult)) => {
                // Stage 7: multiply the paired values into the product slots.
                let byte_size = w.ttype().byte_size();
                let mut product_vals = transform_values(
                    &a_locations,
                    &b_locations,
                    &a_block.vals,
                    view.vals,
                    a.ttype().byte_size(),
                    b.ttype().byte_size(),
                    byte_size,
                    mult,
                );
                sort_by_key(&mut product_cols, &mut product_vals, byte_size, &ctx.params);
                let (rows, vals) = reduce_by_key(&product_cols, &product_vals, byte_size, add);
                match &mask_rows {
                    Some(mask_rows) => {
                        let (rows, vals) =
                            apply_mask(mask_rows, &rows, &vals, byte_size, *complement);
                        CooVec::new(rows, vals)
                    }
                    None => CooVec::new(rows, vals),
                }
            }
            None => {
                let mut no_vals = Vec::new();
                sort_by_key(&mut product_cols, &mut no_vals, 0, &ctx.params);
                let rows = reduce_duplicates(&product_cols);
                let rows = match &mask_rows {
                    Some(mask_rows) => mask_keys(mask_rows, &rows, *complement),
                    None => rows,
                };
                CooVec::new(rows, Vec::new())
            }
        };
        drop(a_storage);
        drop(b_storage);

        w.store_coo(result)
    }
}
