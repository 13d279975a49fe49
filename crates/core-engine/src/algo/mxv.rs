//! Masked sparse matrix-vector product.
//!
//! Row-walk formulation: for every (mask-selected) matrix row, intersect
//! the row's columns with the vector's sparsity via a dense position index
//! and accumulate `add(acc, mult(m[i,j], v[j]))`. Complements the gather/
//! scatter product pipeline with the transposed access pattern.

use core_storage::{CooVec, VectorStorage};
use core_types::{EngineError, Result};

use crate::algo::{check_type, matrix_rows_view};
use crate::dispatch::DispatchContext;
use crate::registry::RegistryAlgo;
use crate::task::Task;

pub struct AlgoMxvCpu;

impl RegistryAlgo for AlgoMxvCpu {
    fn name(&self) -> &str {
        "mxv_masked"
    }

    fn description(&self) -> &str {
        "masked sparse matrix times vector over an (add, mult) semiring"
    }

    fn execute(&self, ctx: &DispatchContext<'_>) -> Result<()> {
        let Task::MxvMasked {
            w,
            m,
            v,
            add,
            mult,
            mask,
            complement,
        } = ctx.task
        else {
            return Err(EngineError::InvalidState(
                "mxv algorithm dispatched with mismatched task".into(),
            ));
        };

        if m.n_cols() != v.n_rows() || w.n_rows() != m.n_rows() {
            return Err(EngineError::InvalidArgument(format!(
                "mxv: shapes do not agree (m: {}x{}, v: {}, w: {})",
                m.n_rows(),
                m.n_cols(),
                v.n_rows(),
                w.n_rows()
            )));
        }
        check_type("mxv mult left", mult.ta(), m.ttype())?;
        check_type("mxv mult right", mult.tb(), v.ttype())?;
        check_type("mxv mult result", mult.tr(), w.ttype())?;
        check_type("mxv add", add.tr(), w.ttype())?;

        if let Some(mask) = mask {
            if !complement && mask.nvals() == 0 {
                w.clear();
                return Ok(());
            }
        }
        if m.nvals() == 0 || v.nvals() == 0 {
            w.clear();
            return Ok(());
        }

        let v_storage = v.read();
        let VectorStorage::Coo(v_block) = &*v_storage else {
            w.clear();
            return Ok(());
        };
        let m_storage = m.read();
        let view = matrix_rows_view(&m_storage, m.n_rows() as usize)?;

        // Dense position index of the vector sparsity.
        const ABSENT: u32 = u32::MAX;
        let mut v_pos = vec![ABSENT; v.n_rows() as usize];
        for (p, &row) in v_block.rows.iter().enumerate() {
            v_pos[row as usize] = p as u32;
        }

        let mask_rows = mask.as_ref().map(|mask| mask.to_rows());
        let tv_size = v.ttype().byte_size();
        let tm_size = m.ttype().byte_size();
        let tw_size = w.ttype().byte_size();

        let mut rows = Vec::new();
        let mut vals = Vec::new();
        let mut acc = vec![0u8; tw_size];
        let mut product = vec![0u8; tw_size];
        let mut folded = vec![0u8; tw_size];
        let mut mask_cursor = 0usize;

        for row in 0..m.n_rows() as u32 {
            if let Some(mask_rows) = &mask_rows {
                while mask_cursor < mask_rows.len() && mask_rows[mask_cursor] < row {
                    mask_cursor += 1;
                }
                let selected = mask_cursor < mask_rows.len() && mask_rows[mask_cursor] == row;
                if selected == *complement {
                    continue;
                }
            }

            let begin = view.offsets[row as usize] as usize;
            let end = view.offsets[row as usize + 1] as usize;
            let mut hit = false;
            for at in begin..end {
                let col = view.cols[at] as usize;
                let p = v_pos[col];
                if p == ABSENT {
                    continue;
                }
                let p = p as usize;
                mult.eval(
                    &view.vals[at * tm_size..(at + 1) * tm_size],
                    &v_block.vals[p * tv_size..(p + 1) * tv_size],
                    &mut product,
                );
                if hit {
                    add.eval(&acc, &product, &mut folded);
                    acc.copy_from_slice(&folded);
                } else {
                    acc.copy_from_slice(&product);
                    hit = true;
                }
            }
            if hit {
                rows.push(row);
                vals.extend_from_slice(&acc);
            }
        }
        drop(v_storage);
        drop(m_storage);

        w.store_coo(CooVec::new(rows, vals))
    }
}
