//! Element-wise union add of two sparse vectors.

use core_storage::{CooVec, VectorStorage};
use core_types::{EngineError, Result};

use crate::algo::check_type;
use crate::dispatch::DispatchContext;
use crate::registry::RegistryAlgo;
use crate::task::Task;

pub struct AlgoVEaddCpu;

impl RegistryAlgo for AlgoVEaddCpu {
    fn name(&self) -> &str {
        "v_eadd"
    }

    fn description(&self) -> &str {
        "element-wise union of two sparse vectors, combining collisions"
    }

    fn execute(&self, ctx: &DispatchContext<'_>) -> Result<()> {
        let Task::VEadd { w, a, b, op } = ctx.task else {
            return Err(EngineError::InvalidState(
                "v_eadd algorithm dispatched with mismatched task".into(),
            ));
        };
        check_type("v_eadd left", op.ta(), a.ttype())?;
        check_type("v_eadd right", op.tb(), b.ttype())?;
        check_type("v_eadd output", op.tr(), w.ttype())?;
        if a.n_rows() != b.n_rows() || w.n_rows() != a.n_rows() {
            return Err(EngineError::InvalidArgument(format!(
                "v_eadd: lengths differ ({}, {}, {})",
                w.n_rows(),
                a.n_rows(),
                b.n_rows()
            )));
        }

        let byte_size = w.ttype().byte_size();
        let a_storage = a.read();
        let b_storage = b.read();
        let empty = CooVec::default();
        let a_block = match &*a_storage {
            VectorStorage::Coo(block) => block,
            VectorStorage::Empty => &empty,
        };
        let b_block = match &*b_storage {
            VectorStorage::Coo(block) => block,
            VectorStorage::Empty => &empty,
        };

        // Sorted two-pointer union; collisions reduced with `op`.
        let mut rows = Vec::with_capacity(a_block.rows.len() + b_block.rows.len());
        let mut vals = Vec::with_capacity(rows.capacity() * byte_size);
        let (mut i, mut j) = (0, 0);
        let mut merged = vec![0u8; byte_size];
        while i < a_block.rows.len() || j < b_block.rows.len() {
            let take_a = j >= b_block.rows.len()
                || (i < a_block.rows.len() && a_block.rows[i] < b_block.rows[j]);
            let take_b = i >= a_block.rows.len()
                || (j < b_block.rows.len() && b_block.rows[j] < a_block.rows[i]);
            if take_a {
                rows.push(a_block.rows[i]);
                vals.extend_from_slice(&a_block.vals[i * byte_size..(i + 1) * byte_size]);
                i += 1;
            } else if take_b {
                rows.push(b_block.rows[j]);
                vals.extend_from_slice(&b_block.vals[j * byte_size..(j + 1) * byte_size]);
                j += 1;
            } else {
                op.eval(
                    &a_block.vals[i * byte_size..(i + 1) * byte_size],
                    &b_block.vals[j * byte_size..(j + 1) * byte_size],
                    &mut merged,
                );
                rows.push(a_block.rows[i]);
                vals.extend_from_slice(&merged);
                i += 1;
                j += 1;
            }
        }
        drop(a_storage);
        drop(b_storage);

        w.store_coo(CooVec::new(rows, vals))
    }
}
