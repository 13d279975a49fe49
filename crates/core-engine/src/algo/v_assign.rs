//! Masked scalar assignment into a sparse vector.

use core_storage::CooVec;
use core_types::{EngineError, Result};

use crate::algo::check_type;
use crate::dispatch::DispatchContext;
use crate::registry::RegistryAlgo;
use crate::task::Task;

pub struct AlgoVAssignMaskedCpu;

impl RegistryAlgo for AlgoVAssignMaskedCpu {
    fn name(&self) -> &str {
        "v_assign_masked"
    }

    fn description(&self) -> &str {
        "assign a scalar at mask-selected vector positions"
    }

    fn execute(&self, ctx: &DispatchContext<'_>) -> Result<()> {
        let Task::VAssignMasked {
            w,
            mask,
            value,
            complement,
        } = ctx.task
        else {
            return Err(EngineError::InvalidState(
                "v_assign_masked algorithm dispatched with mismatched task".into(),
            ));
        };
        check_type("v_assign_masked value", w.ttype(), value.ttype())?;
        if mask.n_rows() != w.n_rows() {
            return Err(EngineError::InvalidArgument(format!(
                "v_assign_masked: mask length {} != output length {}",
                mask.n_rows(),
                w.n_rows()
            )));
        }
        let byte_size = w.ttype().byte_size();
        let value_bytes = value.bytes();
        if value_bytes.len() != byte_size {
            return Err(EngineError::InvalidArgument(
                "v_assign_masked: value scalar is unset".into(),
            ));
        }

        let mask_rows = mask.to_rows();
        let rows: Vec<u32> = if !complement {
            mask_rows
        } else {
            // Complement over the full index universe of `w`.
            let mut rows = Vec::new();
            let mut m = 0;
            for row in 0..w.n_rows() as u32 {
                if m < mask_rows.len() && mask_rows[m] == row {
                    m += 1;
                } else {
                    rows.push(row);
                }
            }
            rows
        };

        let mut vals = Vec::with_capacity(rows.len() * byte_size);
        for _ in 0..rows.len() {
            vals.extend_from_slice(&value_bytes);
        }
        w.store_coo(CooVec::new(rows, vals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_compute::ComputeParams;
    use core_storage::{ScalarVal, Vector};
    use core_types::INT;

    fn ctx(task: &Task) -> DispatchContext<'_> {
        DispatchContext {
            task,
            params: ComputeParams::default(),
            #[cfg(feature = "opencl")]
            accel: None,
        }
    }

    #[test]
    fn assigns_at_masked_positions() {
        let mask = Vector::from_pattern(5, vec![1, 3]).unwrap();
        let w = Vector::new(5, INT.clone());
        let task = Task::VAssignMasked {
            w: w.clone(),
            mask,
            value: ScalarVal::from_value(7i32),
            complement: false,
        };
        AlgoVAssignMaskedCpu.execute(&ctx(&task)).unwrap();
        let (rows, vals) = w.to_entries::<i32>().unwrap();
        assert_eq!(rows, vec![1, 3]);
        assert_eq!(vals, vec![7, 7]);
    }

    #[test]
    fn complement_assigns_everywhere_else() {
        let mask = Vector::from_pattern(5, vec![1, 3]).unwrap();
        let w = Vector::new(5, INT.clone());
        let task = Task::VAssignMasked {
            w: w.clone(),
            mask,
            value: ScalarVal::from_value(-1i32),
            complement: true,
        };
        AlgoVAssignMaskedCpu.execute(&ctx(&task)).unwrap();
        let (rows, vals) = w.to_entries::<i32>().unwrap();
        assert_eq!(rows, vec![0, 2, 4]);
        assert_eq!(vals, vec![-1, -1, -1]);
    }
}
