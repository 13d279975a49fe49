//! Elementwise unary map over a sparse vector.

use rayon::prelude::*;

use core_storage::{CooVec, VectorStorage};
use core_types::{EngineError, Result};

use crate::algo::check_type;
use crate::dispatch::DispatchContext;
use crate::registry::RegistryAlgo;
use crate::task::Task;

pub struct AlgoVMapCpu;

impl RegistryAlgo for AlgoVMapCpu {
    fn name(&self) -> &str {
        "v_map"
    }

    fn description(&self) -> &str {
        "apply a unary operator to every stored vector value"
    }

    fn execute(&self, ctx: &DispatchContext<'_>) -> Result<()> {
        let Task::VMap { w, a, op } = ctx.task else {
            return Err(EngineError::InvalidState(
                "v_map algorithm dispatched with mismatched task".into(),
            ));
        };
        check_type("v_map input", op.ta(), a.ttype())?;
        check_type("v_map output", op.tr(), w.ttype())?;
        if w.n_rows() != a.n_rows() {
            return Err(EngineError::InvalidArgument(format!(
                "v_map: output length {} != input length {}",
                w.n_rows(),
                a.n_rows()
            )));
        }

        let storage = a.read();
        let block = match &*storage {
            VectorStorage::Empty => {
                w.clear();
                return Ok(());
            }
            VectorStorage::Coo(block) => block,
        };

        let ta_size = op.ta().byte_size();
        let tr_size = op.tr().byte_size();
        let mut vals = vec![0u8; block.rows.len() * tr_size];
        vals.par_chunks_mut(tr_size)
            .zip(block.vals.par_chunks(ta_size))
            .for_each(|(out, input)| op.eval(input, out));
        let rows = block.rows.clone();
        drop(storage);

        w.store_coo(CooVec::new(rows, vals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_compute::ComputeParams;
    use core_storage::Vector;
    use core_types::functions::AINV_INT;
    use core_types::INT;

    #[test]
    fn maps_values_preserving_pattern() {
        let a = Vector::from_entries::<i32>(6, vec![1, 4], &[10, -2]).unwrap();
        let w = Vector::new(6, INT.clone());
        let task = Task::VMap {
            w: w.clone(),
            a,
            op: AINV_INT.clone(),
        };
        let ctx = DispatchContext {
            task: &task,
            params: ComputeParams::default(),
            #[cfg(feature = "opencl")]
            accel: None,
        };
        AlgoVMapCpu.execute(&ctx).unwrap();
        let (rows, vals) = w.to_entries::<i32>().unwrap();
        assert_eq!(rows, vec![1, 4]);
        assert_eq!(vals, vec![-10, 2]);
    }

    #[test]
    fn type_mismatch_is_invalid_argument() {
        let a = Vector::from_entries::<f32>(3, vec![0], &[1.0]).unwrap();
        let w = Vector::new(3, INT.clone());
        let task = Task::VMap {
            w,
            a,
            op: AINV_INT.clone(),
        };
        let ctx = DispatchContext {
            task: &task,
            params: ComputeParams::default(),
            #[cfg(feature = "opencl")]
            accel: None,
        };
        assert!(matches!(
            AlgoVMapCpu.execute(&ctx),
            Err(EngineError::InvalidArgument(_))
        ));
    }
}
