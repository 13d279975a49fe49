//! Matrix reduction to a scalar.

use core_storage::MatrixStorage;
use core_types::{EngineError, Result};

use crate::algo::check_type;
use crate::dispatch::DispatchContext;
use crate::registry::RegistryAlgo;
use crate::task::Task;

pub struct AlgoMReduceCpu;

impl RegistryAlgo for AlgoMReduceCpu {
    fn name(&self) -> &str {
        "m_reduce"
    }

    fn description(&self) -> &str {
        "fold every stored matrix value into a scalar"
    }

    fn execute(&self, ctx: &DispatchContext<'_>) -> Result<()> {
        let Task::MReduce { s, init, m, op } = ctx.task else {
            return Err(EngineError::InvalidState(
                "m_reduce algorithm dispatched with mismatched task".into(),
            ));
        };
        check_type("m_reduce input", op.ta(), m.ttype())?;
        check_type("m_reduce init", op.ta(), init.ttype())?;
        check_type("m_reduce output", op.tr(), s.ttype())?;
        let init_bytes = init.bytes();
        if init_bytes.len() != init.ttype().byte_size() {
            return Err(EngineError::InvalidArgument(
                "m_reduce: init scalar is unset".into(),
            ));
        }

        let byte_size = m.ttype().byte_size();
        let storage = m.read();
        let vals: &[u8] = match &*storage {
            MatrixStorage::Empty => &[],
            MatrixStorage::Coo(block) => &block.vals,
            MatrixStorage::Csr(block) => &block.vals,
        };
        let out = core_compute::reduce_all(vals, byte_size, op, &init_bytes);
        drop(storage);
        s.store_bytes(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_compute::ComputeParams;
    use core_storage::{Matrix, ScalarVal};
    use core_types::functions::PLUS_FLOAT;

    #[test]
    fn folds_all_matrix_values() {
        let m = Matrix::from_entries::<f32>(
            3,
            3,
            vec![0, 0, 2],
            vec![1, 2, 0],
            &[1.0, 2.0, 3.5],
        )
        .unwrap();
        let s = ScalarVal::new(core_types::FLOAT.clone());
        let task = Task::MReduce {
            s: s.clone(),
            init: ScalarVal::from_value(0.5f32),
            m,
            op: PLUS_FLOAT.clone(),
        };
        let ctx = DispatchContext {
            task: &task,
            params: ComputeParams::default(),
            #[cfg(feature = "opencl")]
            accel: None,
        };
        AlgoMReduceCpu.execute(&ctx).unwrap();
        assert_eq!(s.get::<f32>().unwrap(), 7.0);
    }
}
