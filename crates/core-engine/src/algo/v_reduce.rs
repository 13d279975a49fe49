//! Vector reduction to a scalar.

use core_storage::VectorStorage;
use core_types::{EngineError, Result};

use crate::algo::check_type;
use crate::dispatch::DispatchContext;
use crate::registry::RegistryAlgo;
use crate::task::Task;

pub struct AlgoVReduceCpu;

impl RegistryAlgo for AlgoVReduceCpu {
    fn name(&self) -> &str {
        "v_reduce"
    }

    fn description(&self) -> &str {
        "fold every stored vector value into a scalar"
    }

    fn execute(&self, ctx: &DispatchContext<'_>) -> Result<()> {
        let Task::VReduce { s, init, a, op } = ctx.task else {
            return Err(EngineError::InvalidState(
                "v_reduce algorithm dispatched with mismatched task".into(),
            ));
        };
        check_type("v_reduce input", op.ta(), a.ttype())?;
        check_type("v_reduce init", op.ta(), init.ttype())?;
        check_type("v_reduce output", op.tr(), s.ttype())?;
        let init_bytes = init.bytes();
        if init_bytes.len() != init.ttype().byte_size() {
            return Err(EngineError::InvalidArgument(
                "v_reduce: init scalar is unset".into(),
            ));
        }

        let byte_size = a.ttype().byte_size();
        let storage = a.read();
        let out = match &*storage {
            VectorStorage::Empty => init_bytes,
            VectorStorage::Coo(block) => {
                core_compute::reduce_all(&block.vals, byte_size, op, &init_bytes)
            }
        };
        drop(storage);
        s.store_bytes(out)
    }
}
