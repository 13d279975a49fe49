//! Host callback scheduled like any other task.

use core_types::{EngineError, Result};

use crate::dispatch::DispatchContext;
use crate::registry::RegistryAlgo;
use crate::task::Task;

pub struct AlgoCallbackCpu;

impl RegistryAlgo for AlgoCallbackCpu {
    fn name(&self) -> &str {
        "callback"
    }

    fn description(&self) -> &str {
        "invoke a host callback inside the schedule"
    }

    fn execute(&self, ctx: &DispatchContext<'_>) -> Result<()> {
        let Task::Callback { f } = ctx.task else {
            return Err(EngineError::InvalidState(
                "callback algorithm dispatched with mismatched task".into(),
            ));
        };
        f()
    }
}
