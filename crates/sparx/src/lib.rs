//! Sparx: a sparse linear algebra engine over a host + accelerator substrate.
//!
//! Users build typed operands ([`Vector`], [`Matrix`], [`ScalarVal`]),
//! describe computations as [`Schedule`]s of [`Task`]s, and submit them to
//! an [`Engine`]. The engine owns the frozen algorithm registry, the
//! compute tuning derived from configuration, and (when built with the
//! `opencl` feature and a device is found) the accelerator state; each
//! submission dispatches tasks by composite key to the registered
//! algorithms.
//!
//! ```
//! use sparx::{Engine, Schedule, Task, Vector, Matrix};
//! use sparx::functions::{PLUS_INT, MULT_INT};
//!
//! let engine = Engine::with_config(sparx::Config::default()).unwrap();
//! let a = Vector::from_entries::<i32>(3, vec![0, 2], &[1, 2]).unwrap();
//! let b = Matrix::from_entries::<i32>(3, 3, vec![0, 0, 2], vec![1, 2, 0], &[3, 4, 5]).unwrap();
//! let w = Vector::new(3, sparx::INT.clone());
//!
//! let mut schedule = Schedule::new();
//! schedule.step_task(Task::VxmMasked {
//!     w: w.clone(),
//!     a,
//!     b,
//!     add: Some(PLUS_INT.clone()),
//!     mult: Some(MULT_INT.clone()),
//!     mask: None,
//!     complement: false,
//! });
//! engine.submit(&schedule).unwrap();
//!
//! let (rows, vals) = w.to_entries::<i32>().unwrap();
//! assert_eq!(rows, vec![0, 1, 2]);
//! assert_eq!(vals, vec![10, 3, 4]);
//! ```

use std::sync::Arc;

use tracing::info;

use core_config::ConfigContext;
use core_engine::{algo, Dispatcher};

pub use core_compute::ComputeParams;
pub use core_config::{load_from, BackendPreference, Config};
pub use core_program::{Compiler, Program, ProgramBuilder, ProgramCache};
pub use core_engine::{
    Backend, DispatchContext, DispatcherMetricsSnapshot, KeyBuilder, Registry, RegistryAlgo,
    Schedule, Task,
};
pub use core_storage::{
    CooMtx, CooVec, CsrMtx, Matrix, MatrixRef, ScalarVal, ScalarValRef, Vector, VectorRef,
};
pub use core_types::{
    functions, EngineError, Op, OpBinary, OpBinaryRef, OpSelect, OpSelectRef, OpUnary, OpUnaryRef,
    Result, Scalar, Type, TypeRef, DOUBLE, FLOAT, INT, UINT, VOID,
};

/// Engine instance: frozen registry, compute tuning, optional accelerator.
///
/// Registration must complete before the first submission; `submit` only
/// borrows the engine immutably, so the borrow checker enforces exactly
/// that ordering.
pub struct Engine {
    registry: Registry,
    params: ComputeParams,
    #[cfg(feature = "opencl")]
    accel: Option<core_opencl::ClAccelerator>,
}

impl Engine {
    /// Engine with configuration discovered from `sparx.toml`.
    pub fn new() -> Result<Engine> {
        let config = core_config::load_from(None)
            .map_err(|err| EngineError::InvalidArgument(format!("config: {err}")))?;
        Engine::with_config(config)
    }

    pub fn with_config(mut config: Config) -> Result<Engine> {
        #[cfg(feature = "opencl")]
        let accel = match config.file.backend.prefer {
            BackendPreference::Cpu => None,
            BackendPreference::Auto => core_opencl::ClAccelerator::discover()?,
            BackendPreference::Opencl => match core_opencl::ClAccelerator::discover()? {
                Some(accel) => Some(accel),
                None => return Err(EngineError::NoAcceleration),
            },
        };
        #[cfg(not(feature = "opencl"))]
        {
            if config.file.backend.prefer == BackendPreference::Opencl {
                return Err(EngineError::NoAcceleration);
            }
        }

        #[cfg(feature = "opencl")]
        let context = match &accel {
            Some(accel) => ConfigContext::new(
                accel.max_wgs() as u32,
                accel.local_mem_bytes() as u32,
                4 + 8,
            ),
            None => ConfigContext::host(),
        };
        #[cfg(not(feature = "opencl"))]
        let context = ConfigContext::host();

        let (block_size, bitonic_max) = config.apply_context(context);
        let params = ComputeParams {
            block_size: block_size as usize,
            bitonic_max: bitonic_max as usize,
        };

        let mut registry = Registry::new();
        algo::register_cpu(&mut registry)?;
        #[cfg(feature = "opencl")]
        if accel.is_some() {
            algo::register_cl(&mut registry)?;
        }

        info!(
            target: "engine",
            algorithms = registry.len(),
            block_size = params.block_size,
            bitonic_max = params.bitonic_max,
            "engine initialized"
        );
        Ok(Engine {
            registry,
            params,
            #[cfg(feature = "opencl")]
            accel,
        })
    }

    /// Register a user algorithm. Only possible before the first `submit`
    /// borrow; duplicate keys are rejected.
    pub fn register(&mut self, key: &str, algorithm: Arc<dyn RegistryAlgo>) -> Result<()> {
        self.registry.add(key, algorithm)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn params(&self) -> ComputeParams {
        self.params
    }

    /// True when the accelerated backend is live.
    pub fn has_acceleration(&self) -> bool {
        #[cfg(feature = "opencl")]
        {
            self.accel.is_some()
        }
        #[cfg(not(feature = "opencl"))]
        {
            false
        }
    }

    /// Execute a schedule synchronously; returns once every step completed
    /// or the first failed step aborted the run.
    pub fn submit(&self, schedule: &Schedule) -> Result<()> {
        self.dispatcher().submit(schedule)
    }

    /// Execute a schedule and surface the dispatch counters alongside the
    /// outcome.
    pub fn submit_with_metrics(
        &self,
        schedule: &Schedule,
    ) -> (Result<()>, DispatcherMetricsSnapshot) {
        let dispatcher = self.dispatcher();
        let outcome = dispatcher.submit(schedule);
        (outcome, dispatcher.metrics_snapshot())
    }

    fn dispatcher(&self) -> Dispatcher<'_> {
        #[cfg(feature = "opencl")]
        {
            if let Some(accel) = &self.accel {
                return Dispatcher::with_accelerator(&self.registry, self.params, accel);
            }
        }
        Dispatcher::new(&self.registry, self.params)
    }
}
