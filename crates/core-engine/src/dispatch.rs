//! Task dispatch over the registry.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, error, info};

use core_compute::ComputeParams;
use core_types::{EngineError, Result};

use crate::registry::{Backend, Registry};
use crate::schedule::Schedule;
use crate::task::Task;

/// Everything an algorithm execution may touch: the task being processed,
/// compute tuning, and (when the accelerated backend is live) the device
/// queue and allocators. Stack-allocated per task.
pub struct DispatchContext<'a> {
    pub task: &'a Task,
    pub params: ComputeParams,
    #[cfg(feature = "opencl")]
    pub accel: Option<&'a core_opencl::ClAccelerator>,
}

#[derive(Debug, Default)]
struct DispatcherMetrics {
    steps_completed: AtomicU64,
    tasks_dispatched: AtomicU64,
    fallback_hits: AtomicU64,
    task_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherMetricsSnapshot {
    pub steps_completed: u64,
    pub tasks_dispatched: u64,
    pub fallback_hits: u64,
    pub task_failures: u64,
}

/// Executes schedules against a frozen registry.
///
/// Host-side dispatch is single-threaded: steps run in program order, the
/// tasks of one step are issued in set order and synchronized by the
/// end-of-step barrier. `submit` is synchronous-execute; when it returns
/// `Ok` every task of every step has completed.
pub struct Dispatcher<'a> {
    registry: &'a Registry,
    params: ComputeParams,
    preferred: Backend,
    #[cfg(feature = "opencl")]
    accel: Option<&'a core_opencl::ClAccelerator>,
    metrics: DispatcherMetrics,
}

impl<'a> Dispatcher<'a> {
    /// Host-only dispatcher.
    pub fn new(registry: &'a Registry, params: ComputeParams) -> Self {
        Self {
            registry,
            params,
            preferred: Backend::Cpu,
            #[cfg(feature = "opencl")]
            accel: None,
            metrics: DispatcherMetrics::default(),
        }
    }

    /// Dispatcher preferring the accelerated backend for every task whose
    /// key resolves there.
    #[cfg(feature = "opencl")]
    pub fn with_accelerator(
        registry: &'a Registry,
        params: ComputeParams,
        accel: &'a core_opencl::ClAccelerator,
    ) -> Self {
        Self {
            registry,
            params,
            preferred: Backend::Cl,
            accel: Some(accel),
            metrics: DispatcherMetrics::default(),
        }
    }

    pub fn preferred(&self) -> Backend {
        self.preferred
    }

    pub fn metrics_snapshot(&self) -> DispatcherMetricsSnapshot {
        DispatcherMetricsSnapshot {
            steps_completed: self.metrics.steps_completed.load(Ordering::Relaxed),
            tasks_dispatched: self.metrics.tasks_dispatched.load(Ordering::Relaxed),
            fallback_hits: self.metrics.fallback_hits.load(Ordering::Relaxed),
            task_failures: self.metrics.task_failures.load(Ordering::Relaxed),
        }
    }

    /// Execute the whole schedule synchronously. Fail-slow within a step
    /// (remaining tasks still run), fail-fast between steps (a failed step
    /// aborts the schedule). Resource and invariant failures abort the
    /// current step immediately.
    pub fn submit(&self, schedule: &Schedule) -> Result<()> {
        self.validate(schedule)?;
        info!(
            target: "dispatch",
            label = schedule.label(),
            steps = schedule.steps().len(),
            backend = ?self.preferred,
            "submit"
        );

        for (step_idx, step) in schedule.steps().iter().enumerate() {
            let mut first_failure: Option<EngineError> = None;
            for task in step {
                match self.dispatch_task(task) {
                    Ok(()) => {}
                    Err(err) => {
                        self.metrics.task_failures.fetch_add(1, Ordering::Relaxed);
                        error!(
                            target: "dispatch",
                            step = step_idx,
                            key = %task.build_key(self.preferred),
                            %err,
                            "task failed"
                        );
                        let fatal = err.is_fatal();
                        if first_failure.is_none() {
                            first_failure = Some(err);
                        }
                        if fatal {
                            break;
                        }
                    }
                }
            }
            self.barrier()?;
            if let Some(err) = first_failure {
                return Err(err);
            }
            self.metrics.steps_completed.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Configuration checks at submit time; any failure rejects the whole
    /// schedule before a single task runs. Every task key must resolve on
    /// some backend, and tasks of one step must not write overlapping
    /// outputs (their order would be undefined).
    fn validate(&self, schedule: &Schedule) -> Result<()> {
        for (step_idx, step) in schedule.steps().iter().enumerate() {
            let mut outputs: Vec<usize> = Vec::new();
            for task in step {
                let key = task.build_key(self.preferred);
                if !self.registry.has(&key)
                    && !self.registry.has(&task.build_key(self.preferred.other()))
                {
                    return Err(EngineError::NotImplemented(format!(
                        "unsupported combination: no algorithm for key `{key}`"
                    )));
                }
                for id in task.output_ids() {
                    if outputs.contains(&id) {
                        return Err(EngineError::InvalidArgument(format!(
                            "schedule `{}` rejected: step {step_idx} tasks write an overlapping output",
                            schedule.label()
                        )));
                    }
                    outputs.push(id);
                }
            }
        }
        Ok(())
    }

    fn dispatch_task(&self, task: &Task) -> Result<()> {
        self.metrics.tasks_dispatched.fetch_add(1, Ordering::Relaxed);
        let key = task.build_key(self.preferred);
        let algo = match self.registry.find(&key) {
            Some(algo) => algo,
            None => {
                let fallback_key = task.build_key(self.preferred.other());
                match self.registry.find(&fallback_key) {
                    Some(algo) => {
                        self.metrics.fallback_hits.fetch_add(1, Ordering::Relaxed);
                        debug!(target: "dispatch", key, fallback_key, "backend fallback");
                        algo
                    }
                    None => {
                        return Err(EngineError::NotImplemented(format!(
                            "unsupported combination: no algorithm for key `{key}`"
                        )));
                    }
                }
            }
        };
        let ctx = DispatchContext {
            task,
            params: self.params,
            #[cfg(feature = "opencl")]
            accel: self.accel,
        };
        debug!(target: "dispatch", key, algo = algo.name(), "execute");
        algo.execute(&ctx).map_err(|err| with_task_context(err, &key))
    }

    /// End-of-step barrier: drain the accelerator command stream.
    fn barrier(&self) -> Result<()> {
        #[cfg(feature = "opencl")]
        {
            if let Some(accel) = self.accel {
                accel.finish()?;
            }
        }
        Ok(())
    }
}

fn with_task_context(err: EngineError, key: &str) -> EngineError {
    use EngineError::*;
    match err {
        Generic(m) => Generic(format!("task `{key}`: {m}")),
        InvalidArgument(m) => InvalidArgument(format!("task `{key}`: {m}")),
        InvalidState(m) => InvalidState(format!("task `{key}`: {m}")),
        OutOfMemory(m) => OutOfMemory(format!("task `{key}`: {m}")),
        CompilationError(m) => CompilationError(format!("task `{key}`: {m}")),
        // These already name the key or carry no payload.
        NotImplemented(m) => NotImplemented(m),
        NoAcceleration => NoAcceleration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryAlgo;
    use core_storage::Vector;
    use core_types::functions::IDENTITY_INT;
    use core_types::INT;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    struct CountingAlgo {
        runs: Arc<AtomicUsize>,
        fail_with: Option<EngineError>,
    }

    impl RegistryAlgo for CountingAlgo {
        fn name(&self) -> &str {
            "counting"
        }
        fn description(&self) -> &str {
            "test stub"
        }
        fn execute(&self, _ctx: &DispatchContext<'_>) -> Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }

    fn map_task(w: core_storage::VectorRef) -> Task {
        Task::VMap {
            w,
            a: Vector::new(2, INT.clone()),
            op: IDENTITY_INT.clone(),
        }
    }

    fn registry_with(fail_with: Option<EngineError>) -> (Registry, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::new();
        registry
            .add(
                "v_map_INT__cpu",
                Arc::new(CountingAlgo {
                    runs: runs.clone(),
                    fail_with,
                }),
            )
            .unwrap();
        (registry, runs)
    }

    #[test]
    fn executes_steps_in_order() {
        let (registry, runs) = registry_with(None);
        let dispatcher = Dispatcher::new(&registry, ComputeParams::default());
        let mut schedule = Schedule::new();
        schedule.step_task(map_task(Vector::new(2, INT.clone())));
        schedule.step_tasks(vec![
            map_task(Vector::new(2, INT.clone())),
            map_task(Vector::new(2, INT.clone())),
        ]);
        dispatcher.submit(&schedule).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        let snap = dispatcher.metrics_snapshot();
        assert_eq!(snap.steps_completed, 2);
        assert_eq!(snap.tasks_dispatched, 3);
        assert_eq!(snap.task_failures, 0);
    }

    #[test]
    fn unsupported_combination_names_the_key() {
        let registry = Registry::new();
        let dispatcher = Dispatcher::new(&registry, ComputeParams::default());
        let mut schedule = Schedule::new();
        schedule.step_task(map_task(Vector::new(2, INT.clone())));
        let err = dispatcher.submit(&schedule).unwrap_err();
        assert!(matches!(err, EngineError::NotImplemented(_)));
        assert!(err.to_string().contains("v_map_INT__cpu"));
    }

    #[test]
    fn missing_preferred_backend_falls_back() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::new();
        registry
            .add(
                "v_map_INT__cl",
                Arc::new(CountingAlgo {
                    runs: runs.clone(),
                    fail_with: None,
                }),
            )
            .unwrap();
        let dispatcher = Dispatcher::new(&registry, ComputeParams::default());
        let mut schedule = Schedule::new();
        schedule.step_task(map_task(Vector::new(2, INT.clone())));
        dispatcher.submit(&schedule).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.metrics_snapshot().fallback_hits, 1);
    }

    #[test]
    fn step_runs_to_completion_after_failure() {
        let (registry, runs) =
            registry_with(Some(EngineError::InvalidArgument("shape".into())));
        let dispatcher = Dispatcher::new(&registry, ComputeParams::default());
        let mut schedule = Schedule::new();
        schedule.step_tasks(vec![
            map_task(Vector::new(2, INT.clone())),
            map_task(Vector::new(2, INT.clone())),
        ]);
        let err = dispatcher.submit(&schedule).unwrap_err();
        // Fail-slow: both tasks ran even though the first failed.
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(matches!(err, EngineError::InvalidArgument(_)));
        assert_eq!(dispatcher.metrics_snapshot().task_failures, 2);
    }

    #[test]
    fn failed_step_aborts_following_steps() {
        let (registry, runs) =
            registry_with(Some(EngineError::InvalidArgument("shape".into())));
        let dispatcher = Dispatcher::new(&registry, ComputeParams::default());
        let mut schedule = Schedule::new();
        schedule.step_task(map_task(Vector::new(2, INT.clone())));
        schedule.step_task(map_task(Vector::new(2, INT.clone())));
        assert!(dispatcher.submit(&schedule).is_err());
        // Fail-fast between steps: the second step never ran.
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fatal_failure_aborts_the_step() {
        let (registry, runs) = registry_with(Some(EngineError::OutOfMemory("device".into())));
        let dispatcher = Dispatcher::new(&registry, ComputeParams::default());
        let mut schedule = Schedule::new();
        schedule.step_tasks(vec![
            map_task(Vector::new(2, INT.clone())),
            map_task(Vector::new(2, INT.clone())),
        ]);
        assert!(dispatcher.submit(&schedule).is_err());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn overlapping_outputs_reject_the_schedule_wholesale() {
        let (registry, runs) = registry_with(None);
        let dispatcher = Dispatcher::new(&registry, ComputeParams::default());
        let shared = Vector::new(2, INT.clone());
        let mut schedule = Schedule::new();
        schedule.step_tasks(vec![map_task(shared.clone()), map_task(shared)]);
        let err = dispatcher.submit(&schedule).unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn same_output_in_different_steps_is_allowed() {
        let (registry, runs) = registry_with(None);
        let dispatcher = Dispatcher::new(&registry, ComputeParams::default());
        let shared = Vector::new(2, INT.clone());
        let mut schedule = Schedule::new();
        schedule.step_task(map_task(shared.clone()));
        schedule.step_task(map_task(shared));
        dispatcher.submit(&schedule).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}
