//! Algorithm registry, schedule model, and the dispatcher that joins them.
//!
//! A schedule is an ordered list of steps; a step is a set of tasks with no
//! internal order. The dispatcher turns every task into a composite string
//! key (operation name, operator/type key fragments, backend suffix), looks
//! the key up in the registry, and executes the algorithm inside a dispatch
//! context carrying the compute parameters and, when present, the
//! accelerator handles. Failures are collected fail-slow within a step and
//! abort the schedule fail-fast between steps.

pub mod algo;
mod dispatch;
mod registry;
mod schedule;
mod task;

pub use dispatch::{DispatchContext, Dispatcher, DispatcherMetricsSnapshot};
pub use registry::{Backend, KeyBuilder, Registry, RegistryAlgo};
pub use schedule::Schedule;
pub use task::Task;
