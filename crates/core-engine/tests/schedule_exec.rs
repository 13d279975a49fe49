//! End-to-end schedule execution against the builtin host registry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use core_compute::ComputeParams;
use core_engine::{algo, Dispatcher, Registry, Schedule, Task};
use core_storage::{Matrix, ScalarVal, Vector};
use core_types::functions::{MULT_INT, PLUS_INT};
use core_types::{EngineError, INT};

fn registry() -> Registry {
    let mut registry = Registry::new();
    algo::register_cpu(&mut registry).unwrap();
    registry
}

#[test]
fn vxm_then_reduce_across_steps() {
    let registry = registry();
    let dispatcher = Dispatcher::new(&registry, ComputeParams::default());

    let a = Vector::from_entries::<i32>(3, vec![0, 2], &[1, 2]).unwrap();
    let b = Matrix::from_entries::<i32>(3, 3, vec![0, 0, 2], vec![1, 2, 0], &[3, 4, 5]).unwrap();
    let w = Vector::new(3, INT.clone());
    let total = ScalarVal::new(INT.clone());

    let mut schedule = Schedule::new();
    schedule.set_label("product then total");
    schedule.step_task(Task::VxmMasked {
        w: w.clone(),
        a,
        b,
        add: Some(PLUS_INT.clone()),
        mult: Some(MULT_INT.clone()),
        mask: None,
        complement: false,
    });
    // The second step observes the first step's output through the shared
    // handle; the inter-step barrier orders the two.
    schedule.step_task(Task::VReduce {
        s: total.clone(),
        init: ScalarVal::from_value(0i32),
        a: w.clone(),
        op: PLUS_INT.clone(),
    });

    dispatcher.submit(&schedule).unwrap();

    let (rows, vals) = w.to_entries::<i32>().unwrap();
    assert_eq!(rows, vec![0, 1, 2]);
    assert_eq!(vals, vec![10, 3, 4]);
    assert_eq!(total.get::<i32>().unwrap(), 17);
}

#[test]
fn pattern_vxm_through_the_dispatcher() {
    let registry = registry();
    let dispatcher = Dispatcher::new(&registry, ComputeParams::default());

    let a = Vector::from_pattern(3, vec![0, 2]).unwrap();
    let b = Matrix::from_pattern(3, 3, vec![0, 0, 2], vec![1, 2, 0]).unwrap();
    let w = Vector::new(3, core_types::VOID.clone());

    let mut schedule = Schedule::new();
    schedule.step_task(Task::VxmMasked {
        w: w.clone(),
        a,
        b,
        add: None,
        mult: None,
        mask: None,
        complement: false,
    });
    dispatcher.submit(&schedule).unwrap();
    assert_eq!(w.to_rows(), vec![0, 1, 2]);
}

#[test]
fn callbacks_observe_step_ordering() {
    let registry = registry();
    let dispatcher = Dispatcher::new(&registry, ComputeParams::default());
    let order = Arc::new(AtomicUsize::new(0));

    let first = order.clone();
    let second = order.clone();
    let mut schedule = Schedule::new();
    schedule.step_task(Task::Callback {
        f: Arc::new(move || {
            first
                .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
                .map_err(|_| EngineError::InvalidState("first callback out of order".into()))?;
            Ok(())
        }),
    });
    schedule.step_task(Task::Callback {
        f: Arc::new(move || {
            second
                .compare_exchange(1, 2, Ordering::SeqCst, Ordering::SeqCst)
                .map_err(|_| EngineError::InvalidState("second callback out of order".into()))?;
            Ok(())
        }),
    });
    dispatcher.submit(&schedule).unwrap();
    assert_eq!(order.load(Ordering::SeqCst), 2);
}

#[test]
fn user_defined_operator_misses_the_registry() {
    let registry = registry();
    let dispatcher = Dispatcher::new(&registry, ComputeParams::default());

    // A user operator key the builtin table never registered.
    let custom = core_types::OpBinary::from_fn::<i32, i32, i32, _>(
        "SATPLUS_INT",
        "*c = a + b;",
        |a, b| a.saturating_add(b),
    );
    let a = Vector::from_entries::<i32>(2, vec![0], &[1]).unwrap();
    let b = Matrix::from_entries::<i32>(2, 2, vec![0], vec![1], &[1]).unwrap();
    let w = Vector::new(2, INT.clone());

    let mut schedule = Schedule::new();
    schedule.step_task(Task::VxmMasked {
        w,
        a,
        b,
        add: Some(custom.clone()),
        mult: Some(custom),
        mask: None,
        complement: false,
    });
    let err = dispatcher.submit(&schedule).unwrap_err();
    assert!(matches!(err, EngineError::NotImplemented(_)));
    assert!(err
        .to_string()
        .contains("vxm_masked_SATPLUS_INT_SATPLUS_INT__cpu"));
}

#[test]
fn empty_schedule_is_ok() {
    let registry = registry();
    let dispatcher = Dispatcher::new(&registry, ComputeParams::default());
    dispatcher.submit(&Schedule::new()).unwrap();
    assert_eq!(dispatcher.metrics_snapshot().tasks_dispatched, 0);
}
