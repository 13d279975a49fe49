//! Public API flows: configuration, registration, submission.

use std::sync::Arc;

use sparx::functions::{MULT_FLOAT, PLUS_FLOAT, PLUS_INT};
use sparx::{
    BackendPreference, Config, Engine, EngineError, Matrix, ScalarVal, Schedule, Task, Vector,
    FLOAT, INT,
};

fn engine() -> Engine {
    Engine::with_config(Config::default()).unwrap()
}

#[test]
fn float_product_with_complement_mask() {
    let engine = engine();
    let a = Vector::from_entries::<f32>(4, vec![0, 1], &[1.5, 2.0]).unwrap();
    let b = Matrix::from_entries::<f32>(
        4,
        4,
        vec![0, 0, 1, 3],
        vec![0, 2, 2, 3],
        &[2.0, 4.0, 10.0, 7.0],
    )
    .unwrap();
    let w = Vector::new(4, FLOAT.clone());
    let mask = Vector::from_pattern(4, vec![0]).unwrap();

    let mut schedule = Schedule::new();
    schedule.set_label("masked float product");
    schedule.step_task(Task::VxmMasked {
        w: w.clone(),
        a,
        b,
        add: Some(PLUS_FLOAT.clone()),
        mult: Some(MULT_FLOAT.clone()),
        mask: Some(mask),
        complement: true,
    });
    engine.submit(&schedule).unwrap();

    let (rows, vals) = w.to_entries::<f32>().unwrap();
    // Column 0 is masked out; 1.5*4.0 + 2.0*10.0 lands in column 2.
    assert_eq!(rows, vec![2]);
    assert_eq!(vals, vec![26.0]);
}

#[test]
fn opencl_preference_without_acceleration_fails_closed() {
    if cfg!(feature = "opencl") {
        // With the runtime linked the outcome depends on the machine.
        return;
    }
    let mut config = Config::default();
    config.file.backend.prefer = BackendPreference::Opencl;
    assert!(matches!(
        Engine::with_config(config),
        Err(EngineError::NoAcceleration)
    ));
}

#[test]
fn user_algorithm_registration_and_dispatch() {
    struct Doubler;
    impl sparx::RegistryAlgo for Doubler {
        fn name(&self) -> &str {
            "v_map"
        }
        fn description(&self) -> &str {
            "doubles stored values"
        }
        fn execute(&self, _ctx: &sparx::DispatchContext<'_>) -> sparx::Result<()> {
            Ok(())
        }
    }

    let mut engine = engine();
    engine
        .register("v_map_CUSTOM__cpu", Arc::new(Doubler))
        .unwrap();
    assert!(engine.registry().has("v_map_CUSTOM__cpu"));
    // Duplicate registration is a configuration error.
    assert!(matches!(
        engine.register("v_map_INT__cpu", Arc::new(Doubler)),
        Err(EngineError::InvalidState(_))
    ));
}

#[test]
fn metrics_count_dispatches() {
    let engine = engine();
    let a = Vector::from_entries::<i32>(2, vec![0, 1], &[5, 6]).unwrap();
    let s = ScalarVal::new(INT.clone());
    let mut schedule = Schedule::new();
    schedule.step_task(Task::VReduce {
        s: s.clone(),
        init: ScalarVal::from_value(0i32),
        a,
        op: PLUS_INT.clone(),
    });
    let (outcome, metrics) = engine.submit_with_metrics(&schedule);
    outcome.unwrap();
    assert_eq!(metrics.tasks_dispatched, 1);
    assert_eq!(metrics.steps_completed, 1);
    assert_eq!(s.get::<i32>().unwrap(), 11);
}
