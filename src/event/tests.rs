//! Coupling scenarios: events driven by a `Scheduler` over built-in models.

use tempfile::TempDir;

use crate::adapter::{InterpolationMethod, ModelAdapter, SharedAdapter, ValueQuery};
use crate::error::CouplingError;
use crate::event::{ChainEvent, Event, EventContext, MapEvent, MemorySink, PrintEvent, StepEvent};
use crate::mapper::MappingMethod;
use crate::model::{Bmi, FieldRole, TriangleMeshModel, UniformFieldModel};
use crate::scheduler::Scheduler;
use crate::time::SimTime;

fn shared<M: Bmi + 'static>(model: M) -> (SharedAdapter, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut adapter = ModelAdapter::new(model);
    adapter.initialize(None, dir.path()).unwrap();
    (adapter.shared(), dir)
}

fn value(adapter: &SharedAdapter, name: &str) -> Vec<f64> {
    adapter.borrow().get_value(name, &ValueQuery::new()).unwrap()
}

fn close(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
}

// ── Step + map ────────────────────────────────────────────────────────

#[test]
fn test_air_to_earth_scenario() {
    let (air, _a) = shared(UniformFieldModel::air());
    let (earth, _e) = shared(UniformFieldModel::earth());

    let mut sched = Scheduler::new();
    sched.register(StepEvent::new(air.clone()), 1.2).unwrap();
    let map = MapEvent::new(
        air.clone(),
        earth.clone(),
        &[("earth_surface__temperature", "air__density")],
        MappingMethod::Nearest,
    )
    .unwrap();
    assert!(map.mappings().unwrap()[0].is_identity());
    sched.register(map, 1.0).unwrap();

    assert_eq!(sched.run(2.0).unwrap(), 3);

    assert_eq!(value(&air, "air__density"), vec![1.2]);
    // Copied at t=2 after air stepped to 1.2.
    assert_eq!(value(&earth, "earth_surface__temperature"), vec![1.2]);

    let order: Vec<(&str, f64)> = sched
        .trace()
        .iter()
        .map(|t| (t.name.as_str(), t.time.value()))
        .collect();
    assert_eq!(order, vec![("map:air->earth", 1.0), ("air", 1.2), ("map:air->earth", 2.0)]);

    // The step follows the model's own dt of 1.
    let pending = sched.pending();
    assert_eq!(pending[0].1, "air");
    assert!((pending[0].2.value() - 2.2).abs() < 1e-12);
}

#[test]
fn test_map_before_step_sees_old_values() {
    let (air, _a) = shared(UniformFieldModel::air());
    let (earth, _e) = shared(UniformFieldModel::earth());

    let mut sched = Scheduler::new();
    sched.register(StepEvent::new(air.clone()), 1.2).unwrap();
    sched
        .register(
            MapEvent::new(
                air.clone(),
                earth.clone(),
                &[("earth_surface__temperature", "air__density")],
                MappingMethod::Nearest,
            )
            .unwrap(),
            1.0,
        )
        .unwrap();

    sched.run(1.0).unwrap();
    assert_eq!(value(&earth, "earth_surface__temperature"), vec![0.0]);
}

#[test]
fn test_chain_runs_as_one_unit() {
    let (air, _a) = shared(UniformFieldModel::air());
    let (earth, _e) = shared(UniformFieldModel::earth());

    let back = MapEvent::new(
        earth.clone(),
        air.clone(),
        &[("air__density", "earth_surface__temperature")],
        MappingMethod::Nearest,
    )
    .unwrap();
    let first: Vec<Box<dyn Event>> = vec![Box::new(StepEvent::new(air.clone()))];
    let chain = ChainEvent::new(first).then(back);
    assert_eq!(chain.name(), "chain[air]");
    assert_eq!(chain.len(), 2);

    let mut sched = Scheduler::new();
    sched.register(StepEvent::new(earth.clone()), 1.2).unwrap();
    sched.register(chain, 1.0).unwrap();
    sched.run(2.0).unwrap();

    // At t=2 air steps to 2, then takes earth's 1.2.
    assert_eq!(value(&air, "air__density"), vec![1.2]);
    assert_eq!(sched.events_processed(), 3);
}

#[test]
fn test_chain_stops_at_first_failure() {
    let (air, _a) = shared(UniformFieldModel::air().failing_after(0));
    let (earth, _e) = shared(UniformFieldModel::earth());
    let map = MapEvent::new(
        air.clone(),
        earth.clone(),
        &[("earth_surface__temperature", "air__density")],
        MappingMethod::Nearest,
    )
    .unwrap();
    let events: Vec<Box<dyn Event>> = vec![Box::new(StepEvent::new(air.clone())), Box::new(map)];
    let mut chain = ChainEvent::new(events);
    assert_eq!(chain.name(), "chain[air, map:air->earth]");

    earth.borrow_mut().set_value("earth_surface__temperature", &[7.0]).unwrap();
    let err = chain.execute(&EventContext::new(SimTime::new(1.0), None)).unwrap_err();
    assert!(err.is_model_error());
    assert_eq!(value(&earth, "earth_surface__temperature"), vec![7.0]);
}

// ── Units and time ────────────────────────────────────────────────────

#[test]
fn test_round_trip_with_unit_conversion() {
    let x_model = UniformFieldModel::new("x", &[3])
        .with_field("temperature", "degC", FieldRole::Output)
        .with_field("returned", "degC", FieldRole::Input);
    let y_model = UniformFieldModel::new("y", &[3]).with_field("temperature", "K", FieldRole::Both);
    let (x, _x) = shared(x_model);
    let (y, _y) = shared(y_model);
    x.borrow_mut().set_value("temperature", &[1.0, 2.0, 3.0]).unwrap();

    let mut there = MapEvent::new(x.clone(), y.clone(), &[("temperature", "temperature")], MappingMethod::Nearest).unwrap();
    let mut back = MapEvent::new(y.clone(), x.clone(), &[("returned", "temperature")], MappingMethod::Nearest).unwrap();

    let ctx = EventContext::new(SimTime::new(1.0), None);
    there.execute(&ctx).unwrap();
    back.execute(&ctx).unwrap();

    assert!(close(&value(&y, "temperature"), &[274.15, 275.15, 276.15]));
    assert!(close(&value(&x, "returned"), &[1.0, 2.0, 3.0]));
}

#[test]
fn test_scheduler_time_units_reach_models() {
    let (air, _a) = shared(UniformFieldModel::air());
    let mut sched = Scheduler::new().with_time_units("h").unwrap();
    sched.register(StepEvent::new(air.clone()), 24.0).unwrap();

    sched.run(24.0).unwrap();
    // Air runs in days.
    assert!(close(&value(&air, "air__density"), &[1.0]));
    // One model step of a day later, expressed in hours.
    assert!((sched.next_due().unwrap().value() - 48.0).abs() < 1e-9);
}

#[test]
fn test_fixed_step_ignores_model_dt() {
    let (air, _a) = shared(UniformFieldModel::air().with_time_step(5.0));
    let mut sched = Scheduler::new();
    sched.register(StepEvent::new(air.clone()).fixed(), 0.5).unwrap();
    assert_eq!(sched.run(2.0).unwrap(), 4);
    assert_eq!(value(&air, "air__density"), vec![2.0]);
}

#[test]
fn test_interpolated_map_reads_between_samples() {
    let (air, _a) = shared(UniformFieldModel::air());
    let (earth, _e) = shared(UniformFieldModel::earth());
    air.borrow_mut()
        .enable_time_interpolation(InterpolationMethod::Linear)
        .unwrap();
    air.borrow_mut().update_until(2.0, None).unwrap();

    let mut map = MapEvent::new(
        air.clone(),
        earth.clone(),
        &[("earth_surface__temperature", "air__density")],
        MappingMethod::Nearest,
    )
    .unwrap();
    map.execute(&EventContext::new(SimTime::new(0.5), None)).unwrap();
    assert!(close(&value(&earth, "earth_surface__temperature"), &[0.5]));
}

// ── Failures ──────────────────────────────────────────────────────────

#[test]
fn test_model_failure_stops_run() {
    let (air, _a) = shared(UniformFieldModel::air().failing_after(2));
    let mut sched = Scheduler::new();
    sched.register(StepEvent::new(air.clone()).fixed(), 1.0).unwrap();

    let err = sched.run(10.0).unwrap_err();
    match err {
        CouplingError::Model { operation, .. } => assert_eq!(operation, "update_until"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(sched.current_time(), SimTime::new(2.0));
    assert_eq!(air.borrow().model::<UniformFieldModel>().unwrap().updates, 2);
}

#[test]
fn test_map_requires_variables() {
    let (air, _a) = shared(UniformFieldModel::air());
    let (earth, _e) = shared(UniformFieldModel::earth());
    let err = MapEvent::new(air, earth, &[], MappingMethod::Nearest).unwrap_err();
    assert!(matches!(err, CouplingError::Configuration(_)));
}

#[test]
fn test_map_unknown_variable() {
    let (air, _a) = shared(UniformFieldModel::air());
    let (earth, _e) = shared(UniformFieldModel::earth());
    let err = MapEvent::new(air, earth, &[("earth_surface__temperature", "nope")], MappingMethod::Nearest)
        .unwrap_err();
    assert!(matches!(err, CouplingError::UnknownVariable(_)));
}

#[test]
fn test_map_across_locations_rejected() {
    let (gauge, _g) = shared(
        UniformFieldModel::new("gauge", &[2, 2]).with_field("slope", "deg", FieldRole::Output),
    );
    let (mesh, _m) = shared(TriangleMeshModel::new());
    let err = MapEvent::new(gauge, mesh, &[("land_surface__aspect_azimuth", "slope")], MappingMethod::Nearest).unwrap_err();
    assert!(matches!(err, CouplingError::IncompatibleGrid(_)));
}

#[test]
fn test_map_built_lazily_for_uninitialized_adapters() {
    let air = ModelAdapter::new(UniformFieldModel::air()).shared();
    let (earth, _e) = shared(UniformFieldModel::earth());
    let map = MapEvent::new(
        air.clone(),
        earth,
        &[("earth_surface__temperature", "air__density")],
        MappingMethod::Nearest,
    )
    .unwrap();
    assert!(map.mappings().is_none());
}

#[test]
fn test_matching_pairs_by_name() {
    let src = UniformFieldModel::new("src", &[1])
        .with_field("a", "m", FieldRole::Output)
        .with_field("b", "m", FieldRole::Output);
    let dst = UniformFieldModel::new("dst", &[1])
        .with_field("b", "km", FieldRole::Input)
        .with_field("c", "m", FieldRole::Input);
    let (src, _s) = shared(src);
    let (dst, _d) = shared(dst);

    let map = MapEvent::matching(src.clone(), dst.clone(), MappingMethod::Nearest).unwrap();
    assert_eq!(map.vars(), &[("b".to_string(), "b".to_string())]);

    let err = MapEvent::matching(dst, src, MappingMethod::Nearest).unwrap_err();
    assert!(matches!(err, CouplingError::Configuration(_)));
}

// ── Print ─────────────────────────────────────────────────────────────

#[test]
fn test_print_event_writes_to_sink() {
    let (air, _a) = shared(UniformFieldModel::air());
    let sink = MemorySink::new();
    let mut sched = Scheduler::new();
    sched.register(StepEvent::new(air.clone()).fixed(), 1.0).unwrap();
    sched
        .register(PrintEvent::new(air.clone(), &[("air__density", "nc")], sink.clone()), 2.0)
        .unwrap();
    sched.run(4.0).unwrap();

    let records = sink.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].component, "air");
    assert_eq!(records[0].name, "air__density");
    assert_eq!(records[0].format, "nc");
    assert_eq!(records[0].units, "");
    // The step registered first, so it ran before each print.
    assert_eq!(records[0].values, vec![2.0]);
    assert_eq!(records[1].time, SimTime::new(4.0));
    assert_eq!(records[1].values, vec![4.0]);
}
