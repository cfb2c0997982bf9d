//! Coupling configuration and the adapter registry.
//!
//! Configuration arrives already parsed; these types only derive
//! `Deserialize` so callers can load them from whatever format they use.
//! Symbolic model names resolve against an [`AdapterRegistry`] the caller
//! owns, never against global state.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::adapter::{ModelAdapter, SharedAdapter};
use crate::error::{CouplingError, CouplingResult};
use crate::event::{ChainEvent, Event, MapEvent, StepEvent};
use crate::mapper::MappingMethod;
use crate::scheduler::Scheduler;

// ── Configuration types ───────────────────────────────────────────────

/// A full coupling: which models to initialize and which events to run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CouplingConfig {
    /// Units of the scheduler clock. Each adapter's own units when unset.
    #[serde(default)]
    pub time_units: Option<String>,
    #[serde(default)]
    pub models: Vec<ModelSetup>,
    #[serde(default)]
    pub events: Vec<EventConfig>,
}

/// Initialization arguments for one registered model.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelSetup {
    pub name: String,
    /// Model config file, resolved inside `directory`.
    #[serde(default)]
    pub config: Option<String>,
    #[serde(default = "current_dir")]
    pub directory: PathBuf,
}

fn current_dir() -> PathBuf {
    PathBuf::from(".")
}

/// One `(event, interval)` registration.
#[derive(Debug, Clone, Deserialize)]
pub struct EventConfig {
    pub interval: f64,
    /// Overrides the event's default name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub spec: EventSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventSpec {
    /// Step `model` up to the clock.
    Step {
        model: String,
        /// Keep the registration interval instead of the model's time step.
        #[serde(default)]
        fixed: bool,
    },
    /// Copy variables from `src` into `dst`. Without `vars`, every output of
    /// `src` that `dst` takes as input is copied.
    Map {
        src: String,
        dst: String,
        #[serde(default)]
        vars: Vec<VarPair>,
        #[serde(default)]
        method: MappingMethod,
    },
    /// Run `events` back to back as one unit.
    Chain { events: Vec<EventSpec> },
}

/// A destination variable and the source variable it is read from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VarPair {
    pub dst: String,
    pub src: String,
}

// ── Registry ──────────────────────────────────────────────────────────

/// Named adapters available to a coupling, in insertion order.
#[derive(Debug, Default)]
pub struct AdapterRegistry {
    adapters: IndexMap<String, SharedAdapter>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `adapter` under `name` and return the shared handle.
    pub fn insert(&mut self, name: &str, adapter: ModelAdapter) -> CouplingResult<SharedAdapter> {
        let shared = adapter.shared();
        self.insert_shared(name, shared.clone())?;
        Ok(shared)
    }

    /// Register an adapter that is already shared.
    pub fn insert_shared(&mut self, name: &str, adapter: SharedAdapter) -> CouplingResult<()> {
        if self.adapters.contains_key(name) {
            return Err(CouplingError::Configuration(format!(
                "a model named '{}' is already registered",
                name
            )));
        }
        debug!(name, "model registered");
        self.adapters.insert(name.to_string(), adapter);
        Ok(())
    }

    pub fn get(&self, name: &str) -> CouplingResult<SharedAdapter> {
        self.adapters
            .get(name)
            .cloned()
            .ok_or_else(|| CouplingError::UnknownModel(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Initialize each model listed in `setups`, in order.
    #[instrument(skip_all, fields(models = setups.len()))]
    pub fn initialize_all(&self, setups: &[ModelSetup]) -> CouplingResult<()> {
        for setup in setups {
            let adapter = self.get(&setup.name)?;
            adapter
                .borrow_mut()
                .initialize(setup.config.as_deref(), &setup.directory)?;
        }
        Ok(())
    }

    /// Finalize every initialized model, in registration order.
    pub fn finalize_all(&self) -> CouplingResult<()> {
        for adapter in self.adapters.values() {
            let mut adapter = adapter.borrow_mut();
            if adapter.is_initialized() {
                adapter.finalize()?;
            }
        }
        Ok(())
    }

    /// Drop every registration.
    pub fn clear(&mut self) {
        self.adapters.clear();
    }
}

// ── Scheduler assembly ────────────────────────────────────────────────

/// Build a scheduler with every event in `config` registered, in order.
pub fn build_scheduler(config: &CouplingConfig, registry: &AdapterRegistry) -> CouplingResult<Scheduler> {
    let mut scheduler = match &config.time_units {
        Some(units) => Scheduler::new().with_time_units(units)?,
        None => Scheduler::new(),
    };
    for entry in &config.events {
        let event = build_event(&entry.spec, entry.name.as_deref(), registry)?;
        scheduler.register_boxed(event, entry.interval)?;
    }
    info!(events = scheduler.len(), "scheduler built from configuration");
    Ok(scheduler)
}

fn build_event(spec: &EventSpec, name: Option<&str>, registry: &AdapterRegistry) -> CouplingResult<Box<dyn Event>> {
    let event: Box<dyn Event> = match spec {
        EventSpec::Step { model, fixed } => {
            // Named by registry key: two instances of one model type share
            // a component name.
            let mut step = StepEvent::new(registry.get(model)?).named(name.unwrap_or(model));
            if *fixed {
                step = step.fixed();
            }
            Box::new(step)
        }
        EventSpec::Map {
            src,
            dst,
            vars,
            method,
        } => {
            let default_name = match vars.as_slice() {
                [] => format!("map:{}->{}", src, dst),
                _ => {
                    let dst_vars: Vec<&str> = vars.iter().map(|p| p.dst.as_str()).collect();
                    format!("map:{}->{}[{}]", src, dst, dst_vars.join(", "))
                }
            };
            let (src, dst) = (registry.get(src)?, registry.get(dst)?);
            let map = if vars.is_empty() {
                MapEvent::matching(src, dst, *method)?
            } else {
                let pairs: Vec<(&str, &str)> = vars.iter().map(|p| (p.dst.as_str(), p.src.as_str())).collect();
                MapEvent::new(src, dst, &pairs, *method)?
            };
            Box::new(map.named(name.unwrap_or(&default_name)))
        }
        EventSpec::Chain { events } => {
            if events.is_empty() {
                return Err(CouplingError::Configuration("a chain needs at least one event".to_string()));
            }
            let events = events
                .iter()
                .map(|sub| build_event(sub, None, registry))
                .collect::<CouplingResult<Vec<_>>>()?;
            let chain = ChainEvent::new(events);
            match name {
                Some(name) => Box::new(chain.named(name)),
                None => Box::new(chain),
            }
        }
    };
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::ValueQuery;
    use crate::model::{FieldRole, UniformFieldModel};

    fn registry() -> AdapterRegistry {
        let mut registry = AdapterRegistry::new();
        registry.insert("air", ModelAdapter::new(UniformFieldModel::air())).unwrap();
        registry.insert("earth", ModelAdapter::new(UniformFieldModel::earth())).unwrap();
        registry
    }

    fn parse(json: serde_json::Value) -> CouplingConfig {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_parse_config() {
        let config = parse(serde_json::json!({
            "time_units": "d",
            "models": [{ "name": "air", "config": "air.json", "directory": "runs/air" }],
            "events": [
                { "kind": "step", "model": "air", "interval": 1.2 },
                { "kind": "map", "src": "air", "dst": "earth", "interval": 1.0,
                  "vars": [{ "dst": "earth_surface__temperature", "src": "air__density" }],
                  "method": "bilinear" },
                { "kind": "chain", "interval": 2.0, "name": "both",
                  "events": [{ "kind": "step", "model": "earth", "fixed": true }] }
            ]
        }));
        assert_eq!(config.time_units.as_deref(), Some("d"));
        assert_eq!(config.models[0].directory, PathBuf::from("runs/air"));
        assert!(matches!(
            &config.events[1].spec,
            EventSpec::Map { method: MappingMethod::Bilinear, vars, .. } if vars.len() == 1
        ));
        assert_eq!(config.events[2].name.as_deref(), Some("both"));
        assert!(matches!(
            &config.events[2].spec,
            EventSpec::Chain { events } if matches!(events[0], EventSpec::Step { fixed: true, .. })
        ));
    }

    #[test]
    fn test_registry_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["air", "earth"]);

        let err = registry
            .insert("air", ModelAdapter::new(UniformFieldModel::air()))
            .unwrap_err();
        assert!(matches!(err, CouplingError::Configuration(_)));

        let setups: Vec<ModelSetup> = ["air", "earth"]
            .iter()
            .map(|name| ModelSetup {
                name: name.to_string(),
                config: None,
                directory: dir.path().to_path_buf(),
            })
            .collect();
        registry.initialize_all(&setups).unwrap();
        assert!(registry.get("earth").unwrap().borrow().is_initialized());

        registry.finalize_all().unwrap();
        assert!(!registry.get("air").unwrap().borrow().is_initialized());

        registry.clear();
        assert!(registry.is_empty());
        assert!(matches!(registry.get("air"), Err(CouplingError::UnknownModel(_))));
    }

    #[test]
    fn test_build_and_run_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry();
        let directory = dir.path().to_string_lossy().into_owned();
        let config = parse(serde_json::json!({
            "models": [
                { "name": "air", "directory": directory },
                { "name": "earth", "directory": directory }
            ],
            "events": [
                { "kind": "step", "model": "air", "interval": 1.2 },
                { "kind": "map", "src": "air", "dst": "earth", "interval": 1.0,
                  "vars": [{ "dst": "earth_surface__temperature", "src": "air__density" }] }
            ]
        }));
        registry.initialize_all(&config.models).unwrap();

        let mut scheduler = build_scheduler(&config, &registry).unwrap();
        assert_eq!(scheduler.len(), 2);
        scheduler.run(2.0).unwrap();

        let earth = registry.get("earth").unwrap();
        let values = earth
            .borrow()
            .get_value("earth_surface__temperature", &ValueQuery::new())
            .unwrap();
        assert_eq!(values, vec![1.2]);
        registry.finalize_all().unwrap();
    }

    #[test]
    fn test_build_rejects_unknown_model_and_bad_interval() {
        let registry = registry();
        let unknown = parse(serde_json::json!({
            "events": [{ "kind": "step", "model": "ocean", "interval": 1.0 }]
        }));
        assert!(matches!(
            build_scheduler(&unknown, &registry),
            Err(CouplingError::UnknownModel(name)) if name == "ocean"
        ));

        let bad = parse(serde_json::json!({
            "events": [{ "kind": "step", "model": "air", "interval": 0.0 }]
        }));
        assert!(matches!(build_scheduler(&bad, &registry), Err(CouplingError::Configuration(_))));

        let empty_chain = parse(serde_json::json!({
            "events": [{ "kind": "chain", "interval": 1.0, "events": [] }]
        }));
        assert!(matches!(
            build_scheduler(&empty_chain, &registry),
            Err(CouplingError::Configuration(_))
        ));
    }

    #[test]
    fn test_same_model_type_under_two_keys() {
        let mut registry = AdapterRegistry::new();
        registry.insert("air_a", ModelAdapter::new(UniformFieldModel::air())).unwrap();
        registry.insert("air_b", ModelAdapter::new(UniformFieldModel::air())).unwrap();
        let config = parse(serde_json::json!({
            "events": [
                { "kind": "step", "model": "air_a", "interval": 1.0 },
                { "kind": "step", "model": "air_b", "interval": 2.0 }
            ]
        }));
        let scheduler = build_scheduler(&config, &registry).unwrap();
        let names: Vec<&str> = scheduler.pending().iter().map(|(_, n, _)| *n).collect();
        assert_eq!(names, vec!["air_a", "air_b"]);
    }

    #[test]
    fn test_two_maps_between_one_pair() {
        let dir = tempfile::tempdir().unwrap();
        let src = UniformFieldModel::new("src", &[1])
            .with_field("a", "m", FieldRole::Output)
            .with_field("b", "m", FieldRole::Output);
        let dst = UniformFieldModel::new("dst", &[1])
            .with_field("a", "m", FieldRole::Input)
            .with_field("b", "m", FieldRole::Input);
        let mut registry = AdapterRegistry::new();
        registry.insert("src", ModelAdapter::new(src)).unwrap();
        registry.insert("dst", ModelAdapter::new(dst)).unwrap();
        let directory = dir.path().to_string_lossy().into_owned();
        let config = parse(serde_json::json!({
            "models": [
                { "name": "src", "directory": directory },
                { "name": "dst", "directory": directory }
            ],
            "events": [
                { "kind": "map", "src": "src", "dst": "dst", "interval": 1.0,
                  "vars": [{ "dst": "a", "src": "a" }] },
                { "kind": "map", "src": "src", "dst": "dst", "interval": 5.0,
                  "vars": [{ "dst": "b", "src": "b" }] }
            ]
        }));
        registry.initialize_all(&config.models).unwrap();

        let mut scheduler = build_scheduler(&config, &registry).unwrap();
        assert_eq!(scheduler.len(), 2);
        scheduler.run(5.0).unwrap();
        let counts: Vec<(&str, usize)> = ["map:src->dst[a]", "map:src->dst[b]"]
            .iter()
            .map(|name| (*name, scheduler.trace().iter().filter(|t| t.name == *name).count()))
            .collect();
        assert_eq!(counts, vec![("map:src->dst[a]", 5), ("map:src->dst[b]", 1)]);
    }

    #[test]
    fn test_event_names_from_config() {
        let registry = registry();
        let config = parse(serde_json::json!({
            "time_units": "h",
            "events": [
                { "kind": "step", "model": "air", "interval": 1.0, "name": "air-fast" },
                { "kind": "step", "model": "air", "interval": 6.0, "fixed": true }
            ]
        }));
        let scheduler = build_scheduler(&config, &registry).unwrap();
        let names: Vec<&str> = scheduler.pending().iter().map(|(_, n, _)| *n).collect();
        assert_eq!(names, vec!["air-fast", "air"]);
        assert_eq!(scheduler.time_units(), Some("h"));
    }
}
