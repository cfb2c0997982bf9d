//! # Confluence: Deterministic Model Coupling
//!
//! Drives independently stepped numerical models along one simulated
//! clock. Each model keeps its own grid, units and time step; the
//! coupling layer steps them in a reproducible order and carries values
//! between them across grids and units.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │          Scheduler           │ ← min-heap of (due, EventId)
//! │  ┌────────────────────────┐  │
//! │  │ Events                 │  │ ← step / map / chain / print
//! │  │  ┌──────────────────┐  │  │
//! │  │  │ GridMapping      │  │  │ ← identity / nearest / bilinear
//! │  │  └──────────────────┘  │  │
//! │  │  ┌──────────────────┐  │  │
//! │  │  │ ModelAdapter     │  │  │ ← units, grids, time, workdir
//! │  │  │  ┌────────────┐  │  │  │
//! │  │  │  │ dyn Bmi    │  │  │  │ ← the wrapped model
//! │  │  │  └────────────┘  │  │  │
//! │  │  └──────────────────┘  │  │
//! │  └────────────────────────┘  │
//! └──────────────────────────────┘
//! ```
//!
//! Execution is single-threaded: one event runs to completion before the
//! next is selected, and adapters are shared between events as
//! [`SharedAdapter`] (`Rc<RefCell<ModelAdapter>>`).
//!
//! ```no_run
//! use confluence::{MapEvent, MappingMethod, ModelAdapter, Scheduler, StepEvent, UniformFieldModel};
//!
//! # fn main() -> confluence::CouplingResult<()> {
//! let mut air = ModelAdapter::new(UniformFieldModel::air());
//! let mut earth = ModelAdapter::new(UniformFieldModel::earth());
//! air.initialize(None, "runs/air")?;
//! earth.initialize(None, "runs/earth")?;
//! let (air, earth) = (air.shared(), earth.shared());
//!
//! let mut scheduler = Scheduler::new();
//! scheduler.register(StepEvent::new(air.clone()), 1.2)?;
//! scheduler.register(
//!     MapEvent::new(
//!         air.clone(),
//!         earth.clone(),
//!         &[("earth_surface__temperature", "air__density")],
//!         MappingMethod::Nearest,
//!     )?,
//!     1.0,
//! )?;
//! scheduler.run(2.0)?;
//!
//! air.borrow_mut().finalize()?;
//! earth.borrow_mut().finalize()?;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod angle;
pub mod config;
pub mod error;
pub mod event;
pub mod mapper;
pub mod model;
pub mod scheduler;
pub mod time;
pub mod units;

// Re-exports for convenience.
pub use adapter::{ModelAdapter, ModelSummary, SharedAdapter, ValueQuery, VariableHandle};
pub use angle::AngleConvention;
pub use config::{build_scheduler, AdapterRegistry, CouplingConfig, EventConfig, EventSpec, ModelSetup};
pub use error::{CouplingError, CouplingResult};
pub use event::{ChainEvent, Event, EventContext, FnEvent, MapEvent, OutputSink, PrintEvent, StepEvent};
pub use mapper::{GridMapping, MappingMethod};
pub use model::{Bmi, BmiError, GridLocation, TriangleMeshModel, UniformFieldModel};
pub use scheduler::{EventId, Scheduler, StopHandle, TraceEntry};
pub use time::SimTime;
pub use units::Unit;
