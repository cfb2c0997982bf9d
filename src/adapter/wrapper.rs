//! `ModelAdapter`: drives and queries one model through a uniform contract.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info, instrument};

use crate::angle::{self, AngleConvention};
use crate::error::{CouplingError, CouplingResult};
use crate::model::{Bmi, BmiError, BmiResult, GridLocation};
use crate::units::{self, Unit};

use super::grid::{structured_counts, GridDescriptor, GridKind};
use super::interp::{InterpolationMethod, TimeInterpolator};
use super::variable::{Intent, VariableDescriptor, VariableHandle};
use super::workdir::WorkingDir;

/// An adapter shared between the events that drive it.
///
/// Execution is single-threaded: one event runs at a time and borrows the
/// adapter only for the duration of its own call.
pub type SharedAdapter = Rc<RefCell<ModelAdapter>>;

// ── ValueQuery ────────────────────────────────────────────────────────

/// Optional transformations applied by [`ModelAdapter::get_value`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueQuery {
    /// Units to convert the values into.
    pub units: Option<String>,
    /// Directional-angle convention to express the values in.
    pub angle: Option<AngleConvention>,
    /// Time (in the adapter's time units) to resample the values at.
    pub at: Option<f64>,
}

impl ValueQuery {
    /// Raw values in the variable's own units.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn units(mut self, units: &str) -> Self {
        self.units = Some(units.to_string());
        self
    }

    pub fn angle(mut self, convention: AngleConvention) -> Self {
        self.angle = Some(convention);
        self
    }

    pub fn at(mut self, time: f64) -> Self {
        self.at = Some(time);
        self
    }
}

// ── ModelAdapter ──────────────────────────────────────────────────────

/// Wraps exactly one model component.
///
/// Lifecycle calls (`initialize`, `update`, `update_until`, `finalize`)
/// run inside the model's working directory. Variable and grid
/// descriptors are captured once when `initialize` succeeds and dropped
/// on `finalize`; every other query goes to the model at call time.
///
/// Every failure reported by the model becomes
/// [`CouplingError::Model`], tagged with the operation and its arguments.
pub struct ModelAdapter {
    model: Box<dyn Bmi>,
    name: String,
    initialized: bool,
    initdir: Option<PathBuf>,
    grids: BTreeMap<i32, GridDescriptor>,
    vars: BTreeMap<String, VariableDescriptor>,
    time_units: Option<String>,
    interpolators: BTreeMap<String, TimeInterpolator>,
}

impl ModelAdapter {
    /// Wrap a model. The adapter starts uninitialized.
    pub fn new<M: Bmi + 'static>(model: M) -> Self {
        Self::from_boxed(Box::new(model))
    }

    /// Wrap an already boxed model.
    pub fn from_boxed(model: Box<dyn Bmi>) -> Self {
        let name = model.get_component_name();
        ModelAdapter {
            model,
            name,
            initialized: false,
            initdir: None,
            grids: BTreeMap::new(),
            vars: BTreeMap::new(),
            time_units: None,
            interpolators: BTreeMap::new(),
        }
    }

    /// Move the adapter behind a shared handle.
    pub fn shared(self) -> SharedAdapter {
        Rc::new(RefCell::new(self))
    }

    /// Component name reported by the model.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Directory the model was initialized in.
    pub fn initdir(&self) -> Option<&Path> {
        self.initdir.as_deref()
    }

    /// Downcast the wrapped model for inspection.
    pub fn model<T: Bmi + 'static>(&self) -> Option<&T> {
        self.model.as_any().downcast_ref::<T>()
    }

    /// Variable descriptors captured at initialize, sorted by name.
    pub fn variables(&self) -> impl Iterator<Item = &VariableDescriptor> {
        self.vars.values()
    }

    /// Grid descriptors captured at initialize, sorted by id.
    pub fn grids(&self) -> impl Iterator<Item = &GridDescriptor> {
        self.grids.values()
    }

    /// Descriptor of one grid.
    pub fn grid(&self, grid: i32) -> CouplingResult<&GridDescriptor> {
        self.require_initialized()?;
        self.grids.get(&grid).ok_or(CouplingError::UnknownGrid(grid))
    }

    /// A live view of one declared variable.
    pub fn var<'a>(&'a self, name: &'a str) -> CouplingResult<VariableHandle<'a>> {
        self.require_initialized()?;
        if !self.vars.contains_key(name) {
            return Err(CouplingError::UnknownVariable(name.to_string()));
        }
        Ok(VariableHandle::new(self, name))
    }

    // ── Model calls ───────────────────────────────────────

    fn call<T>(
        &self,
        operation: &'static str,
        args: impl Display,
        f: impl FnOnce(&dyn Bmi) -> BmiResult<T>,
    ) -> CouplingResult<T> {
        f(self.model.as_ref()).map_err(|source| model_error(operation, args, source))
    }

    fn call_mut<T>(
        &mut self,
        operation: &'static str,
        args: impl Display,
        f: impl FnOnce(&mut dyn Bmi) -> BmiResult<T>,
    ) -> CouplingResult<T> {
        f(self.model.as_mut()).map_err(|source| model_error(operation, args, source))
    }

    fn require_initialized(&self) -> CouplingResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(CouplingError::NotInitialized(self.name.clone()))
        }
    }

    fn check_var(&self, name: &str) -> CouplingResult<()> {
        if self.initialized && !self.vars.contains_key(name) {
            return Err(CouplingError::UnknownVariable(name.to_string()));
        }
        Ok(())
    }

    fn workdir(&self) -> CouplingResult<WorkingDir> {
        match &self.initdir {
            Some(dir) => WorkingDir::enter(dir),
            None => Err(CouplingError::NotInitialized(self.name.clone())),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────

    /// Initialize the model inside `directory`, then capture its variable
    /// and grid descriptors.
    ///
    /// `directory` must already exist. The previous working directory is
    /// restored whether or not the model succeeds.
    #[instrument(skip(self, directory), fields(component = %self.name))]
    pub fn initialize(&mut self, config: Option<&str>, directory: impl AsRef<Path>) -> CouplingResult<()> {
        let directory = directory.as_ref();
        let dir = directory
            .canonicalize()
            .map_err(|source| CouplingError::WorkingDirectory {
                path: directory.to_path_buf(),
                source,
            })?;
        let config = config.unwrap_or("");

        self.initialized = false;
        self.grids.clear();
        self.vars.clear();
        {
            let _cwd = WorkingDir::enter(&dir)?;
            self.call_mut("initialize", format!("{:?}", config), |m| m.initialize(config))?;
        }
        self.initdir = Some(dir.clone());

        self.capture_descriptors()?;
        self.initialized = true;
        for interp in self.interpolators.values_mut() {
            interp.clear();
        }
        self.record_samples()?;

        info!(
            variables = self.vars.len(),
            grids = self.grids.len(),
            dir = %dir.display(),
            "model initialized"
        );
        Ok(())
    }

    fn capture_descriptors(&mut self) -> CouplingResult<()> {
        let inputs: BTreeSet<String> = self.model.get_input_var_names().into_iter().collect();
        let outputs: BTreeSet<String> = self.model.get_output_var_names().into_iter().collect();

        let mut vars = BTreeMap::new();
        let mut grids = BTreeMap::new();
        for name in inputs.union(&outputs) {
            let grid = self.var_grid(name)?;
            if !grids.contains_key(&grid) {
                grids.insert(grid, self.describe_grid(grid)?);
            }
            let intent = Intent::from_flags(inputs.contains(name), outputs.contains(name))
                .unwrap_or(Intent::In);
            let descriptor = VariableDescriptor {
                name: name.clone(),
                units: self.var_units(name)?,
                dtype: self.var_type(name)?,
                itemsize: self.var_itemsize(name)?,
                nbytes: self.var_nbytes(name)?,
                grid,
                location: self.var_location(name)?,
                intent,
            };
            debug!(var = %name, grid, intent = %intent, "variable captured");
            vars.insert(name.clone(), descriptor);
        }

        self.vars = vars;
        self.grids = grids;
        Ok(())
    }

    /// Query the model for the full geometry of one grid.
    pub fn describe_grid(&self, grid: i32) -> CouplingResult<GridDescriptor> {
        let kind = self.grid_type(grid)?;
        let rank = self.grid_ndim(grid)?;
        let mut descriptor = GridDescriptor {
            id: grid,
            kind,
            rank,
            node_count: self.grid_number_of_nodes(grid)?,
            edge_count: self.grid_number_of_edges(grid)?,
            face_count: self.grid_number_of_faces(grid)?,
            vertex_count: self.grid_number_of_vertices(grid)?,
            shape: Vec::new(),
            spacing: Vec::new(),
            origin: Vec::new(),
            x: Vec::new(),
            y: Vec::new(),
            z: Vec::new(),
            face_nodes: Vec::new(),
            nodes_per_face: Vec::new(),
        };

        if kind.is_structured() && rank > 0 {
            descriptor.shape = self.grid_shape(grid)?;
        }
        match kind {
            GridKind::Scalar => {}
            GridKind::UniformRectilinear => {
                descriptor.spacing = self.grid_spacing(grid)?;
                descriptor.origin = self.grid_origin(grid)?;
            }
            _ => {
                descriptor.x = self.grid_x(grid)?;
                if rank >= 2 {
                    descriptor.y = self.grid_y(grid)?;
                }
                if rank >= 3 {
                    descriptor.z = self.grid_z(grid)?;
                }
            }
        }
        if !kind.is_structured() && descriptor.face_count > 0 {
            descriptor.nodes_per_face = self.nodes_per_face(grid)?;
            descriptor.face_nodes = self.face_node_connectivity(grid)?;
        }
        Ok(descriptor)
    }

    /// Advance the model by one of its own time steps.
    #[instrument(level = "debug", skip(self), fields(component = %self.name))]
    pub fn update(&mut self) -> CouplingResult<()> {
        self.require_initialized()?;
        {
            let _cwd = self.workdir()?;
            self.call_mut("update", "", |m| m.update())?;
        }
        self.record_samples()
    }

    /// Advance the model until its current time reaches `then`.
    ///
    /// `then` is in `units`, or the adapter's time units when `None`. Uses
    /// the model's own `update_until` when it has one; otherwise steps
    /// until the model's time reaches `then`, failing if a step makes no
    /// progress.
    #[instrument(level = "debug", skip(self), fields(component = %self.name))]
    pub fn update_until(&mut self, then: f64, units: Option<&str>) -> CouplingResult<()> {
        self.require_initialized()?;
        let target = self.time_from(then, units)?;
        {
            let _cwd = self.workdir()?;
            match self.model.update_until(target) {
                Ok(()) => {}
                Err(e) if e.is_not_implemented() => self.step_until(target)?,
                Err(source) => return Err(model_error("update_until", target, source)),
            }
        }
        self.record_samples()
    }

    // Caller holds the working directory guard.
    fn step_until(&mut self, target: f64) -> CouplingResult<()> {
        let mut now = self.call("get_current_time", "", |m| m.get_current_time())?;
        while now < target {
            self.call_mut("update", "", |m| m.update())?;
            let after = self.call("get_current_time", "", |m| m.get_current_time())?;
            if after <= now {
                return Err(model_error(
                    "update",
                    "",
                    BmiError::failure(format!("time did not advance past {}", now)),
                ));
            }
            now = after;
        }
        Ok(())
    }

    /// Release the model. Descriptors are dropped and the adapter returns
    /// to the uninitialized state.
    #[instrument(skip(self), fields(component = %self.name))]
    pub fn finalize(&mut self) -> CouplingResult<()> {
        self.require_initialized()?;
        {
            let _cwd = self.workdir()?;
            self.call_mut("finalize", "", |m| m.finalize())?;
        }
        self.initialized = false;
        self.grids.clear();
        self.vars.clear();
        for interp in self.interpolators.values_mut() {
            interp.clear();
        }
        info!("model finalized");
        Ok(())
    }

    // ── Values ────────────────────────────────────────────

    /// Current values of `name`, transformed per `query`.
    pub fn get_value(&self, name: &str, query: &ValueQuery) -> CouplingResult<Vec<f64>> {
        self.check_var(name)?;
        let mut values = vec![0.0; self.var_size(name)?];
        self.get_value_into(name, &mut values, query)?;
        Ok(values)
    }

    /// Like [`get_value`](Self::get_value), writing into `out`.
    ///
    /// Order of transformations: time resampling, then unit conversion,
    /// then angle convention.
    pub fn get_value_into(&self, name: &str, out: &mut [f64], query: &ValueQuery) -> CouplingResult<()> {
        self.check_var(name)?;
        self.call("get_value", name, |m| m.get_value(name, out))?;

        if let (Some(at), Some(interp)) = (query.at, self.interpolators.get(name)) {
            let resampled = interp
                .interpolate(at)
                .map_err(|reason| CouplingError::TimeInterpolation {
                    name: name.to_string(),
                    reason,
                })?;
            if resampled.len() != out.len() {
                return Err(CouplingError::TimeInterpolation {
                    name: name.to_string(),
                    reason: format!("recorded {} values, buffer holds {}", resampled.len(), out.len()),
                });
            }
            out.copy_from_slice(&resampled);
        }

        let native = self.var_units(name)?;
        let units = match &query.units {
            Some(target) if target.as_str() != native => {
                units::convert_in_place(out, &native, target)?;
                target.clone()
            }
            _ => native,
        };

        if let Some(convention) = query.angle {
            angle::convert(out, AngleConvention::of_variable(name), convention, is_radians(&units));
        }
        Ok(())
    }

    /// Overwrite `name` with `values`, already in the variable's units.
    pub fn set_value(&mut self, name: &str, values: &[f64]) -> CouplingResult<()> {
        self.check_var(name)?;
        let args = format!("{}, <{} values>", name, values.len());
        self.call_mut("set_value", args, |m| m.set_value(name, values))
    }

    // ── Variable metadata ─────────────────────────────────

    pub fn input_var_names(&self) -> Vec<String> {
        let mut names = self.model.get_input_var_names();
        names.sort();
        names
    }

    pub fn output_var_names(&self) -> Vec<String> {
        let mut names = self.model.get_output_var_names();
        names.sort();
        names
    }

    /// Declared units; the placeholder `"-"` reads as dimensionless `""`.
    pub fn var_units(&self, name: &str) -> CouplingResult<String> {
        let units = self.call("get_var_units", name, |m| m.get_var_units(name))?;
        Ok(if units.trim() == "-" { String::new() } else { units })
    }

    pub fn var_type(&self, name: &str) -> CouplingResult<String> {
        self.call("get_var_type", name, |m| m.get_var_type(name))
    }

    pub fn var_itemsize(&self, name: &str) -> CouplingResult<usize> {
        self.call("get_var_itemsize", name, |m| m.get_var_itemsize(name))
    }

    pub fn var_nbytes(&self, name: &str) -> CouplingResult<usize> {
        self.call("get_var_nbytes", name, |m| m.get_var_nbytes(name))
    }

    pub fn var_grid(&self, name: &str) -> CouplingResult<i32> {
        self.call("get_var_grid", name, |m| m.get_var_grid(name))
    }

    pub fn var_location(&self, name: &str) -> CouplingResult<GridLocation> {
        self.call("get_var_location", name, |m| m.get_var_location(name))
    }

    pub fn var_intent(&self, name: &str) -> CouplingResult<Intent> {
        let input = self.model.get_input_var_names().iter().any(|n| n == name);
        let output = self.model.get_output_var_names().iter().any(|n| n == name);
        Intent::from_flags(input, output).ok_or_else(|| CouplingError::UnknownVariable(name.to_string()))
    }

    /// Number of values `name` carries, from its grid and location.
    pub fn var_size(&self, name: &str) -> CouplingResult<usize> {
        let grid = self.var_grid(name)?;
        self.grid_element_count(grid, self.var_location(name)?)
    }

    // ── Grids ─────────────────────────────────────────────

    pub fn grid_ndim(&self, grid: i32) -> CouplingResult<usize> {
        self.call("get_grid_rank", grid, |m| m.get_grid_rank(grid))
    }

    pub fn grid_type(&self, grid: i32) -> CouplingResult<GridKind> {
        self.call("get_grid_type", grid, |m| m.get_grid_type(grid))
            .map(|t| GridKind::parse(&t))
    }

    pub fn grid_shape(&self, grid: i32) -> CouplingResult<Vec<usize>> {
        let mut out = vec![0; self.grid_ndim(grid)?];
        self.grid_shape_into(grid, &mut out)?;
        Ok(out)
    }

    pub fn grid_shape_into(&self, grid: i32, out: &mut [usize]) -> CouplingResult<()> {
        self.call("get_grid_shape", grid, |m| m.get_grid_shape(grid, out))
    }

    pub fn grid_spacing(&self, grid: i32) -> CouplingResult<Vec<f64>> {
        let mut out = vec![0.0; self.grid_ndim(grid)?];
        self.grid_spacing_into(grid, &mut out)?;
        Ok(out)
    }

    pub fn grid_spacing_into(&self, grid: i32, out: &mut [f64]) -> CouplingResult<()> {
        self.call("get_grid_spacing", grid, |m| m.get_grid_spacing(grid, out))
    }

    pub fn grid_origin(&self, grid: i32) -> CouplingResult<Vec<f64>> {
        let mut out = vec![0.0; self.grid_ndim(grid)?];
        self.grid_origin_into(grid, &mut out)?;
        Ok(out)
    }

    pub fn grid_origin_into(&self, grid: i32, out: &mut [f64]) -> CouplingResult<()> {
        self.call("get_grid_origin", grid, |m| m.get_grid_origin(grid, out))
    }

    pub fn grid_x(&self, grid: i32) -> CouplingResult<Vec<f64>> {
        let mut out = vec![0.0; self.coordinate_len(grid, 0)?];
        self.grid_x_into(grid, &mut out)?;
        Ok(out)
    }

    pub fn grid_x_into(&self, grid: i32, out: &mut [f64]) -> CouplingResult<()> {
        self.call("get_grid_x", grid, |m| m.get_grid_x(grid, out))
    }

    pub fn grid_y(&self, grid: i32) -> CouplingResult<Vec<f64>> {
        let mut out = vec![0.0; self.coordinate_len(grid, 1)?];
        self.grid_y_into(grid, &mut out)?;
        Ok(out)
    }

    pub fn grid_y_into(&self, grid: i32, out: &mut [f64]) -> CouplingResult<()> {
        self.call("get_grid_y", grid, |m| m.get_grid_y(grid, out))
    }

    pub fn grid_z(&self, grid: i32) -> CouplingResult<Vec<f64>> {
        let mut out = vec![0.0; self.coordinate_len(grid, 2)?];
        self.grid_z_into(grid, &mut out)?;
        Ok(out)
    }

    pub fn grid_z_into(&self, grid: i32, out: &mut [f64]) -> CouplingResult<()> {
        self.call("get_grid_z", grid, |m| m.get_grid_z(grid, out))
    }

    // Rectilinear grids list one coordinate per row/column; everything
    // else lists one per node.
    fn coordinate_len(&self, grid: i32, axis: usize) -> CouplingResult<usize> {
        if self.grid_type(grid)? == GridKind::Rectilinear {
            let shape = self.grid_shape(grid)?;
            Ok(shape.len().checked_sub(axis + 1).map_or(0, |d| shape[d]))
        } else {
            self.grid_number_of_nodes(grid)
        }
    }

    pub fn grid_number_of_nodes(&self, grid: i32) -> CouplingResult<usize> {
        self.call("get_grid_node_count", grid, |m| m.get_grid_node_count(grid))
    }

    /// Edge count; structured grids without a native count derive it
    /// from their shape.
    pub fn grid_number_of_edges(&self, grid: i32) -> CouplingResult<usize> {
        match optional(self.call("get_grid_edge_count", grid, |m| m.get_grid_edge_count(grid)))? {
            Some(n) => Ok(n),
            None => self.shape_counts(grid).map(|(edges, _)| edges),
        }
    }

    /// Face count; structured grids without a native count derive it
    /// from their shape.
    pub fn grid_number_of_faces(&self, grid: i32) -> CouplingResult<usize> {
        match optional(self.call("get_grid_face_count", grid, |m| m.get_grid_face_count(grid)))? {
            Some(n) => Ok(n),
            None => self.shape_counts(grid).map(|(_, faces)| faces),
        }
    }

    /// Total face-node references: the length of the connectivity array.
    pub fn grid_number_of_vertices(&self, grid: i32) -> CouplingResult<usize> {
        let faces = self.grid_number_of_faces(grid)?;
        if faces == 0 {
            return Ok(0);
        }
        match optional(self.nodes_per_face(grid))? {
            Some(counts) => Ok(counts.iter().sum()),
            None if self.grid_type(grid)?.is_structured() => Ok(faces * 4),
            None => Ok(0),
        }
    }

    /// Number of values on `grid` at `location`.
    pub fn grid_element_count(&self, grid: i32, location: GridLocation) -> CouplingResult<usize> {
        match location {
            GridLocation::Node => self.grid_number_of_nodes(grid),
            GridLocation::Edge => self.grid_number_of_edges(grid),
            GridLocation::Face => self.grid_number_of_faces(grid),
            GridLocation::Vertex => self.grid_number_of_vertices(grid),
        }
    }

    fn shape_counts(&self, grid: i32) -> CouplingResult<(usize, usize)> {
        let kind = self.grid_type(grid)?;
        if kind.is_structured() && self.grid_ndim(grid)? > 0 {
            Ok(structured_counts(&self.grid_shape(grid)?))
        } else {
            Ok((0, 0))
        }
    }

    pub fn nodes_per_face(&self, grid: i32) -> CouplingResult<Vec<usize>> {
        let mut out = vec![0; self.grid_number_of_faces(grid)?];
        self.nodes_per_face_into(grid, &mut out)?;
        Ok(out)
    }

    pub fn nodes_per_face_into(&self, grid: i32, out: &mut [usize]) -> CouplingResult<()> {
        self.call("get_grid_nodes_per_face", grid, |m| m.get_grid_nodes_per_face(grid, out))
    }

    /// Node indices of every face, concatenated.
    pub fn face_node_connectivity(&self, grid: i32) -> CouplingResult<Vec<usize>> {
        let mut out = vec![0; self.grid_number_of_vertices(grid)?];
        self.face_node_connectivity_into(grid, &mut out)?;
        Ok(out)
    }

    pub fn face_node_connectivity_into(&self, grid: i32, out: &mut [usize]) -> CouplingResult<()> {
        self.call("get_grid_face_nodes", grid, |m| m.get_grid_face_nodes(grid, out))
    }

    /// End offset of each face within the connectivity array.
    pub fn face_node_offset(&self, grid: i32) -> CouplingResult<Vec<usize>> {
        let counts = self.nodes_per_face(grid)?;
        Ok(counts
            .iter()
            .scan(0, |end, n| {
                *end += n;
                Some(*end)
            })
            .collect())
    }

    // ── Time ──────────────────────────────────────────────

    /// Time units the model itself declares.
    pub fn native_time_units(&self) -> CouplingResult<String> {
        self.call("get_time_units", "", |m| m.get_time_units())
    }

    /// Time units this adapter reports in: the override set with
    /// [`set_time_units`](Self::set_time_units), else the model's own.
    pub fn time_units(&self) -> CouplingResult<String> {
        match &self.time_units {
            Some(units) => Ok(units.clone()),
            None => self.native_time_units(),
        }
    }

    /// Report times in `units` instead of the model's own; `None` resets.
    pub fn set_time_units(&mut self, units: Option<&str>) -> CouplingResult<()> {
        if let Some(u) = units {
            if !Unit::parse(u)?.is_time() {
                return Err(CouplingError::units(u, u, "not a unit of time"));
            }
        }
        self.time_units = units.map(str::to_string);
        Ok(())
    }

    /// Convert a model time into `units` (default: the adapter's units).
    pub fn time_in(&self, time: f64, units: Option<&str>) -> CouplingResult<f64> {
        let native = self.native_time_units()?;
        let target = match units {
            Some(u) => u.to_string(),
            None => self.time_units()?,
        };
        if target == native {
            return Ok(time);
        }
        units::convert_time(time, &native, &target)
    }

    /// Convert a time given in `units` (default: the adapter's units) into
    /// the model's own time units.
    pub fn time_from(&self, time: f64, units: Option<&str>) -> CouplingResult<f64> {
        let native = self.native_time_units()?;
        let source = match units {
            Some(u) => u.to_string(),
            None => self.time_units()?,
        };
        if source == native {
            return Ok(time);
        }
        units::convert_time(time, &source, &native)
    }

    pub fn current_time(&self, units: Option<&str>) -> CouplingResult<f64> {
        let t = self.call("get_current_time", "", |m| m.get_current_time())?;
        self.time_in(t, units)
    }

    pub fn start_time(&self, units: Option<&str>) -> CouplingResult<f64> {
        let t = self.call("get_start_time", "", |m| m.get_start_time())?;
        self.time_in(t, units)
    }

    pub fn end_time(&self, units: Option<&str>) -> CouplingResult<f64> {
        let t = self.call("get_end_time", "", |m| m.get_end_time())?;
        self.time_in(t, units)
    }

    /// Length of one model step, as a span in `units`.
    pub fn time_step(&self, units: Option<&str>) -> CouplingResult<f64> {
        let dt = self.call("get_time_step", "", |m| m.get_time_step())?;
        let native = self.native_time_units()?;
        let target = match units {
            Some(u) => u.to_string(),
            None => self.time_units()?,
        };
        if target == native {
            return Ok(dt);
        }
        units::convert_duration(dt, &native, &target)
    }

    // ── Time interpolation ────────────────────────────────

    /// Record every output variable after each step so `get_value` can
    /// resample at intermediate times.
    pub fn enable_time_interpolation(&mut self, method: InterpolationMethod) -> CouplingResult<()> {
        self.interpolators = self
            .output_var_names()
            .into_iter()
            .map(|name| (name, TimeInterpolator::new(method)))
            .collect();
        if self.initialized {
            self.record_samples()?;
        }
        Ok(())
    }

    pub fn disable_time_interpolation(&mut self) {
        self.interpolators.clear();
    }

    /// The interpolator recording `name`, if any.
    pub fn interpolator(&self, name: &str) -> Option<&TimeInterpolator> {
        self.interpolators.get(name)
    }

    fn record_samples(&mut self) -> CouplingResult<()> {
        if self.interpolators.is_empty() {
            return Ok(());
        }
        let now = self.current_time(None)?;
        let names: Vec<String> = self.interpolators.keys().cloned().collect();
        for name in names {
            let mut values = vec![0.0; self.var_size(&name)?];
            self.call("get_value", &name, |m| m.get_value(&name, &mut values))?;
            if let Some(interp) = self.interpolators.get_mut(&name) {
                interp.push(now, values);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ModelAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelAdapter")
            .field("name", &self.name)
            .field("initialized", &self.initialized)
            .field("initdir", &self.initdir)
            .finish()
    }
}

fn model_error(operation: &'static str, args: impl Display, source: BmiError) -> CouplingError {
    CouplingError::Model {
        operation,
        args: args.to_string(),
        source,
    }
}

/// Treat a "not implemented" status as an absent capability.
fn optional<T>(result: CouplingResult<T>) -> CouplingResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(CouplingError::Model { source, .. }) if source.is_not_implemented() => Ok(None),
        Err(e) => Err(e),
    }
}

fn is_radians(units: &str) -> bool {
    matches!(units.trim(), "rad" | "radian" | "radians")
}
