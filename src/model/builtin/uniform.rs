//! `UniformFieldModel`: a uniform rectilinear grid whose fields track time.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::model::status::{BmiError, BmiResult};
use crate::model::traits::Bmi;

/// Which side of the interface a field is exposed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    Input,
    Output,
    Both,
}

impl FieldRole {
    fn is_input(self) -> bool {
        matches!(self, FieldRole::Input | FieldRole::Both)
    }

    fn is_output(self) -> bool {
        matches!(self, FieldRole::Output | FieldRole::Both)
    }
}

#[derive(Debug, Clone)]
struct Field {
    units: String,
    role: FieldRole,
    values: Vec<f64>,
}

/// Settings read from the optional JSON config file passed to `initialize`.
#[derive(Debug, Clone, Default, Deserialize)]
struct FieldConfig {
    time_step: Option<f64>,
    start_time: Option<f64>,
    end_time: Option<f64>,
    fill_value: Option<f64>,
}

/// A model on a single uniform rectilinear grid (grid id 0).
///
/// Every output field is filled with the model's current time after each
/// step, so the value of any output reveals how far the model has advanced.
/// Input-only fields keep whatever was last written to them. This makes
/// the model a convenient stand-in for scheduling and mapping tests.
///
/// `initialize` optionally reads a JSON file (resolved against the working
/// directory) with `time_step`, `start_time`, `end_time`, `fill_value`.
#[derive(Debug, Clone)]
pub struct UniformFieldModel {
    name: String,
    shape: Vec<usize>,
    spacing: Vec<f64>,
    origin: Vec<f64>,
    fields: BTreeMap<String, Field>,
    time: f64,
    start_time: f64,
    end_time: f64,
    time_step: f64,
    time_units: String,
    native_update_until: bool,
    fail_after: Option<u64>,
    /// Number of successful `update` calls.
    pub updates: u64,
    /// Working directory observed during `initialize`.
    pub initialized_in: Option<PathBuf>,
    /// Working directory observed during the last `update`.
    pub updated_in: Option<PathBuf>,
    /// Whether `finalize` has been called.
    pub finalized: bool,
}

impl UniformFieldModel {
    /// Create a model named `name` on a grid of `shape` with unit spacing
    /// and its origin at zero.
    pub fn new(name: &str, shape: &[usize]) -> Self {
        UniformFieldModel {
            name: name.to_string(),
            shape: shape.to_vec(),
            spacing: vec![1.0; shape.len()],
            origin: vec![0.0; shape.len()],
            fields: BTreeMap::new(),
            time: 0.0,
            start_time: 0.0,
            end_time: f64::MAX,
            time_step: 1.0,
            time_units: "d".to_string(),
            native_update_until: true,
            fail_after: None,
            updates: 0,
            initialized_in: None,
            updated_in: None,
            finalized: false,
        }
    }

    /// The `air` test component: one node carrying `air__density`.
    pub fn air() -> Self {
        UniformFieldModel::new("air", &[1]).with_field("air__density", "-", FieldRole::Both)
    }

    /// The `earth` test component: one node carrying
    /// `earth_surface__temperature`.
    pub fn earth() -> Self {
        UniformFieldModel::new("earth", &[1]).with_field(
            "earth_surface__temperature",
            "-",
            FieldRole::Both,
        )
    }

    /// Declare a field.
    pub fn with_field(mut self, name: &str, units: &str, role: FieldRole) -> Self {
        let size = self.node_count();
        self.fields.insert(
            name.to_string(),
            Field {
                units: units.to_string(),
                role,
                values: vec![0.0; size],
            },
        );
        self
    }

    /// Set the grid spacing (slowest-varying dimension first).
    pub fn with_spacing(mut self, spacing: &[f64]) -> Self {
        self.spacing = spacing.to_vec();
        self
    }

    /// Set the grid origin (slowest-varying dimension first).
    pub fn with_origin(mut self, origin: &[f64]) -> Self {
        self.origin = origin.to_vec();
        self
    }

    /// Set the internal time step.
    pub fn with_time_step(mut self, dt: f64) -> Self {
        self.time_step = dt;
        self
    }

    /// Set the native time units.
    pub fn with_time_units(mut self, units: &str) -> Self {
        self.time_units = units.to_string();
        self
    }

    /// Hide the native `update_until`, forcing callers to step.
    pub fn without_update_until(mut self) -> Self {
        self.native_update_until = false;
        self
    }

    /// Make every `update` after the first `n` successful ones fail.
    pub fn failing_after(mut self, n: u64) -> Self {
        self.fail_after = Some(n);
        self
    }

    fn node_count(&self) -> usize {
        self.shape.iter().product()
    }

    fn field(&self, name: &str) -> BmiResult<&Field> {
        self.fields
            .get(name)
            .ok_or_else(|| BmiError::failure(format!("no such variable: {}", name)))
    }

    fn check_grid(&self, grid: i32) -> BmiResult<()> {
        if grid == 0 {
            Ok(())
        } else {
            Err(BmiError::failure(format!("no such grid: {}", grid)))
        }
    }

    fn fill_outputs(&mut self) {
        let time = self.time;
        for field in self.fields.values_mut().filter(|f| f.role.is_output()) {
            field.values.iter_mut().for_each(|v| *v = time);
        }
    }

    fn load_config(&mut self, config_file: &str) -> BmiResult<()> {
        if config_file.is_empty() {
            return Ok(());
        }
        let text = std::fs::read_to_string(config_file)
            .map_err(|e| BmiError::failure(format!("cannot read {}: {}", config_file, e)))?;
        let config: FieldConfig = serde_json::from_str(&text)
            .map_err(|e| BmiError::failure(format!("bad config {}: {}", config_file, e)))?;
        if let Some(dt) = config.time_step {
            self.time_step = dt;
        }
        if let Some(start) = config.start_time {
            self.start_time = start;
        }
        if let Some(end) = config.end_time {
            self.end_time = end;
        }
        if let Some(fill) = config.fill_value {
            for field in self.fields.values_mut() {
                field.values.iter_mut().for_each(|v| *v = fill);
            }
        }
        Ok(())
    }
}

impl Bmi for UniformFieldModel {
    fn get_component_name(&self) -> String {
        self.name.clone()
    }

    fn initialize(&mut self, config_file: &str) -> BmiResult<()> {
        self.initialized_in = std::env::current_dir().ok();
        self.load_config(config_file)?;
        self.time = self.start_time;
        Ok(())
    }

    fn update(&mut self) -> BmiResult<()> {
        if let Some(n) = self.fail_after {
            if self.updates >= n {
                return Err(BmiError::failure(format!("{} failed at t={}", self.name, self.time)));
            }
        }
        self.updated_in = std::env::current_dir().ok();
        self.time += self.time_step;
        self.updates += 1;
        self.fill_outputs();
        Ok(())
    }

    fn update_until(&mut self, then: f64) -> BmiResult<()> {
        if !self.native_update_until {
            return Err(BmiError::not_implemented("update_until"));
        }
        if let Some(n) = self.fail_after {
            if self.updates >= n {
                return Err(BmiError::failure(format!("{} failed at t={}", self.name, self.time)));
            }
        }
        self.time = then;
        self.updates += 1;
        self.fill_outputs();
        Ok(())
    }

    fn finalize(&mut self) -> BmiResult<()> {
        self.finalized = true;
        Ok(())
    }

    fn get_input_var_names(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, f)| f.role.is_input())
            .map(|(n, _)| n.clone())
            .collect()
    }

    fn get_output_var_names(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, f)| f.role.is_output())
            .map(|(n, _)| n.clone())
            .collect()
    }

    fn get_var_grid(&self, name: &str) -> BmiResult<i32> {
        self.field(name).map(|_| 0)
    }

    fn get_var_units(&self, name: &str) -> BmiResult<String> {
        self.field(name).map(|f| f.units.clone())
    }

    fn get_var_type(&self, name: &str) -> BmiResult<String> {
        self.field(name).map(|_| "float64".to_string())
    }

    fn get_var_itemsize(&self, name: &str) -> BmiResult<usize> {
        self.field(name).map(|_| std::mem::size_of::<f64>())
    }

    fn get_var_nbytes(&self, name: &str) -> BmiResult<usize> {
        self.field(name).map(|f| f.values.len() * std::mem::size_of::<f64>())
    }

    fn get_value(&self, name: &str, dest: &mut [f64]) -> BmiResult<()> {
        let field = self.field(name)?;
        if dest.len() != field.values.len() {
            return Err(BmiError::failure(format!(
                "buffer for {} has {} elements, expected {}",
                name,
                dest.len(),
                field.values.len()
            )));
        }
        dest.copy_from_slice(&field.values);
        Ok(())
    }

    fn set_value(&mut self, name: &str, src: &[f64]) -> BmiResult<()> {
        let field = self
            .fields
            .get_mut(name)
            .ok_or_else(|| BmiError::failure(format!("no such variable: {}", name)))?;
        if src.len() != field.values.len() {
            return Err(BmiError::failure(format!(
                "{} expects {} values, got {}",
                name,
                field.values.len(),
                src.len()
            )));
        }
        field.values.copy_from_slice(src);
        Ok(())
    }

    fn get_grid_rank(&self, grid: i32) -> BmiResult<usize> {
        self.check_grid(grid)?;
        Ok(self.shape.len())
    }

    fn get_grid_size(&self, grid: i32) -> BmiResult<usize> {
        self.check_grid(grid)?;
        Ok(self.node_count())
    }

    fn get_grid_type(&self, grid: i32) -> BmiResult<String> {
        self.check_grid(grid)?;
        Ok("uniform_rectilinear".to_string())
    }

    fn get_grid_shape(&self, grid: i32, dest: &mut [usize]) -> BmiResult<()> {
        self.check_grid(grid)?;
        dest.copy_from_slice(&self.shape);
        Ok(())
    }

    fn get_grid_spacing(&self, grid: i32, dest: &mut [f64]) -> BmiResult<()> {
        self.check_grid(grid)?;
        dest.copy_from_slice(&self.spacing);
        Ok(())
    }

    fn get_grid_origin(&self, grid: i32, dest: &mut [f64]) -> BmiResult<()> {
        self.check_grid(grid)?;
        dest.copy_from_slice(&self.origin);
        Ok(())
    }

    fn get_current_time(&self) -> BmiResult<f64> {
        Ok(self.time)
    }

    fn get_start_time(&self) -> BmiResult<f64> {
        Ok(self.start_time)
    }

    fn get_end_time(&self) -> BmiResult<f64> {
        Ok(self.end_time)
    }

    fn get_time_step(&self) -> BmiResult<f64> {
        Ok(self.time_step)
    }

    fn get_time_units(&self) -> BmiResult<String> {
        Ok(self.time_units.clone())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
