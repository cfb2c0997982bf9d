//! `Bmi` trait: the contract every wrapped model component implements.

use serde::{Deserialize, Serialize};

use super::status::{BmiError, BmiResult};

// ── GridLocation ──────────────────────────────────────────────────────

/// The grid element a variable's values live on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridLocation {
    Node,
    Edge,
    Face,
    Vertex,
}

impl std::fmt::Display for GridLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GridLocation::Node => write!(f, "node"),
            GridLocation::Edge => write!(f, "edge"),
            GridLocation::Face => write!(f, "face"),
            GridLocation::Vertex => write!(f, "vertex"),
        }
    }
}

// ── Bmi ───────────────────────────────────────────────────────────────

/// A model component exposing the basic model interface.
///
/// This is the only boundary the coupling layer consumes: lifecycle
/// control, variable metadata and values, grid geometry, and time. How the
/// model computes its physics is invisible here. All value buffers are
/// flattened `f64` slices in the model's own units.
///
/// Optional operations have default implementations returning
/// [`BmiError::not_implemented`]; the adapter treats that status as
/// "capability absent" where a fallback exists.
///
/// # Contract
///
/// Implementations **must**:
/// - Report variable and grid metadata only after `initialize` succeeds.
/// - Keep variable names and grid ids stable for the whole run.
/// - Resolve relative paths against the process working directory at the
///   time of the call (the adapter scopes it to the model's directory).
pub trait Bmi {
    /// Name of the component.
    fn get_component_name(&self) -> String;

    // ── Lifecycle ─────────────────────────────────────────

    /// Prepare the model using an (optional, possibly empty) config path.
    fn initialize(&mut self, config_file: &str) -> BmiResult<()>;

    /// Advance by one internal time step.
    fn update(&mut self) -> BmiResult<()>;

    /// Advance until the model's current time reaches `then`.
    fn update_until(&mut self, then: f64) -> BmiResult<()> {
        let _ = then;
        Err(BmiError::not_implemented("update_until"))
    }

    /// Release model resources.
    fn finalize(&mut self) -> BmiResult<()>;

    // ── Variables ─────────────────────────────────────────

    fn get_input_var_names(&self) -> Vec<String>;
    fn get_output_var_names(&self) -> Vec<String>;
    fn get_var_grid(&self, name: &str) -> BmiResult<i32>;
    fn get_var_units(&self, name: &str) -> BmiResult<String>;
    fn get_var_type(&self, name: &str) -> BmiResult<String>;
    fn get_var_itemsize(&self, name: &str) -> BmiResult<usize>;
    fn get_var_nbytes(&self, name: &str) -> BmiResult<usize>;

    /// Where on the grid the variable is defined. Defaults to nodes.
    fn get_var_location(&self, name: &str) -> BmiResult<GridLocation> {
        let _ = name;
        Ok(GridLocation::Node)
    }

    /// Copy the variable's current values into `dest`.
    fn get_value(&self, name: &str, dest: &mut [f64]) -> BmiResult<()>;

    /// Overwrite the variable's values from `src`.
    fn set_value(&mut self, name: &str, src: &[f64]) -> BmiResult<()>;

    // ── Grids ─────────────────────────────────────────────

    fn get_grid_rank(&self, grid: i32) -> BmiResult<usize>;
    fn get_grid_size(&self, grid: i32) -> BmiResult<usize>;
    fn get_grid_type(&self, grid: i32) -> BmiResult<String>;

    fn get_grid_shape(&self, grid: i32, dest: &mut [usize]) -> BmiResult<()> {
        let _ = (grid, dest);
        Err(BmiError::not_implemented("get_grid_shape"))
    }

    fn get_grid_spacing(&self, grid: i32, dest: &mut [f64]) -> BmiResult<()> {
        let _ = (grid, dest);
        Err(BmiError::not_implemented("get_grid_spacing"))
    }

    fn get_grid_origin(&self, grid: i32, dest: &mut [f64]) -> BmiResult<()> {
        let _ = (grid, dest);
        Err(BmiError::not_implemented("get_grid_origin"))
    }

    fn get_grid_x(&self, grid: i32, dest: &mut [f64]) -> BmiResult<()> {
        let _ = (grid, dest);
        Err(BmiError::not_implemented("get_grid_x"))
    }

    fn get_grid_y(&self, grid: i32, dest: &mut [f64]) -> BmiResult<()> {
        let _ = (grid, dest);
        Err(BmiError::not_implemented("get_grid_y"))
    }

    fn get_grid_z(&self, grid: i32, dest: &mut [f64]) -> BmiResult<()> {
        let _ = (grid, dest);
        Err(BmiError::not_implemented("get_grid_z"))
    }

    fn get_grid_node_count(&self, grid: i32) -> BmiResult<usize> {
        self.get_grid_size(grid)
    }

    fn get_grid_edge_count(&self, grid: i32) -> BmiResult<usize> {
        let _ = grid;
        Err(BmiError::not_implemented("get_grid_edge_count"))
    }

    fn get_grid_face_count(&self, grid: i32) -> BmiResult<usize> {
        let _ = grid;
        Err(BmiError::not_implemented("get_grid_face_count"))
    }

    fn get_grid_face_nodes(&self, grid: i32, dest: &mut [usize]) -> BmiResult<()> {
        let _ = (grid, dest);
        Err(BmiError::not_implemented("get_grid_face_nodes"))
    }

    fn get_grid_nodes_per_face(&self, grid: i32, dest: &mut [usize]) -> BmiResult<()> {
        let _ = (grid, dest);
        Err(BmiError::not_implemented("get_grid_nodes_per_face"))
    }

    // ── Time ──────────────────────────────────────────────

    fn get_current_time(&self) -> BmiResult<f64>;
    fn get_start_time(&self) -> BmiResult<f64>;
    fn get_end_time(&self) -> BmiResult<f64>;
    fn get_time_step(&self) -> BmiResult<f64>;
    fn get_time_units(&self) -> BmiResult<String>;

    // ── Introspection ─────────────────────────────────────

    /// Used by `ModelAdapter::model::<T>()` to downcast.
    fn as_any(&self) -> &dyn std::any::Any;
}
