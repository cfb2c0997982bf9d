//! `TriangleMeshModel`: an unstructured two-triangle mesh.

use crate::model::status::{BmiError, BmiResult};
use crate::model::traits::{Bmi, GridLocation};

const ELEVATION: &str = "land_surface__elevation";
const ASPECT: &str = "land_surface__aspect_azimuth";

/// A unit square split into two triangles (grid id 0).
///
/// ```text
///  3 ─── 2
///  │  ╱  │
///  0 ─── 1
/// ```
///
/// Exposes `land_surface__elevation` (metres, on nodes; input and output)
/// and `land_surface__aspect_azimuth` (degrees, on faces; output only).
/// Each update raises every node by `uplift` metres.
#[derive(Debug, Clone)]
pub struct TriangleMeshModel {
    elevation: Vec<f64>,
    aspect: Vec<f64>,
    uplift: f64,
    time: f64,
    /// Number of successful `update` calls.
    pub updates: u64,
}

impl TriangleMeshModel {
    const X: [f64; 4] = [0.0, 1.0, 1.0, 0.0];
    const Y: [f64; 4] = [0.0, 0.0, 1.0, 1.0];
    const FACE_NODES: [usize; 6] = [0, 1, 2, 0, 2, 3];
    const NODES_PER_FACE: [usize; 2] = [3, 3];
    const EDGES: usize = 5;

    /// Create the mesh with zero elevation.
    pub fn new() -> Self {
        TriangleMeshModel {
            elevation: vec![0.0; 4],
            aspect: vec![0.0, 90.0],
            uplift: 1.0,
            time: 0.0,
            updates: 0,
        }
    }

    /// Set the per-step uplift.
    pub fn with_uplift(mut self, uplift: f64) -> Self {
        self.uplift = uplift;
        self
    }

    fn values(&self, name: &str) -> BmiResult<&[f64]> {
        match name {
            ELEVATION => Ok(&self.elevation),
            ASPECT => Ok(&self.aspect),
            _ => Err(BmiError::failure(format!("no such variable: {}", name))),
        }
    }

    fn check_grid(&self, grid: i32) -> BmiResult<()> {
        if grid == 0 {
            Ok(())
        } else {
            Err(BmiError::failure(format!("no such grid: {}", grid)))
        }
    }
}

impl Default for TriangleMeshModel {
    fn default() -> Self {
        Self::new()
    }
}

impl Bmi for TriangleMeshModel {
    fn get_component_name(&self) -> String {
        "triangle_mesh".to_string()
    }

    fn initialize(&mut self, _config_file: &str) -> BmiResult<()> {
        self.time = 0.0;
        Ok(())
    }

    fn update(&mut self) -> BmiResult<()> {
        self.elevation.iter_mut().for_each(|z| *z += self.uplift);
        self.time += 1.0;
        self.updates += 1;
        Ok(())
    }

    fn finalize(&mut self) -> BmiResult<()> {
        Ok(())
    }

    fn get_input_var_names(&self) -> Vec<String> {
        vec![ELEVATION.to_string()]
    }

    fn get_output_var_names(&self) -> Vec<String> {
        vec![ELEVATION.to_string(), ASPECT.to_string()]
    }

    fn get_var_grid(&self, name: &str) -> BmiResult<i32> {
        self.values(name).map(|_| 0)
    }

    fn get_var_units(&self, name: &str) -> BmiResult<String> {
        match name {
            ELEVATION => Ok("m".to_string()),
            ASPECT => Ok("deg".to_string()),
            _ => Err(BmiError::failure(format!("no such variable: {}", name))),
        }
    }

    fn get_var_type(&self, name: &str) -> BmiResult<String> {
        self.values(name).map(|_| "float64".to_string())
    }

    fn get_var_itemsize(&self, name: &str) -> BmiResult<usize> {
        self.values(name).map(|_| std::mem::size_of::<f64>())
    }

    fn get_var_nbytes(&self, name: &str) -> BmiResult<usize> {
        self.values(name).map(|v| v.len() * std::mem::size_of::<f64>())
    }

    fn get_var_location(&self, name: &str) -> BmiResult<GridLocation> {
        match name {
            ELEVATION => Ok(GridLocation::Node),
            ASPECT => Ok(GridLocation::Face),
            _ => Err(BmiError::failure(format!("no such variable: {}", name))),
        }
    }

    fn get_value(&self, name: &str, dest: &mut [f64]) -> BmiResult<()> {
        let values = self.values(name)?;
        if dest.len() != values.len() {
            return Err(BmiError::failure(format!(
                "buffer for {} has {} elements, expected {}",
                name,
                dest.len(),
                values.len()
            )));
        }
        dest.copy_from_slice(values);
        Ok(())
    }

    fn set_value(&mut self, name: &str, src: &[f64]) -> BmiResult<()> {
        if name != ELEVATION {
            return Err(BmiError::failure(format!("{} is not an input", name)));
        }
        if src.len() != self.elevation.len() {
            return Err(BmiError::failure(format!(
                "{} expects {} values, got {}",
                name,
                self.elevation.len(),
                src.len()
            )));
        }
        self.elevation.copy_from_slice(src);
        Ok(())
    }

    fn get_grid_rank(&self, grid: i32) -> BmiResult<usize> {
        self.check_grid(grid)?;
        Ok(2)
    }

    fn get_grid_size(&self, grid: i32) -> BmiResult<usize> {
        self.check_grid(grid)?;
        Ok(Self::X.len())
    }

    fn get_grid_type(&self, grid: i32) -> BmiResult<String> {
        self.check_grid(grid)?;
        Ok("unstructured".to_string())
    }

    fn get_grid_x(&self, grid: i32, dest: &mut [f64]) -> BmiResult<()> {
        self.check_grid(grid)?;
        dest.copy_from_slice(&Self::X);
        Ok(())
    }

    fn get_grid_y(&self, grid: i32, dest: &mut [f64]) -> BmiResult<()> {
        self.check_grid(grid)?;
        dest.copy_from_slice(&Self::Y);
        Ok(())
    }

    fn get_grid_edge_count(&self, grid: i32) -> BmiResult<usize> {
        self.check_grid(grid)?;
        Ok(Self::EDGES)
    }

    fn get_grid_face_count(&self, grid: i32) -> BmiResult<usize> {
        self.check_grid(grid)?;
        Ok(Self::NODES_PER_FACE.len())
    }

    fn get_grid_face_nodes(&self, grid: i32, dest: &mut [usize]) -> BmiResult<()> {
        self.check_grid(grid)?;
        dest.copy_from_slice(&Self::FACE_NODES);
        Ok(())
    }

    fn get_grid_nodes_per_face(&self, grid: i32, dest: &mut [usize]) -> BmiResult<()> {
        self.check_grid(grid)?;
        dest.copy_from_slice(&Self::NODES_PER_FACE);
        Ok(())
    }

    fn get_current_time(&self) -> BmiResult<f64> {
        Ok(self.time)
    }

    fn get_start_time(&self) -> BmiResult<f64> {
        Ok(0.0)
    }

    fn get_end_time(&self) -> BmiResult<f64> {
        Ok(100.0)
    }

    fn get_time_step(&self) -> BmiResult<f64> {
        Ok(1.0)
    }

    fn get_time_units(&self) -> BmiResult<String> {
        Ok("h".to_string())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
