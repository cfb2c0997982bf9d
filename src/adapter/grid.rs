//! `GridDescriptor`: geometry of one grid, captured once at initialize.

use serde::Serialize;

use crate::model::GridLocation;

/// Family of a model grid, parsed from the model's grid type string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GridKind {
    Scalar,
    Points,
    UniformRectilinear,
    Rectilinear,
    StructuredQuadrilateral,
    Unstructured,
}

impl GridKind {
    /// Parse a model grid type. Unrecognized types are treated as
    /// unstructured, the most general family.
    pub fn parse(text: &str) -> GridKind {
        match text.trim().to_ascii_lowercase().as_str() {
            "scalar" => GridKind::Scalar,
            "points" => GridKind::Points,
            "uniform_rectilinear" | "uniform_rectilinear_grid" | "raster" => {
                GridKind::UniformRectilinear
            }
            "rectilinear" => GridKind::Rectilinear,
            "structured_quadrilateral" => GridKind::StructuredQuadrilateral,
            _ => GridKind::Unstructured,
        }
    }

    /// Grids described by a shape rather than explicit connectivity.
    pub fn is_structured(self) -> bool {
        matches!(
            self,
            GridKind::Scalar
                | GridKind::UniformRectilinear
                | GridKind::Rectilinear
                | GridKind::StructuredQuadrilateral
        )
    }

    /// Grids whose node coordinates are products of per-axis vectors.
    pub fn is_rectilinear(self) -> bool {
        matches!(self, GridKind::UniformRectilinear | GridKind::Rectilinear)
    }
}

impl std::fmt::Display for GridKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GridKind::Scalar => "scalar",
            GridKind::Points => "points",
            GridKind::UniformRectilinear => "uniform_rectilinear",
            GridKind::Rectilinear => "rectilinear",
            GridKind::StructuredQuadrilateral => "structured_quadrilateral",
            GridKind::Unstructured => "unstructured",
        };
        write!(f, "{}", s)
    }
}

/// Geometry of one grid.
///
/// Structured grids carry `shape` (slowest-varying dimension first) and,
/// for uniform grids, `spacing`/`origin` in the same order. Rectilinear
/// grids carry per-axis coordinate vectors in `x`/`y`/`z`; every other
/// family carries one coordinate per node. Unstructured grids add
/// `face_nodes` and `nodes_per_face`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridDescriptor {
    pub id: i32,
    pub kind: GridKind,
    pub rank: usize,
    pub node_count: usize,
    pub edge_count: usize,
    pub face_count: usize,
    pub vertex_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shape: Vec<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub spacing: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub origin: Vec<f64>,
    #[serde(skip)]
    pub x: Vec<f64>,
    #[serde(skip)]
    pub y: Vec<f64>,
    #[serde(skip)]
    pub z: Vec<f64>,
    #[serde(skip)]
    pub face_nodes: Vec<usize>,
    #[serde(skip)]
    pub nodes_per_face: Vec<usize>,
}

impl GridDescriptor {
    /// Number of values a variable at `location` on this grid carries.
    pub fn element_count(&self, location: GridLocation) -> usize {
        match location {
            GridLocation::Node => self.node_count,
            GridLocation::Edge => self.edge_count,
            GridLocation::Face => self.face_count,
            GridLocation::Vertex => self.vertex_count,
        }
    }

    /// Whether two grids lay out their nodes identically by shape.
    pub fn same_structure(&self, other: &GridDescriptor) -> bool {
        self.kind.is_structured()
            && other.kind.is_structured()
            && self.rank == other.rank
            && self.shape == other.shape
            && self.node_count == other.node_count
    }

    /// Coordinates of every node as `[x, y, z]`, in node order.
    ///
    /// Axes the grid does not have are zero. For structured grids the last
    /// shape dimension is `x`, the one before it `y`, and so on.
    pub fn node_coordinates(&self) -> Vec<[f64; 3]> {
        match self.kind {
            GridKind::Scalar => vec![[0.0; 3]; self.node_count.max(1)],
            GridKind::UniformRectilinear | GridKind::Rectilinear => {
                tensor_product(&self.structured_axes())
            }
            _ => (0..self.node_count)
                .map(|n| {
                    [
                        self.x.get(n).copied().unwrap_or(0.0),
                        self.y.get(n).copied().unwrap_or(0.0),
                        self.z.get(n).copied().unwrap_or(0.0),
                    ]
                })
                .collect(),
        }
    }

    /// Per-axis coordinate vector along spatial axis `axis` (0 = x).
    pub fn axis_vector(&self, axis: usize) -> &[f64] {
        match axis {
            0 => &self.x,
            1 => &self.y,
            _ => &self.z,
        }
    }

    /// Coordinates along each structured dimension (slowest first).
    pub fn structured_axes(&self) -> Vec<Vec<f64>> {
        match self.kind {
            GridKind::UniformRectilinear => (0..self.rank)
                .map(|d| {
                    let spacing = self.spacing.get(d).copied().unwrap_or(1.0);
                    let origin = self.origin.get(d).copied().unwrap_or(0.0);
                    (0..self.shape[d]).map(|i| origin + i as f64 * spacing).collect()
                })
                .collect(),
            GridKind::Rectilinear => (0..self.rank)
                .map(|d| self.axis_vector(self.rank - 1 - d).to_vec())
                .collect(),
            _ => Vec::new(),
        }
    }
}

// `axes` is slowest-varying first; node index runs fastest over the last.
fn tensor_product(axes: &[Vec<f64>]) -> Vec<[f64; 3]> {
    let rank = axes.len();
    let total: usize = axes.iter().map(Vec::len).product();
    let mut coords = Vec::with_capacity(total);
    let mut index = vec![0usize; rank];
    for _ in 0..total {
        let mut point = [0.0; 3];
        for d in 0..rank {
            let spatial = rank - 1 - d;
            if spatial < 3 {
                point[spatial] = axes[d][index[d]];
            }
        }
        coords.push(point);
        for d in (0..rank).rev() {
            index[d] += 1;
            if index[d] < axes[d].len() {
                break;
            }
            index[d] = 0;
        }
    }
    coords
}

/// Edge and face counts implied by a structured shape.
pub(crate) fn structured_counts(shape: &[usize]) -> (usize, usize) {
    match shape {
        [n] => (n.saturating_sub(1), 0),
        [ny, nx] => {
            let edges = ny * nx.saturating_sub(1) + nx * ny.saturating_sub(1);
            let faces = ny.saturating_sub(1) * nx.saturating_sub(1);
            (edges, faces)
        }
        _ => (0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(shape: &[usize], spacing: &[f64], origin: &[f64]) -> GridDescriptor {
        let (edge_count, face_count) = structured_counts(shape);
        GridDescriptor {
            id: 0,
            kind: GridKind::UniformRectilinear,
            rank: shape.len(),
            node_count: shape.iter().product(),
            edge_count,
            face_count,
            vertex_count: 0,
            shape: shape.to_vec(),
            spacing: spacing.to_vec(),
            origin: origin.to_vec(),
            x: Vec::new(),
            y: Vec::new(),
            z: Vec::new(),
            face_nodes: Vec::new(),
            nodes_per_face: Vec::new(),
        }
    }

    #[test]
    fn test_parse_kinds() {
        assert_eq!(GridKind::parse("uniform_rectilinear"), GridKind::UniformRectilinear);
        assert_eq!(GridKind::parse("Scalar"), GridKind::Scalar);
        assert_eq!(GridKind::parse("rectilinear"), GridKind::Rectilinear);
        assert_eq!(GridKind::parse("something_else"), GridKind::Unstructured);
        assert!(GridKind::Rectilinear.is_structured());
        assert!(!GridKind::Points.is_structured());
    }

    #[test]
    fn test_uniform_node_coordinates_row_major() {
        // shape [rows=2, cols=3], y spacing 10, x spacing 1, origin (y=100, x=5)
        let grid = uniform(&[2, 3], &[10.0, 1.0], &[100.0, 5.0]);
        let coords = grid.node_coordinates();
        assert_eq!(coords.len(), 6);
        assert_eq!(coords[0], [5.0, 100.0, 0.0]);
        assert_eq!(coords[2], [7.0, 100.0, 0.0]);
        assert_eq!(coords[3], [5.0, 110.0, 0.0]);
        assert_eq!(coords[5], [7.0, 110.0, 0.0]);
    }

    #[test]
    fn test_rectilinear_node_coordinates() {
        let mut grid = uniform(&[2, 2], &[], &[]);
        grid.kind = GridKind::Rectilinear;
        grid.x = vec![0.0, 4.0];
        grid.y = vec![1.0, 3.0];
        let coords = grid.node_coordinates();
        assert_eq!(coords, vec![[0.0, 1.0, 0.0], [4.0, 1.0, 0.0], [0.0, 3.0, 0.0], [4.0, 3.0, 0.0]]);
    }

    #[test]
    fn test_structured_counts() {
        assert_eq!(structured_counts(&[4]), (3, 0));
        assert_eq!(structured_counts(&[2, 3]), (7, 2));
        assert_eq!(structured_counts(&[]), (0, 0));
    }

    #[test]
    fn test_element_count_by_location() {
        let grid = uniform(&[2, 3], &[1.0, 1.0], &[0.0, 0.0]);
        assert_eq!(grid.element_count(GridLocation::Node), 6);
        assert_eq!(grid.element_count(GridLocation::Edge), 7);
        assert_eq!(grid.element_count(GridLocation::Face), 2);
    }

    #[test]
    fn test_same_structure() {
        let a = uniform(&[2, 3], &[1.0, 1.0], &[0.0, 0.0]);
        let b = uniform(&[2, 3], &[5.0, 5.0], &[1.0, 1.0]);
        let c = uniform(&[3, 2], &[1.0, 1.0], &[0.0, 0.0]);
        assert!(a.same_structure(&b));
        assert!(!a.same_structure(&c));
    }
}
