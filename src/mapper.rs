//! Grid mapper: correspondence between two variables' grids.
//!
//! [`build`] inspects the grid descriptors of a source and a destination
//! variable and produces a [`GridMapping`]; [`GridMapping::apply`] turns
//! source values into destination values without touching either model.
//!
//! Identically shaped structured grids map by identity. Anything else is
//! resampled from destination node coordinates: nearest source node, or
//! bilinear weights over a rectilinear source of rank 1 or 2. Points
//! outside a bilinear source clamp to its edge.

use rstar::primitives::GeomWithData;
use rstar::{PointDistance, RTree};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapter::{GridDescriptor, ModelAdapter};
use crate::error::{CouplingError, CouplingResult};
use crate::model::GridLocation;

/// Resampling used when two grids are not identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingMethod {
    #[default]
    Nearest,
    Bilinear,
}

/// How to produce destination values from source values.
#[derive(Debug, Clone, PartialEq)]
pub enum GridMapping {
    /// Same layout on both sides.
    Identity { size: usize },
    /// Each destination value copies one source value.
    Nearest { src_size: usize, indices: Vec<usize> },
    /// Each destination value is a weighted sum of source values.
    Weighted {
        src_size: usize,
        stencils: Vec<Vec<(usize, f64)>>,
    },
}

impl GridMapping {
    pub fn is_identity(&self) -> bool {
        matches!(self, GridMapping::Identity { .. })
    }

    /// Number of source values the mapping expects.
    pub fn src_size(&self) -> usize {
        match self {
            GridMapping::Identity { size } => *size,
            GridMapping::Nearest { src_size, .. } | GridMapping::Weighted { src_size, .. } => *src_size,
        }
    }

    /// Number of destination values the mapping produces.
    pub fn dst_size(&self) -> usize {
        match self {
            GridMapping::Identity { size } => *size,
            GridMapping::Nearest { indices, .. } => indices.len(),
            GridMapping::Weighted { stencils, .. } => stencils.len(),
        }
    }

    /// Destination values for `src`.
    pub fn apply(&self, src: &[f64]) -> CouplingResult<Vec<f64>> {
        let mut dst = vec![0.0; self.dst_size()];
        self.apply_into(src, &mut dst)?;
        Ok(dst)
    }

    /// Like [`apply`](Self::apply), writing into `dst`.
    pub fn apply_into(&self, src: &[f64], dst: &mut [f64]) -> CouplingResult<()> {
        if src.len() != self.src_size() || dst.len() != self.dst_size() {
            return Err(CouplingError::IncompatibleGrid(format!(
                "mapping takes {} values to {}, got {} to {}",
                self.src_size(),
                self.dst_size(),
                src.len(),
                dst.len()
            )));
        }
        match self {
            GridMapping::Identity { .. } => dst.copy_from_slice(src),
            GridMapping::Nearest { indices, .. } => {
                for (d, &i) in dst.iter_mut().zip(indices) {
                    *d = src[i];
                }
            }
            GridMapping::Weighted { stencils, .. } => {
                for (d, stencil) in dst.iter_mut().zip(stencils) {
                    *d = stencil.iter().map(|&(i, w)| w * src[i]).sum();
                }
            }
        }
        Ok(())
    }
}

/// Map `src_var` on `src` onto `dst_var` on `dst`.
///
/// Both adapters must be initialized.
pub fn build(
    src: &ModelAdapter,
    src_var: &str,
    dst: &ModelAdapter,
    dst_var: &str,
    method: MappingMethod,
) -> CouplingResult<GridMapping> {
    let src_grid = src.grid(src.var_grid(src_var)?)?;
    let dst_grid = dst.grid(dst.var_grid(dst_var)?)?;
    let mapping = build_between(
        src_grid,
        src.var_location(src_var)?,
        dst_grid,
        dst.var_location(dst_var)?,
        method,
    )
    .map_err(|e| match e {
        CouplingError::IncompatibleGrid(reason) => CouplingError::IncompatibleGrid(format!(
            "{}.{} -> {}.{}: {}",
            src.name(),
            src_var,
            dst.name(),
            dst_var,
            reason
        )),
        other => other,
    })?;
    debug!(
        src = %format!("{}.{}", src.name(), src_var),
        dst = %format!("{}.{}", dst.name(), dst_var),
        identity = mapping.is_identity(),
        "grid mapping built"
    );
    Ok(mapping)
}

/// Map between two grid descriptors directly.
pub fn build_between(
    src: &GridDescriptor,
    src_location: GridLocation,
    dst: &GridDescriptor,
    dst_location: GridLocation,
    method: MappingMethod,
) -> CouplingResult<GridMapping> {
    if src_location == dst_location && is_same_layout(src, dst) {
        return Ok(GridMapping::Identity {
            size: src.element_count(src_location),
        });
    }
    if src_location != GridLocation::Node || dst_location != GridLocation::Node {
        return Err(CouplingError::IncompatibleGrid(format!(
            "cannot resample {} values onto {} values",
            src_location, dst_location
        )));
    }
    if src.rank != dst.rank {
        return Err(CouplingError::IncompatibleGrid(format!(
            "rank {} source cannot map onto rank {} destination",
            src.rank, dst.rank
        )));
    }
    if src.node_count == 0 {
        return Err(CouplingError::IncompatibleGrid("source grid has no nodes".to_string()));
    }

    let targets = dst.node_coordinates();
    match method {
        MappingMethod::Nearest => {
            let index = NodeIndex::new(&src.node_coordinates());
            let indices = targets.iter().map(|p| index.nearest(p)).collect();
            Ok(GridMapping::Nearest {
                src_size: src.node_count,
                indices,
            })
        }
        MappingMethod::Bilinear => {
            if !src.kind.is_rectilinear() || !(1..=2).contains(&src.rank) {
                return Err(CouplingError::IncompatibleGrid(format!(
                    "bilinear resampling needs a rectilinear source of rank 1 or 2, got {} of rank {}",
                    src.kind, src.rank
                )));
            }
            let axes = src.structured_axes();
            if let Some(axis) = axes.iter().position(|a| !is_monotonic(a)) {
                return Err(CouplingError::IncompatibleGrid(format!(
                    "bilinear resampling needs monotonic coordinates, axis {} is not",
                    axis
                )));
            }
            let stencils = targets.iter().map(|p| bilinear(&axes, p)).collect();
            Ok(GridMapping::Weighted {
                src_size: src.node_count,
                stencils,
            })
        }
    }
}

fn is_same_layout(src: &GridDescriptor, dst: &GridDescriptor) -> bool {
    if src.same_structure(dst) {
        return true;
    }
    !src.kind.is_structured()
        && src.kind == dst.kind
        && src.node_count == dst.node_count
        && src.face_nodes == dst.face_nodes
        && src.node_coordinates() == dst.node_coordinates()
}

type IndexedNode = GeomWithData<[f64; 3], usize>;

/// R-tree over source node coordinates, payload is the node index.
struct NodeIndex {
    tree: RTree<IndexedNode>,
}

impl NodeIndex {
    fn new(nodes: &[[f64; 3]]) -> Self {
        let points = nodes
            .iter()
            .enumerate()
            .map(|(i, p)| IndexedNode::new(*p, i))
            .collect();
        NodeIndex {
            tree: RTree::bulk_load(points),
        }
    }

    /// Index of the source node closest to `p`. Ties go to the lowest
    /// index.
    fn nearest(&self, p: &[f64; 3]) -> usize {
        let mut candidates = self.tree.nearest_neighbor_iter(p);
        let first = match candidates.next() {
            Some(node) => node,
            None => return 0,
        };
        let best = first.distance_2(p);
        candidates
            .take_while(|node| node.distance_2(p) <= best)
            .fold(first.data, |lowest, node| lowest.min(node.data))
    }
}

// Strictly increasing or strictly decreasing.
fn is_monotonic(axis: &[f64]) -> bool {
    axis.windows(2).all(|w| w[1] > w[0]) || axis.windows(2).all(|w| w[1] < w[0])
}

/// Bracketing indices along a monotonic axis and the weight of the
/// second one, clamped to the ends.
fn bracket(axis: &[f64], v: f64) -> (usize, usize, f64) {
    let n = axis.len();
    if n >= 2 && axis[n - 1] < axis[0] {
        let ascending: Vec<f64> = axis.iter().rev().copied().collect();
        let (lo, hi, w) = bracket(&ascending, v);
        return (n - 1 - lo, n - 1 - hi, w);
    }
    if n < 2 || v <= axis[0] {
        return (0, 1.min(n - 1), 0.0);
    }
    if v >= axis[n - 1] {
        return (n - 2, n - 1, 1.0);
    }
    let hi = axis.partition_point(|&c| c <= v);
    let lo = hi - 1;
    let w = (v - axis[lo]) / (axis[hi] - axis[lo]);
    (lo, hi, w)
}

// `axes` is slowest-varying first; for rank 2 that is [y, x].
fn bilinear(axes: &[Vec<f64>], p: &[f64; 3]) -> Vec<(usize, f64)> {
    let mut stencil = match axes {
        [x] => {
            let (i0, i1, w) = bracket(x, p[0]);
            vec![(i0, 1.0 - w), (i1, w)]
        }
        [y, x] => {
            let nx = x.len();
            let (j0, j1, wy) = bracket(y, p[1]);
            let (i0, i1, wx) = bracket(x, p[0]);
            vec![
                (j0 * nx + i0, (1.0 - wy) * (1.0 - wx)),
                (j0 * nx + i1, (1.0 - wy) * wx),
                (j1 * nx + i0, wy * (1.0 - wx)),
                (j1 * nx + i1, wy * wx),
            ]
        }
        _ => Vec::new(),
    };
    stencil.retain(|&(_, w)| w != 0.0);
    stencil
}
