//! Volume and surface integration of field arrays

use std::fmt;
use std::str::FromStr;

use crate::core_types::Point;
use crate::error::{EngineError, EngineResult};
use crate::grid::cell::tet_signed_volume;
use crate::grid::{Association, FieldArray, FieldData, PolyData, UnstructuredGrid};

/// Extents at or below this are treated as degenerate.
const MIN_EXTENT: f64 = 1e-12;

/// What to integrate over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationTarget {
    /// The whole volumetric grid
    Grid,
    /// The active polygon representation
    Component,
}

impl FromStr for IntegrationTarget {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grid" => Ok(Self::Grid),
            "component" => Ok(Self::Component),
            other => Err(EngineError::invalid_argument(
                "target",
                format!("expected \"grid\" or \"component\", got \"{other}\""),
            )),
        }
    }
}

impl fmt::Display for IntegrationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grid => write!(f, "grid"),
            Self::Component => write!(f, "component"),
        }
    }
}

/// Raw integration result.
#[derive(Debug, Clone, PartialEq)]
pub struct Integral {
    /// Volume (grid) or area (surface) integrated over
    pub extent: f64,
    /// Integral of each component
    pub values: Vec<f64>,
}

impl Integral {
    /// Extent-normalized result in the host layout:
    /// - 3+ components: `[extent, v0, v1, v2, |v|]` over the first three
    /// - 1 component: `[extent, v]`
    /// - otherwise: `[extent, v0, .., vn-1]`
    pub fn averaged(&self) -> EngineResult<Vec<f64>> {
        if self.extent.is_nan() || self.extent <= MIN_EXTENT {
            return Err(EngineError::DegenerateExtent {
                extent: self.extent,
            });
        }
        let mean: Vec<f64> = self.values.iter().map(|v| v / self.extent).collect();
        let mut out = Vec::with_capacity(5);
        out.push(self.extent);
        if mean.len() >= 3 {
            let v = &mean[..3];
            out.extend_from_slice(v);
            out.push(v.iter().map(|c| c * c).sum::<f64>().sqrt());
        } else {
            out.extend(mean);
        }
        Ok(out)
    }
}

fn find_field<'a>(
    point_data: &'a FieldData,
    cell_data: &'a FieldData,
    name: &str,
) -> EngineResult<(&'a FieldArray, Association)> {
    if let Some(a) = point_data.get(name) {
        Ok((a, Association::Points))
    } else if let Some(a) = cell_data.get(name) {
        Ok((a, Association::Cells))
    } else {
        Err(EngineError::missing_field(name, Association::Points))
    }
}

/// Integrate `field` over the grid volume.
///
/// Point data is integrated exactly for piecewise-linear fields over the
/// tetrahedral decomposition; cell data is taken as constant per cell.
pub fn integrate_grid(grid: &UnstructuredGrid, field: &str) -> EngineResult<Integral> {
    let (array, association) = find_field(&grid.point_data, &grid.cell_data, field)?;
    let mut values = vec![0.0; array.components];
    let mut extent = 0.0;

    for (cell_id, cell) in grid.cells.iter().enumerate() {
        for tet in cell.tets() {
            let [a, b, c, d] = grid.tet_points(tet);
            let volume = tet_signed_volume(&a, &b, &c, &d).abs();
            extent += volume;
            match association {
                Association::Points => {
                    for p in tet {
                        array.accumulate(p as usize, volume / 4.0, &mut values);
                    }
                }
                Association::Cells => array.accumulate(cell_id, volume, &mut values),
            }
        }
    }
    Ok(Integral { extent, values })
}

/// Integrate `field` over the polygons of `poly`.
pub fn integrate_surface(poly: &PolyData, field: &str) -> EngineResult<Integral> {
    let (array, association) = find_field(&poly.point_data, &poly.cell_data, field)?;
    let mut values = vec![0.0; array.components];
    let mut extent = 0.0;
    let n_lines = poly.lines.len();

    for (poly_id, polygon) in poly.polys.iter().enumerate() {
        for i in 1..polygon.len().saturating_sub(1) {
            let tri = [polygon[0], polygon[i], polygon[i + 1]];
            let [a, b, c]: [Point; 3] = tri.map(|p| poly.points[p as usize]);
            let area = 0.5 * (b - a).cross(&(c - a)).norm();
            extent += area;
            match association {
                Association::Points => {
                    for p in tri {
                        array.accumulate(p as usize, area / 3.0, &mut values);
                    }
                }
                // Cell data is ordered lines first
                Association::Cells => array.accumulate(n_lines + poly_id, area, &mut values),
            }
        }
    }
    Ok(Integral { extent, values })
}
