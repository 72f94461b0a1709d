//! Polygonal surface data derived from the volumetric grid
//!
//! Surfaces, plane cuts and streamline tubes are all stored as `PolyData`.

use serde::{Deserialize, Serialize};

use crate::core_types::{Bounds, Point};
use crate::error::{EngineError, EngineResult};
use crate::grid::field::{Association, FieldArray, FieldData};

/// Points with polygon and polyline connectivity.
///
/// Cell data tuples are ordered lines first, then polygons.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolyData {
    /// Vertex coordinates
    pub points: Vec<Point>,
    /// Polygons (triangles, quads, general planar polygons)
    #[serde(default)]
    pub polys: Vec<Vec<u32>>,
    /// Polylines
    #[serde(default)]
    pub lines: Vec<Vec<u32>>,
    /// Per-point arrays
    #[serde(default)]
    pub point_data: FieldData,
    /// Per-cell arrays
    #[serde(default)]
    pub cell_data: FieldData,
}

impl PolyData {
    /// Create an empty polygon set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Number of cells (lines + polygons).
    pub fn cell_count(&self) -> usize {
        self.lines.len() + self.polys.len()
    }

    /// True when there is no geometry at all.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.cell_count() == 0
    }

    /// Look up a point array, failing with `MissingField`.
    pub fn point_array(&self, name: &str) -> EngineResult<&FieldArray> {
        self.point_data
            .get(name)
            .ok_or_else(|| EngineError::missing_field(name, Association::Points))
    }

    /// Bounding box of all points.
    pub fn bounds(&self) -> Bounds {
        Bounds::from_points(&self.points)
    }

    /// Fan triangulation of every polygon.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.polys.iter().flat_map(|poly| {
            (1..poly.len().saturating_sub(1)).map(move |i| [poly[0], poly[i], poly[i + 1]])
        })
    }

    /// Area of polygon `poly_id`.
    pub fn polygon_area(&self, poly_id: usize) -> f64 {
        let poly = &self.polys[poly_id];
        if poly.len() < 3 {
            return 0.0;
        }
        let p0 = self.points[poly[0] as usize];
        (1..poly.len() - 1)
            .map(|i| {
                let a = self.points[poly[i] as usize];
                let b = self.points[poly[i + 1] as usize];
                0.5 * (a - p0).cross(&(b - p0)).norm()
            })
            .sum()
    }

    /// Total polygon area.
    pub fn total_area(&self) -> f64 {
        (0..self.polys.len()).map(|p| self.polygon_area(p)).sum()
    }

    /// Check index ranges and array lengths.
    pub fn validate(&self) -> EngineResult<()> {
        let n = self.points.len();
        for cell in self.lines.iter().chain(&self.polys) {
            if let Some(&bad) = cell.iter().find(|&&p| p as usize >= n) {
                return Err(EngineError::decode(
                    "polydata",
                    format!("cell references point {bad}, polydata has {n} points"),
                ));
            }
        }
        self.point_data
            .validate(n, Association::Points)
            .map_err(|m| EngineError::decode("polydata", m))?;
        self.cell_data
            .validate(self.cell_count(), Association::Cells)
            .map_err(|m| EngineError::decode("polydata", m))?;
        Ok(())
    }
}
