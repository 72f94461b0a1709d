//! Unstructured volumetric grid with point and cell field data

use serde::{Deserialize, Serialize};

use crate::core_types::{Bounds, Point};
use crate::error::{EngineError, EngineResult};
use crate::grid::cell::{tet_signed_volume, Cell};
use crate::grid::field::{Association, FieldArray, FieldData};

/// Volumetric mesh as produced by the CFD solver.
///
/// Topology is immutable once loaded; operations only append or replace
/// field arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnstructuredGrid {
    /// Vertex coordinates
    pub points: Vec<Point>,
    /// Cells referencing `points` by index
    pub cells: Vec<Cell>,
    /// Per-point arrays
    #[serde(default)]
    pub point_data: FieldData,
    /// Per-cell arrays
    #[serde(default)]
    pub cell_data: FieldData,
}

impl UnstructuredGrid {
    /// Create a grid without field data.
    pub fn new(points: Vec<Point>, cells: Vec<Cell>) -> Self {
        Self {
            points,
            cells,
            point_data: FieldData::new(),
            cell_data: FieldData::new(),
        }
    }

    /// Number of points.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Number of cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// True when the grid has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Look up a point array, failing with `MissingField`.
    pub fn point_array(&self, name: &str) -> EngineResult<&FieldArray> {
        self.point_data
            .get(name)
            .ok_or_else(|| EngineError::missing_field(name, Association::Points))
    }

    /// Look up a cell array, failing with `MissingField`.
    pub fn cell_array(&self, name: &str) -> EngineResult<&FieldArray> {
        self.cell_data
            .get(name)
            .ok_or_else(|| EngineError::missing_field(name, Association::Cells))
    }

    /// Check the structural invariants: connectivity sizes, index ranges and
    /// array lengths.
    pub fn validate(&self) -> EngineResult<()> {
        let n_points = self.points.len();
        for (cell_id, cell) in self.cells.iter().enumerate() {
            cell.check(n_points)
                .map_err(|e| EngineError::InvalidGrid(format!("cell {cell_id}: {e}")))?;
        }
        if self.points.iter().any(|p| !p.coords.iter().all(|c| c.is_finite())) {
            return Err(EngineError::InvalidGrid("non-finite point coordinate".into()));
        }
        self.point_data
            .validate(n_points, Association::Points)
            .map_err(EngineError::InvalidGrid)?;
        self.cell_data
            .validate(self.cells.len(), Association::Cells)
            .map_err(EngineError::InvalidGrid)?;
        Ok(())
    }

    /// Bounding box of all points.
    pub fn bounds(&self) -> Bounds {
        Bounds::from_points(&self.points)
    }

    /// Bounding box of one cell.
    pub fn cell_bounds(&self, cell_id: usize) -> Bounds {
        let mut b = Bounds::empty();
        for &p in &self.cells[cell_id].points {
            b.include(&self.points[p as usize]);
        }
        b
    }

    /// Parametric centre of a cell (vertex average for linear cells).
    pub fn cell_center(&self, cell_id: usize) -> Point {
        let cell = &self.cells[cell_id];
        let sum = cell
            .points
            .iter()
            .fold(nalgebra::Vector3::zeros(), |acc, &p| {
                acc + self.points[p as usize].coords
            });
        Point::from(sum / cell.points.len() as f64)
    }

    /// Coordinates of the four vertices of a tetrahedron given by point ids.
    #[inline]
    pub fn tet_points(&self, tet: [u32; 4]) -> [Point; 4] {
        tet.map(|p| self.points[p as usize])
    }

    /// Volume of one cell from its tetrahedral decomposition.
    pub fn cell_volume(&self, cell_id: usize) -> f64 {
        self.cells[cell_id]
            .tets()
            .map(|t| {
                let [a, b, c, d] = self.tet_points(t);
                tet_signed_volume(&a, &b, &c, &d).abs()
            })
            .sum()
    }

    /// Sum of all cell volumes.
    pub fn total_volume(&self) -> f64 {
        (0..self.cells.len()).map(|c| self.cell_volume(c)).sum()
    }

    /// Characteristic cell length (bounding box diagonal), used as the step
    /// unit for streamline integration.
    pub fn cell_length(&self, cell_id: usize) -> f64 {
        self.cell_bounds(cell_id).diagonal()
    }

    /// For every point, the ids of the cells that use it.
    pub fn point_cells(&self) -> Vec<Vec<u32>> {
        let mut links = vec![Vec::new(); self.points.len()];
        for (cell_id, cell) in self.cells.iter().enumerate() {
            for &p in &cell.points {
                links[p as usize].push(cell_id as u32);
            }
        }
        links
    }
}
