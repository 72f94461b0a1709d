//! Point-in-cell location for unstructured grids
//!
//! Cells are binned by bounding box into a uniform bucket lattice keyed by
//! Morton code. A query walks the candidates of one bucket and tests the
//! point against each cell's tetrahedral decomposition.

use nalgebra::Matrix3;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core_types::{Bounds, Point, Vec3};
use crate::grid::field::FieldArray;
use crate::grid::unstructured_grid::UnstructuredGrid;

/// Locator tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Barycentric tolerance for accepting a point on a cell boundary
    pub tolerance: f64,
    /// Average number of cells per bucket the lattice is sized for
    pub cells_per_bucket: usize,
    /// Upper bound on buckets along any axis
    pub max_buckets_per_axis: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-9,
            cells_per_bucket: 8,
            max_buckets_per_axis: 256,
        }
    }
}

/// A located point: the enclosing cell and the tetrahedron weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellHit {
    /// Enclosing cell id
    pub cell: usize,
    /// Grid point ids of the enclosing tetrahedron
    pub points: [u32; 4],
    /// Barycentric weights matching `points`, summing to 1
    pub weights: [f64; 4],
}

impl CellHit {
    /// `(point id, weight)` pairs for `FieldData::push_interpolated`.
    pub fn point_weights(&self) -> [(usize, f64); 4] {
        std::array::from_fn(|i| (self.points[i] as usize, self.weights[i]))
    }

    /// Interpolate a point array at the hit location.
    pub fn interpolate(&self, array: &FieldArray) -> Vec<f64> {
        let mut out = vec![0.0; array.components];
        for (p, w) in self.point_weights() {
            array.accumulate(p, w, &mut out);
        }
        out
    }

    /// Interpolate a three-component point array at the hit location.
    pub fn interpolate_vector(&self, array: &FieldArray) -> Vec3 {
        self.point_weights()
            .iter()
            .fold(Vec3::zeros(), |acc, &(p, w)| acc + array.vector_at(p) * w)
    }
}

/// Uniform-bucket cell locator.
#[derive(Debug, Clone)]
pub struct CellLocator {
    buckets: FxHashMap<u64, Vec<u32>>,
    bounds: Bounds,
    bucket_size: [f64; 3],
    dims: [usize; 3],
    tolerance: f64,
}

impl CellLocator {
    /// Bin every cell of `grid`.
    pub fn build(grid: &UnstructuredGrid, config: &LocatorConfig) -> Self {
        let bounds = grid.bounds();
        let n_cells = grid.cell_count();
        if n_cells == 0 || bounds.is_empty() {
            return Self {
                buckets: FxHashMap::default(),
                bounds,
                bucket_size: [1.0; 3],
                dims: [1, 1, 1],
                tolerance: config.tolerance,
            };
        }

        let extent = bounds.extent();
        let floor = (bounds.diagonal() * 1e-6).max(f64::MIN_POSITIVE);
        let ext = extent.map(|e| e.max(floor));
        let target_buckets = (n_cells / config.cells_per_bucket.max(1)).max(1) as f64;
        let edge = (ext.x * ext.y * ext.z / target_buckets).cbrt().max(floor);
        let ext = [ext.x, ext.y, ext.z];
        let dims = ext.map(|e| ((e / edge).ceil() as usize).clamp(1, config.max_buckets_per_axis));
        // Clamped axes get wider buckets so the lattice still spans the grid.
        let bucket_size = std::array::from_fn(|i| ext[i] / dims[i] as f64);

        let mut locator = Self {
            buckets: FxHashMap::default(),
            bounds,
            bucket_size,
            dims,
            tolerance: config.tolerance,
        };

        for cell_id in 0..n_cells {
            let cb = grid.cell_bounds(cell_id);
            let lo = locator.bucket_coords(&cb.min);
            let hi = locator.bucket_coords(&cb.max);
            for iz in lo[2]..=hi[2] {
                for iy in lo[1]..=hi[1] {
                    for ix in lo[0]..=hi[0] {
                        locator
                            .buckets
                            .entry(morton_encode(ix, iy, iz))
                            .or_default()
                            .push(cell_id as u32);
                    }
                }
            }
        }

        debug!(
            "Cell locator built: {} cells in {}x{}x{} lattice ({} non-empty buckets)",
            n_cells,
            dims[0],
            dims[1],
            dims[2],
            locator.buckets.len()
        );
        locator
    }

    /// Bounds of the indexed grid.
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Find the cell containing `p`, or `None` when `p` is outside the grid.
    pub fn locate(&self, grid: &UnstructuredGrid, p: &Point) -> Option<CellHit> {
        self.locate_with_hint(grid, p, None)
    }

    /// Like [`CellLocator::locate`], testing `hint` first.
    ///
    /// Consecutive streamline points usually stay in the same cell.
    pub fn locate_with_hint(
        &self,
        grid: &UnstructuredGrid,
        p: &Point,
        hint: Option<usize>,
    ) -> Option<CellHit> {
        if let Some(cell) = hint {
            if let Some(hit) = self.test_cell(grid, cell, p) {
                return Some(hit);
            }
        }
        let slack = self.tolerance * self.bounds.diagonal().max(1.0);
        if self.buckets.is_empty() || !self.bounds.contains(p, slack) {
            return None;
        }
        let [ix, iy, iz] = self.bucket_coords(p);
        self.buckets
            .get(&morton_encode(ix, iy, iz))?
            .iter()
            .filter(|&&c| Some(c as usize) != hint)
            .find_map(|&c| self.test_cell(grid, c as usize, p))
    }

    fn test_cell(&self, grid: &UnstructuredGrid, cell: usize, p: &Point) -> Option<CellHit> {
        grid.cells[cell].tets().find_map(|tet| {
            let weights = barycentric(&grid.tet_points(tet), p)?;
            weights
                .iter()
                .all(|&w| w >= -self.tolerance)
                .then_some(CellHit {
                    cell,
                    points: tet,
                    weights,
                })
        })
    }

    fn bucket_coords(&self, p: &Point) -> [usize; 3] {
        let rel = p - self.bounds.min;
        let axis = |v: f64, a: usize| {
            let i = (v / self.bucket_size[a]).floor();
            if i <= 0.0 {
                0
            } else {
                (i as usize).min(self.dims[a] - 1)
            }
        };
        [
            axis(rel.x, 0),
            axis(rel.y, 1),
            axis(rel.z, 2),
        ]
    }
}

/// Barycentric coordinates of `p` in the tetrahedron `t`, or `None` when the
/// tetrahedron is degenerate.
pub fn barycentric(t: &[Point; 4], p: &Point) -> Option<[f64; 4]> {
    let m = Matrix3::from_columns(&[t[1] - t[0], t[2] - t[0], t[3] - t[0]]);
    let scale = (t[1] - t[0]).norm_squared().max((t[2] - t[0]).norm_squared());
    if m.determinant().abs() <= 1e-14 * scale.powf(1.5) {
        return None;
    }
    let l = m.try_inverse()? * (p - t[0]);
    Some([1.0 - l.x - l.y - l.z, l.x, l.y, l.z])
}

/// Morton encode 3D bucket coordinates into a single 64-bit key
/// (21 bits per axis).
fn morton_encode(x: usize, y: usize, z: usize) -> u64 {
    let (x, y, z) = (x as u64, y as u64, z as u64);
    let mut result = 0u64;
    for i in 0..21 {
        result |= ((x & (1 << i)) << (2 * i))
            | ((y & (1 << i)) << (2 * i + 1))
            | ((z & (1 << i)) << (2 * i + 2));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::generator::{box_grid, box_tet_grid};

    #[test]
    fn test_locate_inside_and_outside() {
        let grid = box_grid(4, 4, 4, [4.0, 4.0, 4.0]);
        let locator = CellLocator::build(&grid, &LocatorConfig::default());

        let hit = locator.locate(&grid, &Point::new(2.5, 0.5, 3.5)).unwrap();
        let cb = grid.cell_bounds(hit.cell);
        assert!(cb.contains(&Point::new(2.5, 0.5, 3.5), 1e-12));
        assert!((hit.weights.iter().sum::<f64>() - 1.0).abs() < 1e-12);

        assert!(locator.locate(&grid, &Point::new(5.0, 1.0, 1.0)).is_none());
        assert!(locator.locate(&grid, &Point::new(-0.1, 1.0, 1.0)).is_none());
    }

    #[test]
    fn test_locate_on_boundary() {
        let grid = box_tet_grid(2, 2, 2, [1.0, 1.0, 1.0]);
        let locator = CellLocator::build(&grid, &LocatorConfig::default());
        for p in [
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 1.0, 1.0),
            Point::new(0.5, 0.5, 0.5),
            Point::new(1.0, 0.3, 0.7),
        ] {
            assert!(locator.locate(&grid, &p).is_some(), "failed to locate {p}");
        }
    }

    #[test]
    fn test_interpolation_is_exact_for_linear_field() {
        let grid = box_tet_grid(3, 3, 3, [3.0, 3.0, 3.0]);
        let locator = CellLocator::build(&grid, &LocatorConfig::default());
        let f = crate::grid::generator::sample_points(&grid, "f", 1, |p| {
            vec![2.0 * p.x - p.y + 0.5 * p.z]
        });
        let q = Point::new(1.3, 2.2, 0.4);
        let hit = locator.locate(&grid, &q).unwrap();
        let v = hit.interpolate(&f)[0];
        assert!((v - (2.0 * 1.3 - 2.2 + 0.5 * 0.4)).abs() < 1e-10);
    }

    #[test]
    fn test_hint_is_used() {
        let grid = box_grid(2, 2, 2, [2.0, 2.0, 2.0]);
        let locator = CellLocator::build(&grid, &LocatorConfig::default());
        let p = Point::new(0.5, 0.5, 0.5);
        let first = locator.locate(&grid, &p).unwrap();
        let again = locator.locate_with_hint(&grid, &p, Some(first.cell)).unwrap();
        assert_eq!(first.cell, again.cell);
    }

    #[test]
    fn test_flat_grid_buckets_stay_small() {
        let grid = box_grid(300, 300, 1, [1.0, 1.0, 0.0001]);
        let locator = CellLocator::build(&grid, &LocatorConfig::default());
        assert_eq!(locator.dims, [256, 256, 1]);

        let fullest = locator.buckets.values().map(Vec::len).max().unwrap();
        assert!(fullest <= 16, "fullest bucket holds {fullest} cells");

        let corner = Point::new(0.999, 0.999, 0.00005);
        let hit = locator.locate(&grid, &corner).unwrap();
        assert!(grid.cell_bounds(hit.cell).contains(&corner, 1e-12));
    }

    #[test]
    fn test_morton_encoding() {
        let code1 = morton_encode(0, 0, 0);
        let code2 = morton_encode(1, 0, 0);
        let code3 = morton_encode(0, 1, 0);
        assert!(code1 != code2);
        assert!(code1 != code3);
        assert!(code2 != code3);
    }
}
