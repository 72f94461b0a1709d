//! Signed distance to a surface and flow-region masking
//!
//! The sign comes from the normal of the closest surface triangle: points on
//! the side the normal points to are positive. Where several triangles share
//! the closest point (an edge or a vertex), the one whose normal is best
//! aligned with the offset decides.

use rayon::prelude::*;
use tracing::info;

use crate::core_types::{Point, Vec3};
use crate::error::{EngineError, EngineResult};
use crate::grid::{Association, FieldArray, PolyData, UnstructuredGrid};

/// Cell array receiving the signed distance.
pub const SDF_NAME: &str = "sdf1";
/// Cell array masked by the signed distance.
pub const FLOW_REGION_NAME: &str = "flowRegion";
/// Cell array passed through to the output.
pub const SDF2_NAME: &str = "sdf2";

/// Compute the closest point on a triangle to a query point.
///
/// This implements the algorithm from "Real-Time Collision Detection" by
/// Christer Ericson.
pub fn closest_point_on_triangle(point: &Point, v0: &Point, v1: &Point, v2: &Point) -> Point {
    let ab = v1 - v0;
    let ac = v2 - v0;
    let ap = point - v0;

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *v0;
    }

    let bp = point - v1;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *v1;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return v0 + ab * (d1 / (d1 - d3));
    }

    let cp = point - v2;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *v2;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return v0 + ac * (d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return v1 + (v2 - v1) * w;
    }

    // Face region
    let denom = 1.0 / (va + vb + vc);
    v0 + ab * (vb * denom) + ac * (vc * denom)
}

/// Triangulated surface prepared for distance queries.
#[derive(Debug, Clone)]
pub struct SurfaceDistance {
    triangles: Vec<[Point; 3]>,
    normals: Vec<Vec3>,
}

impl SurfaceDistance {
    /// Fan-triangulate the polygons of `surface`, dropping degenerate ones.
    pub fn new(surface: &PolyData) -> EngineResult<Self> {
        let mut triangles = Vec::new();
        let mut normals = Vec::new();
        for tri in surface.triangles() {
            let [a, b, c] = tri.map(|i| surface.points[i as usize]);
            if let Some(n) = (b - a).cross(&(c - a)).try_normalize(f64::EPSILON) {
                triangles.push([a, b, c]);
                normals.push(n);
            }
        }
        if triangles.is_empty() {
            return Err(EngineError::decode("surface", "surface has no triangles"));
        }
        Ok(Self { triangles, normals })
    }

    /// Number of usable triangles.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Signed distance from `p` to the surface. Zero counts as positive.
    pub fn signed_distance(&self, p: &Point) -> f64 {
        let mut best_sq = f64::INFINITY;
        let mut best_sign = 1.0;
        let mut best_alignment = -1.0;

        for (tri, normal) in self.triangles.iter().zip(&self.normals) {
            let closest = closest_point_on_triangle(p, &tri[0], &tri[1], &tri[2]);
            let offset = p - closest;
            let dist_sq = offset.norm_squared();
            let tie_tol = 1e-12 * best_sq.max(f64::MIN_POSITIVE);

            if dist_sq > best_sq + tie_tol {
                continue;
            }
            let dot = offset.dot(normal);
            let alignment = if dist_sq > 0.0 {
                dot.abs() / dist_sq.sqrt()
            } else {
                1.0
            };
            if dist_sq < best_sq - tie_tol || alignment > best_alignment {
                best_sq = best_sq.min(dist_sq);
                best_alignment = alignment;
                best_sign = if dot >= 0.0 { 1.0 } else { -1.0 };
            }
        }
        best_sign * best_sq.sqrt()
    }
}

/// Per-cell classification result.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Signed distance of each cell centre
    pub sdf: Vec<f64>,
    /// Flow region, forced to 0 where `sdf < 0`
    pub flow_region: Vec<f64>,
    /// The grid's `sdf2` values, unchanged
    pub sdf2: Vec<f64>,
}

impl Classification {
    /// `[sdf(N), flowRegion(N), sdf2(N)]`.
    pub fn to_buffer(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(3 * self.sdf.len());
        out.extend_from_slice(&self.sdf);
        out.extend_from_slice(&self.flow_region);
        out.extend_from_slice(&self.sdf2);
        out
    }
}

fn scalar_cell_array<'a>(grid: &'a UnstructuredGrid, name: &str) -> EngineResult<&'a FieldArray> {
    let array = grid
        .cell_data
        .get(name)
        .ok_or_else(|| EngineError::missing_field(name, Association::Cells))?;
    if array.components != 1 {
        return Err(EngineError::invalid_argument(
            "field",
            format!("cell array '{name}' must be scalar, has {} components", array.components),
        ));
    }
    Ok(array)
}

/// Classify every cell centre of `grid` against `surface`.
///
/// Both `flowRegion` and `sdf2` must exist as scalar cell arrays; they are
/// checked before any distance is computed. The grid is not modified.
pub fn classify_cells(
    grid: &UnstructuredGrid,
    surface: &SurfaceDistance,
) -> EngineResult<Classification> {
    let flow_region = scalar_cell_array(grid, FLOW_REGION_NAME)?;
    let sdf2 = scalar_cell_array(grid, SDF2_NAME)?;

    let sdf: Vec<f64> = (0..grid.cell_count())
        .into_par_iter()
        .map(|c| surface.signed_distance(&grid.cell_center(c)))
        .collect();

    let masked: Vec<f64> = sdf
        .iter()
        .zip(&flow_region.values)
        .map(|(&d, &region)| if d < 0.0 { 0.0 } else { region })
        .collect();

    let below = sdf.iter().filter(|&&d| d < 0.0).count();
    info!(
        "Classified {} cells against {} triangles ({} masked)",
        sdf.len(),
        surface.triangle_count(),
        below
    );

    Ok(Classification {
        sdf,
        flow_region: masked,
        sdf2: sdf2.values.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::surface::extract_surface;
    use crate::grid::generator::{box_grid, sample_cells};

    fn plane_surface(z: f64) -> PolyData {
        PolyData {
            points: vec![
                Point::new(-10.0, -10.0, z),
                Point::new(10.0, -10.0, z),
                Point::new(10.0, 10.0, z),
                Point::new(-10.0, 10.0, z),
            ],
            polys: vec![vec![0, 1, 2, 3]],
            ..PolyData::default()
        }
    }

    #[test]
    fn test_closest_point_regions() {
        let (a, b, c) = (
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 0.0),
            Point::new(0.0, 1.0, 0.0),
        );
        let inside = closest_point_on_triangle(&Point::new(0.2, 0.2, 1.0), &a, &b, &c);
        assert!((inside - Point::new(0.2, 0.2, 0.0)).norm() < 1e-12);
        let vertex = closest_point_on_triangle(&Point::new(-1.0, -1.0, 0.0), &a, &b, &c);
        assert_eq!(vertex, a);
        let edge = closest_point_on_triangle(&Point::new(0.5, -1.0, 0.0), &a, &b, &c);
        assert!((edge - Point::new(0.5, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_plane_sign() {
        let surface = SurfaceDistance::new(&plane_surface(1.0)).unwrap();
        assert!((surface.signed_distance(&Point::new(0.0, 0.0, 3.0)) - 2.0).abs() < 1e-12);
        assert!((surface.signed_distance(&Point::new(0.0, 0.0, 0.0)) + 1.0).abs() < 1e-12);
        let on = surface.signed_distance(&Point::new(1.0, 2.0, 1.0));
        assert!((0.0..1e-12).contains(&on));
    }

    #[test]
    fn test_closed_box_corners() {
        // Outward surface of the unit cube; points near a corner diagonal
        let cube = extract_surface(&box_grid(1, 1, 1, [1.0, 1.0, 1.0]));
        let surface = SurfaceDistance::new(&cube).unwrap();
        let outside = surface.signed_distance(&Point::new(1.5, 1.5, 1.5));
        assert!((outside - 0.75f64.sqrt()).abs() < 1e-12);
        let inside = surface.signed_distance(&Point::new(0.9, 0.9, 0.9));
        assert!((inside + 0.1).abs() < 1e-12);
        let edge = surface.signed_distance(&Point::new(1.2, 1.2, 0.5));
        assert!(edge > 0.0);
    }

    #[test]
    fn test_classification_masks_below() {
        let mut grid = box_grid(1, 1, 2, [1.0, 1.0, 2.0]);
        grid.cell_data.insert(sample_cells(&grid, FLOW_REGION_NAME, 1, |_| vec![3.0]));
        grid.cell_data.insert(sample_cells(&grid, SDF2_NAME, 1, |c| vec![c.z]));
        let surface = SurfaceDistance::new(&plane_surface(1.0)).unwrap();
        let result = classify_cells(&grid, &surface).unwrap();
        assert_eq!(result.sdf, vec![-0.5, 0.5]);
        assert_eq!(result.flow_region, vec![0.0, 3.0]);
        assert_eq!(result.sdf2, vec![0.5, 1.5]);
        assert_eq!(result.to_buffer().len(), 6);
    }

    #[test]
    fn test_missing_arrays_and_empty_surface() {
        let grid = box_grid(1, 1, 1, [1.0, 1.0, 1.0]);
        let surface = SurfaceDistance::new(&plane_surface(0.5)).unwrap();
        assert!(matches!(
            classify_cells(&grid, &surface),
            Err(EngineError::MissingField { .. })
        ));
        assert!(matches!(
            SurfaceDistance::new(&PolyData::new()),
            Err(EngineError::Decode { .. })
        ));
    }
}
