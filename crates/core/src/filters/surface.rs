//! Boundary surface extraction
//!
//! A face belongs to the boundary when exactly one cell references it. Faces
//! are matched by their sorted point ids, so the same face seen from two
//! neighbouring cells (with opposite winding) cancels out.

use rustc_hash::FxHashMap;
use tracing::info;

use crate::grid::{PolyData, UnstructuredGrid};

/// Sorted face point ids.
type FaceKey = Vec<u32>;

fn face_key(face: &[u32]) -> FaceKey {
    let mut key = face.to_vec();
    key.sort_unstable();
    key
}

/// Extract the boundary surface of `grid`.
///
/// Polygons keep the owning cell's outward winding. Only points used by the
/// surface are kept (in order of first use), together with their point data.
/// Each polygon carries the cell data of its owning cell.
pub fn extract_surface(grid: &UnstructuredGrid) -> PolyData {
    let mut face_counts: FxHashMap<FaceKey, u32> = FxHashMap::default();
    for cell in &grid.cells {
        for face in cell.face_points() {
            *face_counts.entry(face_key(&face)).or_insert(0) += 1;
        }
    }

    let mut out = PolyData::new();
    out.cell_data = grid.cell_data.empty_like(0);
    let mut point_map: Vec<Option<u32>> = vec![None; grid.point_count()];
    let mut kept_points: Vec<usize> = Vec::new();

    for (cell_id, cell) in grid.cells.iter().enumerate() {
        for face in cell.face_points() {
            if face_counts.get(&face_key(&face)) != Some(&1) {
                continue;
            }
            let poly = face
                .iter()
                .map(|&p| {
                    *point_map[p as usize].get_or_insert_with(|| {
                        kept_points.push(p as usize);
                        (kept_points.len() - 1) as u32
                    })
                })
                .collect();
            out.polys.push(poly);
            out.cell_data.push_copy(&grid.cell_data, cell_id);
        }
    }

    out.points = kept_points.iter().map(|&p| grid.points[p]).collect();
    out.point_data = grid.point_data.empty_like(kept_points.len());
    for &p in &kept_points {
        out.point_data.push_copy(&grid.point_data, p);
    }

    info!(
        "Surface extracted: {} polygons, {} points from {} cells",
        out.polys.len(),
        out.points.len(),
        grid.cell_count()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::Point;
    use crate::grid::generator::{box_grid, box_tet_grid, sample_cells, sample_points};

    #[test]
    fn test_box_surface_counts() {
        let grid = box_grid(3, 2, 1, [3.0, 2.0, 1.0]);
        let surface = extract_surface(&grid);
        // 2*(3*2) + 2*(3*1) + 2*(2*1) boundary quads
        assert_eq!(surface.polys.len(), 22);
        // Every lattice point of a 3x2x1 box lies on the boundary
        assert_eq!(surface.points.len(), grid.point_count());
        assert!((surface.total_area() - 2.0 * (6.0 + 3.0 + 2.0)).abs() < 1e-9);
        assert!(surface.validate().is_ok());
    }

    #[test]
    fn test_interior_points_dropped() {
        let grid = box_tet_grid(3, 3, 3, [1.0, 1.0, 1.0]);
        let surface = extract_surface(&grid);
        assert_eq!(surface.points.len(), 4 * 4 * 4 - 2 * 2 * 2);
        assert!((surface.total_area() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_faces_point_outward() {
        let grid = box_grid(2, 2, 2, [2.0, 2.0, 2.0]);
        let surface = extract_surface(&grid);
        let center = Point::new(1.0, 1.0, 1.0);
        for poly in &surface.polys {
            let [a, b, c] = [0, 1, 2].map(|i| surface.points[poly[i] as usize]);
            let normal = (b - a).cross(&(c - a));
            assert!(normal.dot(&(a - center)) > 0.0);
        }
    }

    #[test]
    fn test_data_is_carried() {
        let mut grid = box_grid(2, 1, 1, [2.0, 1.0, 1.0]);
        grid.point_data.insert(sample_points(&grid, "x", 1, |p| vec![p.x]));
        grid.cell_data.insert(sample_cells(&grid, "id", 1, |c| vec![c.x.floor()]));
        let surface = extract_surface(&grid);
        assert!(surface.validate().is_ok());

        let x = surface.point_array("x").unwrap();
        for (i, p) in surface.points.iter().enumerate() {
            assert_eq!(x.scalar_at(i), p.x);
        }
        let ids = surface.cell_data.get("id").unwrap();
        for (i, poly) in surface.polys.iter().enumerate() {
            let cx = poly.iter().map(|&p| surface.points[p as usize].x).sum::<f64>() / poly.len() as f64;
            // Polygon centroids sit inside (or on the face of) their owning cell
            assert!(cx >= ids.scalar_at(i) - 1e-12 && cx <= ids.scalar_at(i) + 1.0 + 1e-12);
        }
    }
}
