//! Plane cross-sections by marching tetrahedra
//!
//! Every cell is decomposed into tetrahedra and each tetrahedron is contoured
//! at the zero level of the plane's signed distance. Intersections on the
//! same grid edge are shared between neighbouring tetrahedra, so the cut is a
//! connected triangle mesh.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core_types::{Point, Vec3};
use crate::error::{EngineError, EngineResult};
use crate::grid::{FieldData, PolyData, UnstructuredGrid};

/// A cutting plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    /// Any point on the plane
    pub origin: Point,
    /// Unit normal
    pub normal: Vec3,
}

impl Plane {
    /// Create a plane; the normal is normalized and must be non-zero.
    pub fn new(origin: Point, normal: Vec3) -> EngineResult<Self> {
        let len = normal.norm();
        if !(len.is_finite() && len > 0.0) || !origin.coords.iter().all(|c| c.is_finite()) {
            return Err(EngineError::invalid_argument(
                "plane",
                format!("normal must be finite and non-zero, got {normal:?}"),
            ));
        }
        Ok(Self {
            origin,
            normal: normal / len,
        })
    }

    /// Signed distance of `p` from the plane.
    #[inline]
    pub fn signed_distance(&self, p: &Point) -> f64 {
        self.normal.dot(&(p - self.origin))
    }
}

/// Intersection point identity: an edge `(lo, hi)`, or `(v, v)` when the
/// plane passes exactly through vertex `v`.
type EdgeKey = (u32, u32);

struct CutBuilder<'a> {
    grid: &'a UnstructuredGrid,
    distance: &'a [f64],
    points: Vec<Point>,
    point_data: FieldData,
    edge_points: FxHashMap<EdgeKey, u32>,
}

impl CutBuilder<'_> {
    /// Output point where the plane crosses edge `a`-`b`.
    fn edge_point(&mut self, a: u32, b: u32) -> u32 {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (d_lo, d_hi) = (self.distance[lo as usize], self.distance[hi as usize]);
        let t = d_lo / (d_lo - d_hi);
        let key = if t <= 0.0 {
            (lo, lo)
        } else if t >= 1.0 {
            (hi, hi)
        } else {
            (lo, hi)
        };

        if let Some(&id) = self.edge_points.get(&key) {
            return id;
        }
        let id = self.points.len() as u32;
        let (p_lo, p_hi) = (self.grid.points[lo as usize], self.grid.points[hi as usize]);
        if key.0 == key.1 {
            self.points.push(self.grid.points[key.0 as usize]);
            self.point_data
                .push_copy(&self.grid.point_data, key.0 as usize);
        } else {
            self.points.push(p_lo + (p_hi - p_lo) * t);
            self.point_data.push_interpolated(
                &self.grid.point_data,
                &[(lo as usize, 1.0 - t), (hi as usize, t)],
            );
        }
        self.edge_points.insert(key, id);
        id
    }
}

/// Cut `grid` with `plane`.
///
/// Output triangles are wound so their normals follow the plane normal and
/// carry their parent cell's cell data. A plane that misses the grid gives an
/// empty result.
pub fn cut(grid: &UnstructuredGrid, plane: &Plane) -> PolyData {
    let mut out = PolyData::new();
    out.point_data = grid.point_data.empty_like(0);
    out.cell_data = grid.cell_data.empty_like(0);

    let bounds = grid.bounds();
    if bounds.is_empty() {
        return out;
    }
    let corner_d = bounds.corners().map(|c| plane.signed_distance(&c));
    if corner_d.iter().all(|&d| d > 0.0) || corner_d.iter().all(|&d| d < 0.0) {
        debug!("Cut plane misses grid bounds");
        return out;
    }

    let distance: Vec<f64> = grid.points.iter().map(|p| plane.signed_distance(p)).collect();
    let mut builder = CutBuilder {
        grid,
        distance: &distance,
        points: Vec::new(),
        point_data: out.point_data,
        edge_points: FxHashMap::default(),
    };
    let mut polys: Vec<Vec<u32>> = Vec::new();
    let mut skipped = 0usize;

    for (cell_id, cell) in grid.cells.iter().enumerate() {
        for tet in cell.tets() {
            let (above, below): (Vec<u32>, Vec<u32>) =
                tet.iter().copied().partition(|&p| distance[p as usize] > 0.0);

            let loops: Vec<[EdgeKey; 3]> = match (above.as_slice(), below.as_slice()) {
                ([a], [b0, b1, b2]) | ([b0, b1, b2], [a]) => vec![[(*a, *b0), (*a, *b1), (*a, *b2)]],
                ([a0, a1], [b0, b1]) => vec![
                    [(*a0, *b0), (*a0, *b1), (*a1, *b1)],
                    [(*a0, *b0), (*a1, *b1), (*a1, *b0)],
                ],
                _ => continue,
            };

            for edges in loops {
                let mut tri = edges.map(|(a, b)| builder.edge_point(a, b));
                if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
                    skipped += 1;
                    continue;
                }
                let [p0, p1, p2] = tri.map(|i| builder.points[i as usize]);
                let n = (p1 - p0).cross(&(p2 - p0));
                if n.norm_squared() == 0.0 {
                    skipped += 1;
                    continue;
                }
                if n.dot(&plane.normal) < 0.0 {
                    tri.swap(1, 2);
                }
                polys.push(tri.to_vec());
                out.cell_data.push_copy(&grid.cell_data, cell_id);
            }
        }
    }

    out.points = builder.points;
    out.point_data = builder.point_data;
    out.polys = polys;

    if skipped > 0 {
        debug!("Cut skipped {} degenerate triangles", skipped);
    }
    info!(
        "Plane cut: {} triangles, {} points",
        out.polys.len(),
        out.points.len()
    );
    out
}
