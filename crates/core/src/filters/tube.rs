//! Tube sweep around polylines
//!
//! Each polyline is swept with a regular polygon in a parallel-transported
//! frame, so tubes do not twist along the line. The radius grows with the
//! local vector magnitude.

use std::f64::consts::PI;

use tracing::info;

use crate::config::TubeConfig;
use crate::core_types::{Point, Vec3};
use crate::error::{EngineError, EngineResult};
use crate::grid::{FieldArray, PolyData};

/// Tube parameters.
#[derive(Debug, Clone, Copy)]
pub struct TubeParams {
    /// Radius at the slowest point
    pub radius: f64,
    /// Polygon sides (at least 3)
    pub sides: usize,
}

impl TubeParams {
    /// Validate and create tube parameters.
    pub fn new(radius: f64, sides: usize) -> EngineResult<Self> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(EngineError::invalid_argument(
                "tube_radius",
                format!("must be positive, got {radius}"),
            ));
        }
        if sides < 3 {
            return Err(EngineError::invalid_argument(
                "tube_sides",
                format!("must be at least 3, got {sides}"),
            ));
        }
        Ok(Self { radius, sides })
    }
}

/// Sweep tubes around every polyline of `lines`.
///
/// The radius is `radius * (1 + (factor - 1) * (|v| - vmin) / (vmax - vmin))`
/// with `v` the `vectors` point array of `lines`, and falls back to `radius`
/// when the magnitude range is flat. Tube points copy the point data of the
/// line point they are swept around. Lines with fewer than two distinct
/// points are dropped.
pub fn tube(
    lines: &PolyData,
    vectors: &str,
    params: &TubeParams,
    config: &TubeConfig,
) -> EngineResult<PolyData> {
    let field = lines.point_array(vectors)?;
    let radius_at = radius_fn(field, params.radius, config.radius_factor);
    let sides = params.sides;

    let mut out = PolyData::new();
    out.point_data = lines.point_data.empty_like(0);

    for line in &lines.lines {
        let ids = distinct_points(lines, line);
        if ids.len() < 2 {
            continue;
        }
        let pts: Vec<Point> = ids.iter().map(|&i| lines.points[i as usize]).collect();
        let frames = transport_frames(&pts);

        let base = out.points.len() as u32;
        for (i, &id) in ids.iter().enumerate() {
            let (normal, binormal) = frames[i];
            let r = radius_at(id as usize);
            for k in 0..sides {
                let theta = 2.0 * PI * k as f64 / sides as f64;
                out.points
                    .push(pts[i] + (normal * theta.cos() + binormal * theta.sin()) * r);
                out.point_data.push_copy(&lines.point_data, id as usize);
            }
        }

        let s = sides as u32;
        for i in 0..ids.len() as u32 - 1 {
            let ring = base + i * s;
            let next = ring + s;
            for k in 0..s {
                let k1 = (k + 1) % s;
                out.polys.push(vec![ring + k, ring + k1, next + k1, next + k]);
            }
        }
    }

    info!(
        "Tubes: {} polygons around {} lines",
        out.polys.len(),
        lines.lines.len()
    );
    Ok(out)
}

fn radius_fn(field: &FieldArray, radius: f64, factor: f64) -> impl Fn(usize) -> f64 + '_ {
    let range = field.range(None).filter(|[lo, hi]| hi > lo);
    move |i| match range {
        Some([lo, hi]) => {
            let t = ((field.magnitude_at(i) - lo) / (hi - lo)).clamp(0.0, 1.0);
            radius * (1.0 + (factor - 1.0) * t)
        }
        None => radius,
    }
}

/// Line point ids with consecutive duplicates removed.
fn distinct_points(poly: &PolyData, line: &[u32]) -> Vec<u32> {
    let mut ids: Vec<u32> = Vec::with_capacity(line.len());
    for &id in line {
        if let Some(&last) = ids.last() {
            if (poly.points[last as usize] - poly.points[id as usize]).norm_squared() == 0.0 {
                continue;
            }
        }
        ids.push(id);
    }
    ids
}

/// `(normal, binormal)` per point, parallel-transported from the first point.
fn transport_frames(pts: &[Point]) -> Vec<(Vec3, Vec3)> {
    let n = pts.len();
    let tangents: Vec<Vec3> = (0..n)
        .map(|i| {
            let (a, b) = (pts[i.saturating_sub(1)], pts[(i + 1).min(n - 1)]);
            let central = b - a;
            let forward = b - pts[i];
            if central.norm_squared() > 1e-12 * forward.norm_squared() {
                central.normalize()
            } else if forward.norm_squared() > 0.0 {
                // Line doubles back on itself
                forward.normalize()
            } else {
                (pts[i] - a).normalize()
            }
        })
        .collect();

    let mut frames = Vec::with_capacity(n);
    let mut normal = perpendicular(&tangents[0]);
    for t in &tangents {
        let projected = normal - t * normal.dot(t);
        normal = if projected.norm_squared() > 1e-12 {
            projected.normalize()
        } else {
            perpendicular(t)
        };
        frames.push((normal, t.cross(&normal)));
    }
    frames
}

/// A unit vector perpendicular to the unit vector `t`.
fn perpendicular(t: &Vec3) -> Vec3 {
    let axis = if t.x.abs() <= t.y.abs() && t.x.abs() <= t.z.abs() {
        Vec3::x()
    } else if t.y.abs() <= t.z.abs() {
        Vec3::y()
    } else {
        Vec3::z()
    };
    t.cross(&axis).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_line(speeds: &[f64]) -> PolyData {
        let n = speeds.len();
        let mut poly = PolyData::new();
        poly.points = (0..n).map(|i| Point::new(i as f64, 0.0, 0.0)).collect();
        poly.lines = vec![(0..n as u32).collect()];
        let vectors: Vec<Vec3> = speeds.iter().map(|&s| Vec3::new(s, 0.0, 0.0)).collect();
        poly.point_data.insert(FieldArray::vector("U", &vectors));
        poly
    }

    #[test]
    fn test_constant_speed_gives_constant_radius() {
        let lines = straight_line(&[2.0, 2.0, 2.0]);
        let params = TubeParams::new(0.1, 8).unwrap();
        let tubes = tube(&lines, "U", &params, &TubeConfig::default()).unwrap();
        assert_eq!(tubes.points.len(), 3 * 8);
        assert_eq!(tubes.polys.len(), 2 * 8);
        for p in &tubes.points {
            assert!(((p.y * p.y + p.z * p.z).sqrt() - 0.1).abs() < 1e-12);
        }
        assert!(tubes.validate().is_ok());
    }

    #[test]
    fn test_radius_varies_with_speed() {
        let lines = straight_line(&[1.0, 2.0, 3.0]);
        let params = TubeParams::new(0.1, 6).unwrap();
        let tubes = tube(&lines, "U", &params, &TubeConfig::default()).unwrap();
        let ring_radius = |ring: usize| {
            let p = tubes.points[ring * 6];
            (p.y * p.y + p.z * p.z).sqrt()
        };
        assert!((ring_radius(0) - 0.1).abs() < 1e-12);
        assert!((ring_radius(1) - 0.55).abs() < 1e-12);
        assert!((ring_radius(2) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_tube_faces_point_outward() {
        let lines = straight_line(&[1.0, 1.0]);
        let tubes = tube(&lines, "U", &TubeParams::new(0.5, 5).unwrap(), &TubeConfig::default()).unwrap();
        for poly in &tubes.polys {
            let [a, b, c] = [0, 1, 2].map(|i| tubes.points[poly[i] as usize]);
            let n = (b - a).cross(&(c - a));
            let radial = Vec3::new(0.0, a.y, a.z);
            assert!(n.dot(&radial) > 0.0);
        }
    }

    #[test]
    fn test_point_data_copied_and_short_lines_dropped() {
        let mut lines = straight_line(&[1.0, 1.0]);
        lines.points.push(Point::new(5.0, 5.0, 5.0));
        lines.lines.push(vec![2]);
        let u = lines.point_data.get_mut("U").unwrap();
        u.values.extend([1.0, 0.0, 0.0]);
        let tubes = tube(&lines, "U", &TubeParams::new(0.2, 4).unwrap(), &TubeConfig::default()).unwrap();
        assert_eq!(tubes.points.len(), 8);
        assert_eq!(tubes.point_array("U").unwrap().len(), 8);
    }

    #[test]
    fn test_line_doubling_back_stays_finite() {
        let mut lines = straight_line(&[1.0, 1.0, 1.0]);
        lines.points[2] = lines.points[0];
        let tubes = tube(&lines, "U", &TubeParams::new(0.2, 4).unwrap(), &TubeConfig::default()).unwrap();
        assert_eq!(tubes.points.len(), 3 * 4);
        assert!(tubes.points.iter().all(|p| p.coords.iter().all(|c| c.is_finite())));
        for p in &tubes.points[4..8] {
            assert!(((p.y * p.y + p.z * p.z).sqrt() - 0.2).abs() < 1e-12);
        }
    }

    #[test]
    fn test_invalid_params() {
        assert!(TubeParams::new(0.0, 8).is_err());
        assert!(TubeParams::new(0.1, 2).is_err());
    }
}
