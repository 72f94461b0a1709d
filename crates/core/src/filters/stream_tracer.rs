//! Streamline integration through a point vector field
//!
//! Streamlines are integrated forward from every seed over arclength, along
//! the unit direction field `v / |v|`, with the Dormand-Prince 5(4) embedded
//! Runge-Kutta pair. Step sizes are measured in cell lengths so the same
//! settings work for meshes of any scale.
//!
//! # Termination
//!
//! A line stops when any of these holds:
//! - its arclength reaches the requested maximum
//! - the next point would leave the grid (at the minimum step)
//! - the speed drops below the terminal speed
//! - the step limit is reached

use std::f64::consts::PI;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::TracerConfig;
use crate::core_types::{Point, Vec3};
use crate::error::{EngineError, EngineResult};
use crate::grid::{CellHit, CellLocator, FieldArray, PolyData, UnstructuredGrid};

/// Seed points on a sphere, laid out like a UV sphere with equal theta and
/// phi resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeedSphere {
    /// Sphere centre
    pub center: Point,
    /// Sphere radius
    pub radius: f64,
    /// Theta and phi resolution
    pub resolution: usize,
}

impl SeedSphere {
    /// Create a seed sphere; radius must be positive and resolution at least 3.
    pub fn new(center: Point, radius: f64, resolution: usize) -> EngineResult<Self> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(EngineError::invalid_argument(
                "radius",
                format!("seed sphere radius must be positive, got {radius}"),
            ));
        }
        if resolution < 3 {
            return Err(EngineError::invalid_argument(
                "resolution",
                format!("seed sphere resolution must be at least 3, got {resolution}"),
            ));
        }
        Ok(Self {
            center,
            radius,
            resolution,
        })
    }

    /// Seed points: north pole, south pole, then `resolution` meridians of
    /// `resolution - 2` points each.
    pub fn points(&self) -> Vec<Point> {
        let res = self.resolution;
        let mut points = Vec::with_capacity(2 + (res - 2) * res);
        points.push(self.center + Vec3::new(0.0, 0.0, self.radius));
        points.push(self.center - Vec3::new(0.0, 0.0, self.radius));

        let dphi = PI / (res - 1) as f64;
        let dtheta = 2.0 * PI / res as f64;
        for i in 0..res {
            let theta = i as f64 * dtheta;
            for j in 1..res - 1 {
                let phi = j as f64 * dphi;
                let r = self.radius * phi.sin();
                points.push(
                    self.center
                        + Vec3::new(r * theta.cos(), r * theta.sin(), self.radius * phi.cos()),
                );
            }
        }
        points
    }
}

// Dormand-Prince 5(4) tableau. The field is autonomous, so the nodes are
// not needed.
const A: [[f64; 6]; 7] = [
    [0.0; 6],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [19372.0 / 6561.0, -25360.0 / 2187.0, 64448.0 / 6561.0, -212.0 / 729.0, 0.0, 0.0],
    [9017.0 / 3168.0, -355.0 / 33.0, 46732.0 / 5247.0, 49.0 / 176.0, -5103.0 / 18656.0, 0.0],
    [35.0 / 384.0, 0.0, 500.0 / 1113.0, 125.0 / 192.0, -2187.0 / 6784.0, 11.0 / 84.0],
];
const B5: [f64; 7] = [35.0 / 384.0, 0.0, 500.0 / 1113.0, 125.0 / 192.0, -2187.0 / 6784.0, 11.0 / 84.0, 0.0];
const B4: [f64; 7] = [
    5179.0 / 57600.0,
    0.0,
    7571.0 / 16695.0,
    393.0 / 640.0,
    -92097.0 / 339200.0,
    187.0 / 2100.0,
    1.0 / 40.0,
];

/// Outcome of one attempted integration step.
enum Step {
    /// Fifth-order endpoint and the embedded error estimate
    Taken { end: Point, error: f64 },
    /// A stage evaluation fell outside the grid
    LeftDomain,
}

/// Integrates streamlines through one vector field.
pub struct StreamTracer<'a> {
    grid: &'a UnstructuredGrid,
    locator: &'a CellLocator,
    field: &'a FieldArray,
    config: &'a TracerConfig,
}

impl<'a> StreamTracer<'a> {
    /// Create a tracer over the point vector array `field_name`.
    pub fn new(
        grid: &'a UnstructuredGrid,
        locator: &'a CellLocator,
        field_name: &str,
        config: &'a TracerConfig,
    ) -> EngineResult<Self> {
        let field = grid.point_array(field_name)?;
        if field.components != 3 {
            return Err(EngineError::invalid_argument(
                "field",
                format!(
                    "'{field_name}' has {} components, streamlines need a 3-component vector",
                    field.components
                ),
            ));
        }
        Ok(Self {
            grid,
            locator,
            field,
            config,
        })
    }

    /// Unit direction at `p`, or `None` outside the grid.
    fn direction(&self, p: &Point, hint: &mut Option<usize>) -> Option<Vec3> {
        let hit = self.locator.locate_with_hint(self.grid, p, *hint)?;
        *hint = Some(hit.cell);
        let v = hit.interpolate_vector(self.field);
        let speed = v.norm();
        Some(if speed > self.config.terminal_speed {
            v / speed
        } else {
            Vec3::zeros()
        })
    }

    fn dormand_prince(&self, start: &Point, h: f64, hint: &mut Option<usize>) -> Step {
        let mut k = [Vec3::zeros(); 7];
        for stage in 0..7 {
            let offset = (0..stage).fold(Vec3::zeros(), |acc, j| acc + k[j] * A[stage][j]);
            let p = start + offset * h;
            match self.direction(&p, hint) {
                Some(d) => k[stage] = d,
                None => return Step::LeftDomain,
            }
        }
        let y5 = (0..7).fold(Vec3::zeros(), |acc, j| acc + k[j] * B5[j]);
        let y4 = (0..7).fold(Vec3::zeros(), |acc, j| acc + k[j] * B4[j]);
        Step::Taken {
            end: start + y5 * h,
            error: ((y5 - y4) * h).norm(),
        }
    }

    /// Trace one streamline. Returns the accepted points with their cell hits;
    /// empty when the seed is outside the grid.
    pub fn trace_from(&self, seed: &Point, max_length: f64) -> Vec<(Point, CellHit)> {
        let cfg = self.config;
        let Some(seed_hit) = self.locator.locate(self.grid, seed) else {
            return Vec::new();
        };
        let mut line = vec![(*seed, seed_hit)];
        let mut hint = Some(seed_hit.cell);
        let mut h = cfg.initial_step;
        let mut length = 0.0;

        for _ in 0..cfg.max_steps {
            if length >= max_length {
                break;
            }
            let (p, hit) = line[line.len() - 1];
            if hit.interpolate_vector(self.field).norm() <= cfg.terminal_speed {
                break;
            }
            let unit = self.grid.cell_length(hit.cell);
            if unit <= 0.0 || max_length - length <= 1e-12 * unit {
                break;
            }

            let accepted = loop {
                let remaining = max_length - length;
                let step = (h * unit).min(remaining);
                match self.dormand_prince(&p, step, &mut hint) {
                    Step::LeftDomain if h > cfg.min_step => {
                        h = (h * 0.5).max(cfg.min_step);
                    }
                    Step::LeftDomain => break None,
                    Step::Taken { end, error } => {
                        let ratio = error / step / cfg.max_error;
                        let h_used = step / unit;
                        if ratio > 1.0 && h_used > cfg.min_step {
                            h = (h_used * (0.9 * ratio.powf(-0.2)).max(0.2)).max(cfg.min_step);
                            continue;
                        }
                        let grow = if ratio > 0.0 {
                            (0.9 * ratio.powf(-0.2)).min(5.0)
                        } else {
                            5.0
                        };
                        h = (h_used * grow).clamp(cfg.min_step, cfg.max_step);
                        break Some(end);
                    }
                }
            };

            let Some(end) = accepted else {
                break;
            };
            let Some(end_hit) = self.locator.locate_with_hint(self.grid, &end, hint) else {
                break;
            };
            let advance = (end - p).norm();
            if advance == 0.0 {
                break;
            }
            hint = Some(end_hit.cell);
            length += advance;
            line.push((end, end_hit));
        }
        line
    }

    /// Trace from every seed in parallel and assemble the polylines.
    ///
    /// Every grid point array is interpolated onto the line points. Seeds
    /// outside the grid or lines shorter than two points produce no line.
    pub fn trace(&self, seeds: &[Point], max_length: f64) -> EngineResult<PolyData> {
        if !(max_length.is_finite() && max_length > 0.0) {
            return Err(EngineError::invalid_argument(
                "max_length",
                format!("must be positive, got {max_length}"),
            ));
        }

        let traced: Vec<Vec<(Point, CellHit)>> = seeds
            .par_iter()
            .map(|seed| self.trace_from(seed, max_length))
            .collect();

        let outside = traced.iter().filter(|l| l.is_empty()).count();
        if outside > 0 {
            warn!("{} of {} streamline seeds lie outside the grid", outside, seeds.len());
        }

        let total: usize = traced.iter().filter(|l| l.len() >= 2).map(Vec::len).sum();
        let mut out = PolyData::new();
        out.points.reserve(total);
        out.point_data = self.grid.point_data.empty_like(total);
        out.point_data.active_vectors = Some(self.field.name.clone());

        for line in traced.iter().filter(|l| l.len() >= 2) {
            let start = out.points.len() as u32;
            for (p, hit) in line {
                out.points.push(*p);
                out.point_data
                    .push_interpolated(&self.grid.point_data, &hit.point_weights());
            }
            out.lines.push((start..start + line.len() as u32).collect());
        }

        debug!("Traced {} seeds", seeds.len());
        info!(
            "Streamlines: {} lines, {} points through '{}'",
            out.lines.len(),
            out.points.len(),
            self.field.name
        );
        Ok(out)
    }
}
