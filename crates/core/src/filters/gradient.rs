//! Gradient and vorticity of point fields
//!
//! Fast approximation: each tetrahedron of a cell carries the exact gradient
//! of the linear interpolant over it. The cell gradient is the volume-weighted
//! mean over its tetrahedra, and the point gradient is the plain mean over the
//! cells that use the point.

use nalgebra::Matrix3;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::core_types::Vec3;
use crate::error::{EngineError, EngineResult};
use crate::grid::cell::tet_signed_volume;
use crate::grid::{FieldArray, UnstructuredGrid};

/// Name of the gradient tensor array.
pub const GRADIENTS_NAME: &str = "gradients";
/// Name of the vorticity array.
pub const VORTICITY_NAME: &str = "vorticity";

/// Which derived arrays to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradientOptions {
    /// Produce the full gradient array
    pub gradients: bool,
    /// Produce the curl (3-component fields only)
    pub vorticity: bool,
}

/// Per-cell gradient of `field`, `3 * nc` values per cell laid out as
/// `d(c0)/dx, d(c0)/dy, d(c0)/dz, d(c1)/dx, ...`.
fn cell_gradients(grid: &UnstructuredGrid, field: &FieldArray) -> (Vec<f64>, usize) {
    let nc = field.components;
    let per_cell: Vec<Option<Vec<f64>>> = (0..grid.cell_count())
        .into_par_iter()
        .map(|cell_id| {
            let mut acc = vec![0.0; 3 * nc];
            let mut total = 0.0;
            for tet in grid.cells[cell_id].tets() {
                let [x0, x1, x2, x3] = grid.tet_points(tet);
                let volume = tet_signed_volume(&x0, &x1, &x2, &x3).abs();
                let Some(inv) = Matrix3::from_rows(&[
                    (x1 - x0).transpose(),
                    (x2 - x0).transpose(),
                    (x3 - x0).transpose(),
                ])
                .try_inverse() else {
                    continue;
                };
                if volume <= 0.0 {
                    continue;
                }
                let [u0, u1, u2, u3] = tet.map(|p| field.tuple(p as usize));
                for c in 0..nc {
                    let du = Vec3::new(u1[c] - u0[c], u2[c] - u0[c], u3[c] - u0[c]);
                    let g = inv * du;
                    for j in 0..3 {
                        acc[3 * c + j] += volume * g[j];
                    }
                }
                total += volume;
            }
            (total > 0.0).then(|| acc.into_iter().map(|v| v / total).collect())
        })
        .collect();

    let mut degenerate = 0;
    let mut flat = Vec::with_capacity(grid.cell_count() * 3 * nc);
    for g in per_cell {
        match g {
            Some(g) => flat.extend(g),
            None => {
                degenerate += 1;
                flat.resize(flat.len() + 3 * nc, 0.0);
            }
        }
    }
    (flat, degenerate)
}

/// Compute the requested derived arrays of the point field `field_name`.
///
/// Returns the new point arrays without touching the grid, so the caller can
/// commit them all at once.
pub fn compute_gradients(
    grid: &UnstructuredGrid,
    field_name: &str,
    options: GradientOptions,
) -> EngineResult<Vec<FieldArray>> {
    let field = grid.point_array(field_name)?;
    let nc = field.components;
    if options.vorticity && nc != 3 {
        return Err(EngineError::invalid_argument(
            "field",
            format!("vorticity needs a 3-component vector, '{field_name}' has {nc}"),
        ));
    }
    if !options.gradients && !options.vorticity {
        return Ok(Vec::new());
    }

    let (cell_grad, degenerate) = cell_gradients(grid, field);
    if degenerate > 0 {
        warn!("{} degenerate cells contribute zero gradient", degenerate);
    }

    let width = 3 * nc;
    let links = grid.point_cells();
    let point_grad: Vec<f64> = links
        .par_iter()
        .flat_map_iter(|cells| {
            let mut g = vec![0.0; width];
            for &c in cells {
                let cg = &cell_grad[c as usize * width..(c as usize + 1) * width];
                for (gi, ci) in g.iter_mut().zip(cg) {
                    *gi += ci;
                }
            }
            if !cells.is_empty() {
                let n = cells.len() as f64;
                g.iter_mut().for_each(|v| *v /= n);
            }
            g
        })
        .collect();

    let mut out = Vec::with_capacity(2);
    if options.vorticity {
        let curl: Vec<f64> = point_grad
            .chunks_exact(9)
            .flat_map(|g| [g[7] - g[5], g[2] - g[6], g[3] - g[1]])
            .collect();
        out.push(FieldArray::new(VORTICITY_NAME, 3, curl));
    }
    if options.gradients {
        out.push(FieldArray::new(GRADIENTS_NAME, width, point_grad));
    }

    info!(
        "Gradients of '{}' over {} cells ({} arrays)",
        field_name,
        grid.cell_count(),
        out.len()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::generator::{box_grid, box_tet_grid, sample_points};

    const BOTH: GradientOptions = GradientOptions {
        gradients: true,
        vorticity: true,
    };

    #[test]
    fn test_linear_field_exact_gradient() {
        let mut grid = box_tet_grid(2, 2, 2, [2.0, 2.0, 2.0]);
        // u = (x + 2y, 3z, -y), gradient rows (1 2 0), (0 0 3), (0 -1 0)
        grid.point_data
            .insert(sample_points(&grid, "U", 3, |p| vec![p.x + 2.0 * p.y, 3.0 * p.z, -p.y]));
        let arrays = compute_gradients(&grid, "U", BOTH).unwrap();
        let vort = arrays.iter().find(|a| a.name == VORTICITY_NAME).unwrap();
        let grad = arrays.iter().find(|a| a.name == GRADIENTS_NAME).unwrap();
        let expected = [1.0, 2.0, 0.0, 0.0, 0.0, 3.0, 0.0, -1.0, 0.0];
        for i in 0..grid.point_count() {
            for (g, e) in grad.tuple(i).iter().zip(expected) {
                assert!((g - e).abs() < 1e-10);
            }
            // curl = (dw/dy - dv/dz, du/dz - dw/dx, dv/dx - du/dy) = (-4, 0, -2)
            let w = vort.vector_at(i);
            assert!((w - Vec3::new(-4.0, 0.0, -2.0)).norm() < 1e-10);
        }
    }

    #[test]
    fn test_rigid_rotation_vorticity() {
        let mut grid = box_grid(3, 3, 3, [1.0, 1.0, 1.0]);
        grid.point_data
            .insert(sample_points(&grid, "U", 3, |p| vec![-p.y, p.x, 0.0]));
        let arrays = compute_gradients(
            &grid,
            "U",
            GradientOptions {
                gradients: false,
                vorticity: true,
            },
        )
        .unwrap();
        assert_eq!(arrays.len(), 1);
        let w = arrays[0].vector_at(10);
        assert!((w - Vec3::new(0.0, 0.0, 2.0)).norm() < 1e-10);
    }

    #[test]
    fn test_scalar_gradient_and_vorticity_rejection() {
        let mut grid = box_grid(2, 2, 2, [1.0, 1.0, 1.0]);
        grid.point_data.insert(sample_points(&grid, "p", 1, |p| vec![5.0 * p.z]));
        let arrays = compute_gradients(
            &grid,
            "p",
            GradientOptions {
                gradients: true,
                vorticity: false,
            },
        )
        .unwrap();
        assert_eq!(arrays[0].components, 3);
        assert!((arrays[0].tuple(0)[2] - 5.0).abs() < 1e-10);
        assert!(compute_gradients(&grid, "p", BOTH).is_err());
    }

    #[test]
    fn test_missing_field() {
        let grid = box_grid(1, 1, 1, [1.0, 1.0, 1.0]);
        assert!(matches!(
            compute_gradients(&grid, "U", BOTH),
            Err(EngineError::MissingField { .. })
        ));
    }
}
