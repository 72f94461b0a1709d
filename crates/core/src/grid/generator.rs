//! Structured box grids for synthetic cases and tests
//!
//! CFD meshes come in from the solver; these helpers build small regular
//! grids so filters can be exercised without a solver run.

use crate::core_types::Point;
use crate::grid::cell::{Cell, CellKind};
use crate::grid::field::FieldArray;
use crate::grid::unstructured_grid::UnstructuredGrid;

/// Build an `nx × ny × nz` hexahedral grid spanning `[0, size]` on each axis.
pub fn box_grid(nx: usize, ny: usize, nz: usize, size: [f64; 3]) -> UnstructuredGrid {
    let points = lattice_points(nx, ny, nz, size);
    let mut cells = Vec::with_capacity(nx * ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                cells.push(Cell::new(CellKind::Hexahedron, hex_ids(nx, ny, i, j, k).to_vec()));
            }
        }
    }
    UnstructuredGrid::new(points, cells)
}

/// Same lattice as [`box_grid`], but every hexahedron is split into six
/// tetrahedra.
pub fn box_tet_grid(nx: usize, ny: usize, nz: usize, size: [f64; 3]) -> UnstructuredGrid {
    let points = lattice_points(nx, ny, nz, size);
    let mut cells = Vec::with_capacity(nx * ny * nz * 6);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let hex = hex_ids(nx, ny, i, j, k);
                for tet in CellKind::Hexahedron.tetrahedra() {
                    cells.push(Cell::new(CellKind::Tetra, tet.map(|l| hex[l]).to_vec()));
                }
            }
        }
    }
    UnstructuredGrid::new(points, cells)
}

/// Sample `f` at every grid point into a point array.
pub fn sample_points<F>(grid: &UnstructuredGrid, name: &str, components: usize, f: F) -> FieldArray
where
    F: Fn(&Point) -> Vec<f64>,
{
    let mut values = Vec::with_capacity(grid.point_count() * components);
    for p in &grid.points {
        let tuple = f(p);
        debug_assert_eq!(tuple.len(), components);
        values.extend(tuple);
    }
    FieldArray::new(name, components, values)
}

/// Sample `f` at every cell centre into a cell array.
pub fn sample_cells<F>(grid: &UnstructuredGrid, name: &str, components: usize, f: F) -> FieldArray
where
    F: Fn(&Point) -> Vec<f64>,
{
    let mut values = Vec::with_capacity(grid.cell_count() * components);
    for c in 0..grid.cell_count() {
        values.extend(f(&grid.cell_center(c)));
    }
    FieldArray::new(name, components, values)
}

fn lattice_points(nx: usize, ny: usize, nz: usize, size: [f64; 3]) -> Vec<Point> {
    let (dx, dy, dz) = (
        size[0] / nx as f64,
        size[1] / ny as f64,
        size[2] / nz as f64,
    );
    let mut points = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                points.push(Point::new(i as f64 * dx, j as f64 * dy, k as f64 * dz));
            }
        }
    }
    points
}

fn hex_ids(nx: usize, ny: usize, i: usize, j: usize, k: usize) -> [u32; 8] {
    let id = |i: usize, j: usize, k: usize| (k * (ny + 1) * (nx + 1) + j * (nx + 1) + i) as u32;
    [
        id(i, j, k),
        id(i + 1, j, k),
        id(i + 1, j + 1, k),
        id(i, j + 1, k),
        id(i, j, k + 1),
        id(i + 1, j, k + 1),
        id(i + 1, j + 1, k + 1),
        id(i, j + 1, k + 1),
    ]
}
