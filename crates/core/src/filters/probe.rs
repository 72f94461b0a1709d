//! Point probing
//!
//! Interpolates one field at an arbitrary location. Points outside the grid
//! are not an error; they probe as NaN.

use crate::core_types::Point;
use crate::error::{EngineError, EngineResult};
use crate::grid::{Association, CellLocator, UnstructuredGrid};

/// Probe `field` at `point`.
///
/// Returns `[v0, v1, v2, |v|]`. Fields with fewer than three components pad
/// with zeros; the magnitude always covers every component. Point data is
/// interpolated with the enclosing tetrahedron's barycentric weights, cell
/// data takes the enclosing cell's value. Outside the grid all four values
/// are NaN.
pub fn probe(
    grid: &UnstructuredGrid,
    locator: &CellLocator,
    field: &str,
    point: &Point,
) -> EngineResult<[f64; 4]> {
    let (array, association) = if let Some(a) = grid.point_data.get(field) {
        (a, Association::Points)
    } else if let Some(a) = grid.cell_data.get(field) {
        (a, Association::Cells)
    } else {
        return Err(EngineError::missing_field(field, Association::Points));
    };

    let Some(hit) = locator.locate(grid, point) else {
        return Ok([f64::NAN; 4]);
    };

    let tuple = match association {
        Association::Points => hit.interpolate(array),
        Association::Cells => array.tuple(hit.cell).to_vec(),
    };
    let mut out = [0.0; 4];
    for (o, v) in out.iter_mut().zip(&tuple) {
        *o = *v;
    }
    out[3] = tuple.iter().map(|v| v * v).sum::<f64>().sqrt();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::generator::{box_tet_grid, sample_cells, sample_points};
    use crate::grid::LocatorConfig;

    fn setup() -> (UnstructuredGrid, CellLocator) {
        let mut grid = box_tet_grid(3, 3, 3, [3.0, 3.0, 3.0]);
        grid.point_data.insert(sample_points(&grid, "U", 3, |p| vec![p.x, 2.0 * p.y, -p.z]));
        grid.point_data.insert(sample_points(&grid, "p", 1, |p| vec![p.x - p.y]));
        grid.cell_data.insert(sample_cells(&grid, "region", 1, |_| vec![4.0]));
        let locator = CellLocator::build(&grid, &LocatorConfig::default());
        (grid, locator)
    }

    #[test]
    fn test_probe_linear_vector() {
        let (grid, locator) = setup();
        let v = probe(&grid, &locator, "U", &Point::new(1.2, 0.7, 2.9)).unwrap();
        assert!((v[0] - 1.2).abs() < 1e-10);
        assert!((v[1] - 1.4).abs() < 1e-10);
        assert!((v[2] + 2.9).abs() < 1e-10);
        let mag = (1.2f64 * 1.2 + 1.4 * 1.4 + 2.9 * 2.9).sqrt();
        assert!((v[3] - mag).abs() < 1e-10);
    }

    #[test]
    fn test_probe_scalar_pads() {
        let (grid, locator) = setup();
        let v = probe(&grid, &locator, "p", &Point::new(0.5, 2.0, 1.0)).unwrap();
        assert!((v[0] + 1.5).abs() < 1e-10);
        assert_eq!(v[1], 0.0);
        assert_eq!(v[2], 0.0);
        assert!((v[3] - 1.5).abs() < 1e-10);
    }

    #[test]
    fn test_probe_cell_data() {
        let (grid, locator) = setup();
        let v = probe(&grid, &locator, "region", &Point::new(2.5, 2.5, 2.5)).unwrap();
        assert_eq!(v, [4.0, 0.0, 0.0, 4.0]);
    }

    #[test]
    fn test_probe_outside_is_nan() {
        let (grid, locator) = setup();
        let v = probe(&grid, &locator, "U", &Point::new(10.0, 0.0, 0.0)).unwrap();
        assert!(v.iter().all(|x| x.is_nan()));
    }

    #[test]
    fn test_probe_missing_field() {
        let (grid, locator) = setup();
        assert!(matches!(
            probe(&grid, &locator, "T", &Point::new(10.0, 0.0, 0.0)),
            Err(EngineError::MissingField { .. })
        ));
    }
}
