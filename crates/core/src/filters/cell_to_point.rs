//! Cell data to point data conversion

use rayon::prelude::*;
use tracing::debug;

use crate::grid::{FieldArray, UnstructuredGrid};

/// Average every cell array onto the points.
///
/// A point's value is the mean over the cells that use it; points used by no
/// cell get zeros. The returned arrays keep the cell arrays' names and
/// component counts. The grid is left untouched.
pub fn cell_to_point(grid: &UnstructuredGrid) -> Vec<FieldArray> {
    let links = grid.point_cells();
    let arrays: Vec<FieldArray> = grid
        .cell_data
        .iter()
        .map(|cell_array| {
            let nc = cell_array.components;
            let values: Vec<f64> = links
                .par_iter()
                .flat_map_iter(|cells| {
                    let mut tuple = vec![0.0; nc];
                    if !cells.is_empty() {
                        let w = 1.0 / cells.len() as f64;
                        for &c in cells {
                            cell_array.accumulate(c as usize, w, &mut tuple);
                        }
                    }
                    tuple
                })
                .collect();
            FieldArray::new(cell_array.name.clone(), nc, values)
        })
        .collect();
    debug!(
        "Converted {} cell arrays to point data over {} points",
        arrays.len(),
        grid.point_count()
    );
    arrays
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::generator::box_grid;

    #[test]
    fn test_average_of_neighbours() {
        let mut grid = box_grid(2, 1, 1, [2.0, 1.0, 1.0]);
        grid.cell_data.insert(FieldArray::scalar("p", vec![1.0, 3.0]));
        grid.cell_data
            .insert(FieldArray::new("U", 3, vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0]));
        let arrays = cell_to_point(&grid);
        assert_eq!(arrays.len(), 2);

        let p = &arrays[0];
        assert_eq!(p.name, "p");
        assert_eq!(p.len(), grid.point_count());
        // Point 0 (x = 0) only touches cell 0, point 1 (x = 1) touches both
        assert_eq!(p.scalar_at(0), 1.0);
        assert_eq!(p.scalar_at(1), 2.0);
        assert_eq!(p.scalar_at(2), 3.0);

        let u = &arrays[1];
        assert_eq!(u.tuple(1), &[0.5, 0.5, 0.0]);
    }
}
