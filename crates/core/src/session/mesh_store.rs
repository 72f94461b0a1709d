//! The active grid, its locator, and the host-facing scratch buffers
//!
//! The store owns exactly one grid. Topology only changes through `load`,
//! which rebuilds the locator at the same time; field arrays are committed
//! through methods that leave topology alone, so the locator never goes
//! stale.

use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::filters::cell_to_point;
use crate::grid::{CellLocator, FieldArray, LocatorConfig, UnstructuredGrid};
use crate::io::MeshCodec;

/// Active mesh plus derived lookup structures.
#[derive(Debug, Clone)]
pub struct MeshStore {
    grid: UnstructuredGrid,
    locator: CellLocator,
    /// Channel-stacked cell vectors: component `c` of cell `i` at `i + c * N`
    field_vector: Vec<f64>,
    /// One scalar per cell
    field_scalar: Vec<f64>,
}

impl MeshStore {
    /// Empty store.
    pub fn new(config: &LocatorConfig) -> Self {
        let grid = UnstructuredGrid::default();
        let locator = CellLocator::build(&grid, config);
        Self {
            grid,
            locator,
            field_vector: Vec::new(),
            field_scalar: Vec::new(),
        }
    }

    /// Decode `bytes` and replace the active grid.
    ///
    /// On failure the store is unchanged. Returns the new cell count.
    pub fn load(
        &mut self,
        codec: &dyn MeshCodec,
        bytes: &[u8],
        config: &LocatorConfig,
    ) -> EngineResult<usize> {
        let grid = codec.decode_grid(bytes)?;
        Ok(self.replace(grid, config))
    }

    /// Install an already validated grid.
    pub fn replace(&mut self, grid: UnstructuredGrid, config: &LocatorConfig) -> usize {
        let n = grid.cell_count();
        self.locator = CellLocator::build(&grid, config);
        self.grid = grid;
        self.field_vector = vec![0.0; 3 * n];
        self.field_scalar = vec![0.0; n];
        info!(
            "Loaded grid: {} points, {} cells, {} point arrays, {} cell arrays",
            self.grid.point_count(),
            n,
            self.grid.point_data.len(),
            self.grid.cell_data.len()
        );
        n
    }

    /// The active grid.
    pub fn grid(&self) -> &UnstructuredGrid {
        &self.grid
    }

    /// Point locator over the active grid.
    pub fn locator(&self) -> &CellLocator {
        &self.locator
    }

    pub fn cell_count(&self) -> usize {
        self.grid.cell_count()
    }

    pub fn point_count(&self) -> usize {
        self.grid.point_count()
    }

    /// Vector scratch buffer (`3N`).
    pub fn field_vector(&self) -> &[f64] {
        &self.field_vector
    }

    /// Writable vector scratch buffer (`3N`, channel-stacked).
    pub fn field_vector_mut(&mut self) -> &mut [f64] {
        &mut self.field_vector
    }

    /// Scalar scratch buffer (`N`).
    pub fn field_scalar(&self) -> &[f64] {
        &self.field_scalar
    }

    /// Writable scalar scratch buffer (`N`).
    pub fn field_scalar_mut(&mut self) -> &mut [f64] {
        &mut self.field_scalar
    }

    /// Add or replace point arrays.
    pub fn commit_point_arrays(&mut self, arrays: impl IntoIterator<Item = FieldArray>) {
        for array in arrays {
            self.grid.point_data.insert(array);
        }
    }

    /// Add or replace cell arrays.
    pub fn commit_cell_arrays(&mut self, arrays: impl IntoIterator<Item = FieldArray>) {
        for array in arrays {
            self.grid.cell_data.insert(array);
        }
    }

    /// Make `name` the active cell scalars.
    pub fn set_active_cell_scalars(&mut self, name: &str) {
        self.grid.cell_data.active_scalars = Some(name.to_owned());
    }

    /// Build the cell array `name` from the scratch buffers.
    ///
    /// One component reads the scalar buffer; two or three read the leading
    /// channels of the vector buffer. Afterwards every cell array is averaged
    /// onto the points under the same name, keeping the cell arrays.
    pub fn update_field(&mut self, name: &str, components: usize) -> EngineResult<()> {
        if name.is_empty() {
            return Err(EngineError::invalid_argument("name", "field name is empty"));
        }
        let n = self.grid.cell_count();
        let values: Vec<f64> = match components {
            1 => self.field_scalar.clone(),
            2 | 3 => {
                let vector = &self.field_vector;
                (0..n)
                    .flat_map(|i| (0..components).map(move |c| vector[i + c * n]))
                    .collect()
            }
            other => {
                return Err(EngineError::invalid_argument(
                    "components",
                    format!("expected 1, 2 or 3 components, got {other}"),
                ))
            }
        };

        self.grid
            .cell_data
            .insert(FieldArray::new(name, components, values));
        let point_arrays = cell_to_point(&self.grid);
        self.commit_point_arrays(point_arrays);
        info!("Updated field '{}' ({} components) on {} cells", name, components, n);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::generator::box_grid;
    use crate::io::JsonCodec;

    fn store() -> MeshStore {
        let config = LocatorConfig::default();
        let mut store = MeshStore::new(&config);
        store.replace(box_grid(2, 1, 1, [2.0, 1.0, 1.0]), &config);
        store
    }

    #[test]
    fn test_scratch_sizes() {
        let store = store();
        assert_eq!(store.cell_count(), 2);
        assert_eq!(store.field_vector().len(), 6);
        assert_eq!(store.field_scalar().len(), 2);
    }

    #[test]
    fn test_update_vector_field_is_channel_stacked() {
        let mut store = store();
        // x of both cells, then y, then z
        store
            .field_vector_mut()
            .copy_from_slice(&[1.0, 2.0, 10.0, 20.0, 100.0, 200.0]);
        store.update_field("U", 3).unwrap();
        let u = store.grid().cell_array("U").unwrap();
        assert_eq!(u.tuple(0), &[1.0, 10.0, 100.0]);
        assert_eq!(u.tuple(1), &[2.0, 20.0, 200.0]);
        let point_u = store.grid().point_array("U").unwrap();
        assert_eq!(point_u.tuple(1), &[1.5, 15.0, 150.0]);

        store.update_field("uv", 2).unwrap();
        assert_eq!(store.grid().cell_array("uv").unwrap().tuple(1), &[2.0, 20.0]);
    }

    #[test]
    fn test_update_scalar_and_rejects() {
        let mut store = store();
        store.field_scalar_mut().copy_from_slice(&[4.0, 8.0]);
        store.update_field("p", 1).unwrap();
        assert_eq!(store.grid().point_array("p").unwrap().scalar_at(1), 6.0);
        assert!(store.update_field("T", 4).is_err());
        assert!(store.update_field("T", 0).is_err());
        assert!(store.update_field("", 1).is_err());
    }

    #[test]
    fn test_failed_load_keeps_grid() {
        let mut store = store();
        let err = store.load(&JsonCodec::new(), b"{}", &LocatorConfig::default());
        assert!(err.is_err());
        assert_eq!(store.cell_count(), 2);
    }
}
