//! Mesh data model: volumetric grids, polygon data and field arrays

pub mod cell;
pub mod field;
pub mod generator;
pub mod locator;
pub mod poly_data;
pub mod unstructured_grid;

// Re-export main types
pub use cell::{Cell, CellKind};
pub use field::{Association, FieldArray, FieldData};
pub use locator::{CellHit, CellLocator, LocatorConfig};
pub use poly_data::PolyData;
pub use unstructured_grid::UnstructuredGrid;
