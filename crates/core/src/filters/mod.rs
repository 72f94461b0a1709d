//! Geometric and numerical filters over the mesh
//!
//! Every filter takes its inputs by reference and returns new data; none of
//! them mutates the grid. The session decides what to commit.

pub mod cell_to_point;
pub mod cutter;
pub mod gradient;
pub mod integrate;
pub mod probe;
pub mod signed_distance;
pub mod stream_tracer;
pub mod surface;
pub mod tube;

// Re-exports
pub use cell_to_point::cell_to_point;
pub use cutter::{cut, Plane};
pub use gradient::{compute_gradients, GradientOptions, GRADIENTS_NAME, VORTICITY_NAME};
pub use integrate::{integrate_grid, integrate_surface, Integral, IntegrationTarget};
pub use probe::probe;
pub use signed_distance::{
    classify_cells, closest_point_on_triangle, Classification, SurfaceDistance,
    FLOW_REGION_NAME, SDF2_NAME, SDF_NAME,
};
pub use stream_tracer::{SeedSphere, StreamTracer};
pub use surface::extract_surface;
pub use tube::{tube, TubeParams};
