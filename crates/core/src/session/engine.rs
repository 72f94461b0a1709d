//! Engine capability traits
//!
//! This module defines the `MeshEngine` and `RegionClassifier` traits, the
//! interface host bindings program against. `Session` implements both.

use serde::{Deserialize, Serialize};

use crate::core_types::{Point, Vec3};
use crate::error::EngineResult;

/// Streamline request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamlineParams {
    /// Center of the seed sphere
    pub center: Point,
    /// Radius of the seed sphere
    pub radius: f64,
    /// Maximum arclength per streamline
    pub max_length: f64,
    /// Base tube radius
    pub tube_radius: f64,
    /// Sides of the tube cross-section
    pub tube_sides: usize,
    /// Seed sphere resolution (theta and phi)
    pub resolution: usize,
    /// Point vector array to follow
    pub field: String,
}

/// Color mapping request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Representation to color: "surface", "plane" or "streamlines"
    pub component: String,
    /// Point array to map
    pub field: String,
    /// `-1` for magnitude, otherwise the component to map
    pub component_index: i32,
    /// Lower end of the color range (`min == max == 0` selects auto-range)
    pub min: f64,
    /// Upper end of the color range
    pub max: f64,
}

impl RenderRequest {
    /// Magnitude-mode request with an automatic range.
    pub fn auto(component: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            field: field.into(),
            component_index: -1,
            min: 0.0,
            max: 0.0,
        }
    }
}

/// Core post-processing operations over one active mesh
///
/// Mutating operations are all-or-nothing: on error the engine state is left
/// exactly as before the call. Encoded outputs go through the engine's codec.
pub trait MeshEngine: Send + Sync {
    /// Replace the active grid
    ///
    /// Invalidates every derived representation and the render state.
    ///
    /// # Arguments
    ///
    /// * `bytes` - Encoded unstructured grid
    ///
    /// # Returns
    ///
    /// Number of cells in the new grid
    fn load(&mut self, bytes: &[u8]) -> EngineResult<usize>;

    /// Encode the active grid, including every field array added since load
    fn export_current(&self) -> EngineResult<Vec<u8>>;

    /// Extract the boundary surface and make it the active representation
    ///
    /// # Returns
    ///
    /// Number of boundary polygons
    fn extract_surface(&mut self) -> usize;

    /// Encode the boundary surface without touching session state
    fn surface_to_polydata(&self) -> EngineResult<Vec<u8>>;

    /// Convert an STL file into encoded polygon data
    ///
    /// # Arguments
    ///
    /// * `bytes` - ASCII or binary STL
    fn stl_to_polydata(&self, bytes: &[u8]) -> EngineResult<Vec<u8>>;

    /// Cut the grid with a plane and make the cut the active representation
    ///
    /// # Arguments
    ///
    /// * `origin` - Any point on the plane
    /// * `normal` - Plane normal (non-zero)
    fn cut(&mut self, origin: Point, normal: Vec3) -> EngineResult<Vec<u8>>;

    /// Trace streamline tubes and make them the active representation
    fn trace(&mut self, params: &StreamlineParams) -> EngineResult<Vec<u8>>;

    /// Interpolate a field at a point
    ///
    /// # Arguments
    ///
    /// * `field` - Point or cell array name
    /// * `point` - Query location
    ///
    /// # Returns
    ///
    /// `[v0, v1, v2, |v|]`, all NaN outside the grid
    fn probe(&self, field: &str, point: &Point) -> EngineResult<[f64; 4]>;

    /// Extent-averaged integral of a field
    ///
    /// # Arguments
    ///
    /// * `field` - Array name
    /// * `target` - "grid" for the volume, "component" for the active representation
    ///
    /// # Returns
    ///
    /// `[extent, mean...]`, with a trailing magnitude for vector fields
    fn integrate(&self, field: &str, target: &str) -> EngineResult<Vec<f64>>;

    /// Append `vorticity` and/or `gradients` point arrays computed from `U`
    fn compute_gradients(&mut self, include_vorticity: bool, include_gradients: bool)
        -> EngineResult<()>;

    /// Build a cell array from the scratch buffers and refresh point data
    ///
    /// # Arguments
    ///
    /// * `name` - Array name to add or replace
    /// * `components` - 1 (scalar buffer), 2 or 3 (vector buffer)
    fn update_field(&mut self, name: &str, components: usize) -> EngineResult<()>;

    /// Map a point field of a representation to RGBA colors
    ///
    /// # Returns
    ///
    /// Four floats per point in `0..=1`
    fn render(&mut self, request: &RenderRequest) -> EngineResult<Vec<f32>>;

    /// Range of the last rendered field for the given component mode
    fn scalar_bar_range(&self, component_index: i32) -> EngineResult<[f64; 2]>;

    /// Drop the render state
    fn clear_scene(&mut self);

    /// Export the active representation as a glTF document
    fn export_scene(&self) -> EngineResult<Vec<u8>>;
}

/// Signed-distance region classification against an external surface
pub trait RegionClassifier: Send + Sync {
    /// Classify every cell against a surface and mask the flow region
    ///
    /// Writes `sdf1` (made the active cell scalars). The grid's `flowRegion`
    /// is left as loaded; the masked copy is only returned.
    ///
    /// # Arguments
    ///
    /// * `surface_bytes` - Encoded polygon data (see `stl_to_polydata`)
    ///
    /// # Returns
    ///
    /// `[sdf(N), flowRegion(N), sdf2(N)]`
    fn compute_distance_and_region(&mut self, surface_bytes: &[u8]) -> EngineResult<Vec<f64>>;
}
