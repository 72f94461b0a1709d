//! Post-processing session
//!
//! A `Session` owns the active mesh and every representation derived from
//! it. Each kind of representation (surface, plane cut, streamline tubes) has
//! one slot that the next computation of that kind replaces; loading a new
//! grid clears them all.

pub mod engine;
pub mod mesh_store;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::core_types::{Point, Vec3};
use crate::error::{EngineError, EngineResult};
use crate::filters::{self, GradientOptions, IntegrationTarget, Plane, SurfaceDistance};
use crate::filters::{SeedSphere, StreamTracer, TubeParams, SDF_NAME};
use crate::grid::{FieldArray, PolyData, UnstructuredGrid};
use crate::io::{read_stl, JsonCodec, MeshCodec};
use crate::render::{export_gltf, field_range, map_colors, ColorMapping};

pub use engine::{MeshEngine, RegionClassifier, RenderRequest, StreamlineParams};
pub use mesh_store::MeshStore;

/// Velocity array the gradient engine differentiates.
pub const VELOCITY_NAME: &str = "U";

/// Kind of derived polygon representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Representation {
    /// Boundary surface of the grid
    Surface,
    /// Plane cross-section
    Plane,
    /// Streamline tubes
    Streamlines,
}

impl FromStr for Representation {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "surface" => Ok(Self::Surface),
            "plane" => Ok(Self::Plane),
            "streamlines" => Ok(Self::Streamlines),
            other => Err(EngineError::invalid_argument(
                "component",
                format!("expected \"surface\", \"plane\" or \"streamlines\", got \"{other}\""),
            )),
        }
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Surface => write!(f, "surface"),
            Self::Plane => write!(f, "plane"),
            Self::Streamlines => write!(f, "streamlines"),
        }
    }
}

/// Result of the last render call.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    /// Representation that was colored
    pub representation: Representation,
    /// Field, component mode, range and colors
    pub mapping: ColorMapping,
}

/// One active mesh and its derived representations.
pub struct Session {
    config: EngineConfig,
    codec: Box<dyn MeshCodec>,
    store: MeshStore,
    surface: Option<PolyData>,
    plane_cut: Option<(Plane, PolyData)>,
    streamlines: Option<PolyData>,
    active: Option<Representation>,
    render: Option<RenderState>,
}

impl Default for Session {
    /// Default configuration with the JSON codec.
    fn default() -> Self {
        Self::from_parts(EngineConfig::default(), Box::new(JsonCodec::new()))
    }
}

impl Session {
    /// Session with the default configuration and the JSON codec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Session with a custom configuration and codec.
    pub fn with_config(config: EngineConfig, codec: Box<dyn MeshCodec>) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self::from_parts(config, codec))
    }

    fn from_parts(config: EngineConfig, codec: Box<dyn MeshCodec>) -> Self {
        let store = MeshStore::new(&config.locator);
        Self {
            config,
            codec,
            store,
            surface: None,
            plane_cut: None,
            streamlines: None,
            active: None,
            render: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The mesh store.
    pub fn store(&self) -> &MeshStore {
        &self.store
    }

    /// The active grid.
    pub fn grid(&self) -> &UnstructuredGrid {
        self.store.grid()
    }

    pub fn cell_count(&self) -> usize {
        self.store.cell_count()
    }

    pub fn point_count(&self) -> usize {
        self.store.point_count()
    }

    /// Writable vector scratch buffer (`3N`, channel-stacked).
    pub fn field_vector_mut(&mut self) -> &mut [f64] {
        self.store.field_vector_mut()
    }

    /// Writable scalar scratch buffer (`N`).
    pub fn field_scalar_mut(&mut self) -> &mut [f64] {
        self.store.field_scalar_mut()
    }

    /// Most recently produced or rendered representation.
    pub fn active(&self) -> Option<Representation> {
        self.active
    }

    /// Current polygon data of one representation kind.
    pub fn representation(&self, kind: Representation) -> Option<&PolyData> {
        match kind {
            Representation::Surface => self.surface.as_ref(),
            Representation::Plane => self.plane_cut.as_ref().map(|(_, poly)| poly),
            Representation::Streamlines => self.streamlines.as_ref(),
        }
    }

    /// Plane of the current cut.
    pub fn plane(&self) -> Option<&Plane> {
        self.plane_cut.as_ref().map(|(plane, _)| plane)
    }

    /// Last render result.
    pub fn render_state(&self) -> Option<&RenderState> {
        self.render.as_ref()
    }

    fn active_poly(&self) -> EngineResult<&PolyData> {
        let kind = self.active.ok_or(EngineError::NoActiveRepresentation)?;
        self.representation(kind)
            .ok_or(EngineError::MissingRepresentation(kind))
    }

    /// Store a representation, invalidating colors computed for the old one.
    fn set_representation(&mut self, kind: Representation, poly: PolyData, plane: Option<Plane>) {
        match (kind, plane) {
            (Representation::Surface, _) => self.surface = Some(poly),
            (Representation::Plane, Some(plane)) => self.plane_cut = Some((plane, poly)),
            (Representation::Plane, None) => {
                if let Some((_, old)) = self.plane_cut.as_mut() {
                    *old = poly;
                }
            }
            (Representation::Streamlines, _) => self.streamlines = Some(poly),
        }
        if self.render.as_ref().is_some_and(|r| r.representation == kind) {
            self.render = None;
        }
        self.active = Some(kind);
    }
}

impl MeshEngine for Session {
    fn load(&mut self, bytes: &[u8]) -> EngineResult<usize> {
        let n = self.store.load(self.codec.as_ref(), bytes, &self.config.locator)?;
        self.surface = None;
        self.plane_cut = None;
        self.streamlines = None;
        self.active = None;
        self.render = None;
        Ok(n)
    }

    fn export_current(&self) -> EngineResult<Vec<u8>> {
        self.codec.encode_grid(self.store.grid())
    }

    fn extract_surface(&mut self) -> usize {
        let surface = filters::extract_surface(self.store.grid());
        let n = surface.polys.len();
        self.set_representation(Representation::Surface, surface, None);
        n
    }

    fn surface_to_polydata(&self) -> EngineResult<Vec<u8>> {
        self.codec
            .encode_poly(&filters::extract_surface(self.store.grid()))
    }

    fn stl_to_polydata(&self, bytes: &[u8]) -> EngineResult<Vec<u8>> {
        self.codec.encode_poly(&read_stl(bytes)?)
    }

    fn cut(&mut self, origin: Point, normal: Vec3) -> EngineResult<Vec<u8>> {
        let plane = Plane::new(origin, normal)?;
        let poly = filters::cut(self.store.grid(), &plane);
        let bytes = self.codec.encode_poly(&poly)?;
        self.set_representation(Representation::Plane, poly, Some(plane));
        Ok(bytes)
    }

    fn trace(&mut self, params: &StreamlineParams) -> EngineResult<Vec<u8>> {
        let seeds = SeedSphere::new(params.center, params.radius, params.resolution)?;
        let tube_params = TubeParams::new(params.tube_radius, params.tube_sides)?;
        let tracer = StreamTracer::new(
            self.store.grid(),
            self.store.locator(),
            &params.field,
            &self.config.tracer,
        )?;
        let lines = tracer.trace(&seeds.points(), params.max_length)?;
        let tubes = filters::tube(&lines, &params.field, &tube_params, &self.config.tube)?;
        let bytes = self.codec.encode_poly(&tubes)?;
        self.set_representation(Representation::Streamlines, tubes, None);
        Ok(bytes)
    }

    fn probe(&self, field: &str, point: &Point) -> EngineResult<[f64; 4]> {
        filters::probe(self.store.grid(), self.store.locator(), field, point)
    }

    fn integrate(&self, field: &str, target: &str) -> EngineResult<Vec<f64>> {
        let integral = match target.parse::<IntegrationTarget>()? {
            IntegrationTarget::Grid => filters::integrate_grid(self.store.grid(), field)?,
            IntegrationTarget::Component => filters::integrate_surface(self.active_poly()?, field)?,
        };
        debug!("Integrated '{}' over {} (extent {})", field, target, integral.extent);
        integral.averaged()
    }

    fn compute_gradients(
        &mut self,
        include_vorticity: bool,
        include_gradients: bool,
    ) -> EngineResult<()> {
        let velocity = self.store.grid().point_array(VELOCITY_NAME)?;
        if velocity.components != 3 {
            return Err(EngineError::invalid_argument(
                "field",
                format!("'{VELOCITY_NAME}' has {} components, expected 3", velocity.components),
            ));
        }
        let arrays = filters::compute_gradients(
            self.store.grid(),
            VELOCITY_NAME,
            GradientOptions {
                gradients: include_gradients,
                vorticity: include_vorticity,
            },
        )?;
        self.store.commit_point_arrays(arrays);
        Ok(())
    }

    fn update_field(&mut self, name: &str, components: usize) -> EngineResult<()> {
        self.store.update_field(name, components)
    }

    fn render(&mut self, request: &RenderRequest) -> EngineResult<Vec<f32>> {
        let kind: Representation = request.component.parse()?;
        let poly = match kind {
            Representation::Surface => filters::extract_surface(self.store.grid()),
            Representation::Plane => {
                let plane = self
                    .plane()
                    .ok_or(EngineError::MissingRepresentation(kind))?;
                filters::cut(self.store.grid(), plane)
            }
            Representation::Streamlines => self
                .streamlines
                .clone()
                .ok_or(EngineError::MissingRepresentation(kind))?,
        };

        let mapping = map_colors(
            &poly,
            &request.field,
            request.component_index,
            [request.min, request.max],
            &self.config.lookup_table,
        )?;
        let colors = mapping.colors.clone();

        self.set_representation(kind, poly, None);
        info!(
            "Rendered '{}' on {} over [{}, {}]",
            mapping.field, kind, mapping.range[0], mapping.range[1]
        );
        self.render = Some(RenderState {
            representation: kind,
            mapping,
        });
        Ok(colors)
    }

    fn scalar_bar_range(&self, component_index: i32) -> EngineResult<[f64; 2]> {
        let state = self
            .render
            .as_ref()
            .ok_or(EngineError::NoActiveRepresentation)?;
        let poly = self
            .representation(state.representation)
            .ok_or(EngineError::MissingRepresentation(state.representation))?;
        field_range(poly, &state.mapping.field, component_index)
    }

    fn clear_scene(&mut self) {
        self.render = None;
    }

    fn export_scene(&self) -> EngineResult<Vec<u8>> {
        let poly = self.active_poly()?;
        let colors = self
            .render
            .as_ref()
            .filter(|r| Some(r.representation) == self.active)
            .map(|r| r.mapping.colors.as_slice());
        export_gltf(poly, colors)
    }
}

impl RegionClassifier for Session {
    fn compute_distance_and_region(&mut self, surface_bytes: &[u8]) -> EngineResult<Vec<f64>> {
        let surface = SurfaceDistance::new(&self.codec.decode_poly(surface_bytes)?)?;
        let classification = filters::classify_cells(self.store.grid(), &surface)?;
        let buffer = classification.to_buffer();

        self.store
            .commit_cell_arrays([FieldArray::scalar(SDF_NAME, classification.sdf)]);
        self.store.set_active_cell_scalars(SDF_NAME);
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::generator::{box_grid, sample_points};

    fn loaded() -> Session {
        let mut grid = box_grid(2, 2, 2, [2.0, 2.0, 2.0]);
        grid.point_data
            .insert(sample_points(&grid, "U", 3, |p| vec![1.0, 0.0, p.x]));
        grid.point_data.insert(sample_points(&grid, "p", 1, |p| vec![p.z]));
        let bytes = JsonCodec::new().encode_grid(&grid).unwrap();
        let mut session = Session::new();
        assert_eq!(session.load(&bytes).unwrap(), 8);
        session
    }

    #[test]
    fn test_representation_parsing() {
        assert_eq!("plane".parse::<Representation>().unwrap(), Representation::Plane);
        assert_eq!(Representation::Streamlines.to_string(), "streamlines");
        assert!(matches!(
            "volume".parse::<Representation>(),
            Err(EngineError::InvalidArgument { name: "component", .. })
        ));
    }

    #[test]
    fn test_load_resets_representations() {
        let mut session = loaded();
        session.extract_surface();
        assert_eq!(session.active(), Some(Representation::Surface));
        let bytes = session.export_current().unwrap();
        session.load(&bytes).unwrap();
        assert!(session.active().is_none());
        assert!(session.representation(Representation::Surface).is_none());
    }

    #[test]
    fn test_render_before_cut_is_missing() {
        let mut session = loaded();
        let err = session.render(&RenderRequest::auto("plane", "p")).unwrap_err();
        assert!(matches!(
            err,
            EngineError::MissingRepresentation(Representation::Plane)
        ));
        assert!(matches!(
            session.scalar_bar_range(-1),
            Err(EngineError::NoActiveRepresentation)
        ));
    }

    #[test]
    fn test_render_then_scene_has_colors() {
        let mut session = loaded();
        let colors = session.render(&RenderRequest::auto("surface", "p")).unwrap();
        let surface = session.representation(Representation::Surface).unwrap();
        assert_eq!(colors.len(), 4 * surface.point_count());
        assert_eq!(session.scalar_bar_range(-1).unwrap(), [0.0, 2.0]);

        let doc: serde_json::Value = serde_json::from_slice(&session.export_scene().unwrap()).unwrap();
        assert!(doc["meshes"][0]["primitives"][0]["attributes"]
            .get("COLOR_0")
            .is_some());

        // A new cut takes over the scene, uncolored
        session
            .cut(Point::new(1.0, 1.0, 0.5), Vec3::z())
            .unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&session.export_scene().unwrap()).unwrap();
        assert!(doc["meshes"][0]["primitives"][0]["attributes"]
            .get("COLOR_0")
            .is_none());
    }

    #[test]
    fn test_failed_cut_keeps_state() {
        let mut session = loaded();
        session.extract_surface();
        assert!(session.cut(Point::origin(), Vec3::zeros()).is_err());
        assert_eq!(session.active(), Some(Representation::Surface));
        assert!(session.plane().is_none());
    }

    #[test]
    fn test_integrate_component_needs_active() {
        let mut session = loaded();
        assert!(matches!(
            session.integrate("p", "component"),
            Err(EngineError::NoActiveRepresentation)
        ));
        session.extract_surface();
        let result = session.integrate("p", "component").unwrap();
        // Cube surface area
        assert!((result[0] - 24.0).abs() < 1e-9);
        // Mean of z over the surface: top 2, bottom 0, sides 1
        assert!((result[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_gradients_commit() {
        let mut session = loaded();
        session.compute_gradients(true, true).unwrap();
        let vorticity = session.grid().point_array("vorticity").unwrap();
        // curl of (1, 0, x) is (0, -1, 0)
        assert!((vorticity.vector_at(0) - Vec3::new(0.0, -1.0, 0.0)).norm() < 1e-10);
        assert_eq!(session.grid().point_array("gradients").unwrap().components, 9);
    }
}
