//! CFD Mesh Post-Processing Core Library
//!
//! Loads an unstructured volumetric mesh with point and cell field data and
//! answers geometric and numerical queries over it for a remote viewer.
//!
//! ## Operations
//!
//! - Boundary surface extraction and plane cross-sections
//! - Streamline tracing (Dormand-Prince 5(4)) swept into tubes
//! - Point probing, volume and surface integration
//! - Gradient and vorticity of the velocity field
//! - Signed-distance region classification against an STL surface
//! - HSV color mapping and glTF scene export
//!
//! Everything is driven through a [`Session`], which implements the
//! [`MeshEngine`] and [`RegionClassifier`] traits.

// Core types and utilities
pub mod config;
pub mod core_types;
pub mod error;

// Mesh data model and encoding
pub mod grid;
pub mod io;

// Filters, rendering and the session tying them together
pub mod filters;
pub mod render;
pub mod session;

// Re-export core types
pub use config::{EngineConfig, LookupTableConfig, TracerConfig, TubeConfig};
pub use core_types::{Bounds, Point, Vec3};
pub use error::{EngineError, EngineResult};

// Re-export data model
pub use grid::{
    Association, Cell, CellKind, CellLocator, FieldArray, FieldData, LocatorConfig, PolyData,
    UnstructuredGrid,
};
pub use io::{JsonCodec, MeshCodec};

// Re-export session types
pub use session::{
    MeshEngine, RegionClassifier, RenderRequest, RenderState, Representation, Session,
    StreamlineParams,
};
