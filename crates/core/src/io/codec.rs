//! Wire encoding of grids and polygon data
//!
//! The session never touches bytes directly; everything crossing the host
//! boundary goes through a [`MeshCodec`].

use crate::error::{EngineError, EngineResult};
use crate::grid::{PolyData, UnstructuredGrid};

/// Backend-agnostic encoder/decoder for mesh objects.
///
/// Decoders must return fully validated objects: a grid coming out of
/// `decode_grid` satisfies [`UnstructuredGrid::validate`].
pub trait MeshCodec: Send + Sync {
    /// Short name used in logs ("json", ...)
    fn name(&self) -> &'static str;

    /// Decode a volumetric grid.
    ///
    /// # Arguments
    ///
    /// * `bytes` - Serialized grid as received from the host
    fn decode_grid(&self, bytes: &[u8]) -> EngineResult<UnstructuredGrid>;

    /// Encode a volumetric grid.
    fn encode_grid(&self, grid: &UnstructuredGrid) -> EngineResult<Vec<u8>>;

    /// Decode polygon data (surfaces, cuts, tubes).
    fn decode_poly(&self, bytes: &[u8]) -> EngineResult<PolyData>;

    /// Encode polygon data.
    fn encode_poly(&self, poly: &PolyData) -> EngineResult<Vec<u8>>;
}

/// JSON codec built on `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    /// Emit indented JSON
    pub pretty: bool,
}

impl JsonCodec {
    /// Compact JSON codec.
    pub fn new() -> Self {
        Self::default()
    }

    fn encode<T: serde::Serialize>(&self, what: &'static str, value: &T) -> EngineResult<Vec<u8>> {
        let result = if self.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        result.map_err(|e| EngineError::Encode {
            what,
            message: e.to_string(),
        })
    }
}

impl MeshCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn decode_grid(&self, bytes: &[u8]) -> EngineResult<UnstructuredGrid> {
        let grid: UnstructuredGrid =
            serde_json::from_slice(bytes).map_err(|e| EngineError::decode("grid", e.to_string()))?;
        grid.validate()?;
        Ok(grid)
    }

    fn encode_grid(&self, grid: &UnstructuredGrid) -> EngineResult<Vec<u8>> {
        self.encode("grid", grid)
    }

    fn decode_poly(&self, bytes: &[u8]) -> EngineResult<PolyData> {
        let poly: PolyData = serde_json::from_slice(bytes)
            .map_err(|e| EngineError::decode("polydata", e.to_string()))?;
        poly.validate()?;
        Ok(poly)
    }

    fn encode_poly(&self, poly: &PolyData) -> EngineResult<Vec<u8>> {
        self.encode("polydata", poly)
    }
}
