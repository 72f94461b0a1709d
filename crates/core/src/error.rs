//! Error types for mesh engine operations.

use thiserror::Error;

use crate::grid::Association;
use crate::session::Representation;

/// Result type for mesh engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while loading, querying, or rendering a mesh.
///
/// Every mutating operation is all-or-nothing: when one of these is returned
/// the session is exactly as it was before the call.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input buffer is not a valid encoding of the expected object.
    #[error("failed to decode {what}: {message}")]
    Decode {
        /// What was being decoded (grid, polydata, STL).
        what: &'static str,
        /// Decoder diagnostic.
        message: String,
    },

    /// Output object could not be serialized.
    #[error("failed to encode {what}: {message}")]
    Encode {
        /// What was being encoded.
        what: &'static str,
        /// Encoder diagnostic.
        message: String,
    },

    /// Decoded grid violates a structural invariant.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    /// Referenced field does not exist where it is needed.
    #[error("field '{name}' not found in {association}")]
    MissingField {
        /// Field name as requested.
        name: String,
        /// Namespace that was searched.
        association: Association,
    },

    /// Operation needs a derived representation that has not been produced.
    #[error("no {0} representation is available")]
    MissingRepresentation(Representation),

    /// Operation works on the active representation but none is active yet.
    #[error("no representation is active")]
    NoActiveRepresentation,

    /// An argument is outside its accepted set or range.
    #[error("invalid argument '{name}': {message}")]
    InvalidArgument {
        /// Argument name.
        name: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// Integration extent (volume or area) is too small to normalize by.
    #[error("degenerate integration extent {extent:e}")]
    DegenerateExtent {
        /// The offending extent.
        extent: f64,
    },
}

impl EngineError {
    /// Create an `InvalidArgument` error.
    pub fn invalid_argument(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            message: message.into(),
        }
    }

    /// Create a `MissingField` error.
    pub fn missing_field(name: &str, association: Association) -> Self {
        Self::MissingField {
            name: name.to_owned(),
            association,
        }
    }

    /// Create a `Decode` error.
    pub fn decode(what: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            what,
            message: message.into(),
        }
    }
}
