//! Serialization boundary: mesh codecs and STL import

pub mod codec;
pub mod stl;

pub use codec::{JsonCodec, MeshCodec};
pub use stl::read_stl;
