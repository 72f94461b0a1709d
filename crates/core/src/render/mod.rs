//! Color mapping and scene export

pub mod lookup_table;
pub mod mapper;
pub mod scene;

pub use lookup_table::{hsv_to_rgb, LookupTable};
pub use mapper::{field_range, map_colors, parse_component, ColorMapping};
pub use scene::export_gltf;
