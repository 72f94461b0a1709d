//! Core types and utilities

pub mod bounds;
pub mod vec3;

pub use bounds::Bounds;
pub use vec3::{Point, Vec3};
