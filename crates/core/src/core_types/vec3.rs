//! Vector and point aliases for mesh geometry.

use nalgebra::{Point3, Vector3};

/// 3D vector type for directions, normals, and vector field samples.
///
/// Alias for `nalgebra::Vector3<f64>`. Mesh coordinates coming out of CFD
/// solvers routinely span several orders of magnitude, so everything is `f64`.
pub type Vec3 = Vector3<f64>;

/// 3D point type for mesh vertices and query locations.
pub type Point = Point3<f64>;
