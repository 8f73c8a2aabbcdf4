//! Shared geometric types.

use nalgebra::Vector3;

/// A vertex position. Components beyond the mesh dimension are zero.
pub type Point3 = Vector3<f64>;
