//! Coordinate primitives.
//!
//! Pure value types used to place CSG nodes: positions/offsets and orientations.
//! Scalars are `f64`; conversion to GPU-facing `f32` happens at upload time.

mod quaternion;
mod vec3;

pub use quaternion::Quaternion;
pub use vec3::Vec3;

/// Scalar type used by scene-space math.
pub type Scalar = f64;
