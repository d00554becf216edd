use core::ops::Mul;

use super::{Scalar, Vec3};

/// Rotation quaternion: `real + imaginary.x*i + imaginary.y*j + imaginary.z*k`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quaternion {
    pub real: Scalar,
    pub imaginary: Vec3,
}

impl Quaternion {
    #[inline]
    pub const fn new(real: Scalar, imaginary: Vec3) -> Self {
        Self { real, imaginary }
    }

    /// The no-rotation quaternion.
    #[inline]
    pub const fn identity() -> Self {
        Self { real: 1.0, imaginary: Vec3::zero() }
    }

    /// Rotation of `angle_rad` around `axis` (normalized internally).
    pub fn from_axis_angle(axis: Vec3, angle_rad: Scalar) -> Self {
        let half = angle_rad * 0.5;
        Self {
            real: half.cos(),
            imaginary: axis.normalized() * half.sin(),
        }
    }

    #[inline]
    pub fn conjugate(self) -> Self {
        Self { real: self.real, imaginary: -self.imaginary }
    }

    #[inline]
    pub fn norm(self) -> Scalar {
        (self.real * self.real + self.imaginary.length_sqr()).sqrt()
    }

    /// Rotates `v` by this (unit) quaternion.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Quaternion::new(0.0, v);
        (self * p * self.conjugate()).imaginary
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

/// Hamilton product.
impl Mul for Quaternion {
    type Output = Quaternion;
    fn mul(self, rhs: Quaternion) -> Quaternion {
        let (a, u) = (self.real, self.imaginary);
        let (b, v) = (rhs.real, rhs.imaginary);
        Quaternion {
            real: a * b - u.dot(v),
            imaginary: v * a + u * b + u.cross(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-9
    }

    #[test]
    fn identity_leaves_vectors_unchanged() {
        let v = Vec3::new(1.0, -2.0, 3.0);
        assert!(close(Quaternion::identity().rotate(v), v));
    }

    #[test]
    fn quarter_turn_about_z() {
        let q = Quaternion::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), core::f64::consts::FRAC_PI_2);
        assert!(close(q.rotate(Vec3::new(1.0, 0.0, 0.0)), Vec3::new(0.0, 1.0, 0.0)));
        assert!((q.norm() - 1.0).abs() < 1e-12);
    }
}
