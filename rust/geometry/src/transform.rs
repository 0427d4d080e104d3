// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar rotation helpers shared by the projections

use nalgebra::{Matrix2, Vector2};

/// Rotation matrix `[[cos θ, -sin θ], [sin θ, cos θ]]` for an angle in degrees
#[inline]
pub fn rotation_matrix_2d(degrees: f64) -> Matrix2<f64> {
    let theta = degrees.to_radians();
    let (sin_theta, cos_theta) = theta.sin_cos();
    Matrix2::new(cos_theta, -sin_theta, sin_theta, cos_theta)
}

/// Rotate a 2D vector as a row vector: `point · R(degrees)`
///
/// Multiplying from the left turns the rotation clockwise for positive angles,
/// so `rotate_2d(v, -90.0)` turns `v` a quarter turn counter-clockwise.
/// The trigonometric terms are evaluated in full, so a quarter turn keeps the
/// `cos(±90°) ≈ 6.1e-17` residue rather than snapping to exact zeros.
#[inline]
pub fn rotate_2d(point: Vector2<f64>, degrees: f64) -> Vector2<f64> {
    rotation_matrix_2d(degrees).transpose() * point
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_matrix_layout() {
        let m = rotation_matrix_2d(90.0);
        assert_relative_eq!(m[(0, 0)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(m[(0, 1)], -1.0);
        assert_relative_eq!(m[(1, 0)], 1.0);
    }

    #[test]
    fn test_row_vector_quarter_turn() {
        // (1, 0) · R(-90) = (cos, -sin) = (0, 1)
        let r = rotate_2d(Vector2::new(1.0, 0.0), -90.0);
        assert_relative_eq!(r.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(r.y, 1.0);

        // (0, 1) · R(-90) = (sin, cos) = (-1, 0)
        let r = rotate_2d(Vector2::new(0.0, 1.0), -90.0);
        assert_relative_eq!(r.x, -1.0);
        assert_relative_eq!(r.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_residue_is_kept() {
        let r = rotate_2d(Vector2::new(2.0, 0.0), -90.0);
        assert!(r.x != 0.0);
        assert!(r.x.abs() < 1e-15);
    }

    #[test]
    fn test_full_turn_is_identity() {
        let v = Vector2::new(3.5, -1.25);
        let r = rotate_2d(rotate_2d(v, 180.0), 180.0);
        assert_relative_eq!(r, v, epsilon = 1e-12);
    }
}
