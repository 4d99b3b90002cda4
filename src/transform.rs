//! Transform component for physics entities.

use glam::{Quat, Vec3};

/// World-space position and orientation of a body's center of mass.
#[derive(Debug, Clone, Copy)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Transform {
    /// Create an identity transform.
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    /// Create a transform from a position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Shift the position by `delta`.
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Rotate by a scaled-axis displacement: `delta` encodes the rotation
    /// axis with magnitude equal to the angle in radians, scaled by `scale`.
    ///
    /// Uses the small-angle quaternion step q' = q + 0.5 * w_quat * q, so it
    /// is only accurate for the small corrections the resolver applies.
    pub fn rotate_scaled_axis(&mut self, delta: Vec3, scale: f32) {
        let w = delta * scale;
        if w.length_squared() < 1e-12 {
            return;
        }
        let w_quat = Quat::from_xyzw(w.x, w.y, w.z, 0.0);
        let q_dot = w_quat * self.rotation * 0.5;
        self.rotation = Quat::from_xyzw(
            self.rotation.x + q_dot.x,
            self.rotation.y + q_dot.y,
            self.rotation.z + q_dot.z,
            self.rotation.w + q_dot.w,
        )
        .normalize();
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let t = Transform::identity();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Quat::IDENTITY);
    }

    #[test]
    fn test_from_position() {
        let pos = Vec3::new(1.0, 2.0, 3.0);
        let t = Transform::from_position(pos);
        assert_eq!(t.position, pos);
        assert_eq!(t.rotation, Quat::IDENTITY);
    }

    #[test]
    fn test_translate() {
        let mut t = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
        t.translate(Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(t.position, Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn test_rotate_scaled_axis_small_angle() {
        let mut t = Transform::identity();
        let angle = 0.01;
        t.rotate_scaled_axis(Vec3::new(0.0, angle, 0.0), 1.0);

        // For small angles the step matches the exact axis-angle rotation
        let expected = Quat::from_rotation_y(angle);
        let dot = t.rotation.dot(expected).abs();
        assert!((dot - 1.0).abs() < 1e-6, "rotation off: dot = {}", dot);
    }

    #[test]
    fn test_rotate_zero_is_noop() {
        let mut t = Transform::identity();
        t.rotate_scaled_axis(Vec3::ZERO, 1.0);
        assert_eq!(t.rotation, Quat::IDENTITY);
    }

    #[test]
    fn test_rotation_stays_normalized() {
        let mut t = Transform::identity();
        for _ in 0..100 {
            t.rotate_scaled_axis(Vec3::new(0.02, 0.03, -0.01), 1.0);
        }
        assert!((t.rotation.length() - 1.0).abs() < 1e-5);
    }
}
