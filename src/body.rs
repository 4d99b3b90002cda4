//! Rigid body component and the accessors the resolver works through.

use glam::{Mat3, Quat, Vec3};

/// Rigid body type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigidBodyType {
    /// Affected by impulses and positional corrections.
    Dynamic,
    /// Immovable.
    Static,
    /// Position controlled by user, but affects dynamic bodies.
    Kinematic,
}

/// Rigid body component.
///
/// Holds mass properties and velocities; position and orientation live in the
/// entity's [`Transform`](crate::Transform). Static and kinematic bodies
/// report an inverse mass of zero and are never moved by the resolver.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub body_type: RigidBodyType,
    pub mass: f32,
    /// Inverse inertia tensor in body-local coordinates.
    pub inverse_inertia_local: Mat3,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Acceleration the integrator applied during the previous step (e.g.
    /// gravity). The resolver discounts the closing velocity this introduced
    /// so resting contacts do not gain energy every tick. Zero is safe if the
    /// integrator never sets it.
    pub last_acceleration: Vec3,
}

impl RigidBody {
    /// Create a dynamic body with the given mass and a unit-sphere inertia
    /// approximation.
    pub fn new_dynamic(mass: f32) -> Self {
        let inverse_inertia_local = if mass > 0.0 {
            Mat3::from_diagonal(Vec3::splat(1.0 / mass))
        } else {
            Mat3::ZERO
        };
        Self {
            body_type: RigidBodyType::Dynamic,
            mass,
            inverse_inertia_local,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            last_acceleration: Vec3::ZERO,
        }
    }

    /// Create a static body.
    pub fn new_static() -> Self {
        Self {
            body_type: RigidBodyType::Static,
            mass: 0.0,
            inverse_inertia_local: Mat3::ZERO,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            last_acceleration: Vec3::ZERO,
        }
    }

    /// Create a kinematic body.
    pub fn new_kinematic() -> Self {
        Self {
            body_type: RigidBodyType::Kinematic,
            mass: 0.0,
            inverse_inertia_local: Mat3::ZERO,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            last_acceleration: Vec3::ZERO,
        }
    }

    /// Replace the inertia tensor (body-local coordinates). Stores its
    /// inverse; a singular tensor disables rotation entirely.
    pub fn with_inertia_tensor(mut self, inertia: Mat3) -> Self {
        self.inverse_inertia_local = if inertia.determinant().abs() > f32::EPSILON {
            inertia.inverse()
        } else {
            Mat3::ZERO
        };
        self
    }

    /// Inverse mass; zero for static, kinematic, and massless bodies.
    pub fn inverse_mass(&self) -> f32 {
        if self.body_type == RigidBodyType::Dynamic && self.mass > 0.0 {
            1.0 / self.mass
        } else {
            0.0
        }
    }

    /// Inverse inertia tensor in world coordinates for the given orientation.
    pub fn inverse_inertia_world(&self, rotation: Quat) -> Mat3 {
        if self.body_type != RigidBodyType::Dynamic {
            return Mat3::ZERO;
        }
        let basis = Mat3::from_quat(rotation);
        basis * self.inverse_inertia_local * basis.transpose()
    }

    /// Velocity of the material point at `relative` (world-space offset from
    /// the center of mass).
    pub fn velocity_at_point(&self, relative: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(relative)
    }

    /// Apply an impulse at a point given as a world-space offset from the
    /// center of mass. No-op for bodies with zero inverse mass.
    pub fn apply_impulse_at_point(&mut self, impulse: Vec3, relative: Vec3, rotation: Quat) {
        let inverse_mass = self.inverse_mass();
        if inverse_mass == 0.0 {
            return;
        }
        self.linear_velocity += impulse * inverse_mass;
        self.angular_velocity += self.inverse_inertia_world(rotation) * relative.cross(impulse);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dynamic_inverse_mass() {
        let rb = RigidBody::new_dynamic(2.0);
        assert!((rb.inverse_mass() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_static_and_kinematic_are_immovable() {
        assert_eq!(RigidBody::new_static().inverse_mass(), 0.0);
        assert_eq!(RigidBody::new_kinematic().inverse_mass(), 0.0);
        assert_eq!(
            RigidBody::new_static().inverse_inertia_world(Quat::IDENTITY),
            Mat3::ZERO
        );
    }

    #[test]
    fn test_inverse_inertia_world_rotates_with_body() {
        // Distinct principal moments so rotation is observable
        let rb = RigidBody::new_dynamic(1.0)
            .with_inertia_tensor(Mat3::from_diagonal(Vec3::new(1.0, 2.0, 4.0)));

        let identity = rb.inverse_inertia_world(Quat::IDENTITY);
        assert!((identity.x_axis.x - 1.0).abs() < 1e-6);
        assert!((identity.y_axis.y - 0.5).abs() < 1e-6);

        // Quarter turn about z swaps the x and y moments
        let rotated = rb.inverse_inertia_world(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        assert!((rotated.x_axis.x - 0.5).abs() < 1e-5);
        assert!((rotated.y_axis.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_velocity_at_point() {
        let mut rb = RigidBody::new_dynamic(1.0);
        rb.linear_velocity = Vec3::new(1.0, 0.0, 0.0);
        rb.angular_velocity = Vec3::new(0.0, 0.0, 2.0);

        // omega x r = (0,0,2) x (0,1,0) = (-2,0,0)
        let v = rb.velocity_at_point(Vec3::new(0.0, 1.0, 0.0));
        assert!((v - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_apply_impulse_at_center_of_mass() {
        let mut rb = RigidBody::new_dynamic(2.0);
        rb.apply_impulse_at_point(Vec3::new(4.0, 0.0, 0.0), Vec3::ZERO, Quat::IDENTITY);
        assert!((rb.linear_velocity - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-6);
        assert!(rb.angular_velocity.length() < 1e-6);
    }

    #[test]
    fn test_apply_impulse_off_center_spins() {
        let mut rb = RigidBody::new_dynamic(1.0);
        rb.apply_impulse_at_point(
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Quat::IDENTITY,
        );
        assert!(rb.linear_velocity.length() > 0.0);
        // r x J = (1,0,0) x (0,1,0) = (0,0,1)
        assert!((rb.angular_velocity - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn test_impulse_on_static_body_is_noop() {
        let mut rb = RigidBody::new_static();
        rb.apply_impulse_at_point(Vec3::new(10.0, 0.0, 0.0), Vec3::ZERO, Quat::IDENTITY);
        assert_eq!(rb.linear_velocity, Vec3::ZERO);
        assert_eq!(rb.angular_velocity, Vec3::ZERO);
    }
}
