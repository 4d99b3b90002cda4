//! Contact data produced by collision detection and consumed by the resolver.

use glam::{Mat3, Vec3};
use thiserror::Error;

/// Tolerance on the squared length of a contact normal before it is rejected
/// as non-unit.
const NORMAL_TOLERANCE: f32 = 1e-3;

/// Errors reported by [`Contact::validate`].
#[derive(Debug, Error)]
pub enum ContactError {
    #[error("contact normal must have unit length, got {0}")]
    NonUnitNormal(f32),
    #[error("penetration must be non-negative, got {0}")]
    NegativePenetration(f32),
}

/// One interpenetration event between a body and either a second body or the
/// immovable environment.
///
/// Produced fresh by collision detection every tick, consumed entirely by
/// [`ContactResolver::resolve_contacts`](crate::ContactResolver::resolve_contacts)
/// within that tick, then discarded. The resolver updates `penetration` in
/// place while it works, so a resolved batch reads back with near-zero depths.
#[derive(Debug, Clone)]
pub struct Contact {
    /// First body. The contact normal points toward this body.
    pub body_a: hecs::Entity,
    /// Second body, or `None` for contacts against the static environment.
    pub body_b: Option<hecs::Entity>,
    /// World-space contact point (midway between the interpenetrating points
    /// when both bodies are present).
    pub point: Vec3,
    /// Unit separation direction, from the second body toward the first.
    pub normal: Vec3,
    /// Depth of overlap along `normal`. Non-negative.
    pub penetration: f32,
    /// Per-contact restitution; `None` uses the resolver default.
    pub restitution: Option<f32>,
    /// Per-contact friction; `None` uses the resolver default.
    pub friction: Option<f32>,
    /// Working state owned by the resolver, rebuilt on every resolve call.
    pub(crate) state: ContactState,
}

impl Contact {
    /// Create a contact with default material properties.
    pub fn new(
        body_a: hecs::Entity,
        body_b: Option<hecs::Entity>,
        point: Vec3,
        normal: Vec3,
        penetration: f32,
    ) -> Self {
        Self {
            body_a,
            body_b,
            point,
            normal,
            penetration,
            restitution: None,
            friction: None,
            state: ContactState::default(),
        }
    }

    /// Check the invariants collision detection must uphold. The resolver
    /// runs this over the whole batch in debug builds only; release builds
    /// trust the input.
    pub fn validate(&self) -> Result<(), ContactError> {
        let length_sq = self.normal.length_squared();
        if (length_sq - 1.0).abs() > NORMAL_TOLERANCE {
            return Err(ContactError::NonUnitNormal(length_sq.sqrt()));
        }
        if self.penetration < 0.0 {
            return Err(ContactError::NegativePenetration(self.penetration));
        }
        Ok(())
    }
}

/// Per-contact state computed by the resolver's prepare pass and kept
/// consistent across corrections within one resolve call. Never persisted
/// between ticks.
#[derive(Debug, Clone, Default)]
pub(crate) struct ContactState {
    /// False until prepare finds both bodies alive and at least one movable.
    pub(crate) active: bool,
    /// Orthonormal basis whose first column is the contact normal; transforms
    /// contact-local coordinates to world coordinates.
    pub(crate) contact_to_world: Mat3,
    /// Closing velocity at the contact point, in contact-local coordinates.
    pub(crate) contact_velocity: Vec3,
    /// Change in closing velocity required to resolve this contact.
    pub(crate) desired_delta_velocity: f32,
    /// Closing velocity contributed by the last integration step; constant
    /// while impulses are applied, so cached here from the prepare pass.
    pub(crate) velocity_from_acceleration: f32,
    /// Contact point relative to each body's center of mass, world-space.
    /// Second entry stays zero for single-body contacts.
    pub(crate) relative_position: [Vec3; 2],
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_entity() -> hecs::Entity {
        let mut world = hecs::World::new();
        world.spawn((0u32,))
    }

    #[test]
    fn test_new_uses_default_materials() {
        let contact = Contact::new(dummy_entity(), None, Vec3::ZERO, Vec3::Y, 0.1);
        assert!(contact.restitution.is_none());
        assert!(contact.friction.is_none());
        assert!(!contact.state.active);
    }

    #[test]
    fn test_validate_accepts_unit_normal() {
        let contact = Contact::new(
            dummy_entity(),
            None,
            Vec3::ZERO,
            Vec3::new(1.0, 2.0, 3.0).normalize(),
            0.0,
        );
        assert!(contact.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_unit_normal() {
        let contact = Contact::new(dummy_entity(), None, Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0), 0.1);
        assert!(matches!(
            contact.validate(),
            Err(ContactError::NonUnitNormal(_))
        ));
    }

    #[test]
    fn test_validate_rejects_negative_penetration() {
        let contact = Contact::new(dummy_entity(), None, Vec3::ZERO, Vec3::Y, -0.5);
        assert!(matches!(
            contact.validate(),
            Err(ContactError::NegativePenetration(_))
        ));
    }
}
