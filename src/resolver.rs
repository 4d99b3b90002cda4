//! Iterative contact resolver.
//!
//! Two sequential worst-first passes over the contact batch: a penetration
//! pass that applies positional corrections, then a velocity pass that
//! applies impulses. Every correction changes the situation at other contacts
//! sharing a body, so both passes re-select the worst remaining contact after
//! each step and update the cached state of the neighbors, instead of
//! sweeping the batch once. Residual error left when an iteration cap runs
//! out is accepted; the next tick's contacts pick it up again.

use glam::{Mat3, Vec3};

use crate::body::RigidBody;
use crate::contact::Contact;
use crate::transform::Transform;

/// Configuration for the contact resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Cap on penetration-pass iterations. 0 means twice the batch size.
    pub position_iterations: u32,
    /// Cap on velocity-pass iterations. 0 means twice the batch size.
    pub velocity_iterations: u32,
    /// Penetrations below this depth count as resolved. Default: 0.01.
    pub position_epsilon: f32,
    /// Desired velocity changes below this magnitude count as resolved.
    /// Default: 0.01.
    pub velocity_epsilon: f32,
    /// Closing speeds below this threshold resolve without restitution,
    /// suppressing micro-bounces in resting contacts. Default: 0.25.
    pub velocity_limit: f32,
    /// Restitution for contacts that carry no override. Default: 0.0.
    pub restitution: f32,
    /// Friction for contacts that carry no override. Default: 0.0.
    pub friction: f32,
    /// Fraction of the contact's lever arm a positional correction may
    /// rotate through. Default: 0.2.
    pub angular_limit: f32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            position_iterations: 0,
            velocity_iterations: 0,
            position_epsilon: 0.01,
            velocity_epsilon: 0.01,
            velocity_limit: 0.25,
            restitution: 0.0,
            friction: 0.0,
            angular_limit: 0.2,
        }
    }
}

/// The contact resolution routine.
///
/// Holds configuration only, so one instance can serve the whole simulation
/// across ticks. [`resolve_contacts`](Self::resolve_contacts) is the sole
/// entry point, called once per tick with the batch collision detection
/// produced for that tick.
#[derive(Debug, Default)]
pub struct ContactResolver {
    config: ResolverConfig,
}

impl ContactResolver {
    /// Create a resolver with the given configuration.
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Resolve a batch of contacts for penetration and velocity.
    ///
    /// Mutates body transforms and velocities in place, and each contact's
    /// `penetration` as corrections are applied. An empty batch is a no-op.
    /// Contacts referencing despawned entities are skipped.
    pub fn resolve_contacts(
        &self,
        contacts: &mut [Contact],
        world: &mut hecs::World,
        duration: f32,
    ) {
        debug_assert!(duration > 0.0, "resolve_contacts needs a positive duration");
        if contacts.is_empty() {
            return;
        }
        #[cfg(debug_assertions)]
        Self::validate_batch(contacts);

        tracing::trace!(contacts = contacts.len(), "resolving contact batch");

        self.prepare_contacts(contacts, world, duration);
        self.resolve_penetrations(contacts, world);
        self.resolve_velocities(contacts, world);
    }

    #[cfg(debug_assertions)]
    fn validate_batch(contacts: &[Contact]) {
        for (index, contact) in contacts.iter().enumerate() {
            if let Err(error) = contact.validate() {
                panic!("contact {index} failed validation: {error}");
            }
        }
    }

    fn iteration_cap(configured: u32, batch_len: usize) -> u32 {
        if configured == 0 {
            (batch_len as u32).saturating_mul(2)
        } else {
            configured
        }
    }

    /// Build each contact's working state: contact-space basis, relative
    /// positions, closing velocity, and the velocity change needed to
    /// resolve it.
    fn prepare_contacts(&self, contacts: &mut [Contact], world: &hecs::World, duration: f32) {
        for contact in contacts.iter_mut() {
            contact.state.active = false;

            let Some(a) = BodyData::fetch(world, contact.body_a) else {
                tracing::warn!(body = ?contact.body_a, "contact references a despawned body, skipping");
                continue;
            };
            let b = match contact.body_b {
                Some(entity) => match BodyData::fetch(world, entity) {
                    Some(data) => Some(data),
                    None => {
                        tracing::warn!(body = ?entity, "contact references a despawned body, skipping");
                        continue;
                    }
                },
                None => None,
            };

            // Nothing to resolve when neither side can move
            if a.inverse_mass == 0.0 && b.map_or(true, |b| b.inverse_mass == 0.0) {
                continue;
            }

            contact.state.active = true;
            contact.state.contact_to_world = contact_basis(contact.normal);
            contact.state.relative_position[0] = contact.point - a.position;
            contact.state.relative_position[1] = match &b {
                Some(b) => contact.point - b.position,
                None => Vec3::ZERO,
            };

            let world_to_contact = contact.state.contact_to_world.transpose();

            let mut velocity = world_to_contact * a.velocity_at(contact.state.relative_position[0]);
            // Velocity the last integration step introduced. Only the planar
            // part feeds the friction calculation; the normal part is
            // discounted through velocity_from_acceleration instead.
            let mut acceleration_velocity = world_to_contact * (a.last_acceleration * duration);
            acceleration_velocity.x = 0.0;
            velocity += acceleration_velocity;

            let mut velocity_from_acceleration = a.last_acceleration.dot(contact.normal) * duration;

            if let Some(b) = &b {
                velocity -= world_to_contact * b.velocity_at(contact.state.relative_position[1]);
                let mut acceleration_velocity = world_to_contact * (b.last_acceleration * duration);
                acceleration_velocity.x = 0.0;
                velocity -= acceleration_velocity;
                velocity_from_acceleration -= b.last_acceleration.dot(contact.normal) * duration;
            }

            contact.state.contact_velocity = velocity;
            contact.state.velocity_from_acceleration = velocity_from_acceleration;
            self.update_desired_delta_velocity(contact);
        }
    }

    /// Recompute the velocity change a contact needs from its current closing
    /// velocity. Slow approaches resolve without restitution, and the part of
    /// the closing velocity the last integration step introduced does not
    /// rebound.
    fn update_desired_delta_velocity(&self, contact: &mut Contact) {
        let closing = contact.state.contact_velocity.x;
        let mut restitution = contact.restitution.unwrap_or(self.config.restitution);
        if closing.abs() < self.config.velocity_limit {
            restitution = 0.0;
        }
        contact.state.desired_delta_velocity =
            -closing - restitution * (closing - contact.state.velocity_from_acceleration);
    }

    /// Penetration pass: repeatedly pick the deepest contact, move its bodies
    /// apart, and propagate the geometry change to every contact sharing a
    /// body.
    fn resolve_penetrations(&self, contacts: &mut [Contact], world: &mut hecs::World) {
        let cap = Self::iteration_cap(self.config.position_iterations, contacts.len());

        for _ in 0..cap {
            // Strict comparison keeps batch order on ties
            let mut worst = self.config.position_epsilon;
            let mut index = None;
            for (i, contact) in contacts.iter().enumerate() {
                if contact.state.active && contact.penetration > worst {
                    worst = contact.penetration;
                    index = Some(i);
                }
            }
            let Some(index) = index else {
                return;
            };

            let (linear_change, angular_change) = self.apply_position_change(&contacts[index], world);

            let moved = [Some(contacts[index].body_a), contacts[index].body_b];
            for contact in contacts.iter_mut() {
                if !contact.state.active {
                    continue;
                }
                let slots = [Some(contact.body_a), contact.body_b];
                for (slot, entity) in slots.iter().enumerate() {
                    let Some(entity) = *entity else { continue };
                    for (moved_slot, moved_entity) in moved.iter().enumerate() {
                        if *moved_entity != Some(entity) {
                            continue;
                        }
                        let delta = linear_change[moved_slot]
                            + angular_change[moved_slot]
                                .cross(contact.state.relative_position[slot]);
                        let sign = if slot == 0 { -1.0 } else { 1.0 };
                        contact.penetration += sign * delta.dot(contact.normal);
                        contact.state.relative_position[slot] -= linear_change[moved_slot];
                    }
                }
            }
        }

        let residual = contacts
            .iter()
            .filter(|c| c.state.active)
            .map(|c| c.penetration)
            .fold(0.0f32, f32::max);
        tracing::debug!(residual, "penetration pass exhausted its iteration budget");
    }

    /// Move the contact's bodies apart by its penetration depth, split
    /// between them in proportion to how much each can give at the contact
    /// point, linearly and through rotation. Returns the applied changes for
    /// neighbor bookkeeping.
    fn apply_position_change(
        &self,
        contact: &Contact,
        world: &mut hecs::World,
    ) -> ([Vec3; 2], [Vec3; 2]) {
        let mut linear_change = [Vec3::ZERO; 2];
        let mut angular_change = [Vec3::ZERO; 2];

        let bodies = [
            BodyData::fetch(world, contact.body_a),
            contact.body_b.and_then(|entity| BodyData::fetch(world, entity)),
        ];

        let mut linear_inertia = [0.0f32; 2];
        let mut angular_inertia = [0.0f32; 2];
        let mut total_inertia = 0.0;
        for (i, body) in bodies.iter().enumerate() {
            let Some(body) = body else { continue };
            let relative = contact.state.relative_position[i];
            angular_inertia[i] = (body.inverse_inertia_world * relative.cross(contact.normal))
                .cross(relative)
                .dot(contact.normal);
            linear_inertia[i] = body.inverse_mass;
            total_inertia += linear_inertia[i] + angular_inertia[i];
        }
        if total_inertia <= 0.0 {
            return (linear_change, angular_change);
        }

        for (i, body) in bodies.iter().enumerate() {
            let Some(body) = body else { continue };
            if body.inverse_mass == 0.0 {
                continue;
            }
            let sign = if i == 0 { 1.0 } else { -1.0 };
            let mut angular_move = sign * contact.penetration * (angular_inertia[i] / total_inertia);
            let mut linear_move = sign * contact.penetration * (linear_inertia[i] / total_inertia);

            // A contact far from the center of mass would turn a small depth
            // into a large rotation; cap the angular share and take the rest
            // as translation
            let relative = contact.state.relative_position[i];
            let lever = relative - contact.normal * relative.dot(contact.normal);
            let max_angular_move = self.config.angular_limit * lever.length();
            if angular_move.abs() > max_angular_move {
                let total_move = angular_move + linear_move;
                angular_move = angular_move.clamp(-max_angular_move, max_angular_move);
                linear_move = total_move - angular_move;
            }

            linear_change[i] = contact.normal * linear_move;
            angular_change[i] = if angular_move == 0.0 || angular_inertia[i] <= 0.0 {
                Vec3::ZERO
            } else {
                let direction = relative.cross(contact.normal);
                (body.inverse_inertia_world * direction) * (angular_move / angular_inertia[i])
            };

            if let Ok(mut transform) = world.get::<&mut Transform>(body.entity) {
                transform.translate(linear_change[i]);
                transform.rotate_scaled_axis(angular_change[i], 1.0);
            }
        }

        (linear_change, angular_change)
    }

    /// Velocity pass: repeatedly pick the contact with the largest required
    /// velocity change, apply the matching impulse, and propagate the
    /// velocity change to every contact sharing a body.
    fn resolve_velocities(&self, contacts: &mut [Contact], world: &mut hecs::World) {
        let cap = Self::iteration_cap(self.config.velocity_iterations, contacts.len());

        for _ in 0..cap {
            let mut worst = self.config.velocity_epsilon;
            let mut index = None;
            for (i, contact) in contacts.iter().enumerate() {
                if contact.state.active && contact.state.desired_delta_velocity > worst {
                    worst = contact.state.desired_delta_velocity;
                    index = Some(i);
                }
            }
            let Some(index) = index else {
                return;
            };

            let (velocity_change, rotation_change) =
                self.apply_velocity_change(&contacts[index], world);

            let moved = [Some(contacts[index].body_a), contacts[index].body_b];
            for contact in contacts.iter_mut() {
                if !contact.state.active {
                    continue;
                }
                let slots = [Some(contact.body_a), contact.body_b];
                for (slot, entity) in slots.iter().enumerate() {
                    let Some(entity) = *entity else { continue };
                    for (moved_slot, moved_entity) in moved.iter().enumerate() {
                        if *moved_entity != Some(entity) {
                            continue;
                        }
                        let delta = velocity_change[moved_slot]
                            + rotation_change[moved_slot]
                                .cross(contact.state.relative_position[slot]);
                        let sign = if slot == 0 { 1.0 } else { -1.0 };
                        contact.state.contact_velocity +=
                            contact.state.contact_to_world.transpose() * delta * sign;
                        self.update_desired_delta_velocity(contact);
                    }
                }
            }
        }

        let residual = contacts
            .iter()
            .filter(|c| c.state.active)
            .map(|c| c.state.desired_delta_velocity)
            .fold(0.0f32, f32::max);
        tracing::debug!(residual, "velocity pass exhausted its iteration budget");
    }

    /// Compute and apply the impulse that produces the contact's desired
    /// velocity change. Returns the per-body velocity and rotation changes
    /// for neighbor bookkeeping.
    fn apply_velocity_change(
        &self,
        contact: &Contact,
        world: &mut hecs::World,
    ) -> ([Vec3; 2], [Vec3; 2]) {
        let mut velocity_change = [Vec3::ZERO; 2];
        let mut rotation_change = [Vec3::ZERO; 2];

        let bodies = [
            BodyData::fetch(world, contact.body_a),
            contact.body_b.and_then(|entity| BodyData::fetch(world, entity)),
        ];

        let friction = contact.friction.unwrap_or(self.config.friction);
        let impulse_contact = if friction == 0.0 {
            Self::frictionless_impulse(contact, &bodies)
        } else {
            Self::friction_impulse(contact, &bodies, friction)
        };
        let impulse = contact.state.contact_to_world * impulse_contact;

        if let Some(body) = &bodies[0] {
            if body.inverse_mass > 0.0 {
                let torque = contact.state.relative_position[0].cross(impulse);
                rotation_change[0] = body.inverse_inertia_world * torque;
                velocity_change[0] = impulse * body.inverse_mass;
                if let Ok(mut rigid_body) = world.get::<&mut RigidBody>(body.entity) {
                    rigid_body.linear_velocity += velocity_change[0];
                    rigid_body.angular_velocity += rotation_change[0];
                }
            }
        }
        if let Some(body) = &bodies[1] {
            if body.inverse_mass > 0.0 {
                let torque = impulse.cross(contact.state.relative_position[1]);
                rotation_change[1] = body.inverse_inertia_world * torque;
                velocity_change[1] = impulse * -body.inverse_mass;
                if let Ok(mut rigid_body) = world.get::<&mut RigidBody>(body.entity) {
                    rigid_body.linear_velocity += velocity_change[1];
                    rigid_body.angular_velocity += rotation_change[1];
                }
            }
        }

        (velocity_change, rotation_change)
    }

    /// Impulse along the contact normal only.
    fn frictionless_impulse(contact: &Contact, bodies: &[Option<BodyData>; 2]) -> Vec3 {
        let mut delta_velocity = 0.0;
        for (i, body) in bodies.iter().enumerate() {
            let Some(body) = body else { continue };
            let relative = contact.state.relative_position[i];
            let delta_velocity_world =
                (body.inverse_inertia_world * relative.cross(contact.normal)).cross(relative);
            delta_velocity += delta_velocity_world.dot(contact.normal) + body.inverse_mass;
        }
        Vec3::new(
            contact.state.desired_delta_velocity / delta_velocity,
            0.0,
            0.0,
        )
    }

    /// Impulse with tangential friction: build the full 3x3 velocity-per-
    /// unit-impulse matrix in contact coordinates, invert it to find the
    /// impulse that kills both approach and sliding, then clamp to the
    /// Coulomb friction cone.
    fn friction_impulse(contact: &Contact, bodies: &[Option<BodyData>; 2], friction: f32) -> Vec3 {
        let mut inverse_mass = 0.0;
        let mut delta_velocity_world = Mat3::ZERO;
        for (i, body) in bodies.iter().enumerate() {
            let Some(body) = body else { continue };
            let impulse_to_torque = skew_symmetric(contact.state.relative_position[i]);
            delta_velocity_world +=
                -(impulse_to_torque * body.inverse_inertia_world * impulse_to_torque);
            inverse_mass += body.inverse_mass;
        }

        let mut delta_velocity = contact.state.contact_to_world.transpose()
            * delta_velocity_world
            * contact.state.contact_to_world;
        delta_velocity.x_axis.x += inverse_mass;
        delta_velocity.y_axis.y += inverse_mass;
        delta_velocity.z_axis.z += inverse_mass;

        let impulse_matrix = delta_velocity.inverse();

        let kill = Vec3::new(
            contact.state.desired_delta_velocity,
            -contact.state.contact_velocity.y,
            -contact.state.contact_velocity.z,
        );
        let mut impulse_contact = impulse_matrix * kill;

        let planar_impulse =
            (impulse_contact.y * impulse_contact.y + impulse_contact.z * impulse_contact.z).sqrt();
        if planar_impulse > impulse_contact.x * friction {
            // Outside the cone: slide with dynamic friction, re-deriving the
            // normal impulse with the friction coupling folded in
            impulse_contact.y /= planar_impulse;
            impulse_contact.z /= planar_impulse;
            impulse_contact.x = delta_velocity.x_axis.x
                + delta_velocity.y_axis.x * friction * impulse_contact.y
                + delta_velocity.z_axis.x * friction * impulse_contact.z;
            impulse_contact.x = contact.state.desired_delta_velocity / impulse_contact.x;
            impulse_contact.y *= friction * impulse_contact.x;
            impulse_contact.z *= friction * impulse_contact.x;
        }

        impulse_contact
    }
}

/// Cached body state for resolver calculations.
#[derive(Clone, Copy)]
struct BodyData {
    entity: hecs::Entity,
    inverse_mass: f32,
    inverse_inertia_world: Mat3,
    position: Vec3,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
    last_acceleration: Vec3,
}

impl BodyData {
    fn fetch(world: &hecs::World, entity: hecs::Entity) -> Option<Self> {
        let body = world.get::<&RigidBody>(entity).ok()?;
        let transform = world.get::<&Transform>(entity).ok()?;
        Some(Self {
            entity,
            inverse_mass: body.inverse_mass(),
            inverse_inertia_world: body.inverse_inertia_world(transform.rotation),
            position: transform.position,
            linear_velocity: body.linear_velocity,
            angular_velocity: body.angular_velocity,
            last_acceleration: body.last_acceleration,
        })
    }

    fn velocity_at(&self, relative: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(relative)
    }
}

/// Orthonormal basis whose first column is the contact normal. The tangent
/// pair is arbitrary but deterministic for a given normal.
fn contact_basis(normal: Vec3) -> Mat3 {
    let tangent_a = normal.any_orthonormal_vector();
    let tangent_b = normal.cross(tangent_a);
    Mat3::from_cols(normal, tangent_a, tangent_b)
}

/// Matrix M such that M * v == axis x v.
fn skew_symmetric(axis: Vec3) -> Mat3 {
    Mat3::from_cols(
        Vec3::new(0.0, axis.z, -axis.y),
        Vec3::new(-axis.z, 0.0, axis.x),
        Vec3::new(axis.y, -axis.x, 0.0),
    )
}
