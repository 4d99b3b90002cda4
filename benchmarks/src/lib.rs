//! Shared setup helpers for quell benchmarks.
//!
//! ## Running
//!
//! Wall-clock time (criterion):
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench resolver
//!
//! iai-callgrind (instruction counts, requires valgrind):
//!   cargo install iai-callgrind-runner
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench resolver_iai
//!
//! Filter by group:
//!   cargo bench --manifest-path benchmarks/Cargo.toml --bench resolver -- stack

use glam::Vec3;
use quell::{Contact, ContactResolver, ResolverConfig, RigidBody, Transform};

/// Vertical stack of `n` unit boxes on a static ground, with a contact
/// between each consecutive pair. Every correction disturbs the neighbors,
/// which is the resolver's worst case.
pub fn setup_stack(n: usize) -> (hecs::World, Vec<Contact>) {
    let mut world = hecs::World::new();
    let ground = world.spawn((
        Transform::from_position(Vec3::new(0.0, -0.5, 0.0)),
        RigidBody::new_static(),
    ));

    let mut bodies = Vec::with_capacity(n);
    for i in 0..n {
        let mut body = RigidBody::new_dynamic(1.0);
        body.linear_velocity = Vec3::new(0.0, -1.0, 0.0);
        let entity = world.spawn((
            Transform::from_position(Vec3::new(0.0, 0.5 + i as f32, 0.0)),
            body,
        ));
        bodies.push(entity);
    }

    let mut contacts = Vec::with_capacity(n);
    contacts.push(Contact::new(bodies[0], Some(ground), Vec3::ZERO, Vec3::Y, 0.01));
    for i in 1..n {
        contacts.push(Contact::new(
            bodies[i],
            Some(bodies[i - 1]),
            Vec3::new(0.0, i as f32, 0.0),
            Vec3::Y,
            0.01,
        ));
    }

    (world, contacts)
}

/// `n` independent bodies, each with a single environment contact and
/// deterministic depth/speed jitter. No shared bodies, so contacts resolve
/// without coupling.
pub fn setup_pile(n: usize) -> (hecs::World, Vec<Contact>) {
    let mut world = hecs::World::new();
    let mut contacts = Vec::with_capacity(n);
    for i in 0..n {
        let x = (i % 32) as f32 * 2.0;
        let z = (i / 32) as f32 * 2.0;
        let mut body = RigidBody::new_dynamic(1.0);
        body.linear_velocity = Vec3::new(0.0, -0.5 - (i % 7) as f32 * 0.25, 0.0);
        let entity = world.spawn((Transform::from_position(Vec3::new(x, 0.45, z)), body));
        contacts.push(Contact::new(
            entity,
            None,
            Vec3::new(x, -0.05, z),
            Vec3::Y,
            0.01 + (i % 5) as f32 * 0.01,
        ));
    }
    (world, contacts)
}

/// Pile scene with per-contact friction, exercising the 3x3 impulse path.
pub fn setup_pile_with_friction(n: usize, friction: f32) -> (hecs::World, Vec<Contact>) {
    let (mut world, mut contacts) = setup_pile(n);
    for (i, contact) in contacts.iter_mut().enumerate() {
        contact.friction = Some(friction);
        // Give every body some sideways sliding to resolve
        let entity = contact.body_a;
        if let Ok(mut body) = world.get::<&mut RigidBody>(entity) {
            body.linear_velocity.x = 0.5 + (i % 3) as f32 * 0.5;
        }
    }
    (world, contacts)
}

/// Resolver with fixed iteration caps for both passes.
pub fn resolver_with_iterations(iterations: u32) -> ContactResolver {
    ContactResolver::new(ResolverConfig {
        position_iterations: iterations,
        velocity_iterations: iterations,
        ..ResolverConfig::default()
    })
}
