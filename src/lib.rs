//! Quell
//!
//! A rigid body contact resolution engine.
//!
//! Given a batch of contacts produced by collision detection (point, normal,
//! penetration depth), the resolver applies the positional corrections and
//! impulses needed to separate interpenetrating bodies and stop them from
//! approaching along the contact normal, with optional rebound.
//!
//! # Architecture
//!
//! Resolution sits between collision detection and integration in a fixed
//! timestep loop:
//!
//! 1. Collision detection (external) fills an ordered batch of [`Contact`]s
//! 2. Prepare: per-contact frame basis, closing velocity, desired velocity change
//! 3. Penetration pass: worst-first positional corrections until converged
//!    or out of iterations
//! 4. Velocity pass: worst-first impulses until converged or out of iterations
//! 5. The integrator (external) consumes the corrected positions and velocities
//!
//! Bodies live in a [`hecs::World`] as a [`RigidBody`] + [`Transform`]
//! component pair; contacts reference them by entity. Resolving one contact
//! disturbs every other contact sharing a body, so both passes re-select the
//! worst remaining contact after each correction rather than sweeping the
//! batch once.

pub mod body;
pub mod contact;
pub mod resolver;
pub mod transform;

pub use body::{RigidBody, RigidBodyType};
pub use contact::{Contact, ContactError};
pub use resolver::{ContactResolver, ResolverConfig};
pub use transform::Transform;

// Re-export glam for convenience
pub use glam;
