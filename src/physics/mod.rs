//! A small rigid-body world.
//!
//! Just enough dynamics for the connector scene: dynamic and kinematic
//! bodies built from ball and cuboid colliders, a sequential-impulse
//! contact solver, damping, and sleeping. Bodies implement
//! [`RigidBodyProxy`](crate::body::RigidBodyProxy) so the frame controllers
//! can drive them through [`PhysicsWorld::get_mut`].
//!
//! ```
//! use connectors::physics::{Collider, PhysicsWorld, RigidBodyBuilder};
//! use connectors::{RigidBodyProxy, Vec3};
//!
//! let mut world = PhysicsWorld::new();
//! let ball = world.insert(
//!     RigidBodyBuilder::dynamic()
//!         .translation(Vec3::new(2.0, 0.0, 0.0))
//!         .collider(Collider::ball(0.5))
//!         .build(),
//! );
//!
//! world.get_mut(ball).unwrap().apply_impulse(Vec3::new(-0.4, 0.0, 0.0), true);
//! world.step(1.0 / 60.0);
//! assert!(world.get(ball).unwrap().translation().x < 2.0);
//! ```

mod collider;
mod contact;
mod rigid_body;
mod solver;
mod world;

pub use collider::{Collider, ColliderShape};
pub use rigid_body::{BodyType, RigidBody, RigidBodyBuilder};
pub use world::{BodyHandle, IntegrationParameters, PhysicsWorld};
