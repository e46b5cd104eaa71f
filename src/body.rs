//! The seam between the frame controllers and a physics engine.

use glam::Vec3;

/// The three operations a frame controller performs on a physics body.
///
/// [`physics::RigidBody`](crate::physics::RigidBody) implements this; tests
/// and other engines can supply their own.
pub trait RigidBodyProxy {
    /// Current world-space position of the body.
    fn translation(&self) -> Vec3;

    /// Change the body's momentum instantly by `impulse`.
    ///
    /// With `wake == false` a sleeping body is left asleep.
    fn apply_impulse(&mut self, impulse: Vec3, wake: bool);

    /// Position a kinematic body should reach by the end of the next
    /// physics step.
    fn set_next_kinematic_translation(&mut self, translation: Vec3);
}
