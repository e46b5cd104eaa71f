//! Rigid bodies and their builder.

use glam::{Quat, Vec3};

use super::collider::Collider;
use crate::body::RigidBodyProxy;

/// How a body takes part in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    /// Moved by forces, impulses, and contacts.
    Dynamic,
    /// Moved only by explicit position targets; pushes dynamic bodies but is
    /// never pushed back.
    KinematicPositionBased,
}

#[derive(Debug, Clone)]
pub struct RigidBody {
    pub(crate) body_type: BodyType,
    pub(crate) translation: Vec3,
    pub(crate) rotation: Quat,
    pub(crate) linvel: Vec3,
    pub(crate) angvel: Vec3,
    pub(crate) linear_damping: f32,
    pub(crate) angular_damping: f32,
    pub(crate) friction: f32,
    pub(crate) colliders: Vec<Collider>,
    pub(crate) inv_mass: f32,
    pub(crate) next_translation: Option<Vec3>,
    pub(crate) can_sleep: bool,
    pub(crate) sleeping: bool,
    pub(crate) sleep_timer: f32,
}

impl RigidBody {
    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    pub fn is_dynamic(&self) -> bool {
        self.body_type == BodyType::Dynamic
    }

    pub fn is_kinematic(&self) -> bool {
        self.body_type == BodyType::KinematicPositionBased
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn linvel(&self) -> Vec3 {
        self.linvel
    }

    pub fn angvel(&self) -> Vec3 {
        self.angvel
    }

    pub fn set_linvel(&mut self, linvel: Vec3, wake: bool) {
        if wake {
            self.wake_up();
        }
        self.linvel = linvel;
    }

    /// Teleport the body. Velocities are kept.
    pub fn set_translation(&mut self, translation: Vec3, wake: bool) {
        if wake {
            self.wake_up();
        }
        self.translation = translation;
    }

    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }

    /// Total mass; zero for kinematic bodies.
    pub fn mass(&self) -> f32 {
        if self.inv_mass > 0.0 {
            1.0 / self.inv_mass
        } else {
            0.0
        }
    }

    pub fn linear_damping(&self) -> f32 {
        self.linear_damping
    }

    pub fn angular_damping(&self) -> f32 {
        self.angular_damping
    }

    pub fn friction(&self) -> f32 {
        self.friction
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    pub fn wake_up(&mut self) {
        self.sleeping = false;
        self.sleep_timer = 0.0;
    }

    pub fn sleep(&mut self) {
        if self.is_dynamic() {
            self.sleeping = true;
            self.linvel = Vec3::ZERO;
            self.angvel = Vec3::ZERO;
        }
    }

    /// Inverse mass as seen by the solver this step.
    #[inline]
    pub(crate) fn effective_inv_mass(&self) -> f32 {
        if self.is_dynamic() && !self.sleeping {
            self.inv_mass
        } else {
            0.0
        }
    }
}

impl RigidBodyProxy for RigidBody {
    fn translation(&self) -> Vec3 {
        self.translation
    }

    fn apply_impulse(&mut self, impulse: Vec3, wake: bool) {
        if !self.is_dynamic() {
            return;
        }
        if self.sleeping {
            if !wake {
                return;
            }
            self.wake_up();
        }
        self.linvel += impulse * self.inv_mass;
    }

    fn set_next_kinematic_translation(&mut self, translation: Vec3) {
        if self.is_kinematic() {
            self.next_translation = Some(translation);
        }
    }
}

/// Builder for [`RigidBody`].
///
/// # Example
///
/// ```
/// use connectors::physics::{Collider, RigidBodyBuilder};
/// use connectors::Vec3;
///
/// let body = RigidBodyBuilder::dynamic()
///     .translation(Vec3::new(1.0, 2.0, 0.0))
///     .linear_damping(4.0)
///     .collider(Collider::ball(0.5))
///     .build();
/// assert!(body.mass() > 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct RigidBodyBuilder {
    body_type: BodyType,
    translation: Vec3,
    rotation: Quat,
    linvel: Vec3,
    linear_damping: f32,
    angular_damping: f32,
    friction: f32,
    colliders: Vec<Collider>,
    can_sleep: bool,
}

impl RigidBodyBuilder {
    pub fn new(body_type: BodyType) -> Self {
        Self {
            body_type,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            linvel: Vec3::ZERO,
            linear_damping: 0.0,
            angular_damping: 0.0,
            friction: 0.5,
            colliders: Vec::new(),
            can_sleep: true,
        }
    }

    pub fn dynamic() -> Self {
        Self::new(BodyType::Dynamic)
    }

    pub fn kinematic_position_based() -> Self {
        Self::new(BodyType::KinematicPositionBased)
    }

    pub fn translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn linvel(mut self, linvel: Vec3) -> Self {
        self.linvel = linvel;
        self
    }

    pub fn linear_damping(mut self, damping: f32) -> Self {
        self.linear_damping = damping.max(0.0);
        self
    }

    pub fn angular_damping(mut self, damping: f32) -> Self {
        self.angular_damping = damping.max(0.0);
        self
    }

    pub fn friction(mut self, friction: f32) -> Self {
        self.friction = friction.max(0.0);
        self
    }

    pub fn collider(mut self, collider: Collider) -> Self {
        self.colliders.push(collider);
        self
    }

    pub fn colliders(mut self, colliders: impl IntoIterator<Item = Collider>) -> Self {
        self.colliders.extend(colliders);
        self
    }

    pub fn can_sleep(mut self, can_sleep: bool) -> Self {
        self.can_sleep = can_sleep;
        self
    }

    pub fn build(self) -> RigidBody {
        let inv_mass = match self.body_type {
            BodyType::Dynamic => {
                let mass: f32 = self.colliders.iter().map(Collider::mass).sum();
                // A dynamic body without volume still needs a finite mass.
                if mass > 0.0 {
                    1.0 / mass
                } else {
                    1.0
                }
            }
            BodyType::KinematicPositionBased => 0.0,
        };
        RigidBody {
            body_type: self.body_type,
            translation: self.translation,
            rotation: self.rotation,
            linvel: self.linvel,
            angvel: Vec3::ZERO,
            linear_damping: self.linear_damping,
            angular_damping: self.angular_damping,
            friction: self.friction,
            colliders: self.colliders,
            inv_mass,
            next_translation: None,
            can_sleep: self.can_sleep,
            sleeping: false,
            sleep_timer: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impulse_changes_velocity_by_inverse_mass() {
        let mut body = RigidBodyBuilder::dynamic()
            .collider(Collider::cuboid(0.5, 0.5, 0.5).with_density(2.0))
            .build();
        assert!((body.mass() - 2.0).abs() < 1e-6);
        body.apply_impulse(Vec3::new(1.0, 0.0, 0.0), true);
        assert!((body.linvel() - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_dynamic_body_without_colliders_has_unit_mass() {
        let body = RigidBodyBuilder::dynamic().build();
        assert_eq!(body.mass(), 1.0);
    }

    #[test]
    fn test_kinematic_ignores_impulses() {
        let mut body = RigidBodyBuilder::kinematic_position_based()
            .collider(Collider::ball(1.0))
            .build();
        body.apply_impulse(Vec3::ONE, true);
        assert_eq!(body.linvel(), Vec3::ZERO);
        assert_eq!(body.mass(), 0.0);
    }

    #[test]
    fn test_sleeping_body_keeps_still_without_wake() {
        let mut body = RigidBodyBuilder::dynamic().collider(Collider::ball(0.5)).build();
        body.sleep();

        body.apply_impulse(Vec3::X, false);
        assert!(body.is_sleeping());
        assert_eq!(body.linvel(), Vec3::ZERO);

        body.apply_impulse(Vec3::X, true);
        assert!(!body.is_sleeping());
        assert!(body.linvel().x > 0.0);
    }

    #[test]
    fn test_dynamic_body_ignores_kinematic_target() {
        let mut body = RigidBodyBuilder::dynamic().build();
        body.set_next_kinematic_translation(Vec3::ONE);
        assert!(body.next_translation.is_none());
    }
}
