//! Connectors: dynamic bodies pulled back toward the origin.
//!
//! Every frame each connector reads its own position and injects an impulse
//! of `-k * position`. With the linear damping on the body this behaves
//! like a loose spring-damper, so the connectors settle into a cluster
//! around the origin instead of drifting off after the pointer shoves them.

use glam::Vec3;

use crate::body::RigidBodyProxy;

/// Tuned restoring strengths per collider family.
///
/// The values are empirical, not derived from mass: the compound box
/// connectors are heavier and need a stronger pull to cluster the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpulseProfile {
    Ball,
    CompoundBox,
}

impl ImpulseProfile {
    pub const BALL_STRENGTH: f32 = 0.2;
    pub const COMPOUND_BOX_STRENGTH: f32 = 0.9;

    pub fn strength(self) -> f32 {
        match self {
            ImpulseProfile::Ball => Self::BALL_STRENGTH,
            ImpulseProfile::CompoundBox => Self::COMPOUND_BOX_STRENGTH,
        }
    }
}

/// Impulse that pulls a body at `position` back toward the origin.
#[inline]
pub fn restoring_impulse(position: Vec3, strength: f32) -> Vec3 {
    -position * strength
}

/// Per-frame controller for one connector body.
#[derive(Debug, Clone)]
pub struct ConnectorController {
    strength: f32,
}

impl ConnectorController {
    pub fn new(strength: f32) -> Self {
        Self { strength }
    }

    pub fn from_profile(profile: ImpulseProfile) -> Self {
        Self::new(profile.strength())
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    /// Run once per frame after the physics step.
    ///
    /// Returns the impulse applied, or `None` if the body is not mounted.
    /// The impulse is applied without waking a sleeping body.
    pub fn update<B: RigidBodyProxy + ?Sized>(&self, body: Option<&mut B>) -> Option<Vec3> {
        let body = body?;
        let impulse = restoring_impulse(body.translation(), self.strength);
        body.apply_impulse(impulse, false);
        Some(impulse)
    }
}
