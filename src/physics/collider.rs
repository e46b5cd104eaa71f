//! Collision shapes attached to rigid bodies.

use glam::{Mat3, Quat, Vec3};

/// Primitive collision shape, in the collider's local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    Ball { radius: f32 },
    Cuboid { half_extents: Vec3 },
}

impl ColliderShape {
    pub fn volume(&self) -> f32 {
        match *self {
            ColliderShape::Ball { radius } => 4.0 / 3.0 * std::f32::consts::PI * radius.powi(3),
            ColliderShape::Cuboid { half_extents } => 8.0 * half_extents.x * half_extents.y * half_extents.z,
        }
    }

    /// Radius of the smallest sphere around the local origin containing the shape.
    pub fn bounding_radius(&self) -> f32 {
        match *self {
            ColliderShape::Ball { radius } => radius,
            ColliderShape::Cuboid { half_extents } => half_extents.length(),
        }
    }
}

/// A shape placed on a body, with its own local offset and rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    pub shape: ColliderShape,
    pub translation: Vec3,
    pub rotation: Quat,
    pub density: f32,
    /// `None` inherits the body's friction.
    pub friction: Option<f32>,
}

impl Collider {
    fn with_shape(shape: ColliderShape) -> Self {
        Self {
            shape,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            density: 1.0,
            friction: None,
        }
    }

    pub fn ball(radius: f32) -> Self {
        Self::with_shape(ColliderShape::Ball { radius })
    }

    pub fn cuboid(hx: f32, hy: f32, hz: f32) -> Self {
        Self::with_shape(ColliderShape::Cuboid {
            half_extents: Vec3::new(hx, hy, hz),
        })
    }

    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = Some(friction);
        self
    }

    pub fn mass(&self) -> f32 {
        self.density * self.shape.volume()
    }
}

/// A collider resolved into world space for one step.
#[derive(Debug, Clone)]
pub(crate) struct WorldCollider {
    /// Slot index of the owning body.
    pub body: usize,
    pub shape: ColliderShape,
    pub center: Vec3,
    pub rotation: Quat,
    pub friction: f32,
    pub aabb_min: Vec3,
    pub aabb_max: Vec3,
}

impl WorldCollider {
    pub fn new(body: usize, collider: &Collider, body_translation: Vec3, body_rotation: Quat, body_friction: f32) -> Self {
        let rotation = body_rotation * collider.rotation;
        let center = body_translation + body_rotation * collider.translation;
        let extent = match collider.shape {
            ColliderShape::Ball { radius } => Vec3::splat(radius),
            ColliderShape::Cuboid { half_extents } => {
                let m = Mat3::from_quat(rotation);
                m.x_axis.abs() * half_extents.x
                    + m.y_axis.abs() * half_extents.y
                    + m.z_axis.abs() * half_extents.z
            }
        };
        Self {
            body,
            shape: collider.shape,
            center,
            rotation,
            friction: collider.friction.unwrap_or(body_friction),
            aabb_min: center - extent,
            aabb_max: center + extent,
        }
    }

    #[inline]
    pub fn aabb_overlaps(&self, other: &WorldCollider) -> bool {
        self.aabb_min.cmple(other.aabb_max).all() && other.aabb_min.cmple(self.aabb_max).all()
    }
}
