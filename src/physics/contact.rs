//! Narrow-phase contact generation.
//!
//! Ball/ball and ball/cuboid are exact. Cuboid/cuboid falls back to the
//! overlap of the two world-space AABBs, which is exact for axis-aligned
//! boxes and conservative for rotated ones.

use glam::Vec3;

use super::collider::{ColliderShape, WorldCollider};

/// A penetrating contact between two bodies.
#[derive(Debug, Clone)]
pub(crate) struct Contact {
    pub a: usize,
    pub b: usize,
    /// Unit normal pointing from `a` toward `b`.
    pub normal: Vec3,
    pub depth: f32,
    pub friction: f32,
    // Accumulated impulses, clamped across solver iterations.
    pub normal_impulse: f32,
    pub tangent_impulse: [f32; 2],
}

impl Contact {
    fn new(a: &WorldCollider, b: &WorldCollider, normal: Vec3, depth: f32) -> Self {
        Self {
            a: a.body,
            b: b.body,
            normal,
            depth,
            friction: (a.friction + b.friction) * 0.5,
            normal_impulse: 0.0,
            tangent_impulse: [0.0; 2],
        }
    }
}

/// Contact between two colliders, if they penetrate.
pub(crate) fn collide(a: &WorldCollider, b: &WorldCollider) -> Option<Contact> {
    if !a.aabb_overlaps(b) {
        return None;
    }
    let (normal, depth) = match (a.shape, b.shape) {
        (ColliderShape::Ball { radius: ra }, ColliderShape::Ball { radius: rb }) => {
            ball_ball(a.center, ra, b.center, rb)?
        }
        (ColliderShape::Ball { radius }, ColliderShape::Cuboid { half_extents }) => {
            let (n, d) = ball_cuboid(a.center, radius, b, half_extents)?;
            (-n, d)
        }
        (ColliderShape::Cuboid { half_extents }, ColliderShape::Ball { radius }) => {
            ball_cuboid(b.center, radius, a, half_extents)?
        }
        (ColliderShape::Cuboid { .. }, ColliderShape::Cuboid { .. }) => aabb_aabb(a, b)?,
    };
    Some(Contact::new(a, b, normal, depth))
}

fn ball_ball(pa: Vec3, ra: f32, pb: Vec3, rb: f32) -> Option<(Vec3, f32)> {
    let d = pb - pa;
    let dist2 = d.length_squared();
    let rsum = ra + rb;
    if dist2 >= rsum * rsum {
        return None;
    }
    let dist = dist2.sqrt();
    let normal = if dist > 1.0e-6 { d / dist } else { Vec3::X };
    Some((normal, rsum - dist))
}

/// Returns the normal pointing from the cuboid toward the ball.
fn ball_cuboid(center: Vec3, radius: f32, cuboid: &WorldCollider, half: Vec3) -> Option<(Vec3, f32)> {
    let local = cuboid.rotation.inverse() * (center - cuboid.center);
    let clamped = local.clamp(-half, half);
    let diff = local - clamped;
    let dist2 = diff.length_squared();

    if dist2 > 1.0e-12 {
        if dist2 >= radius * radius {
            return None;
        }
        let dist = dist2.sqrt();
        return Some((cuboid.rotation * (diff / dist), radius - dist));
    }

    // Ball centre inside the box: leave through the nearest face.
    let gap = half - local.abs();
    let axis = if gap.x <= gap.y && gap.x <= gap.z {
        0
    } else if gap.y <= gap.z {
        1
    } else {
        2
    };
    let mut n = Vec3::ZERO;
    n[axis] = if local[axis] >= 0.0 { 1.0 } else { -1.0 };
    Some((cuboid.rotation * n, radius + gap[axis]))
}

fn aabb_aabb(a: &WorldCollider, b: &WorldCollider) -> Option<(Vec3, f32)> {
    let overlap = (a.aabb_max - b.aabb_min).min(b.aabb_max - a.aabb_min);
    let ca = (a.aabb_min + a.aabb_max) * 0.5;
    let cb = (b.aabb_min + b.aabb_max) * 0.5;
    let axis = if overlap.x <= overlap.y && overlap.x <= overlap.z {
        0
    } else if overlap.y <= overlap.z {
        1
    } else {
        2
    };
    let depth = overlap[axis];
    if depth <= 0.0 {
        return None;
    }
    let mut n = Vec3::ZERO;
    n[axis] = if cb[axis] >= ca[axis] { 1.0 } else { -1.0 };
    Some((n, depth))
}
