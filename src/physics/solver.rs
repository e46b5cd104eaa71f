//! Sequential-impulse contact solver.
//!
//! Contacts are linear only: impulses act through the centre of mass and
//! never spin bodies up. Restitution is zero, so colliding connectors stick
//! together into a cluster rather than bouncing apart.

use glam::Vec3;

use super::contact::Contact;
use super::rigid_body::RigidBody;
use super::world::IntegrationParameters;

#[inline]
fn state(bodies: &[Option<RigidBody>], index: usize) -> (f32, Vec3) {
    bodies[index]
        .as_ref()
        .map(|b| (b.effective_inv_mass(), b.linvel))
        .unwrap_or((0.0, Vec3::ZERO))
}

#[inline]
fn push_velocity(bodies: &mut [Option<RigidBody>], index: usize, delta: Vec3) {
    if let Some(body) = bodies[index].as_mut() {
        body.linvel += delta;
    }
}

#[inline]
fn push_translation(bodies: &mut [Option<RigidBody>], index: usize, delta: Vec3) {
    if let Some(body) = bodies[index].as_mut() {
        body.translation += delta;
    }
}

/// Removes approaching velocity along each contact normal and applies
/// Coulomb friction on the two tangents.
pub(crate) fn solve_velocities(bodies: &mut [Option<RigidBody>], contacts: &mut [Contact], iterations: usize) {
    for _ in 0..iterations {
        for c in contacts.iter_mut() {
            let (ima, va) = state(bodies, c.a);
            let (imb, vb) = state(bodies, c.b);
            let sum = ima + imb;
            if sum <= 0.0 {
                continue;
            }

            let mut rel = vb - va;
            let vn = rel.dot(c.normal);
            let old = c.normal_impulse;
            c.normal_impulse = (old - vn / sum).max(0.0);
            let dn = c.normal_impulse - old;
            let mut p = c.normal * dn;
            rel += c.normal * (dn * sum);

            let max_friction = c.friction * c.normal_impulse;
            let (t1, t2) = c.normal.any_orthonormal_pair();
            for (k, t) in [t1, t2].into_iter().enumerate() {
                let vt = rel.dot(t);
                let old = c.tangent_impulse[k];
                c.tangent_impulse[k] = (old - vt / sum).clamp(-max_friction, max_friction);
                let dt = c.tangent_impulse[k] - old;
                p += t * dt;
                rel += t * (dt * sum);
            }

            push_velocity(bodies, c.a, -p * ima);
            push_velocity(bodies, c.b, p * imb);
        }
    }
}

/// Pushes penetrating bodies apart by a fraction of the remaining depth.
pub(crate) fn correct_positions(bodies: &mut [Option<RigidBody>], contacts: &[Contact], params: &IntegrationParameters) {
    for c in contacts {
        let (ima, _) = state(bodies, c.a);
        let (imb, _) = state(bodies, c.b);
        let sum = ima + imb;
        if sum <= 0.0 {
            continue;
        }
        let depth = (c.depth - params.allowed_penetration).max(0.0);
        if depth == 0.0 {
            continue;
        }
        let p = c.normal * (depth * params.position_correction / sum);
        push_translation(bodies, c.a, -p * ima);
        push_translation(bodies, c.b, p * imb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{Collider, RigidBodyBuilder};

    fn ball(at: Vec3, vel: Vec3) -> Option<RigidBody> {
        Some(
            RigidBodyBuilder::dynamic()
                .translation(at)
                .linvel(vel)
                .friction(0.0)
                .collider(Collider::ball(0.5))
                .build(),
        )
    }

    fn contact(a: usize, b: usize, normal: Vec3, depth: f32) -> Contact {
        Contact {
            a,
            b,
            normal,
            depth,
            friction: 0.0,
            normal_impulse: 0.0,
            tangent_impulse: [0.0; 2],
        }
    }

    #[test]
    fn test_head_on_equal_masses_stop() {
        let mut bodies = vec![ball(Vec3::ZERO, Vec3::X), ball(Vec3::X * 0.9, -Vec3::X)];
        let mut contacts = vec![contact(0, 1, Vec3::X, 0.1)];
        solve_velocities(&mut bodies, &mut contacts, 4);

        let va = bodies[0].as_ref().unwrap().linvel;
        let vb = bodies[1].as_ref().unwrap().linvel;
        assert!(va.length() < 1e-5);
        assert!(vb.length() < 1e-5);
    }

    #[test]
    fn test_separating_bodies_are_left_alone() {
        let mut bodies = vec![ball(Vec3::ZERO, -Vec3::X), ball(Vec3::X * 0.9, Vec3::X)];
        let mut contacts = vec![contact(0, 1, Vec3::X, 0.1)];
        solve_velocities(&mut bodies, &mut contacts, 4);
        assert_eq!(bodies[0].as_ref().unwrap().linvel, -Vec3::X);
        assert_eq!(contacts[0].normal_impulse, 0.0);
    }

    #[test]
    fn test_friction_is_bounded_by_normal_impulse() {
        let mut bodies = vec![
            Some(RigidBodyBuilder::kinematic_position_based().build()),
            ball(Vec3::Y, Vec3::new(3.0, -1.0, 0.0)),
        ];
        let mut c = contact(0, 1, Vec3::Y, 0.0);
        c.friction = 0.1;
        let mut contacts = vec![c];
        solve_velocities(&mut bodies, &mut contacts, 8);

        let v = bodies[1].as_ref().unwrap().linvel;
        assert!(v.y.abs() < 1e-5);
        let mass = bodies[1].as_ref().unwrap().mass();
        // Normal impulse cancels 1 m/s; friction may remove at most 10% of that.
        assert!(v.x >= 3.0 - 0.1 - 1e-4);
        assert!(v.x < 3.0);
        assert!((contacts[0].normal_impulse - mass).abs() < 1e-4);
    }

    #[test]
    fn test_position_correction_moves_only_dynamic_side() {
        let mut bodies = vec![
            Some(RigidBodyBuilder::kinematic_position_based().build()),
            ball(Vec3::ZERO, Vec3::ZERO),
        ];
        let contacts = vec![contact(0, 1, Vec3::Z, 0.5)];
        let params = IntegrationParameters::default();
        correct_positions(&mut bodies, &contacts, &params);

        assert_eq!(bodies[0].as_ref().unwrap().translation, Vec3::ZERO);
        let moved = bodies[1].as_ref().unwrap().translation;
        let expected = (0.5 - params.allowed_penetration) * params.position_correction;
        assert!((moved.z - expected).abs() < 1e-5);
    }
}
