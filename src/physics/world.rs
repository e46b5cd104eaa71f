//! The body set and the step pipeline.

use glam::{Quat, Vec3};
use log::trace;

use super::collider::WorldCollider;
use super::contact::{collide, Contact};
use super::rigid_body::{BodyType, RigidBody};
use super::solver::{correct_positions, solve_velocities};

/// Stable reference to a body in a [`PhysicsWorld`].
///
/// Handles carry a generation, so a handle to a removed body never resolves
/// to whatever later reuses its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle {
    index: u32,
    generation: u32,
}

impl BodyHandle {
    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

/// Tunables for [`PhysicsWorld::step`].
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrationParameters {
    pub solver_iterations: usize,
    /// Penetration left uncorrected, in world units.
    pub allowed_penetration: f32,
    /// Fraction of the penetration removed each step.
    pub position_correction: f32,
    pub linear_sleep_threshold: f32,
    pub angular_sleep_threshold: f32,
    /// Seconds a body must stay below both thresholds before it sleeps.
    pub time_until_sleep: f32,
}

impl Default for IntegrationParameters {
    fn default() -> Self {
        Self {
            solver_iterations: 8,
            allowed_penetration: 0.005,
            position_correction: 0.2,
            linear_sleep_threshold: 0.05,
            angular_sleep_threshold: 0.05,
            time_until_sleep: 2.0,
        }
    }
}

/// A set of rigid bodies stepped together.
#[derive(Debug, Default)]
pub struct PhysicsWorld {
    gravity: Vec3,
    params: IntegrationParameters,
    bodies: Vec<Option<RigidBody>>,
    generations: Vec<u32>,
    free: Vec<u32>,
    contacts: Vec<Contact>,
}

impl PhysicsWorld {
    /// An empty world with zero gravity.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: IntegrationParameters) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    pub fn params(&self) -> &IntegrationParameters {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut IntegrationParameters {
        &mut self.params
    }

    pub fn insert(&mut self, body: RigidBody) -> BodyHandle {
        match self.free.pop() {
            Some(index) => {
                let i = index as usize;
                self.bodies[i] = Some(body);
                BodyHandle {
                    index,
                    generation: self.generations[i],
                }
            }
            None => {
                let index = self.bodies.len() as u32;
                self.bodies.push(Some(body));
                self.generations.push(0);
                BodyHandle { index, generation: 0 }
            }
        }
    }

    /// Remove a body. Returns `None` for stale handles.
    pub fn remove(&mut self, handle: BodyHandle) -> Option<RigidBody> {
        if !self.contains(handle) {
            return None;
        }
        let i = handle.index();
        let body = self.bodies[i].take();
        self.generations[i] = self.generations[i].wrapping_add(1);
        self.free.push(handle.index);
        self.contacts.retain(|c| c.a != i && c.b != i);
        body
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        let i = handle.index();
        i < self.bodies.len() && self.generations[i] == handle.generation && self.bodies[i].is_some()
    }

    pub fn get(&self, handle: BodyHandle) -> Option<&RigidBody> {
        if self.contains(handle) {
            self.bodies[handle.index()].as_ref()
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        if self.contains(handle) {
            self.bodies[handle.index()].as_mut()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.bodies.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> {
        self.bodies.iter().enumerate().filter_map(|(i, slot)| {
            slot.as_ref().map(|body| {
                (
                    BodyHandle {
                        index: i as u32,
                        generation: self.generations[i],
                    },
                    body,
                )
            })
        })
    }

    /// Number of penetrating pairs found by the last step.
    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    /// Whether the last step found the two bodies touching.
    pub fn in_contact(&self, a: BodyHandle, b: BodyHandle) -> bool {
        let (a, b) = (a.index(), b.index());
        self.contacts
            .iter()
            .any(|c| (c.a == a && c.b == b) || (c.a == b && c.b == a))
    }

    /// Advance the world by `dt` seconds. Non-positive steps are ignored.
    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }

        self.integrate_forces(dt);
        self.find_contacts();
        self.wake_touched();
        solve_velocities(&mut self.bodies, &mut self.contacts, self.params.solver_iterations);
        self.integrate_positions(dt);
        correct_positions(&mut self.bodies, &self.contacts, &self.params);
        self.update_sleep(dt);

        trace!("physics step: {} bodies, {} contacts", self.len(), self.contacts.len());
    }

    fn integrate_forces(&mut self, dt: f32) {
        let gravity = self.gravity;
        for body in self.bodies.iter_mut().flatten() {
            match body.body_type {
                BodyType::KinematicPositionBased => match body.next_translation.take() {
                    Some(next) => {
                        body.linvel = (next - body.translation) / dt;
                        body.translation = next;
                    }
                    None => body.linvel = Vec3::ZERO,
                },
                BodyType::Dynamic if !body.sleeping => {
                    body.linvel += gravity * dt;
                    body.linvel *= 1.0 / (1.0 + dt * body.linear_damping);
                    body.angvel *= 1.0 / (1.0 + dt * body.angular_damping);
                }
                BodyType::Dynamic => {}
            }
        }
    }

    fn find_contacts(&mut self) {
        self.contacts.clear();

        let colliders: Vec<WorldCollider> = self
            .bodies
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|b| (i, b)))
            .flat_map(|(i, body)| {
                body.colliders
                    .iter()
                    .map(move |c| WorldCollider::new(i, c, body.translation, body.rotation, body.friction))
            })
            .collect();

        for (n, a) in colliders.iter().enumerate() {
            for b in &colliders[n + 1..] {
                if a.body == b.body || !self.any_dynamic(a.body, b.body) {
                    continue;
                }
                if let Some(contact) = collide(a, b) {
                    self.contacts.push(contact);
                }
            }
        }
    }

    fn any_dynamic(&self, a: usize, b: usize) -> bool {
        [a, b]
            .iter()
            .any(|&i| self.bodies[i].as_ref().is_some_and(RigidBody::is_dynamic))
    }

    /// Wakes sleeping bodies touched by something that is moving.
    fn wake_touched(&mut self) {
        let threshold = self.params.linear_sleep_threshold;
        let moving = |body: &RigidBody| match body.body_type {
            BodyType::KinematicPositionBased => body.linvel != Vec3::ZERO,
            BodyType::Dynamic => !body.sleeping && body.linvel.length() > threshold,
        };

        let mut to_wake = Vec::new();
        for c in &self.contacts {
            let (Some(a), Some(b)) = (self.bodies[c.a].as_ref(), self.bodies[c.b].as_ref()) else {
                continue;
            };
            if a.sleeping && moving(b) {
                to_wake.push(c.a);
            }
            if b.sleeping && moving(a) {
                to_wake.push(c.b);
            }
        }
        for i in to_wake {
            if let Some(body) = self.bodies[i].as_mut() {
                body.wake_up();
            }
        }
    }

    fn integrate_positions(&mut self, dt: f32) {
        for body in self.bodies.iter_mut().flatten() {
            if !body.is_dynamic() || body.sleeping {
                continue;
            }
            body.translation += body.linvel * dt;
            if body.angvel != Vec3::ZERO {
                body.rotation = (Quat::from_scaled_axis(body.angvel * dt) * body.rotation).normalize();
            }
        }
    }

    fn update_sleep(&mut self, dt: f32) {
        let lin = self.params.linear_sleep_threshold;
        let ang = self.params.angular_sleep_threshold;
        let wait = self.params.time_until_sleep;
        for body in self.bodies.iter_mut().flatten() {
            if !body.is_dynamic() || body.sleeping || !body.can_sleep {
                continue;
            }
            if body.linvel.length() < lin && body.angvel.length() < ang {
                body.sleep_timer += dt;
                if body.sleep_timer >= wait {
                    body.sleep();
                }
            } else {
                body.sleep_timer = 0.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::RigidBodyProxy;
    use crate::physics::{Collider, RigidBodyBuilder};

    const DT: f32 = 1.0 / 60.0;

    fn ball_at(p: Vec3) -> RigidBody {
        RigidBodyBuilder::dynamic()
            .translation(p)
            .linear_damping(4.0)
            .friction(0.1)
            .collider(Collider::ball(0.5))
            .build()
    }

    #[test]
    fn test_resting_body_stays_put_without_gravity() {
        let mut world = PhysicsWorld::new();
        let h = world.insert(ball_at(Vec3::new(1.0, 2.0, 3.0)));
        for _ in 0..120 {
            world.step(DT);
        }
        assert_eq!(world.get(h).unwrap().translation(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_gravity_pulls_down() {
        let mut world = PhysicsWorld::new();
        world.set_gravity(Vec3::new(0.0, -9.81, 0.0));
        let h = world.insert(RigidBodyBuilder::dynamic().collider(Collider::ball(0.5)).build());
        world.step(DT);
        assert!(world.get(h).unwrap().translation().y < 0.0);
    }

    #[test]
    fn test_linear_damping_scales_velocity() {
        let mut world = PhysicsWorld::new();
        let body = RigidBodyBuilder::dynamic()
            .linvel(Vec3::X)
            .linear_damping(4.0)
            .collider(Collider::ball(0.5))
            .build();
        let h = world.insert(body);
        world.step(DT);
        let expected = 1.0 / (1.0 + DT * 4.0);
        assert!((world.get(h).unwrap().linvel().x - expected).abs() < 1e-6);
    }

    #[test]
    fn test_kinematic_reaches_target_in_one_step() {
        let mut world = PhysicsWorld::new();
        let h = world.insert(
            RigidBodyBuilder::kinematic_position_based()
                .collider(Collider::ball(1.0))
                .build(),
        );
        let target = Vec3::new(2.0, -1.0, 0.0);
        world.get_mut(h).unwrap().set_next_kinematic_translation(target);
        world.step(DT);

        let body = world.get(h).unwrap();
        assert_eq!(body.translation(), target);
        assert!((body.linvel() - target / DT).length() < 1e-3);

        // No new target: the body holds still.
        world.step(DT);
        assert_eq!(world.get(h).unwrap().translation(), target);
        assert_eq!(world.get(h).unwrap().linvel(), Vec3::ZERO);
    }

    #[test]
    fn test_kinematic_pushes_dynamic_and_is_not_pushed_back() {
        let mut world = PhysicsWorld::new();
        let pointer = world.insert(
            RigidBodyBuilder::kinematic_position_based()
                .collider(Collider::ball(1.0))
                .build(),
        );
        let ball = world.insert(ball_at(Vec3::new(1.2, 0.0, 0.0)));

        for i in 1..=30 {
            let x = i as f32 * 0.05;
            world.get_mut(pointer).unwrap().set_next_kinematic_translation(Vec3::new(x, 0.0, 0.0));
            world.step(DT);
            assert_eq!(world.get(pointer).unwrap().translation().x, x);
        }
        assert!(world.get(ball).unwrap().translation().x > 1.2 + 1.0);
    }

    #[test]
    fn test_overlapping_balls_separate() {
        let mut world = PhysicsWorld::new();
        let a = world.insert(ball_at(Vec3::ZERO));
        let b = world.insert(ball_at(Vec3::new(0.6, 0.0, 0.0)));
        world.step(DT);
        assert!(world.in_contact(a, b));

        for _ in 0..120 {
            world.step(DT);
        }
        let gap = world.get(b).unwrap().translation() - world.get(a).unwrap().translation();
        assert!(gap.length() > 0.95);
    }

    #[test]
    fn test_still_body_falls_asleep_and_wakes_on_contact() {
        let mut world = PhysicsWorld::new();
        let ball = world.insert(ball_at(Vec3::ZERO));
        let steps = (world.params().time_until_sleep / DT).ceil() as usize + 1;
        for _ in 0..steps {
            world.step(DT);
        }
        assert!(world.get(ball).unwrap().is_sleeping());

        world.get_mut(ball).unwrap().apply_impulse(Vec3::X, false);
        assert!(world.get(ball).unwrap().is_sleeping());

        let pointer = world.insert(
            RigidBodyBuilder::kinematic_position_based()
                .translation(Vec3::new(-2.0, 0.0, 0.0))
                .collider(Collider::ball(1.0))
                .build(),
        );
        world
            .get_mut(pointer)
            .unwrap()
            .set_next_kinematic_translation(Vec3::new(-1.3, 0.0, 0.0));
        world.step(DT);
        assert!(!world.get(ball).unwrap().is_sleeping());
    }

    #[test]
    fn test_stale_handles_do_not_resolve() {
        let mut world = PhysicsWorld::new();
        let first = world.insert(ball_at(Vec3::ZERO));
        assert!(world.remove(first).is_some());
        assert!(world.get(first).is_none());
        assert!(world.remove(first).is_none());

        let second = world.insert(ball_at(Vec3::ONE));
        assert_eq!(second.index(), first.index());
        assert_ne!(second.generation(), first.generation());
        assert!(world.get(first).is_none());
        assert_eq!(world.get(second).unwrap().translation(), Vec3::ONE);
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn test_zero_dt_is_ignored() {
        let mut world = PhysicsWorld::new();
        let h = world.insert(
            RigidBodyBuilder::dynamic()
                .linvel(Vec3::X)
                .collider(Collider::ball(0.5))
                .build(),
        );
        world.step(0.0);
        assert_eq!(world.get(h).unwrap().translation(), Vec3::ZERO);
    }
}
