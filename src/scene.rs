//! Scene composition: which connectors exist, how they are built, and the
//! per-frame passes that drive them.
//!
//! A [`Scene`] is an entity table. Each entry pairs an immutable descriptor
//! with its controller, its colour animator, and the handle of its body in
//! the [`PhysicsWorld`]. Controllers never hold a body directly; every pass
//! looks the handle up and silently skips entries that are not mounted.

use glam::Vec3;
use log::{debug, info};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::body::RigidBodyProxy;
use crate::color::{Color, ColorAnimator};
use crate::config::{BodyConfig, ConnectorConfig, SceneConfig};
use crate::connector::{ConnectorController, ImpulseProfile};
use crate::error::ConfigError;
use crate::input::InputSample;
use crate::physics::{BodyHandle, Collider, PhysicsWorld, RigidBody, RigidBodyBuilder};
use crate::pointer::PointerController;

/// Half-extents of the three bars making up the compound box collider.
pub const COMPOUND_BOX_HALF_EXTENTS: [[f32; 3]; 3] = [
    [0.38, 1.27, 0.38],
    [1.27, 0.38, 0.38],
    [0.38, 0.38, 1.27],
];

/// Collider layout for a connector body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColliderPreset {
    Ball {
        #[serde(default = "default_ball_radius")]
        radius: f32,
    },
    /// Three crossed bars, one along each axis.
    CompoundBox,
}

fn default_ball_radius() -> f32 {
    0.5
}

impl Default for ColliderPreset {
    fn default() -> Self {
        ColliderPreset::Ball {
            radius: default_ball_radius(),
        }
    }
}

impl ColliderPreset {
    pub fn colliders(&self) -> Vec<Collider> {
        match *self {
            ColliderPreset::Ball { radius } => vec![Collider::ball(radius)],
            ColliderPreset::CompoundBox => COMPOUND_BOX_HALF_EXTENTS
                .iter()
                .map(|&[x, y, z]| Collider::cuboid(x, y, z))
                .collect(),
        }
    }

    pub fn impulse_profile(&self) -> ImpulseProfile {
        match self {
            ColliderPreset::Ball { .. } => ImpulseProfile::Ball,
            ColliderPreset::CompoundBox => ImpulseProfile::CompoundBox,
        }
    }
}

/// Glass look for a connector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransmissionMaterial {
    pub thickness: f32,
    pub clearcoat: f32,
    pub chromatic_aberration: f32,
}

impl Default for TransmissionMaterial {
    fn default() -> Self {
        Self {
            thickness: 0.1,
            clearcoat: 1.0,
            chromatic_aberration: 0.1,
        }
    }
}

/// How a connector is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Renderable {
    Standard { roughness: f32 },
    Transmission { roughness: f32, material: TransmissionMaterial },
}

impl Renderable {
    pub fn roughness(&self) -> f32 {
        match *self {
            Renderable::Standard { roughness } | Renderable::Transmission { roughness, .. } => roughness,
        }
    }

    pub fn is_transmissive(&self) -> bool {
        matches!(self, Renderable::Transmission { .. })
    }
}

/// Everything fixed about a connector once the scene is composed.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorDescriptor {
    /// Spawn position, sampled once at composition when not given.
    pub position: Vec3,
    pub color: Color,
    pub accent: bool,
    pub collider: ColliderPreset,
    pub strength: f32,
    pub renderable: Renderable,
}

impl ConnectorDescriptor {
    fn from_config(config: &ConnectorConfig, position: Vec3) -> Result<Self, ConfigError> {
        let renderable = match config.transmission {
            Some(material) => Renderable::Transmission {
                roughness: config.roughness,
                material,
            },
            None => Renderable::Standard {
                roughness: config.roughness,
            },
        };
        Ok(Self {
            position,
            color: Color::parse(&config.color)?,
            accent: config.accent,
            collider: config.collider,
            strength: config
                .strength
                .unwrap_or_else(|| config.collider.impulse_profile().strength()),
            renderable,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerDescriptor {
    pub radius: f32,
}

#[derive(Debug, Clone)]
pub struct ConnectorEntity {
    pub descriptor: ConnectorDescriptor,
    pub controller: ConnectorController,
    pub color: ColorAnimator,
    pub handle: Option<BodyHandle>,
}

#[derive(Debug, Clone)]
pub struct PointerEntity {
    pub descriptor: PointerDescriptor,
    pub controller: PointerController,
    pub handle: Option<BodyHandle>,
}

/// A point light carried by an accent connector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Color,
    pub intensity: f32,
    pub range: f32,
}

#[derive(Debug, Clone)]
pub struct Scene {
    connectors: Vec<ConnectorEntity>,
    pointer: PointerEntity,
    body: BodyConfig,
    start_color: Color,
    accent_intensity: f32,
    accent_range: f32,
}

impl Scene {
    /// Build descriptors from `config`. Random spawn positions are drawn
    /// here, once, from `config.seed`.
    pub fn compose(config: &SceneConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut rng = SmallRng::seed_from_u64(config.seed);
        let half = config.spawn_spread / 2.0;
        let start_color = Color::parse(&config.start_color)?;

        let mut connectors = Vec::with_capacity(config.connectors.len());
        for connector in &config.connectors {
            let position = match connector.position {
                Some(p) => Vec3::from_array(p),
                None => Vec3::new(
                    rng.gen_range(-half..=half),
                    rng.gen_range(-half..=half),
                    rng.gen_range(-half..=half),
                ),
            };
            let descriptor = ConnectorDescriptor::from_config(connector, position)?;
            connectors.push(ConnectorEntity {
                controller: ConnectorController::new(descriptor.strength),
                color: ColorAnimator::new(start_color, descriptor.color, config.color_smooth_time),
                descriptor,
                handle: None,
            });
        }

        Ok(Self {
            connectors,
            pointer: PointerEntity {
                descriptor: PointerDescriptor {
                    radius: config.pointer.radius,
                },
                controller: PointerController::new(),
                handle: None,
            },
            body: config.body.clone(),
            start_color,
            accent_intensity: config.lighting.accent_intensity,
            accent_range: config.lighting.accent_range,
        })
    }

    pub fn connectors(&self) -> &[ConnectorEntity] {
        &self.connectors
    }

    pub fn pointer(&self) -> &PointerEntity {
        &self.pointer
    }

    /// True once every entity has a live body in `world`.
    pub fn is_mounted(&self, world: &PhysicsWorld) -> bool {
        let live = |h: Option<BodyHandle>| h.is_some_and(|h| world.contains(h));
        live(self.pointer.handle) && self.connectors.iter().all(|c| live(c.handle))
    }

    /// Create bodies for every entity that does not have a live one.
    pub fn mount(&mut self, world: &mut PhysicsWorld) {
        let mut created = 0;
        if !self.pointer.handle.is_some_and(|h| world.contains(h)) {
            self.pointer.handle = Some(world.insert(pointer_body(&self.pointer.descriptor)));
            created += 1;
        }
        for connector in &mut self.connectors {
            if connector.handle.is_some_and(|h| world.contains(h)) {
                continue;
            }
            connector.handle = Some(world.insert(connector_body(&connector.descriptor, &self.body)));
            created += 1;
        }
        info!("Scene mounted: {} connectors, {} new bodies", self.connectors.len(), created);
    }

    /// Remove every body this scene owns.
    pub fn unmount(&mut self, world: &mut PhysicsWorld) {
        if let Some(h) = self.pointer.handle.take() {
            world.remove(h);
        }
        for connector in &mut self.connectors {
            if let Some(h) = connector.handle.take() {
                world.remove(h);
            }
        }
        debug!("Scene unmounted");
    }

    /// Rebuild every body at its original spawn position and restart the
    /// colour easing. Spawn positions are not re-sampled.
    pub fn reset(&mut self, world: &mut PhysicsWorld) {
        self.unmount(world);
        self.pointer.controller = PointerController::new();
        for connector in &mut self.connectors {
            connector.color.snap_to(self.start_color);
            debug!("Respawning connector at {:?}", connector.descriptor.position);
        }
        self.mount(world);
    }

    /// Pointer pass: move the pointer body under the cursor.
    pub fn update_pointer(&mut self, world: &mut PhysicsWorld, input: &InputSample) -> Option<Vec3> {
        let body = self.pointer.handle.and_then(|h| world.get_mut(h));
        self.pointer.controller.update(body, input)
    }

    /// Connector pass: pull every mounted connector toward the origin.
    /// Returns how many impulses were applied.
    pub fn update_connectors(&mut self, world: &mut PhysicsWorld) -> usize {
        let mut applied = 0;
        for connector in &self.connectors {
            let body = connector.handle.and_then(|h| world.get_mut(h));
            if connector.controller.update(body).is_some() {
                applied += 1;
            }
        }
        applied
    }

    /// Colour pass.
    pub fn update_colors(&mut self, dt: f32) {
        for connector in &mut self.connectors {
            connector.color.update(dt);
        }
    }

    /// Current position of each connector, `None` if not mounted.
    pub fn connector_positions<'a>(&'a self, world: &'a PhysicsWorld) -> impl Iterator<Item = Option<Vec3>> + 'a {
        self.connectors
            .iter()
            .map(|c| c.handle.and_then(|h| world.get(h)).map(|b| b.translation()))
    }

    pub fn pointer_position(&self, world: &PhysicsWorld) -> Option<Vec3> {
        self.pointer.handle.and_then(|h| world.get(h)).map(|b| b.translation())
    }

    /// Lights that follow the mounted accent connectors.
    pub fn accent_lights(&self, world: &PhysicsWorld) -> Vec<PointLight> {
        self.connectors
            .iter()
            .filter(|c| c.descriptor.accent)
            .filter_map(|c| {
                let body = world.get(c.handle?)?;
                Some(PointLight {
                    position: body.translation(),
                    color: c.descriptor.color,
                    intensity: self.accent_intensity,
                    range: self.accent_range,
                })
            })
            .collect()
    }
}

fn connector_body(descriptor: &ConnectorDescriptor, settings: &BodyConfig) -> RigidBody {
    RigidBodyBuilder::dynamic()
        .translation(descriptor.position)
        .linear_damping(settings.linear_damping)
        .angular_damping(settings.angular_damping)
        .friction(settings.friction)
        .colliders(descriptor.collider.colliders())
        .build()
}

fn pointer_body(descriptor: &PointerDescriptor) -> RigidBody {
    RigidBodyBuilder::kinematic_position_based()
        .translation(Vec3::ZERO)
        .collider(Collider::ball(descriptor.radius))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::BodyType;
    use crate::viewport::Viewport;
    use glam::Vec2;

    fn composed(seed: u64) -> Scene {
        let config = SceneConfig {
            seed,
            ..SceneConfig::default()
        };
        Scene::compose(&config).unwrap()
    }

    #[test]
    fn test_stock_scene_layout() {
        let scene = composed(1);
        assert_eq!(scene.connectors().len(), 12);
        assert_eq!(scene.pointer().descriptor.radius, 1.0);

        let accents = scene.connectors().iter().filter(|c| c.descriptor.accent).count();
        assert_eq!(accents, 4);

        let glass: Vec<_> = scene
            .connectors()
            .iter()
            .filter(|c| c.descriptor.renderable.is_transmissive())
            .collect();
        assert_eq!(glass.len(), 2);
        for g in glass {
            assert_eq!(g.descriptor.position, Vec3::new(10.0, 10.0, 5.0));
            assert!(g.descriptor.color.max_difference(Color::WHITE) < 1e-6);
        }
    }

    #[test]
    fn test_random_positions_fall_in_spawn_cube() {
        let scene = composed(42);
        for c in scene.connectors().iter().filter(|c| !c.descriptor.renderable.is_transmissive()) {
            let p = c.descriptor.position;
            assert!(p.abs().max_element() <= 5.0, "{:?}", p);
        }
    }

    #[test]
    fn test_same_seed_same_positions() {
        let a = composed(9);
        let b = composed(9);
        let c = composed(10);
        let pos = |s: &Scene| s.connectors().iter().map(|c| c.descriptor.position).collect::<Vec<_>>();
        assert_eq!(pos(&a), pos(&b));
        assert_ne!(pos(&a), pos(&c));
    }

    #[test]
    fn test_strength_follows_collider_preset() {
        let config = SceneConfig {
            connectors: vec![
                ConnectorConfig::default(),
                ConnectorConfig::default().with_collider(ColliderPreset::CompoundBox),
                ConnectorConfig {
                    strength: Some(0.5),
                    ..ConnectorConfig::default()
                },
            ],
            ..SceneConfig::default()
        };
        let scene = Scene::compose(&config).unwrap();
        let strengths: Vec<f32> = scene.connectors().iter().map(|c| c.controller.strength()).collect();
        assert_eq!(strengths, vec![0.2, 0.9, 0.5]);
    }

    #[test]
    fn test_mount_builds_bodies() {
        let mut world = PhysicsWorld::new();
        let mut scene = composed(3);
        assert!(!scene.is_mounted(&world));

        scene.mount(&mut world);
        assert!(scene.is_mounted(&world));
        assert_eq!(world.len(), 13);

        let pointer = world.get(scene.pointer().handle.unwrap()).unwrap();
        assert_eq!(pointer.body_type(), BodyType::KinematicPositionBased);

        for c in scene.connectors() {
            let body = world.get(c.handle.unwrap()).unwrap();
            assert!(body.is_dynamic());
            assert_eq!(body.linear_damping(), 4.0);
            assert_eq!(body.angular_damping(), 1.0);
            assert_eq!(body.friction(), 0.1);
            assert_eq!(body.translation(), c.descriptor.position);
        }

        // Mounting twice does not duplicate bodies.
        scene.mount(&mut world);
        assert_eq!(world.len(), 13);
    }

    #[test]
    fn test_passes_skip_unmounted_entities() {
        let mut world = PhysicsWorld::new();
        let mut scene = composed(3);
        let sample = InputSample::new(Vec2::ONE, Viewport::new(10.0, 8.0));
        assert_eq!(scene.update_pointer(&mut world, &sample), None);
        assert_eq!(scene.update_connectors(&mut world), 0);

        scene.mount(&mut world);
        assert_eq!(scene.update_pointer(&mut world, &sample), Some(Vec3::new(5.0, 4.0, 0.0)));
        assert_eq!(scene.update_connectors(&mut world), 12);

        scene.unmount(&mut world);
        assert!(world.is_empty());
        assert_eq!(scene.update_connectors(&mut world), 0);
    }

    #[test]
    fn test_reset_respawns_at_original_positions() {
        let mut world = PhysicsWorld::new();
        let mut scene = composed(5);
        scene.mount(&mut world);
        let before: Vec<_> = scene.connectors().iter().map(|c| c.descriptor.position).collect();

        for _ in 0..30 {
            scene.update_connectors(&mut world);
            world.step(1.0 / 60.0);
            scene.update_colors(1.0 / 60.0);
        }
        scene.reset(&mut world);

        let after: Vec<_> = scene.connector_positions(&world).map(Option::unwrap).collect();
        assert_eq!(before, after);
        assert_eq!(world.len(), 13);
        assert!(scene
            .connectors()
            .iter()
            .all(|c| c.color.current().max_difference(Color::WHITE) < 1e-6));
    }

    #[test]
    fn test_accent_lights_follow_bodies() {
        let mut world = PhysicsWorld::new();
        let mut scene = composed(2);
        assert!(scene.accent_lights(&world).is_empty());

        scene.mount(&mut world);
        let lights = scene.accent_lights(&world);
        assert_eq!(lights.len(), 4);
        for light in &lights {
            assert_eq!(light.intensity, 4.0);
            assert_eq!(light.range, 2.5);
        }
        assert_eq!(lights[0].color, Color::parse("#ff4060").unwrap());
    }

    #[test]
    fn test_compound_box_has_three_bars() {
        let colliders = ColliderPreset::CompoundBox.colliders();
        assert_eq!(colliders.len(), 3);
        assert_eq!(ColliderPreset::CompoundBox.impulse_profile(), ImpulseProfile::CompoundBox);
    }
}
