//! Per-frame instance data gathered from the scene.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};

use crate::color::Color;
use crate::physics::{ColliderShape, PhysicsWorld, RigidBody};
use crate::scene::{Renderable, Scene};
use crate::RigidBodyProxy;

/// Per-instance vertex data for the mesh shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
    /// Linear RGB plus base opacity.
    pub color: [f32; 4],
    /// Roughness, transmission, clearcoat, chromatic aberration.
    pub material: [f32; 4],
}

impl InstanceRaw {
    const ATTRIBUTES: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }

    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.model[3][0], self.model[3][1], self.model[3][2])
    }
}

/// Instances grouped by mesh and pass.
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    pub spheres: Vec<InstanceRaw>,
    pub cubes: Vec<InstanceRaw>,
    /// Transparent spheres, sorted back to front.
    pub glass: Vec<InstanceRaw>,
}

impl DrawList {
    /// Collect every mounted connector. The pointer has no mesh.
    pub fn build(scene: &Scene, world: &PhysicsWorld, camera_position: Vec3) -> Self {
        let mut list = DrawList::default();

        for connector in scene.connectors() {
            let Some(body) = connector.handle.and_then(|h| world.get(h)) else {
                continue;
            };
            let color = connector.color.current();

            match connector.descriptor.renderable {
                Renderable::Standard { roughness } => {
                    let material = [roughness, 0.0, 0.0, 0.0];
                    push_shapes(&mut list, body, color, 1.0, material, false);
                }
                Renderable::Transmission { roughness, material } => {
                    let opacity = (0.15 + material.thickness).clamp(0.0, 1.0);
                    let packed = [roughness, 1.0, material.clearcoat, material.chromatic_aberration];
                    push_shapes(&mut list, body, color, opacity, packed, true);
                }
            }
        }

        list.glass.sort_by(|a, b| {
            let da = a.translation().distance_squared(camera_position);
            let db = b.translation().distance_squared(camera_position);
            db.total_cmp(&da)
        });
        list
    }
}

fn push_shapes(list: &mut DrawList, body: &RigidBody, color: Color, opacity: f32, material: [f32; 4], glass: bool) {
    let [r, g, b] = color.to_array();
    let color = [r, g, b, opacity];
    for collider in body.colliders() {
        let rotation = body.rotation() * collider.rotation;
        let center = body.translation() + body.rotation() * collider.translation;
        let (scale, is_sphere) = match collider.shape {
            ColliderShape::Ball { radius } => (Vec3::splat(radius), true),
            ColliderShape::Cuboid { half_extents } => (half_extents, false),
        };
        let instance = InstanceRaw {
            model: model_matrix(center, rotation, scale).to_cols_array_2d(),
            color,
            material,
        };
        match (is_sphere, glass) {
            (true, true) => list.glass.push(instance),
            (true, false) => list.spheres.push(instance),
            // Glass cuboids are drawn opaque; only spheres get the glass pass.
            (false, _) => list.cubes.push(instance),
        }
    }
}

fn model_matrix(translation: Vec3, rotation: Quat, scale: Vec3) -> Mat4 {
    Mat4::from_scale_rotation_translation(scale, rotation, translation)
}
