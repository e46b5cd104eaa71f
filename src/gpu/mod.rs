//! GPU state and rendering.
//!
//! One lit, instanced mesh pipeline draws every connector: opaque spheres
//! and cubes first, then glass spheres back to front with blending and no
//! depth writes. The axis gizmo and the optional egui panel go on top in
//! their own passes.

mod draw;
#[cfg(feature = "egui")]
pub mod egui_integration;
mod gizmo;
pub mod mesh;
pub mod shaders;

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use log::info;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::color::Color;
use crate::config::LightingConfig;
use crate::error::GpuError;
use crate::scene::PointLight;

pub use draw::{DrawList, InstanceRaw};
use gizmo::{gizmo_viewport, GizmoRenderer};
use mesh::{MeshData, Vertex};
use shaders::MESH_SHADER;

/// Point lights beyond this many are not drawn.
pub const MAX_POINT_LIGHTS: usize = 8;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct GpuPointLight {
    position_range: [f32; 4],
    color_intensity: [f32; 4],
}

/// Mirror of `Globals` in the mesh shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub(crate) struct Globals {
    view_proj: [[f32; 4]; 4],
    camera_position: [f32; 4],
    ambient: [f32; 4],
    spot_position: [f32; 4],
    spot_direction: [f32; 4],
    spot_cone: [f32; 4],
    light_count: [u32; 4],
    lights: [GpuPointLight; MAX_POINT_LIGHTS],
}

impl Globals {
    fn new(view_proj: Mat4, camera_position: Vec3, lighting: &LightingConfig, lights: &[PointLight]) -> Self {
        let spot = Vec3::from_array(lighting.spot_position);
        let mut spot_direction = (-spot).normalize_or_zero();
        if spot_direction == Vec3::ZERO {
            spot_direction = Vec3::NEG_Y;
        }
        let outer = lighting.spot_angle;
        let inner = outer * (1.0 - lighting.spot_penumbra);

        let mut packed = [GpuPointLight::zeroed(); MAX_POINT_LIGHTS];
        for (slot, light) in packed.iter_mut().zip(lights) {
            slot.position_range = light.position.extend(light.range).to_array();
            slot.color_intensity = light.color.to_vec3().extend(light.intensity).to_array();
        }

        Self {
            view_proj: view_proj.to_cols_array_2d(),
            camera_position: camera_position.extend(1.0).to_array(),
            ambient: [lighting.ambient, lighting.ambient, lighting.ambient, 1.0],
            spot_position: spot.extend(lighting.spot_intensity).to_array(),
            spot_direction: spot_direction.extend(0.0).to_array(),
            spot_cone: [inner.cos(), outer.cos(), 0.0, 0.0],
            light_count: [lights.len().min(MAX_POINT_LIGHTS) as u32, 0, 0, 0],
            lights: packed,
        }
    }
}

/// What to draw this frame.
pub struct FrameData<'a> {
    pub view_proj: Mat4,
    pub camera_position: Vec3,
    pub draw: &'a DrawList,
    pub lights: &'a [PointLight],
    /// Camera rotation for the axis gizmo; `None` hides it.
    pub gizmo: Option<Mat4>,
    #[cfg(feature = "egui")]
    pub ui: Option<(&'a mut egui_integration::EguiIntegration, &'a egui_integration::EguiFrameOutput)>,
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn new(device: &wgpu::Device, label: &str, mesh: &MeshData) -> Self {
        Self {
            vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Vertex Buffer", label)),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Index Buffer", label)),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            index_count: mesh.indices.len() as u32,
        }
    }
}

/// Instance buffer that grows to fit.
struct InstanceBuffer {
    label: &'static str,
    buffer: wgpu::Buffer,
    capacity: usize,
    len: u32,
}

impl InstanceBuffer {
    fn new(device: &wgpu::Device, label: &'static str, capacity: usize) -> Self {
        Self {
            label,
            buffer: Self::allocate(device, label, capacity),
            capacity,
            len: 0,
        }
    }

    fn allocate(device: &wgpu::Device, label: &str, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (capacity.max(1) * std::mem::size_of::<InstanceRaw>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, instances: &[InstanceRaw]) {
        if instances.len() > self.capacity {
            self.capacity = instances.len().next_power_of_two();
            self.buffer = Self::allocate(device, self.label, self.capacity);
        }
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(instances));
        self.len = instances.len() as u32;
    }
}

pub struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    opaque_pipeline: wgpu::RenderPipeline,
    glass_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    depth_texture: wgpu::TextureView,
    sphere: GpuMesh,
    cube: GpuMesh,
    spheres: InstanceBuffer,
    cubes: InstanceBuffer,
    glass: InstanceBuffer,
    gizmo: GizmoRenderer,
    gizmo_margin: u32,
    lighting: LightingConfig,
    background: Color,
}

impl GpuState {
    pub async fn new(
        window: Arc<Window>,
        lighting: LightingConfig,
        background: Color,
        gizmo_margin: u32,
    ) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;
        info!("Using GPU adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(GpuError::UnsupportedSurface)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = create_depth_texture(&device, &config);

        let globals = Globals::new(Mat4::IDENTITY, Vec3::ZERO, &lighting, &[]);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Globals Buffer"),
            contents: bytemuck::cast_slice(&[globals]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Globals Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Globals Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(MESH_SHADER.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });

        let opaque_pipeline = create_mesh_pipeline(&device, &pipeline_layout, &shader, surface_format, false);
        let glass_pipeline = create_mesh_pipeline(&device, &pipeline_layout, &shader, surface_format, true);

        let sphere = GpuMesh::new(&device, "Sphere", &mesh::sphere(24, 32));
        let cube = GpuMesh::new(&device, "Cube", &mesh::cube());

        let gizmo = GizmoRenderer::new(&device, surface_format);

        Ok(Self {
            spheres: InstanceBuffer::new(&device, "Sphere Instances", 16),
            cubes: InstanceBuffer::new(&device, "Cube Instances", 16),
            glass: InstanceBuffer::new(&device, "Glass Instances", 4),
            surface,
            device,
            queue,
            config,
            opaque_pipeline,
            glass_pipeline,
            uniform_buffer,
            uniform_bind_group,
            depth_texture,
            sphere,
            cube,
            gizmo,
            gizmo_margin,
            lighting,
            background,
        })
    }

    #[cfg_attr(not(feature = "egui"), allow(dead_code))]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[cfg_attr(not(feature = "egui"), allow(dead_code))]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height.max(1) as f32
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = create_depth_texture(&self.device, &self.config);
        }
    }

    /// Reconfigure the surface at its current size.
    pub fn reconfigure(&mut self) {
        self.resize(winit::dpi::PhysicalSize::new(self.config.width, self.config.height));
    }

    pub fn render(&mut self, frame: FrameData<'_>) -> Result<(), wgpu::SurfaceError> {
        let globals = Globals::new(frame.view_proj, frame.camera_position, &self.lighting, frame.lights);
        self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[globals]));
        self.spheres.write(&self.device, &self.queue, &frame.draw.spheres);
        self.cubes.write(&self.device, &self.queue, &frame.draw.cubes);
        self.glass.write(&self.device, &self.queue, &frame.draw.glass);

        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        let [r, g, b] = self.background.to_array();
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);

            render_pass.set_pipeline(&self.opaque_pipeline);
            draw_instances(&mut render_pass, &self.sphere, &self.spheres);
            draw_instances(&mut render_pass, &self.cube, &self.cubes);

            render_pass.set_pipeline(&self.glass_pipeline);
            draw_instances(&mut render_pass, &self.sphere, &self.glass);
        }

        if let Some(rotation) = frame.gizmo {
            if let Some(viewport) = gizmo_viewport(self.config.width, self.config.height, self.gizmo_margin) {
                self.gizmo.update(&self.queue, rotation);
                self.gizmo.render(&mut encoder, &view, viewport);
            }
        }

        #[allow(unused_mut)]
        let mut command_buffers = Vec::new();

        #[cfg(feature = "egui")]
        if let Some((egui, ui_output)) = frame.ui {
            let screen = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [self.config.width, self.config.height],
                pixels_per_point: ui_output.pixels_per_point,
            };
            command_buffers = egui.paint(&self.device, &self.queue, &mut encoder, &view, ui_output, &screen);
        }

        command_buffers.push(encoder.finish());
        self.queue.submit(command_buffers);
        output.present();

        Ok(())
    }
}

fn draw_instances(pass: &mut wgpu::RenderPass<'_>, mesh: &GpuMesh, instances: &InstanceBuffer) {
    if instances.len == 0 {
        return;
    }
    pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
    pass.set_vertex_buffer(1, instances.buffer.slice(..));
    pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
    pass.draw_indexed(0..mesh.index_count, 0, 0..instances.len);
}

fn create_mesh_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    transparent: bool,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(if transparent { "Glass Pipeline" } else { "Opaque Pipeline" }),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[Vertex::layout(), InstanceRaw::layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: transparent.then_some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: !transparent,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn create_depth_texture(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_globals_match_wgsl_layout() {
        // mat4 + 6 vec4 + 8 lights of 2 vec4
        assert_eq!(std::mem::size_of::<Globals>(), 64 + 6 * 16 + MAX_POINT_LIGHTS * 32);
    }

    #[test]
    fn test_globals_pack_lights_and_spot() {
        let lighting = LightingConfig::default();
        let lights: Vec<PointLight> = (0..10)
            .map(|i| PointLight {
                position: Vec3::new(i as f32, 0.0, 0.0),
                color: Color::WHITE,
                intensity: 4.0,
                range: 2.5,
            })
            .collect();
        let g = Globals::new(Mat4::IDENTITY, Vec3::ONE, &lighting, &lights);

        assert_eq!(g.light_count[0], MAX_POINT_LIGHTS as u32);
        assert_eq!(g.lights[3].position_range, [3.0, 0.0, 0.0, 2.5]);
        assert_eq!(g.lights[3].color_intensity[3], 4.0);
        assert_eq!(g.ambient[0], 0.75);
        assert_eq!(g.spot_position[3], 1.0);

        let dir = Vec3::new(g.spot_direction[0], g.spot_direction[1], g.spot_direction[2]);
        assert!((dir - Vec3::splat(-1.0).normalize()).length() < 1e-5);
        // Full penumbra: the cone fades from the axis all the way out.
        assert_eq!(g.spot_cone[0], 1.0);
        assert!((g.spot_cone[1] - 0.15f32.cos()).abs() < 1e-6);
    }

    #[test]
    fn test_instance_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<InstanceRaw>(), 96);
        assert_eq!(std::mem::size_of::<Vertex>(), 24);
    }
}
