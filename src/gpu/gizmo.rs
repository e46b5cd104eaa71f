//! Axis gizmo drawn in a small viewport in the top-right corner.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

use super::shaders::GIZMO_SHADER;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GizmoVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

const AXIS_COLORS: [[f32; 3]; 3] = [[0.9, 0.2, 0.25], [0.35, 0.8, 0.3], [0.25, 0.45, 0.95]];

/// Line list: a bright positive half and a faded negative half per axis,
/// plus a small arrowhead at each positive tip.
pub fn axis_lines() -> Vec<GizmoVertex> {
    let mut lines = Vec::with_capacity(3 * 8);
    for (axis, color) in AXIS_COLORS.iter().enumerate() {
        let mut tip = [0.0; 3];
        tip[axis] = 1.0;
        let mut tail = [0.0; 3];
        tail[axis] = -1.0;
        let faded = color.map(|c| c * 0.35 + 0.4);

        lines.push(GizmoVertex { position: [0.0; 3], color: *color });
        lines.push(GizmoVertex { position: tip, color: *color });
        lines.push(GizmoVertex { position: [0.0; 3], color: faded });
        lines.push(GizmoVertex { position: tail, color: faded });

        // Arrowhead barbs bend back toward the next axis.
        let side = (axis + 1) % 3;
        for s in [-1.0f32, 1.0] {
            let mut barb = [0.0; 3];
            barb[axis] = 0.8;
            barb[side] = 0.1 * s;
            lines.push(GizmoVertex { position: tip, color: *color });
            lines.push(GizmoVertex { position: barb, color: *color });
        }
    }
    lines
}

/// Square gizmo viewport `(x, y, size)` whose centre sits `margin` pixels
/// in from the top and right edges.
pub fn gizmo_viewport(width: u32, height: u32, margin: u32) -> Option<(f32, f32, f32)> {
    let size = (margin * 2).min(width).min(height);
    if size == 0 {
        return None;
    }
    let cx = width.saturating_sub(margin) as f32;
    let cy = margin as f32;
    let half = size as f32 / 2.0;
    // The viewport must stay inside the render target.
    let x = (cx - half).clamp(0.0, (width - size) as f32);
    let y = (cy - half).clamp(0.0, (height - size) as f32);
    Some((x, y, size as f32))
}

/// Orthographic projection framing the unit axes.
pub fn gizmo_projection(rotation: Mat4) -> Mat4 {
    Mat4::orthographic_rh(-1.3, 1.3, -1.3, 1.3, 0.1, 10.0) * rotation
}

pub(crate) struct GizmoRenderer {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl GizmoRenderer {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let vertices = axis_lines();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Gizmo Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Gizmo Uniform Buffer"),
            contents: bytemuck::cast_slice(&[Mat4::IDENTITY.to_cols_array_2d()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Gizmo Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Gizmo Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Gizmo Shader"),
            source: wgpu::ShaderSource::Wgsl(GIZMO_SHADER.into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Gizmo Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Gizmo Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<GizmoVertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            vertex_buffer,
            vertex_count: vertices.len() as u32,
            uniform_buffer,
            bind_group,
        }
    }

    pub fn update(&self, queue: &wgpu::Queue, rotation: Mat4) {
        let view_proj = gizmo_projection(rotation);
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[view_proj.to_cols_array_2d()]));
    }

    /// Draw on top of what is already in `target`.
    pub fn render(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView, viewport: (f32, f32, f32)) {
        let (x, y, size) = viewport;
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Gizmo Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_viewport(x, y, size, size, 0.0, 1.0);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.draw(0..self.vertex_count, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_viewport_in_top_right_corner() {
        let (x, y, size) = gizmo_viewport(1280, 720, 75).unwrap();
        assert_eq!(size, 150.0);
        assert_eq!(x + size / 2.0, 1280.0 - 75.0);
        assert_eq!(y + size / 2.0, 75.0);
    }

    #[test]
    fn test_viewport_shrinks_in_tiny_windows() {
        let (x, y, size) = gizmo_viewport(100, 60, 75).unwrap();
        assert_eq!(size, 60.0);
        assert!(x >= 0.0 && y >= 0.0);
        assert!(x + size <= 100.0 && y + size <= 60.0);
        assert!(gizmo_viewport(0, 0, 75).is_none());
    }

    #[test]
    fn test_axis_lines_are_pairs() {
        let lines = axis_lines();
        assert_eq!(lines.len() % 2, 0);
        assert_eq!(lines.len(), 3 * 8);
        assert!(lines.iter().all(|v| v.position.iter().all(|c| c.abs() <= 1.0)));
    }

    #[test]
    fn test_projection_keeps_axes_on_screen() {
        let rotation = Mat4::look_at_rh(Vec3::new(1.0, 1.0, 1.0).normalize() * 3.0, Vec3::ZERO, Vec3::Y);
        let proj = gizmo_projection(rotation);
        for v in axis_lines() {
            let p = proj.project_point3(Vec3::from_array(v.position));
            assert!(p.x.abs() <= 1.0 && p.y.abs() <= 1.0);
            assert!((0.0..=1.0).contains(&p.z));
        }
    }
}
