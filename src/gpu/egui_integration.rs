//! Optional egui control panel, enabled with the `egui` feature.

use std::sync::Arc;
use winit::window::Window;

/// Snapshot of the scene shown in the panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelState {
    pub fps: f32,
    pub connectors: usize,
    pub paused: bool,
    pub orbit: bool,
    pub gizmo: bool,
}

/// Something the user asked for from the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    TogglePause,
    Reset,
    SetOrbit(bool),
    SetGizmo(bool),
}

pub struct EguiIntegration {
    pub ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

pub struct EguiFrameOutput {
    pub paint_jobs: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

impl EguiIntegration {
    pub fn new(device: &wgpu::Device, output_format: wgpu::TextureFormat, window: &Arc<Window>) -> Self {
        let ctx = egui::Context::default();

        // Light theme to sit on the pale background.
        let mut style = egui::Style::default();
        style.visuals = egui::Visuals::light();
        style.visuals.window_shadow = egui::Shadow::NONE;
        ctx.set_style(style);

        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window.as_ref(),
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let renderer = egui_wgpu::Renderer::new(device, output_format, None, 1, false);

        Self { ctx, state, renderer }
    }

    /// Returns true if egui consumed the event.
    pub fn on_window_event(&mut self, window: &Window, event: &winit::event::WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Build the control panel for this frame.
    pub fn run(&mut self, window: &Window, panel: PanelState) -> (EguiFrameOutput, Vec<PanelAction>) {
        let raw_input = self.state.take_egui_input(window);
        let mut actions = Vec::new();
        let full_output = self.ctx.run(raw_input, |ctx| {
            actions = control_panel(ctx, panel);
        });

        self.state.handle_platform_output(window, full_output.platform_output);
        let paint_jobs = self.ctx.tessellate(full_output.shapes, full_output.pixels_per_point);

        let output = EguiFrameOutput {
            paint_jobs,
            textures_delta: full_output.textures_delta,
            pixels_per_point: full_output.pixels_per_point,
        };
        (output, actions)
    }

    /// Record the panel on top of `view`. The returned command buffers must
    /// be submitted before the encoder's.
    pub fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        output: &EguiFrameOutput,
        screen: &egui_wgpu::ScreenDescriptor,
    ) -> Vec<wgpu::CommandBuffer> {
        for (id, image_delta) in &output.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }
        let command_buffers = self
            .renderer
            .update_buffers(device, queue, encoder, &output.paint_jobs, screen);

        {
            let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Egui Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
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
            self.renderer
                .render(&mut pass.forget_lifetime(), &output.paint_jobs, screen);
        }

        for id in &output.textures_delta.free {
            self.renderer.free_texture(id);
        }
        command_buffers
    }
}

fn control_panel(ctx: &egui::Context, panel: PanelState) -> Vec<PanelAction> {
    let mut actions = Vec::new();
    egui::Window::new("Connectors")
        .default_pos([12.0, 12.0])
        .resizable(false)
        .show(ctx, |ui| {
            ui.label(format!("{:.0} fps", panel.fps));
            ui.label(format!("{} connectors", panel.connectors));
            ui.separator();

            ui.horizontal(|ui| {
                let label = if panel.paused { "Resume" } else { "Pause" };
                if ui.button(label).clicked() {
                    actions.push(PanelAction::TogglePause);
                }
                if ui.button("Reset").clicked() {
                    actions.push(PanelAction::Reset);
                }
            });

            let mut orbit = panel.orbit;
            if ui.checkbox(&mut orbit, "Orbit controls").changed() {
                actions.push(PanelAction::SetOrbit(orbit));
            }
            let mut gizmo = panel.gizmo;
            if ui.checkbox(&mut gizmo, "Axis gizmo").changed() {
                actions.push(PanelAction::SetGizmo(gizmo));
            }
        });
    actions
}
