//! Simulation builder and runner
//!
//! [`SceneRunner`] owns the scene and its physics world and runs one tick
//! per frame. [`Simulation`] wraps it in a window, or drives it headless
//! with a fixed frame delta.

use std::sync::Arc;

use glam::{Vec2, Vec3};
use log::{debug, info, warn};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::camera::Camera;
use crate::color::Color;
use crate::config::SceneConfig;
use crate::error::{ConfigError, SimulationError};
use crate::gpu::{DrawList, FrameData, GpuState};
use crate::input::{Input, InputSample, KeyCode, MouseButton};
use crate::physics::{IntegrationParameters, PhysicsWorld};
use crate::scene::Scene;
use crate::time::{FixedStep, Time};

/// What one [`SceneRunner::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickReport {
    /// Physics sub-steps run this tick.
    pub substeps: u32,
    /// Kinematic target written for the pointer, if it is mounted.
    pub pointer: Option<Vec3>,
    /// Number of connectors that received an impulse.
    pub impulses: usize,
}

/// Summary of a headless run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadlessReport {
    pub frames: u32,
    /// Simulated seconds.
    pub elapsed: f32,
    /// Mean distance of the connectors from the origin at the end.
    pub mean_distance: f32,
    pub pointer: Option<Vec3>,
}

/// Scene, physics world, and fixed-step clock, ticked once per frame.
///
/// ```
/// use connectors::{InputSample, SceneConfig, SceneRunner, Vec2, Viewport};
///
/// let mut runner = SceneRunner::new(SceneConfig::default()).unwrap();
/// let input = InputSample::new(Vec2::ZERO, Viewport::new(10.0, 8.0));
/// let report = runner.tick(&input, 1.0 / 60.0);
/// assert_eq!(report.impulses, 12);
/// ```
pub struct SceneRunner {
    config: SceneConfig,
    scene: Scene,
    world: PhysicsWorld,
    clock: FixedStep,
    frame: u64,
}

impl SceneRunner {
    /// Compose the scene from `config` and mount it in a fresh world.
    pub fn new(config: SceneConfig) -> Result<Self, ConfigError> {
        let mut scene = Scene::compose(&config)?;

        let params = IntegrationParameters {
            solver_iterations: config.physics.solver_iterations,
            ..Default::default()
        };
        let mut world = PhysicsWorld::with_params(params);
        world.set_gravity(Vec3::from_array(config.physics.gravity));
        scene.mount(&mut world);

        let clock = FixedStep::new(config.physics.timestep, config.physics.max_substeps);

        Ok(Self {
            config,
            scene,
            world,
            clock,
            frame: 0,
        })
    }

    /// Advance by one frame of `dt` seconds.
    ///
    /// Physics runs first and consumes the pointer target written on the
    /// previous tick. Then the pointer, connector and colour passes run
    /// once each. A non-positive `dt` (paused) does nothing.
    pub fn tick(&mut self, input: &InputSample, dt: f32) -> TickReport {
        if dt <= 0.0 {
            return TickReport::default();
        }

        let substeps = self.clock.advance(dt);
        for _ in 0..substeps {
            self.world.step(self.clock.step());
        }

        let pointer = self.scene.update_pointer(&mut self.world, input);
        let impulses = self.scene.update_connectors(&mut self.world);
        self.scene.update_colors(dt);
        self.frame += 1;

        TickReport {
            substeps,
            pointer,
            impulses,
        }
    }

    /// Respawn every body at its original position and restart the colours.
    pub fn reset(&mut self) {
        self.scene.reset(&mut self.world);
        self.clock.reset();
        self.frame = 0;
        info!("Scene reset");
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Ticks since creation or the last reset.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Mean distance of the mounted connectors from the origin.
    pub fn mean_distance_to_origin(&self) -> f32 {
        let (sum, count) = self
            .scene
            .connector_positions(&self.world)
            .flatten()
            .fold((0.0, 0u32), |(sum, n), p| (sum + p.length(), n + 1));
        if count == 0 {
            0.0
        } else {
            sum / count as f32
        }
    }
}

/// A connectors scene builder.
///
/// Use method chaining to configure, then call `.run()` to open a window.
///
/// ```no_run
/// use connectors::Simulation;
///
/// Simulation::new().with_seed(42).with_gizmo(false).run().unwrap();
/// ```
pub struct Simulation {
    config: SceneConfig,
    title: String,
    window_size: (u32, u32),
}

impl Simulation {
    /// Create a simulation of the stock scene.
    pub fn new() -> Self {
        Self {
            config: SceneConfig::default(),
            title: "Connectors".into(),
            window_size: (1280, 720),
        }
    }

    /// Replace the whole scene configuration.
    pub fn with_config(mut self, config: SceneConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed for the random spawn positions.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Show or hide the axis gizmo.
    pub fn with_gizmo(mut self, enabled: bool) -> Self {
        self.config.overlays.gizmo = enabled;
        self
    }

    /// Enable or disable mouse orbit controls.
    pub fn with_orbit(mut self, enabled: bool) -> Self {
        self.config.overlays.orbit = enabled;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = (width, height);
        self
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Open a window and run until it is closed.
    pub fn run(self) -> Result<(), SimulationError> {
        let runner = SceneRunner::new(self.config)?;

        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = App::new(runner, self.title, self.window_size)?;
        event_loop.run_app(&mut app)?;

        match app.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Run `frames` ticks of one fixed physics step each, with the mouse
    /// resting at the centre of the view.
    pub fn run_headless(self, frames: u32) -> Result<HeadlessReport, SimulationError> {
        let (width, height) = self.window_size;
        let mut runner = SceneRunner::new(self.config)?;
        let camera = Camera::from_config(&runner.config().camera);
        let aspect = width as f32 / height.max(1) as f32;
        let input = InputSample::new(Vec2::ZERO, camera.viewport(aspect));
        let dt = runner.config().physics.timestep;

        let mut report = TickReport::default();
        for _ in 0..frames {
            report = runner.tick(&input, dt);
        }

        let summary = HeadlessReport {
            frames,
            elapsed: frames as f32 * dt,
            mean_distance: runner.mean_distance_to_origin(),
            pointer: runner.scene().pointer_position(runner.world()),
        };
        info!(
            "Headless run finished: {} frames, mean distance {:.3}, pointer {:?}, {} impulses last frame",
            summary.frames, summary.mean_distance, summary.pointer, report.impulses
        );
        Ok(summary)
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

struct App {
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    runner: SceneRunner,
    camera: Camera,
    input: Input,
    time: Time,
    title: String,
    window_size: (u32, u32),
    background: Color,
    orbit: bool,
    gizmo: bool,
    error: Option<SimulationError>,
    #[cfg(feature = "egui")]
    egui: Option<crate::gpu::egui_integration::EguiIntegration>,
}

impl App {
    fn new(runner: SceneRunner, title: String, window_size: (u32, u32)) -> Result<Self, ConfigError> {
        let config = runner.config();
        let background = Color::parse(&config.background)?;
        let camera = Camera::from_config(&config.camera);
        let orbit = config.overlays.orbit;
        let gizmo = config.overlays.gizmo;

        Ok(Self {
            window: None,
            gpu: None,
            runner,
            camera,
            input: Input::new(),
            time: Time::new(),
            title,
            window_size,
            background,
            orbit,
            gizmo,
            error: None,
            #[cfg(feature = "egui")]
            egui: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: SimulationError) {
        log::error!("{}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn handle_keys(&mut self, event_loop: &ActiveEventLoop) {
        if self.input.key_pressed(KeyCode::Escape) {
            event_loop.exit();
        }
        if self.input.key_pressed(KeyCode::Space) {
            self.time.toggle_pause();
            debug!("Paused: {}", self.time.is_paused());
        }
        if self.input.key_pressed(KeyCode::R) {
            self.runner.reset();
        }
        if self.input.key_pressed(KeyCode::G) {
            self.gizmo = !self.gizmo;
        }
        if self.input.key_pressed(KeyCode::O) {
            self.orbit = !self.orbit;
            self.camera.settle();
        }
    }

    fn handle_orbit(&mut self) {
        if !self.orbit {
            return;
        }
        let delta = self.input.mouse_delta();
        if self.input.mouse_held(MouseButton::Left) {
            self.camera.rotate(delta.x, delta.y);
        }
        if self.input.mouse_held(MouseButton::Right) {
            let height = self.gpu.as_ref().map_or(self.window_size.1, |g| g.config.height);
            self.camera.pan(delta.x, delta.y, height as f32);
        }
        let scroll = self.input.scroll_delta();
        if scroll != 0.0 {
            self.camera.zoom(scroll);
        }
    }

    fn update_title(&self) {
        if self.time.frame() % 30 != 0 {
            return;
        }
        if let Some(window) = &self.window {
            let paused = if self.time.is_paused() { " (paused)" } else { "" };
            window.set_title(&format!("{} - {:.0} fps{}", self.title, self.time.fps(), paused));
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let dt = self.time.update();
        self.handle_keys(event_loop);
        self.handle_orbit();
        self.camera.update(self.time.unscaled_delta());

        let aspect = self.gpu.as_ref().map_or(1.0, |g| g.aspect());
        let sample = self.input.sample(self.camera.viewport(aspect));
        self.runner.tick(&sample, dt);
        self.update_title();

        let draw = DrawList::build(self.runner.scene(), self.runner.world(), self.camera.position());
        let lights = self.runner.scene().accent_lights(self.runner.world());

        #[cfg(feature = "egui")]
        let ui = match (&mut self.egui, &self.window) {
            (Some(egui), Some(window)) => {
                use crate::gpu::egui_integration::{PanelAction, PanelState};

                let panel = PanelState {
                    fps: self.time.fps(),
                    connectors: self.runner.scene().connectors().len(),
                    paused: self.time.is_paused(),
                    orbit: self.orbit,
                    gizmo: self.gizmo,
                };
                let (output, actions) = egui.run(window, panel);
                for action in actions {
                    match action {
                        PanelAction::TogglePause => self.time.toggle_pause(),
                        PanelAction::Reset => self.runner.reset(),
                        PanelAction::SetOrbit(on) => self.orbit = on,
                        PanelAction::SetGizmo(on) => self.gizmo = on,
                    }
                }
                Some(output)
            }
            _ => None,
        };

        self.input.end_frame();

        let Some(gpu) = &mut self.gpu else {
            return;
        };
        let frame = FrameData {
            view_proj: self.camera.view_projection(gpu.aspect()),
            camera_position: self.camera.position(),
            draw: &draw,
            lights: &lights,
            gizmo: self.gizmo.then(|| self.camera.rotation_matrix()),
            #[cfg(feature = "egui")]
            ui: match (&mut self.egui, &ui) {
                (Some(egui), Some(output)) => Some((egui, output)),
                _ => None,
            },
        };

        match gpu.render(frame) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => gpu.reconfigure(),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory");
                event_loop.exit();
            }
            Err(e) => warn!("Render error: {:?}", e),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let (width, height) = self.window_size;
        let window_attrs = Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(width, height));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        let config = self.runner.config();
        let gpu = pollster::block_on(GpuState::new(
            window.clone(),
            config.lighting.clone(),
            self.background,
            config.overlays.gizmo_margin,
        ));
        let gpu = match gpu {
            Ok(gpu) => gpu,
            Err(e) => return self.fail(event_loop, e.into()),
        };

        let size = window.inner_size();
        self.input.set_window_size(size.width, size.height);

        #[cfg(feature = "egui")]
        {
            self.egui = Some(crate::gpu::egui_integration::EguiIntegration::new(
                gpu.device(),
                gpu.format(),
                &window,
            ));
        }

        info!("Window ready: {}x{}", size.width, size.height);
        self.gpu = Some(gpu);
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        #[cfg(feature = "egui")]
        if let (Some(egui), Some(window)) = (&mut self.egui, &self.window) {
            if egui.on_window_event(window, &event) {
                return;
            }
        }

        self.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(physical_size);
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectorConfig;
    use crate::viewport::Viewport;

    fn centred() -> InputSample {
        InputSample::new(Vec2::ZERO, Viewport::new(10.0, 8.0))
    }

    #[test]
    fn test_tick_runs_every_pass() {
        let mut runner = SceneRunner::new(SceneConfig::default()).unwrap();
        let report = runner.tick(&centred(), 1.0 / 60.0);
        assert_eq!(report.substeps, 1);
        assert_eq!(report.pointer, Some(Vec3::ZERO));
        assert_eq!(report.impulses, 12);
        assert_eq!(runner.frame(), 1);
    }

    #[test]
    fn test_paused_tick_does_nothing() {
        let mut runner = SceneRunner::new(SceneConfig::default()).unwrap();
        let before: Vec<_> = runner.scene().connector_positions(runner.world()).collect();

        for _ in 0..10 {
            assert_eq!(runner.tick(&centred(), 0.0), TickReport::default());
        }

        let after: Vec<_> = runner.scene().connector_positions(runner.world()).collect();
        assert_eq!(before, after);
        assert_eq!(runner.frame(), 0);
        let c = &runner.scene().connectors()[0];
        assert!(c.color.current().max_difference(Color::WHITE) < 1e-6);
    }

    #[test]
    fn test_short_frames_accumulate_substeps() {
        let mut runner = SceneRunner::new(SceneConfig::default()).unwrap();
        let step = runner.config().physics.timestep;
        let a = runner.tick(&centred(), step * 0.5);
        let b = runner.tick(&centred(), step * 0.5);
        assert_eq!(a.substeps + b.substeps, 1);
        // Impulses still go out every frame.
        assert_eq!(a.impulses, 12);
        assert_eq!(b.impulses, 12);
    }

    #[test]
    fn test_long_frame_is_capped() {
        let mut runner = SceneRunner::new(SceneConfig::default()).unwrap();
        let report = runner.tick(&centred(), 1.0);
        assert_eq!(report.substeps, runner.config().physics.max_substeps);
    }

    #[test]
    fn test_reset_restores_spawn_positions() {
        let config = SceneConfig {
            connectors: vec![ConnectorConfig::default().with_position([3.0, 0.0, 0.0])],
            ..SceneConfig::default()
        };
        let mut runner = SceneRunner::new(config).unwrap();
        for _ in 0..30 {
            runner.tick(&centred(), 1.0 / 60.0);
        }
        let moved = runner.mean_distance_to_origin();
        assert!(moved < 3.0);

        runner.reset();
        assert_eq!(runner.frame(), 0);
        assert_eq!(runner.mean_distance_to_origin(), 3.0);
    }

    #[test]
    fn test_builder_options_reach_config() {
        let sim = Simulation::new().with_seed(9).with_gizmo(false).with_orbit(false);
        assert_eq!(sim.config().seed, 9);
        assert!(!sim.config().overlays.gizmo);
        assert!(!sim.config().overlays.orbit);
    }

    #[test]
    fn test_headless_rejects_bad_config() {
        let mut config = SceneConfig::default();
        config.pointer.radius = -1.0;
        let err = Simulation::new().with_config(config).run_headless(1).unwrap_err();
        assert!(matches!(err, SimulationError::Config(_)));
    }
}
