//! Input handling for the scene.
//!
//! [`Input`] folds raw winit window events into per-frame state: which keys
//! and buttons went down this frame, which are held, where the cursor is.
//! Once per tick the loop takes an [`InputSample`], the small immutable
//! snapshot the pointer controller reads.

use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode as WinitKeyCode, PhysicalKey};

use crate::viewport::Viewport;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    fn from_winit(btn: WinitMouseButton) -> Option<Self> {
        match btn {
            WinitMouseButton::Left => Some(MouseButton::Left),
            WinitMouseButton::Right => Some(MouseButton::Right),
            WinitMouseButton::Middle => Some(MouseButton::Middle),
            _ => None,
        }
    }
}

/// Keys the scene reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Space,
    Escape,
    /// Reset the scene.
    R,
    /// Toggle the axis gizmo.
    G,
    /// Toggle orbit controls.
    O,
    Other(u32),
}

impl From<WinitKeyCode> for KeyCode {
    fn from(key: WinitKeyCode) -> Self {
        match key {
            WinitKeyCode::Space => KeyCode::Space,
            WinitKeyCode::Escape => KeyCode::Escape,
            WinitKeyCode::KeyR => KeyCode::R,
            WinitKeyCode::KeyG => KeyCode::G,
            WinitKeyCode::KeyO => KeyCode::O,
            _ => KeyCode::Other(key as u32),
        }
    }
}

/// What the controllers see of the outside world for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSample {
    /// Mouse position in normalized device coordinates, each axis in `[-1, 1]`,
    /// y up.
    pub mouse_ndc: Vec2,
    /// World-space size of the visible area at the camera target.
    pub viewport: Viewport,
}

impl InputSample {
    pub fn new(mouse_ndc: Vec2, viewport: Viewport) -> Self {
        Self { mouse_ndc, viewport }
    }
}

/// Input state tracking for keyboard and mouse.
#[derive(Debug, Default)]
pub struct Input {
    keys_held: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,

    mouse_held: HashSet<MouseButton>,
    mouse_pressed: HashSet<MouseButton>,

    mouse_position: Vec2,
    mouse_ndc: Vec2,
    mouse_delta: Vec2,
    cursor_inside: bool,

    scroll_delta: f32,

    window_size: (u32, u32),
}

impl Input {
    pub fn new() -> Self {
        Self {
            window_size: (1280, 720),
            ..Default::default()
        }
    }

    /// Check if a key was pressed this frame (just went down).
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    pub fn mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse_pressed.contains(&button)
    }

    pub fn mouse_held(&self, button: MouseButton) -> bool {
        self.mouse_held.contains(&button)
    }

    /// Mouse position in window pixels.
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    /// Mouse position in normalized device coordinates (-1 to 1), y up.
    ///
    /// Keeps its last value when the cursor leaves the window.
    pub fn mouse_ndc(&self) -> Vec2 {
        self.mouse_ndc
    }

    /// Cursor movement since the last frame, in pixels.
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Scroll wheel delta this frame, positive away from the user.
    pub fn scroll_delta(&self) -> f32 {
        self.scroll_delta
    }

    pub fn cursor_inside(&self) -> bool {
        self.cursor_inside
    }

    /// Snapshot for the controllers.
    pub fn sample(&self, viewport: Viewport) -> InputSample {
        InputSample::new(self.mouse_ndc, viewport)
    }

    /// Clear per-frame state. Call after the frame has consumed its input.
    pub(crate) fn end_frame(&mut self) {
        self.keys_pressed.clear();
        self.mouse_pressed.clear();
        self.mouse_delta = Vec2::ZERO;
        self.scroll_delta = 0.0;
    }

    pub(crate) fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_size = (width, height);
        self.recompute_ndc();
    }

    fn recompute_ndc(&mut self) {
        let (w, h) = self.window_size;
        if w > 0 && h > 0 {
            self.mouse_ndc = Vec2::new(
                (self.mouse_position.x / w as f32) * 2.0 - 1.0,
                1.0 - (self.mouse_position.y / h as f32) * 2.0,
            )
            .clamp(Vec2::splat(-1.0), Vec2::ONE);
        }
    }

    fn move_cursor(&mut self, position: Vec2) {
        if self.cursor_inside {
            self.mouse_delta += position - self.mouse_position;
        }
        self.mouse_position = position;
        self.cursor_inside = true;
        self.recompute_ndc();
    }

    /// Process a winit window event.
    pub(crate) fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(keycode) = event.physical_key {
                    let key = KeyCode::from(keycode);
                    match event.state {
                        ElementState::Pressed => {
                            // Key repeat must not re-trigger toggles.
                            if self.keys_held.insert(key) {
                                self.keys_pressed.insert(key);
                            }
                        }
                        ElementState::Released => {
                            self.keys_held.remove(&key);
                        }
                    }
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(btn) = MouseButton::from_winit(*button) {
                    match state {
                        ElementState::Pressed => {
                            self.mouse_pressed.insert(btn);
                            self.mouse_held.insert(btn);
                        }
                        ElementState::Released => {
                            self.mouse_held.remove(&btn);
                        }
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.move_cursor(Vec2::new(position.x as f32, position.y as f32));
            }

            WindowEvent::CursorLeft { .. } => {
                self.cursor_inside = false;
            }

            WindowEvent::MouseWheel { delta, .. } => {
                self.scroll_delta += match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
            }

            WindowEvent::Resized(size) => {
                self.set_window_size(size.width, size.height);
            }

            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_pressed_clears_but_held_remains() {
        let mut input = Input::new();
        assert!(!input.key_held(KeyCode::Space));

        input.keys_pressed.insert(KeyCode::Space);
        input.keys_held.insert(KeyCode::Space);
        assert!(input.key_pressed(KeyCode::Space));

        input.end_frame();
        assert!(input.key_held(KeyCode::Space));
        assert!(!input.key_pressed(KeyCode::Space));
    }

    #[test]
    fn test_mouse_ndc_center_and_corners() {
        let mut input = Input::new();
        input.set_window_size(800, 600);

        input.move_cursor(Vec2::new(400.0, 300.0));
        assert!(input.mouse_ndc().length() < 1e-6);

        input.move_cursor(Vec2::new(800.0, 0.0));
        assert_eq!(input.mouse_ndc(), Vec2::new(1.0, 1.0));

        input.move_cursor(Vec2::new(0.0, 600.0));
        assert_eq!(input.mouse_ndc(), Vec2::new(-1.0, -1.0));
    }

    #[test]
    fn test_ndc_is_clamped_outside_window() {
        let mut input = Input::new();
        input.set_window_size(100, 100);
        input.move_cursor(Vec2::new(250.0, -40.0));
        assert_eq!(input.mouse_ndc(), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_mouse_delta_accumulates_within_frame() {
        let mut input = Input::new();
        input.move_cursor(Vec2::new(10.0, 10.0));
        // First sighting of the cursor does not count as movement.
        assert_eq!(input.mouse_delta(), Vec2::ZERO);

        input.move_cursor(Vec2::new(15.0, 12.0));
        input.move_cursor(Vec2::new(20.0, 10.0));
        assert_eq!(input.mouse_delta(), Vec2::new(10.0, 0.0));

        input.end_frame();
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
    }

    #[test]
    fn test_sample_carries_viewport() {
        let mut input = Input::new();
        input.set_window_size(200, 100);
        input.move_cursor(Vec2::new(200.0, 0.0));

        let sample = input.sample(Viewport::new(10.0, 8.0));
        assert_eq!(sample.mouse_ndc, Vec2::new(1.0, 1.0));
        assert_eq!(sample.viewport, Viewport::new(10.0, 8.0));
    }
}
