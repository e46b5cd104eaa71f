//! Orbit camera.
//!
//! Rotation and zoom requests are eased in over a short time rather than
//! applied at once, so dragging feels smooth without changing how far the
//! camera ends up turning.

use glam::{Mat4, Vec3};

use crate::color::damp_factor;
use crate::config::CameraConfig;
use crate::viewport::Viewport;

const ORBIT_SMOOTH_TIME: f32 = 0.05;
const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Orbit camera looking at a target point.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Horizontal rotation angle in radians.
    pub yaw: f32,
    /// Vertical rotation angle in radians.
    pub pitch: f32,
    /// Distance from the target point.
    pub distance: f32,
    /// Point the camera orbits around.
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Radians per pixel of drag.
    pub rotate_speed: f32,
    pending_yaw: f32,
    pending_pitch: f32,
    pending_zoom: f32,
}

impl Camera {
    /// A camera at `position` looking at `target`.
    pub fn from_position(position: Vec3, target: Vec3) -> Self {
        let offset = position - target;
        let distance = offset.length().max(1e-3);
        Self {
            yaw: offset.x.atan2(offset.z),
            pitch: (offset.y / distance).clamp(-1.0, 1.0).asin(),
            distance,
            target,
            fov_y: 75f32.to_radians(),
            near: 0.1,
            far: 1000.0,
            min_distance: 0.5,
            max_distance: 100.0,
            rotate_speed: 0.005,
            pending_yaw: 0.0,
            pending_pitch: 0.0,
            pending_zoom: 0.0,
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        let mut camera = Self::from_position(Vec3::from_array(config.position), Vec3::from_array(config.target));
        camera.fov_y = config.fov.to_radians();
        camera.near = config.near;
        camera.far = config.far;
        camera.max_distance = camera.max_distance.max(camera.distance);
        camera
    }

    /// Calculate the camera's world position.
    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + Vec3::new(x, y, z)
    }

    /// Queue a rotation from a mouse drag of `dx, dy` pixels.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.pending_yaw -= dx * self.rotate_speed;
        self.pending_pitch += dy * self.rotate_speed;
    }

    /// Queue a zoom; positive `amount` moves closer.
    pub fn zoom(&mut self, amount: f32) {
        self.pending_zoom += amount;
    }

    /// Slide the target in the view plane by a drag of `dx, dy` pixels on
    /// a window `height` pixels tall.
    pub fn pan(&mut self, dx: f32, dy: f32, height: f32) {
        if height <= 0.0 {
            return;
        }
        let world_per_pixel = 2.0 * (self.fov_y * 0.5).tan() * self.distance / height;
        let forward = (self.target - self.position()).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward);
        self.target += (-right * dx + up * dy) * world_per_pixel;
    }

    /// Apply part of the queued rotation and zoom.
    pub fn update(&mut self, dt: f32) {
        let f = damp_factor(ORBIT_SMOOTH_TIME, dt);

        let yaw = self.pending_yaw * f;
        let pitch = self.pending_pitch * f;
        let zoom = self.pending_zoom * f;
        self.pending_yaw -= yaw;
        self.pending_pitch -= pitch;
        self.pending_zoom -= zoom;

        self.yaw += yaw;
        self.pitch = (self.pitch + pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        // Each unit of zoom scales the distance by 10%.
        self.distance = (self.distance * 0.9f32.powf(zoom)).clamp(self.min_distance, self.max_distance);
    }

    /// Drop any queued motion.
    pub fn settle(&mut self) {
        self.pending_yaw = 0.0;
        self.pending_pitch = 0.0;
        self.pending_zoom = 0.0;
    }

    /// Calculate the view matrix for rendering.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    /// View matrix with the translation removed, for the axis gizmo.
    pub fn rotation_matrix(&self) -> Mat4 {
        let dir = (self.position() - self.target).normalize_or_zero();
        Mat4::look_at_rh(dir * 3.0, Vec3::ZERO, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// World-space size of the view at the target distance.
    pub fn viewport(&self, aspect: f32) -> Viewport {
        Viewport::from_perspective(self.fov_y, aspect, self.distance)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_position_round_trips() {
        let camera = Camera::from_position(Vec3::new(3.0, 2.0, 3.0), Vec3::ZERO);
        assert!((camera.position() - Vec3::new(3.0, 2.0, 3.0)).length() < 1e-5);
    }

    #[test]
    fn test_rotation_keeps_distance() {
        let mut camera = Camera::default();
        let d = camera.distance;
        camera.rotate(120.0, -40.0);
        for _ in 0..60 {
            camera.update(1.0 / 60.0);
        }
        assert!((camera.position().length() - d).abs() < 1e-4);
        assert!((camera.yaw - (Camera::default().yaw - 0.6)).abs() < 1e-3);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = Camera::default();
        camera.rotate(0.0, 1.0e5);
        camera.update(1.0);
        assert!(camera.pitch <= PITCH_LIMIT);
        assert!(camera.position().y < camera.distance);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut camera = Camera::default();
        camera.zoom(1000.0);
        camera.update(1.0);
        assert_eq!(camera.distance, camera.min_distance);

        camera.zoom(-1000.0);
        camera.update(1.0);
        assert_eq!(camera.distance, camera.max_distance);
    }

    #[test]
    fn test_pan_moves_target_sideways() {
        let mut camera = Camera::from_position(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        camera.pan(100.0, 0.0, 600.0);
        assert!(camera.target.x < 0.0);
        assert!(camera.target.y.abs() < 1e-6);
        assert!(camera.target.z.abs() < 1e-6);
    }

    #[test]
    fn test_viewport_matches_target_distance() {
        let camera = Camera::default();
        let eye = Vec3::new(3.0, 2.0, 3.0);
        let expected = Viewport::at_target(75f32.to_radians(), 1.5, eye, Vec3::ZERO);
        let vp = camera.viewport(1.5);
        assert!((vp.width - expected.width).abs() < 1e-4);
        assert!((vp.height - expected.height).abs() < 1e-4);
    }
}
