//! World-space size of the visible area.

use glam::Vec3;

/// Width and height, in world units, of the view frustum's cross-section
/// through the camera target.
///
/// This is what the pointer maps normalised mouse coordinates onto: a mouse
/// at the right edge of the window lands `width / 2` units right of the
/// target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Cross-section of a perspective frustum at `distance` from the eye.
    pub fn from_perspective(fov_y_radians: f32, aspect: f32, distance: f32) -> Self {
        let height = 2.0 * (fov_y_radians * 0.5).tan() * distance;
        Self {
            width: height * aspect,
            height,
        }
    }

    /// Cross-section at the target of a camera sitting at `eye`.
    pub fn at_target(fov_y_radians: f32, aspect: f32, eye: Vec3, target: Vec3) -> Self {
        Self::from_perspective(fov_y_radians, aspect, eye.distance(target))
    }

    #[inline]
    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}
