//! The mouse-following pointer.
//!
//! A kinematic ball that tracks the cursor on the `z = 0` plane. It has no
//! mesh; connectors only notice it when they collide with it.

use glam::{Vec2, Vec3};

use crate::body::RigidBodyProxy;
use crate::input::InputSample;
use crate::viewport::Viewport;

/// World position under a normalised mouse coordinate, on the `z = 0` plane.
#[inline]
pub fn pointer_target(mouse_ndc: Vec2, viewport: Viewport) -> Vec3 {
    Vec3::new(
        (mouse_ndc.x * viewport.width) / 2.0,
        (mouse_ndc.y * viewport.height) / 2.0,
        0.0,
    )
}

/// Drives the pointer body from input.
#[derive(Debug, Clone, Default)]
pub struct PointerController {
    last_target: Option<Vec3>,
}

impl PointerController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target written on the most recent successful update.
    pub fn last_target(&self) -> Option<Vec3> {
        self.last_target
    }

    /// Run once per frame, every frame.
    ///
    /// A body that is not mounted yet is skipped; the next frame retries.
    pub fn update<B: RigidBodyProxy + ?Sized>(
        &mut self,
        body: Option<&mut B>,
        input: &InputSample,
    ) -> Option<Vec3> {
        let body = body?;
        let target = pointer_target(input.mouse_ndc, input.viewport);
        body.set_next_kinematic_translation(target);
        self.last_target = Some(target);
        Some(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Probe {
        next: Option<Vec3>,
    }

    impl RigidBodyProxy for Probe {
        fn translation(&self) -> Vec3 {
            Vec3::ZERO
        }
        fn apply_impulse(&mut self, _impulse: Vec3, _wake: bool) {
            panic!("the pointer never pushes its body");
        }
        fn set_next_kinematic_translation(&mut self, translation: Vec3) {
            self.next = Some(translation);
        }
    }

    #[test]
    fn test_top_right_corner_maps_to_half_viewport() {
        let target = pointer_target(Vec2::new(1.0, 1.0), Viewport::new(10.0, 8.0));
        assert_eq!(target, Vec3::new(5.0, 4.0, 0.0));
    }

    #[test]
    fn test_target_is_linear_and_on_z_plane() {
        let vp = Viewport::new(7.5, 3.0);
        for (x, y) in [(-1.0, -1.0), (0.0, 0.0), (0.25, -0.5), (-0.8, 1.0)] {
            let t = pointer_target(Vec2::new(x, y), vp);
            assert_eq!(t, Vec3::new(x * 7.5 / 2.0, y * 3.0 / 2.0, 0.0));
            assert_eq!(t.z, 0.0);
        }
    }

    #[test]
    fn test_update_writes_kinematic_target() {
        let mut probe = Probe::default();
        let mut pointer = PointerController::new();
        let sample = InputSample::new(Vec2::new(-1.0, 0.5), Viewport::new(4.0, 2.0));

        let written = pointer.update(Some(&mut probe), &sample);
        assert_eq!(written, Some(Vec3::new(-2.0, 0.5, 0.0)));
        assert_eq!(probe.next, written);
        assert_eq!(pointer.last_target(), written);
    }

    #[test]
    fn test_missing_body_is_skipped() {
        let mut pointer = PointerController::new();
        let sample = InputSample::new(Vec2::ONE, Viewport::new(1.0, 1.0));
        assert_eq!(pointer.update::<Probe>(None, &sample), None);
        assert_eq!(pointer.last_target(), None);
    }
}
