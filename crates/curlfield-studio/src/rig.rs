//! Pointer- and scroll-driven scene rotation.

use std::f32::consts::TAU;

use glam::{EulerRot, Mat4, Vec3};

use curlfield_particles::easing::{smooth_damp, smooth_damp_angle};

/// Wrapping scroll position over `pages` virtual pages.
///
/// Wheel input moves an unbounded target; the current position follows it
/// with a critically damped spring. [`Scroll::offset`] wraps into `[0, 1)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Scroll {
    pages: f32,
    damping: f32,
    target: f32,
    current: f32,
    velocity: f32,
}

impl Scroll {
    pub fn new(pages: f32, damping: f32) -> Self {
        Self {
            pages: pages.max(1.0),
            damping,
            target: 0.0,
            current: 0.0,
            velocity: 0.0,
        }
    }

    #[inline]
    pub fn pages(&self) -> f32 {
        self.pages
    }

    /// Applies wheel movement in logical pixels; one page is one viewport height.
    /// Negative `wheel_y` (wheel rolled away from the user) scrolls forward.
    pub fn apply_wheel(&mut self, wheel_y: f32, viewport_height: f32) {
        if viewport_height <= 0.0 || wheel_y == 0.0 {
            return;
        }
        self.target -= wheel_y / (viewport_height * self.pages);
    }

    pub fn update(&mut self, dt: f32) {
        self.current = smooth_damp(self.current, self.target, &mut self.velocity, self.damping, dt);
    }

    /// Scroll position in `[0, 1)`.
    pub fn offset(&self) -> f32 {
        let o = self.current.rem_euclid(1.0);
        if o >= 1.0 { 0.0 } else { o }
    }
}

/// Euler rotation (XYZ) of the scene group, eased toward the pointer and scroll.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rig {
    smooth_time: f32,
    rotation: Vec3,
    velocity: Vec3,
}

impl Rig {
    pub fn new(smooth_time: f32) -> Self {
        Self {
            smooth_time,
            rotation: Vec3::ZERO,
            velocity: Vec3::ZERO,
        }
    }

    /// Rotation the rig eases toward.
    pub fn target(pointer: (f32, f32), scroll: &Scroll) -> Vec3 {
        let (px, py) = pointer;
        Vec3::new(
            py / 15.0,
            -px / 10.0 - scroll.offset() * TAU * scroll.pages() * 0.1,
            0.0,
        )
    }

    pub fn update(&mut self, pointer: (f32, f32), scroll: &Scroll, dt: f32) {
        let target = Self::target(pointer, scroll);
        let t = self.smooth_time;
        self.rotation = Vec3::new(
            smooth_damp_angle(self.rotation.x, target.x, &mut self.velocity.x, t, dt),
            smooth_damp_angle(self.rotation.y, target.y, &mut self.velocity.y, t, dt),
            smooth_damp_angle(self.rotation.z, target.z, &mut self.velocity.z, t, dt),
        );
    }

    pub fn model(&self) -> Mat4 {
        Mat4::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }
}
