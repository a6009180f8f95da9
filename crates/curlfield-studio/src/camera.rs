use glam::{Mat4, Vec3};

use crate::config::SceneConfig;

/// Perspective camera looking at the origin.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Vertical field of view, radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn from_config(cfg: &SceneConfig) -> Self {
        Self {
            position: Vec3::from_array(cfg.camera_position),
            fov_y: cfg.camera_fov.to_radians(),
            near: cfg.near,
            far: cfg.far,
        }
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, Vec3::ZERO, Vec3::Y)
    }

    /// Depth maps to `[0, 1]`.
    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect.max(1e-4), self.near, self.far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_projects_to_screen_center() {
        let cam = Camera::from_config(&SceneConfig::default());
        let clip = cam.projection(16.0 / 9.0) * cam.view() * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;

        assert!(ndc.x.abs() < 1e-6 && ndc.y.abs() < 1e-6);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn view_space_depth_is_distance_along_negative_z() {
        let cam = Camera::from_config(&SceneConfig::default());
        let mv = cam.view() * glam::Vec4::new(0.0, 0.0, 1.0, 1.0);
        assert!((mv.z + 5.0).abs() < 1e-5);
    }
}
