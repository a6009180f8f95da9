//! Static backdrop of stars in a ball, slowly tumbling.

use std::f32::consts::FRAC_PI_4;

use anyhow::Result;
use glam::{EulerRot, Mat4};
use rand::Rng;

use curlfield_engine::render::{RenderCtx, RenderTarget};
use curlfield_particles::seed::seed_positions;
use curlfield_particles::{
    MaterialTable, OffscreenTarget, ParticleGrid, PointCloudRenderer, PointFrame, PointStyle,
    RendererKind, SeedShape,
};

use crate::config::StarfieldConfig;

pub struct Starfield {
    _positions: OffscreenTarget,
    renderer: PointCloudRenderer,
    bind_group: wgpu::BindGroup,
    spin: Spin,
}

impl Starfield {
    pub fn new<R: Rng + ?Sized>(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        materials: &MaterialTable,
        surface_format: wgpu::TextureFormat,
        cfg: &StarfieldConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let grid = ParticleGrid::new(cfg.size)?;

        let positions = OffscreenTarget::new(device, grid.size(), "curlfield star positions")?;
        positions.upload(
            queue,
            &seed_positions(rng, SeedShape::Ball, grid.count() as usize, cfg.radius),
        )?;

        // A divisor of 1 keeps every star at full size.
        let style = PointStyle {
            kind: RendererKind::Additive,
            point_size: cfg.point_size,
            edge_divisor: 1.0,
            min_point_size: 1.0,
            color: cfg.color,
        };
        let renderer = PointCloudRenderer::new(device, materials, surface_format, style, grid)?;
        let bind_group = renderer.bind_positions(device, &positions);

        log::info!("starfield: {} stars, radius {}", grid.count(), cfg.radius);

        Ok(Self {
            _positions: positions,
            renderer,
            bind_group,
            spin: Spin::default(),
        })
    }

    pub fn update(&mut self, dt: f32) {
        self.spin.advance(dt);
    }

    /// Draws the stars on top of `target`. `group` is the rig rotation.
    pub fn draw(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        group: Mat4,
        view: Mat4,
        projection: Mat4,
    ) {
        self.renderer.ensure_format(ctx.device, ctx.surface_format);
        self.renderer.write_params(
            ctx.queue,
            &PointFrame {
                model_view: view * group * self.spin.model(),
                projection,
                viewport: ctx.viewport,
                focus: 0.0,
                fov: 1.0,
                blur: 0.0,
            },
        );
        self.renderer.encode(target.encoder, target.color_view, &self.bind_group);
    }
}

/// Tumble of the star ball inside a group tilted `π/4` about z.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
struct Spin {
    x: f32,
    y: f32,
}

impl Spin {
    fn advance(&mut self, dt: f32) {
        self.x -= dt / 40.0;
        self.y -= dt / 50.0;
    }

    fn model(&self) -> Mat4 {
        Mat4::from_rotation_z(FRAC_PI_4) * Mat4::from_euler(EulerRot::XYZ, self.x, self.y, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn spin_rates() {
        let mut spin = Spin::default();
        spin.advance(200.0);
        assert!((spin.x + 5.0).abs() < 1e-5);
        assert!((spin.y + 4.0).abs() < 1e-5);
    }

    #[test]
    fn resting_spin_is_the_group_tilt() {
        let m = Spin::default().model();
        let x = m.transform_vector3(Vec3::X);
        let d = FRAC_PI_4.cos();
        assert!((x - Vec3::new(d, d, 0.0)).abs().max_element() < 1e-6);
    }
}
