//! Per-frame orchestration of the particle field.
//!
//! One [`FrameDriver::frame`] call records, into the frame's encoder:
//! 1. the simulation pass, writing the back target;
//! 2. the point pass, reading the target just written;
//!
//! then swaps the ping-pong roles and eases the live parameters toward the
//! configured targets. Uniforms written in a frame therefore carry the values
//! eased at the end of the previous frame.

use anyhow::Result;
use glam::Mat4;
use rand::rngs::StdRng;

use curlfield_engine::render::{RenderCtx, RenderTarget};

use crate::config::{ParticleConfig, SimulationMode};
use crate::easing::Eased;
use crate::error::FieldError;
use crate::grid::ParticleGrid;
use crate::kernel::StepParams;
use crate::material::MaterialTable;
use crate::points::{PointCloudRenderer, PointFrame, PointStyle};
use crate::seed::seed_positions;
use crate::simulation::{SimFrame, SimProgram, SimulationPass};
use crate::target::{OffscreenTarget, PingPong};

/// Live values the shaders start from before any easing.
pub const INITIAL_FOCUS: f32 = 5.1;
pub const INITIAL_FOV: f32 = 50.0;
pub const INITIAL_BLUR: f32 = 30.0;
pub const INITIAL_CURL: f32 = 0.25;

/// Host inputs of one frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameInputs {
    /// Seconds of simulation clock (excludes paused time).
    pub elapsed: f32,
    /// Seconds since the previous frame; 0 while paused.
    pub dt: f32,
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
}

/// Snapshot of the eased shader parameters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LiveParams {
    pub focus: f32,
    pub fov: f32,
    pub blur: f32,
    pub curl: f32,
}

/// Focus, fov, blur and curl frequency, each eased toward its configured target.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ParamEasing {
    focus: Eased,
    fov: Eased,
    blur: Eased,
    curl: Eased,
}

impl ParamEasing {
    pub fn new(damping: f32) -> Result<Self, FieldError> {
        Ok(Self {
            focus: Eased::new(INITIAL_FOCUS, damping)?,
            fov: Eased::new(INITIAL_FOV, damping)?,
            blur: Eased::new(INITIAL_BLUR, damping)?,
            curl: Eased::new(INITIAL_CURL, damping)?,
        })
    }

    /// One easing step toward the targets in `cfg`.
    pub fn update(&mut self, cfg: &ParticleConfig) {
        self.focus.update(cfg.focus);
        self.fov.update(cfg.fov);
        self.blur.update(cfg.blur_target());
        self.curl.update(cfg.curl);
    }

    pub fn live(&self) -> LiveParams {
        LiveParams {
            focus: self.focus.value(),
            fov: self.fov.value(),
            blur: self.blur.value(),
            curl: self.curl.value(),
        }
    }
}

pub struct FrameDriver {
    config: ParticleConfig,
    grid: ParticleGrid,
    rng: StdRng,

    seed: OffscreenTarget,
    targets: PingPong,

    sim: SimulationPass,
    sim_from_seed: wgpu::BindGroup,
    sim_from_target: [wgpu::BindGroup; 2],

    points: PointCloudRenderer,
    points_from_target: [wgpu::BindGroup; 2],

    params: ParamEasing,
}

impl FrameDriver {
    /// Validates `config`, allocates the targets, seeds them and builds both passes.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        materials: &MaterialTable,
        surface_format: wgpu::TextureFormat,
        config: ParticleConfig,
        rng: StdRng,
    ) -> Result<Self> {
        let grid = config.validate()?;
        let size = grid.size();

        let seed = OffscreenTarget::new(device, size, "curlfield seed positions")?;
        let targets = PingPong::new(device, size)?;

        let sim = SimulationPass::new(device, materials, SimProgram::Curl, size)?;
        let sim_from_seed = sim.bind_input(device, &seed);
        let sim_from_target = [
            sim.bind_input(device, &targets.targets()[0]),
            sim.bind_input(device, &targets.targets()[1]),
        ];

        let points = PointCloudRenderer::new(
            device,
            materials,
            surface_format,
            PointStyle::from_config(&config),
            grid,
        )?;
        let points_from_target = [
            points.bind_positions(device, &targets.targets()[0]),
            points.bind_positions(device, &targets.targets()[1]),
        ];

        let params = ParamEasing::new(config.damping)?;

        log::info!(
            "particle field: {size}x{size} ({} particles), {:?}, {:?}, seed {:?} r={}",
            grid.count(),
            config.mode,
            config.renderer,
            config.seed_shape,
            config.seed_radius
        );

        let mut driver = Self {
            config,
            grid,
            rng,
            seed,
            targets,
            sim,
            sim_from_seed,
            sim_from_target,
            points,
            points_from_target,
            params,
        };
        driver.reseed(queue)?;
        Ok(driver)
    }

    #[inline]
    pub fn config(&self) -> &ParticleConfig {
        &self.config
    }

    #[inline]
    pub fn grid(&self) -> ParticleGrid {
        self.grid
    }

    #[inline]
    pub fn params(&self) -> LiveParams {
        self.params.live()
    }

    /// Replaces the configured targets and simulation settings.
    ///
    /// Grid size, renderer and point style are fixed at construction; changes
    /// to them are ignored.
    pub fn set_config(&mut self, config: ParticleConfig) -> Result<(), FieldError> {
        let grid = config.validate()?;
        if grid != self.grid || config.renderer != self.config.renderer {
            log::warn!("grid size and renderer cannot change after construction; keeping current");
        }
        let mut config = config;
        config.size = self.config.size;
        config.renderer = self.config.renderer;

        if config.damping != self.config.damping {
            let live = self.params.live();
            self.params = ParamEasing::new(config.damping)?;
            self.params.focus.snap(live.focus);
            self.params.fov.snap(live.fov);
            self.params.blur.snap(live.blur);
            self.params.curl.snap(live.curl);
        }

        self.config = config;
        Ok(())
    }

    /// Draws fresh seed positions and restarts the field from them.
    pub fn reseed(&mut self, queue: &wgpu::Queue) -> Result<(), FieldError> {
        let texels = seed_positions(
            &mut self.rng,
            self.config.seed_shape,
            self.grid.count() as usize,
            self.config.seed_radius,
        );
        self.seed.upload(queue, &texels)?;
        for target in self.targets.targets() {
            target.upload(queue, &texels)?;
        }
        log::debug!("reseeded {} particles", texels.len());
        Ok(())
    }

    /// Records one frame into `target` and advances the driver state.
    pub fn frame(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>, inputs: &FrameInputs) {
        self.points.ensure_format(ctx.device, ctx.surface_format);

        let live = self.params.live();
        let feedback = self.config.mode == SimulationMode::Feedback;

        self.sim.write_params(
            ctx.queue,
            &SimFrame {
                step: StepParams {
                    time: inputs.elapsed * self.config.speed,
                    curl_freq: live.curl,
                    advect_step: self.config.advect_step * inputs.dt,
                    bound_radius: self.config.bound_radius,
                },
                feedback,
            },
        );
        self.points.write_params(
            ctx.queue,
            &PointFrame {
                model_view: inputs.view * inputs.model,
                projection: inputs.projection,
                viewport: ctx.viewport,
                focus: live.focus,
                fov: live.fov,
                blur: live.blur,
            },
        );

        let input = if feedback {
            &self.sim_from_target[self.targets.front_index()]
        } else {
            &self.sim_from_seed
        };
        self.sim.encode(target.encoder, input, self.targets.back());

        self.points.encode(
            target.encoder,
            target.color_view,
            &self.points_from_target[self.targets.back_index()],
        );

        self.targets.swap();
        self.params.update(&self.config);

        log::trace!("frame t={:.3} {:?}", inputs.elapsed, self.params.live());
    }

    /// Copies the latest simulation output to host memory.
    pub fn read_positions(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Vec<[f32; 4]>> {
        self.targets.front().read_back(device, queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RendererKind;
    use curlfield_engine::device::HeadlessGpu;

    #[test]
    fn easing_starts_from_shader_defaults() {
        let live = ParamEasing::new(0.1).unwrap().live();
        assert_eq!(
            live,
            LiveParams {
                focus: 5.1,
                fov: 50.0,
                blur: 30.0,
                curl: 0.25,
            }
        );
    }

    #[test]
    fn one_update_covers_a_tenth_of_the_gap() {
        let mut easing = ParamEasing::new(0.1).unwrap();
        easing.focus.snap(5.0);
        let cfg = ParticleConfig {
            focus: 10.0,
            ..Default::default()
        };

        easing.update(&cfg);

        assert!((easing.live().focus - 5.5).abs() < 1e-6);
    }

    #[test]
    fn blur_eases_toward_aperture_target() {
        let cfg = ParticleConfig {
            aperture: 5.6,
            ..Default::default()
        };
        let mut easing = ParamEasing::new(0.1).unwrap();

        let mut prev = easing.live().blur;
        for _ in 0..200 {
            easing.update(&cfg);
            let blur = easing.live().blur;
            assert!(blur <= prev && blur >= 0.0);
            prev = blur;
        }
        assert!(prev < 1e-3);
    }

    #[test]
    fn invalid_damping_is_rejected() {
        assert!(ParamEasing::new(0.0).is_err());
        assert!(ParamEasing::new(1.5).is_err());
    }

    const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    fn driver_for(gpu: &HeadlessGpu, config: ParticleConfig) -> FrameDriver {
        use rand::SeedableRng;

        FrameDriver::new(
            gpu.device(),
            gpu.queue(),
            &MaterialTable::with_builtins(),
            COLOR_FORMAT,
            config,
            StdRng::seed_from_u64(1),
        )
        .unwrap()
    }

    fn inputs(elapsed: f32, dt: f32) -> FrameInputs {
        FrameInputs {
            elapsed,
            dt,
            model: Mat4::IDENTITY,
            view: Mat4::from_translation(glam::Vec3::new(0.0, 0.0, -6.0)),
            projection: Mat4::perspective_rh(0.5, 1.0, 0.1, 100.0),
        }
    }

    /// Records and submits one frame into a throwaway 32×32 color target.
    fn run_frame(gpu: &HeadlessGpu, driver: &mut FrameDriver, inputs: &FrameInputs) {
        use curlfield_engine::coords::Viewport;

        let (device, queue) = (gpu.device(), gpu.queue());
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("test color"),
            size: wgpu::Extent3d {
                width: 32,
                height: 32,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = color.create_view(&Default::default());
        let ctx = RenderCtx::new(device, queue, COLOR_FORMAT, Viewport::new(32.0, 32.0), 1.0);

        let mut encoder = device.create_command_encoder(&Default::default());
        let mut target = RenderTarget::new(&mut encoder, &view);
        driver.frame(&ctx, &mut target, inputs);
        queue.submit(std::iter::once(encoder.finish()));
    }

    #[test]
    fn feedback_frames_move_particles_and_swap_targets() {
        let Some(gpu) = crate::target::test_gpu() else {
            return;
        };
        let (device, queue) = (gpu.device(), gpu.queue());

        let mut driver = driver_for(
            &gpu,
            ParticleConfig {
                size: 8,
                mode: SimulationMode::Feedback,
                seed_radius: 1.0,
                ..Default::default()
            },
        );
        let before = driver.read_positions(device, queue).unwrap();

        run_frame(&gpu, &mut driver, &inputs(1.0, 1.0));

        let after = driver.read_positions(device, queue).unwrap();
        assert_eq!(after.len(), 64);
        assert!(after.iter().all(|t| t[3] == 1.0));
        assert_ne!(before, after);
        // Default aperture 1.8 targets a blur of 34.2.
        assert!((driver.params().blur - 30.42).abs() < 1e-4);
    }

    #[test]
    fn reseed_frames_with_frozen_time_are_identical() {
        let Some(gpu) = crate::target::test_gpu() else {
            return;
        };
        let (device, queue) = (gpu.device(), gpu.queue());

        // Default curl equals its initial live value, so easing leaves it fixed.
        let mut driver = driver_for(
            &gpu,
            ParticleConfig {
                size: 8,
                mode: SimulationMode::Reseed,
                seed_radius: 1.0,
                ..Default::default()
            },
        );
        let seeds = driver.read_positions(device, queue).unwrap();

        run_frame(&gpu, &mut driver, &inputs(2.0, 0.016));
        let first = driver.read_positions(device, queue).unwrap();
        run_frame(&gpu, &mut driver, &inputs(2.0, 0.016));
        let second = driver.read_positions(device, queue).unwrap();
        run_frame(&gpu, &mut driver, &inputs(2.0, 0.016));
        let third = driver.read_positions(device, queue).unwrap();

        assert_ne!(first, seeds);
        // Each frame wrote a different ping-pong target from the same seed.
        assert_eq!(first, second);
        assert_eq!(second, third);
    }

    #[test]
    fn reseed_frames_follow_time() {
        let Some(gpu) = crate::target::test_gpu() else {
            return;
        };
        let (device, queue) = (gpu.device(), gpu.queue());

        let mut driver = driver_for(
            &gpu,
            ParticleConfig {
                size: 8,
                seed_radius: 1.0,
                ..Default::default()
            },
        );
        run_frame(&gpu, &mut driver, &inputs(2.0, 0.016));
        let first = driver.read_positions(device, queue).unwrap();
        run_frame(&gpu, &mut driver, &inputs(2.5, 0.016));
        let second = driver.read_positions(device, queue).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn feedback_frames_with_zero_dt_hold_positions() {
        let Some(gpu) = crate::target::test_gpu() else {
            return;
        };
        let (device, queue) = (gpu.device(), gpu.queue());

        let mut driver = driver_for(
            &gpu,
            ParticleConfig {
                size: 8,
                mode: SimulationMode::Feedback,
                seed_radius: 1.0,
                ..Default::default()
            },
        );
        let seeds = driver.read_positions(device, queue).unwrap();

        run_frame(&gpu, &mut driver, &inputs(2.0, 0.0));
        let first = driver.read_positions(device, queue).unwrap();
        run_frame(&gpu, &mut driver, &inputs(2.0, 0.0));
        let second = driver.read_positions(device, queue).unwrap();

        assert_eq!(first, seeds);
        assert_eq!(second, first);
    }

    #[test]
    fn set_config_retargets_easing_but_keeps_grid_and_renderer() {
        let Some(gpu) = crate::target::test_gpu() else {
            return;
        };
        let mut driver = driver_for(
            &gpu,
            ParticleConfig {
                size: 8,
                seed_radius: 1.0,
                ..Default::default()
            },
        );

        driver
            .set_config(ParticleConfig {
                size: 16,
                renderer: RendererKind::Additive,
                focus: 10.0,
                damping: 0.5,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(driver.grid().size(), 8);
        assert_eq!(driver.config().size, 8);
        assert_eq!(driver.config().renderer, RendererKind::DepthOfField);
        // New damping keeps the live value and applies from the next frame.
        assert_eq!(driver.params().focus, INITIAL_FOCUS);

        run_frame(&gpu, &mut driver, &inputs(0.0, 0.0));
        assert!((driver.params().focus - (INITIAL_FOCUS + (10.0 - INITIAL_FOCUS) * 0.5)).abs() < 1e-5);

        assert!(
            driver
                .set_config(ParticleConfig {
                    damping: 1.0,
                    ..Default::default()
                })
                .is_err()
        );
    }
}
