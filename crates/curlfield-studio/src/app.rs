use anyhow::Result;
use rand::SeedableRng;
use rand::rngs::StdRng;

use curlfield_engine::core::{App, AppControl, FrameCtx};
use curlfield_engine::input::Key;
use curlfield_particles::{FrameDriver, FrameInputs, MaterialTable};

use crate::camera::Camera;
use crate::config::StudioConfig;
use crate::rig::{Rig, Scroll};
use crate::starfield::Starfield;

/// GPU-side scene, built on the first frame once a device exists.
struct Scene {
    field: FrameDriver,
    stars: Option<Starfield>,
}

pub struct StudioApp {
    config: StudioConfig,
    camera: Camera,
    scroll: Scroll,
    rig: Rig,
    scene: Option<Scene>,

    clock: SimClock,
}

/// Simulation clock. Stands still while paused.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
struct SimClock {
    paused: bool,
    /// Seconds; `f64` so long sessions do not lose per-frame increments.
    elapsed: f64,
}

impl SimClock {
    /// Advances by `dt` unless paused; returns the simulation delta.
    fn advance(&mut self, dt: f32) -> f32 {
        let sim_dt = if self.paused { 0.0 } else { dt };
        self.elapsed += f64::from(sim_dt);
        sim_dt
    }

    fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    fn restart(&mut self) {
        self.elapsed = 0.0;
    }

    fn seconds(&self) -> f32 {
        self.elapsed as f32
    }
}

impl StudioApp {
    pub fn new(config: StudioConfig) -> Self {
        let scene_cfg = &config.scene;
        Self {
            camera: Camera::from_config(scene_cfg),
            scroll: Scroll::new(scene_cfg.scroll_pages, scene_cfg.scroll_damping),
            rig: Rig::new(scene_cfg.rig_smooth_time),
            scene: None,
            clock: SimClock::default(),
            config,
        }
    }

    fn build_scene(&self, ctx: &FrameCtx<'_, '_>) -> Result<Scene> {
        let device = ctx.gpu.device();
        let queue = ctx.gpu.queue();
        let format = ctx.gpu.surface_format();
        let materials = MaterialTable::with_builtins();

        let mut rng = match self.config.scene.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let stars = if self.config.scene.starfield.enabled {
            Some(Starfield::new(
                device,
                queue,
                &materials,
                format,
                &self.config.scene.starfield,
                &mut rng,
            )?)
        } else {
            None
        };

        let field = FrameDriver::new(
            device,
            queue,
            &materials,
            format,
            self.config.particles.clone(),
            rng,
        )?;

        Ok(Scene { field, stars })
    }
}

impl App for StudioApp {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<AppControl> {
        if self.scene.is_none() {
            self.scene = Some(self.build_scene(ctx)?);
        }
        let Some(scene) = self.scene.as_mut() else {
            return Ok(AppControl::Continue);
        };

        let keys = ctx.input_frame;
        if keys.key_pressed(Key::Escape) {
            return Ok(AppControl::Exit);
        }
        if keys.key_pressed(Key::R) {
            scene.field.reseed(ctx.gpu.queue())?;
            self.clock.restart();
        }
        if keys.key_pressed(Key::Space) {
            let paused = self.clock.toggle_pause();
            log::info!("simulation {}", if paused { "paused" } else { "resumed" });
            ctx.runtime.set_title(window_title(&self.config.window.title, paused));
        }

        let dt = ctx.time.dt;
        let sim_dt = self.clock.advance(dt);

        let logical = ctx.window.logical_viewport();
        self.scroll.apply_wheel(ctx.input_frame.wheel_y, logical.height);
        if keys.key_pressed(Key::PageDown) {
            self.scroll.apply_wheel(-logical.height, logical.height);
        }
        if keys.key_pressed(Key::PageUp) {
            self.scroll.apply_wheel(logical.height, logical.height);
        }
        self.scroll.update(dt);
        self.rig.update(ctx.input.pointer_ndc(logical), &self.scroll, dt);
        if let Some(stars) = scene.stars.as_mut() {
            stars.update(dt);
        }

        let camera = self.camera;
        let group = self.rig.model();
        let elapsed = self.clock.seconds();

        ctx.render(self.config.scene.clear(), |rctx, target| {
            let view = camera.view();
            let projection = camera.projection(rctx.aspect());

            if let Some(stars) = scene.stars.as_mut() {
                stars.draw(rctx, target, group, view, projection);
            }
            scene.field.frame(
                rctx,
                target,
                &FrameInputs {
                    elapsed,
                    dt: sim_dt,
                    model: group,
                    view,
                    projection,
                },
            );
            Ok(())
        })
    }
}

fn window_title(base: &str, paused: bool) -> String {
    if paused {
        format!("{base} (paused)")
    } else {
        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_marks_paused_state() {
        assert_eq!(window_title("curlfield", true), "curlfield (paused)");
        assert_eq!(window_title("curlfield", false), "curlfield");
    }

    #[test]
    fn simulation_clock_accumulates_without_drift() {
        let dt = 1.0_f32 / 60.0;
        let mut clock = SimClock::default();
        // Three hours at 60 fps.
        for _ in 0..60 * 60 * 60 * 3 {
            clock.advance(dt);
        }
        assert!((clock.seconds() - 10_800.0).abs() < 0.01, "{}", clock.seconds());
    }

    #[test]
    fn paused_clock_stands_still() {
        let mut clock = SimClock::default();
        clock.advance(0.5);
        assert!(clock.toggle_pause());

        assert_eq!(clock.advance(0.25), 0.0);
        assert_eq!(clock.seconds(), 0.5);

        assert!(!clock.toggle_pause());
        assert_eq!(clock.advance(0.25), 0.25);
        assert_eq!(clock.seconds(), 0.75);

        clock.restart();
        assert_eq!(clock.seconds(), 0.0);
        assert!(!clock.paused);
    }
}
