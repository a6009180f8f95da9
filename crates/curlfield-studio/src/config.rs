//! Studio configuration, loaded from an optional TOML file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use curlfield_engine::logging::LoggingConfig;
use curlfield_engine::paint::Color;
use curlfield_engine::window::RuntimeConfig;
use curlfield_particles::ParticleConfig;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// `env_logger` filter; overrides `RUST_LOG` when set.
    pub log: Option<String>,
    pub window: WindowConfig,
    pub scene: SceneConfig,
    pub particles: ParticleConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: f64,
    pub height: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "curlfield".to_string(),
            width: 1280.0,
            height: 720.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub camera_position: [f32; 3],
    /// Vertical field of view, degrees.
    pub camera_fov: f32,
    pub near: f32,
    pub far: f32,
    /// sRGB.
    pub clear_color: [u8; 3],
    /// Virtual scroll pages driving the rig's yaw.
    pub scroll_pages: f32,
    /// Smoothing time of the scroll offset, seconds.
    pub scroll_damping: f32,
    /// Smoothing time of the rig rotation, seconds.
    pub rig_smooth_time: f32,
    /// RNG seed for particle and star placement; random when unset.
    pub seed: Option<u64>,
    pub starfield: StarfieldConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            camera_position: [0.0, 0.0, 6.0],
            camera_fov: 25.0,
            near: 0.1,
            far: 1000.0,
            clear_color: [0, 0, 0],
            scroll_pages: 100.0,
            scroll_damping: 0.25,
            rig_smooth_time: 0.7,
            seed: None,
            starfield: StarfieldConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StarfieldConfig {
    pub enabled: bool,
    /// Grid side; the starfield holds `size²` stars.
    pub size: u32,
    pub radius: f32,
    /// Physical pixels.
    pub point_size: f32,
    /// Straight sRGB.
    pub color: [f32; 3],
}

impl Default for StarfieldConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            size: 64,
            radius: 2.0,
            point_size: 1.0,
            color: [1.0, 0.988, 0.996],
        }
    }
}

impl StudioConfig {
    /// Reads the file given as the first command-line argument, or returns defaults.
    pub fn from_args() -> Result<Self> {
        match std::env::args_os().nth(1) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let cfg: StudioConfig = toml::from_str(text)?;
        cfg.particles.validate()?;
        Ok(cfg)
    }

    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            env_filter: self.log.clone(),
            ..Default::default()
        }
    }

    pub fn runtime(&self) -> RuntimeConfig {
        RuntimeConfig {
            title: self.window.title.clone(),
            initial_size: winit::dpi::LogicalSize::new(self.window.width, self.window.height),
        }
    }
}

impl SceneConfig {
    pub fn clear(&self) -> Color {
        let [r, g, b] = self.clear_color;
        Color::from_srgb_u8(r, g, b, 255)
    }
}
