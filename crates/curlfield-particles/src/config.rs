//! Particle field configuration.

use serde::Deserialize;

use crate::error::FieldError;
use crate::grid::ParticleGrid;
use crate::seed::SeedShape;

/// How the simulation pass obtains its input positions.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimulationMode {
    /// Every frame evaluates the field at the fixed seed positions; time alone
    /// animates the cloud. Frozen time yields identical frames.
    #[default]
    Reseed,
    /// Every frame advects the previous frame's output (ping-pong feedback).
    Feedback,
}

/// Point shading variant.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RendererKind {
    /// Fixed-color points, additive blending, no depth of field.
    Additive,
    /// Round points sized and faded by distance from the focal plane.
    #[default]
    DepthOfField,
}

/// Configuration of the particle field.
///
/// `speed`, `fov`, `aperture`, `focus` and `curl` are targets: the frame driver
/// eases the live shader values toward them every frame. `size` is fixed at
/// construction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    /// Grid side `N`; the field holds `N²` particles.
    pub size: u32,
    /// Multiplier from elapsed seconds to simulation time.
    pub speed: f32,
    /// Edge-mask divisor of the depth-of-field renderer: only particles with
    /// `u >= 1 - 1/fov` get their full size. Not the camera field of view.
    pub fov: f32,
    /// Blur target is `(5.6 - aperture) * 9`.
    pub aperture: f32,
    /// Focal distance from the camera, world units.
    pub focus: f32,
    /// Base frequency of the curl field.
    pub curl: f32,

    pub mode: SimulationMode,
    pub renderer: RendererKind,
    pub seed_shape: SeedShape,
    pub seed_radius: f32,
    /// Feedback mode: displacement per second per unit of field.
    pub advect_step: f32,
    /// `> 0` clamps position length; `0` leaves positions unbounded.
    pub bound_radius: f32,
    /// Fraction of the remaining distance covered per eased update.
    pub damping: f32,
    /// Additive renderer base point size, physical pixels.
    pub point_size: f32,
    /// Additive renderer edge-mask divisor.
    pub edge_divisor: f32,
    /// Smallest rasterized point size, physical pixels.
    pub min_point_size: f32,
    /// Additive renderer color (straight sRGB).
    pub color: [f32; 3],
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            size: 512,
            speed: 100.0,
            fov: 50.0,
            aperture: 1.8,
            focus: 5.1,
            curl: 0.25,
            mode: SimulationMode::Reseed,
            renderer: RendererKind::DepthOfField,
            seed_shape: SeedShape::Surface,
            seed_radius: 128.0,
            advect_step: 0.05,
            bound_radius: 0.0,
            damping: 0.1,
            point_size: 3.0,
            edge_divisor: 64.0,
            min_point_size: 1.0,
            color: [0.34, 0.53, 0.96],
        }
    }
}

impl ParticleConfig {
    /// Blur amount targeted by the depth-of-field renderer.
    #[inline]
    pub fn blur_target(&self) -> f32 {
        (5.6 - self.aperture) * 9.0
    }

    /// Validates the configuration and returns its grid.
    pub fn validate(&self) -> Result<ParticleGrid, FieldError> {
        if !(self.damping > 0.0 && self.damping < 1.0) {
            return Err(FieldError::InvalidDamping(self.damping));
        }
        ParticleGrid::new(self.size)
    }
}
