//! GPU curl-noise particle field.
//!
//! Positions live in a float texture, one particle per texel. Every frame a
//! simulation pass rewrites the texture through curl-noise advection and a
//! point pass draws one screen-aligned quad per particle from it.
//!
//! CPU pieces (`grid`, `seed`, `noise`, `kernel`, `easing`, `config`) carry no
//! GPU state and are what the tests exercise without a device.

pub mod config;
pub mod driver;
pub mod easing;
pub mod error;
pub mod grid;
pub mod kernel;
pub mod material;
pub mod noise;
pub mod points;
pub mod seed;
pub mod simulation;
pub mod target;

pub use config::{ParticleConfig, RendererKind, SimulationMode};
pub use driver::{FrameDriver, FrameInputs, LiveParams};
pub use error::FieldError;
pub use grid::ParticleGrid;
pub use material::MaterialTable;
pub use points::{PointCloudRenderer, PointFrame, PointStyle};
pub use seed::SeedShape;
pub use simulation::{SimProgram, SimulationPass};
pub use target::{OffscreenTarget, PingPong};
