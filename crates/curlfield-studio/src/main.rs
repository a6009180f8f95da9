//! curlfield studio: the particle field in a window.
//!
//! Usage: `curlfield-studio [config.toml]`
//!
//! Keys: `Escape` quits, `R` re-seeds the field, `Space` pauses simulation time,
//! `PageUp`/`PageDown` scroll one page.

mod app;
mod camera;
mod config;
mod rig;
mod starfield;

use anyhow::Result;

use curlfield_engine::device::GpuInit;
use curlfield_engine::logging::init_logging;
use curlfield_engine::window::Runtime;

use crate::app::StudioApp;
use crate::config::StudioConfig;

fn main() -> Result<()> {
    let config = StudioConfig::from_args()?;
    init_logging(config.logging());

    log::info!(
        "starting: {}x{} particles, {:?}, {:?}",
        config.particles.size,
        config.particles.size,
        config.particles.mode,
        config.particles.renderer
    );

    Runtime::run(config.runtime(), GpuInit::default(), StudioApp::new(config))
}
