//! wgpu device ownership.
//!
//! [`Gpu`] binds a device to a window surface and hands out one [`GpuFrame`]
//! per redraw. [`HeadlessGpu`] opens the same kind of device without a surface
//! for offscreen work (target read-back, GPU tests).

mod gpu;
mod headless;
mod init;
mod surface;

pub use gpu::{Gpu, GpuFrame};
pub use headless::HeadlessGpu;
pub use init::GpuInit;
pub use surface::SurfaceErrorAction;
