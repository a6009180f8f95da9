//! GPU rendering plumbing shared by renderers.
//!
//! Each renderer owns its GPU resources (pipelines, buffers, bind groups) and
//! records passes into the [`RenderTarget`] encoder.
//!
//! Convention:
//! - the viewport is in physical pixels (point sizes are pixel sizes)
//! - uniform structs are `#[repr(C)]` + `Pod` and padded to 16 bytes

mod ctx;
pub mod util;

pub use ctx::{RenderCtx, RenderTarget};
