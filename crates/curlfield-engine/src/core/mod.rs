//! Core engine-facing contracts.
//!
//! Defines the interface between the runtime (platform loop) and higher layers
//! (particle scene, tools) and provides a consistent per-frame context.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
