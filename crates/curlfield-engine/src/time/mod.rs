//! Frame timing.
//!
//! One `FrameClock` per window; call `tick()` once per presented frame to obtain
//! a `FrameTime` carrying the clamped delta and the accumulated elapsed time that
//! drives simulation uniforms.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
