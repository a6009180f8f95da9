//! curlfield engine crate.
//!
//! Owns the platform + GPU runtime pieces (window loop, device, input, frame
//! timing, logging) used by the particle field and the studio binary.

pub mod core;
pub mod device;
pub mod input;
pub mod time;
pub mod window;

pub mod coords;
pub mod logging;
pub mod paint;
pub mod render;
