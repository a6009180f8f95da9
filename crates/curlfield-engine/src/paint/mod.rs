//! Color representation shared by renderers and scene configuration.

pub mod color;

pub use color::Color;
