use thiserror::Error;

/// Errors raised while building or feeding the particle field.
///
/// All of them are startup-fatal at the application level; callers wrap them
/// into `anyhow::Error` and abort scene construction.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("grid size {0} must be a power of two in [2, 4096]")]
    InvalidGridSize(u32),

    #[error("offscreen target {size}x{size} exceeds the device limit of {limit}")]
    TargetTooLarge { size: u32, limit: u32 },

    #[error("device rejected a {size}x{size} position target: {reason}")]
    TargetRejected { size: u32, reason: String },

    #[error("unknown material `{0}`")]
    UnknownMaterial(String),

    #[error("texel data has {got} entries, expected {expected}")]
    TexelCount { got: usize, expected: usize },

    #[error("damping factor {0} must lie in (0, 1)")]
    InvalidDamping(f32),

    #[error("target read-back failed: {0}")]
    ReadBack(String),
}
