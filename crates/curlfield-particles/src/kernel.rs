//! CPU reference of the per-texel simulation in `shaders/simulation.wgsl`.

use glam::{Vec3, Vec4};

use crate::noise::{curl, noise};

/// Shader-side time scale: the field is evaluated at `time * TIME_SCALE`.
pub const TIME_SCALE: f32 = 0.015;

/// Per-frame simulation uniforms.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StepParams {
    /// Simulation time (elapsed seconds × speed).
    pub time: f32,
    pub curl_freq: f32,
    /// Feedback mode only: displacement per unit of field, already scaled by dt.
    pub advect_step: f32,
    /// Positions longer than this are pulled back onto the sphere; `<= 0` disables.
    pub bound_radius: f32,
}

/// Turbulent curl field at `p`.
///
/// `base = curl(p·f + t)`; four octaves at doubling frequency and halving
/// amplitude refine a copy of it; a noise value blends the two, so turbulence
/// varies over space and time. The last octave samples `base`, not the
/// refined copy.
pub fn field(p: Vec3, t: f32, freq: f32) -> Vec3 {
    let base = curl(p * freq + Vec3::splat(t));

    let mut turb = base;
    turb += curl(turb * freq * 2.0) * 0.5;
    turb += curl(turb * freq * 4.0) * 0.25;
    turb += curl(turb * freq * 8.0) * 0.125;
    turb += curl(base * freq * 16.0) * 0.0625;

    base.lerp(turb, noise(base + Vec3::splat(t)))
}

/// Reseed mode: the output is the field evaluated at the seed position.
pub fn reseed_texel(seed: Vec4, params: &StepParams) -> Vec4 {
    let t = params.time * TIME_SCALE;
    bound(field(seed.truncate(), t, params.curl_freq), params.bound_radius).extend(1.0)
}

/// Feedback mode: the previous position is advected along the field.
pub fn advect_texel(prev: Vec4, params: &StepParams) -> Vec4 {
    let t = params.time * TIME_SCALE;
    let p = prev.truncate();
    let next = p + field(p, t, params.curl_freq) * params.advect_step;
    bound(next, params.bound_radius).extend(1.0)
}

#[inline]
fn bound(p: Vec3, radius: f32) -> Vec3 {
    if radius > 0.0 && p.length() > radius {
        p.normalize_or_zero() * radius
    } else {
        p
    }
}
