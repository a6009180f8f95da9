//! Parameter smoothing.
//!
//! [`Eased`] is the per-frame exponential lerp used for shader parameters
//! (frame-rate dependent by construction). [`smooth_damp`] and
//! [`smooth_damp_angle`] are the time-corrected critically damped springs used
//! for the camera rig.

use std::f32::consts::{PI, TAU};

use crate::error::FieldError;

/// `value + (target - value) * factor`.
#[inline]
pub fn lerp_toward(value: f32, target: f32, factor: f32) -> f32 {
    value + (target - value) * factor
}

/// A scalar eased toward a target by a fixed fraction of the remaining
/// distance each update.
///
/// For `factor ∈ (0, 1)` the value approaches the target monotonically and
/// never overshoots.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Eased {
    value: f32,
    factor: f32,
}

impl Eased {
    pub fn new(initial: f32, factor: f32) -> Result<Self, FieldError> {
        if !(factor > 0.0 && factor < 1.0) {
            return Err(FieldError::InvalidDamping(factor));
        }
        Ok(Self {
            value: initial,
            factor,
        })
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Moves one step toward `target` and returns the new value.
    #[inline]
    pub fn update(&mut self, target: f32) -> f32 {
        self.value = lerp_toward(self.value, target, self.factor);
        self.value
    }

    /// Jumps to `value` without easing.
    #[inline]
    pub fn snap(&mut self, value: f32) {
        self.value = value;
    }
}

/// Critically damped spring toward `target` (Unity-style SmoothDamp).
///
/// `velocity` carries state between calls. `smooth_time` is roughly the time
/// to reach the target; the result never overshoots it.
pub fn smooth_damp(current: f32, target: f32, velocity: &mut f32, smooth_time: f32, dt: f32) -> f32 {
    let smooth_time = smooth_time.max(1e-4);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let exp = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * exp;

    let mut output = target + (change + temp) * exp;

    // Prevent overshoot.
    if (target - current > 0.0) == (output > target) {
        output = target;
        *velocity = (output - target) / dt.max(1e-6);
    }

    output
}

/// Signed shortest angular difference `to - from`, in `(-π, π]`.
#[inline]
pub fn delta_angle(from: f32, to: f32) -> f32 {
    let d = (to - from).rem_euclid(TAU);
    if d > PI { d - TAU } else { d }
}

/// [`smooth_damp`] along the shortest arc.
pub fn smooth_damp_angle(current: f32, target: f32, velocity: &mut f32, smooth_time: f32, dt: f32) -> f32 {
    let target = current + delta_angle(current, target);
    smooth_damp(current, target, velocity, smooth_time, dt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_jump_single_step() {
        let mut focus = Eased::new(5.0, 0.1).unwrap();
        assert_eq!(focus.update(10.0), 5.5);
    }

    #[test]
    fn rejects_factor_outside_open_unit_interval() {
        for bad in [0.0, 1.0, -0.5, 1.5, f32::NAN] {
            assert!(Eased::new(0.0, bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn approaches_monotonically_without_overshoot() {
        for (start, target) in [(5.0, 10.0), (10.0, -3.0), (-2.0, -2.5)] {
            let mut e = Eased::new(start, 0.1).unwrap();
            let mut prev_gap = (target - start).abs();

            for _ in 0..400 {
                let v = e.update(target);
                let gap = (target - v).abs();
                assert!(gap <= prev_gap);
                assert!(if target > start { v <= target } else { v >= target });
                prev_gap = gap;
            }

            assert!(prev_gap < 1e-4, "did not converge: gap {prev_gap}");
        }
    }

    #[test]
    fn smooth_damp_converges_without_overshoot() {
        let mut v = 0.0;
        let mut x = 0.0;
        for _ in 0..600 {
            x = smooth_damp(x, 1.0, &mut v, 0.7, 1.0 / 60.0);
            assert!(x <= 1.0);
        }
        assert!((x - 1.0).abs() < 1e-3);
    }

    #[test]
    fn delta_angle_wraps_to_shortest_arc() {
        assert!((delta_angle(0.0, TAU + 0.1) - 0.1).abs() < 1e-5);
        assert!((delta_angle(0.1, -0.1) + 0.2).abs() < 1e-5);
        assert!((delta_angle(3.0, -3.0) - (TAU - 6.0)).abs() < 1e-5);
    }

    #[test]
    fn damp_angle_ignores_full_turns_in_target() {
        let mut v = 0.0;
        let x = smooth_damp_angle(0.0, 10.0 * TAU, &mut v, 0.7, 1.0 / 60.0);
        assert!(x.abs() < 1e-4);
    }
}
