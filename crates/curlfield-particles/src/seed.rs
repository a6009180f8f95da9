//! Initial position distributions.
//!
//! Samples are drawn by rejection from the cube `[-1, 1]³` into the unit ball.
//! The loop is bounded: after [`MAX_ATTEMPTS`] rejections the last candidate
//! is pulled onto the unit sphere, which keeps the `|p| <= 1` guarantee.

use glam::{Vec3, Vec4};
use rand::Rng;
use serde::Deserialize;

/// Rejection attempts per sample. The acceptance rate is π/6 (~52%), so
/// exhausting the budget has probability ~1e-21.
pub const MAX_ATTEMPTS: u32 = 64;

/// How seed positions are distributed.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeedShape {
    /// On the sphere of the given radius (ball samples normalized).
    #[default]
    Surface,
    /// Uniformly inside the ball of the given radius.
    Ball,
}

/// Draws one point inside the closed unit ball.
pub fn sample_unit_ball<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let mut candidate = Vec3::ZERO;
    for _ in 0..MAX_ATTEMPTS {
        candidate = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        if candidate.length_squared() <= 1.0 {
            return candidate;
        }
    }
    log::trace!("unit ball rejection budget exhausted; projecting onto the sphere");
    candidate.normalize_or_zero()
}

/// `count` points on the sphere of `radius`, `w = 1`.
pub fn get_sphere<R: Rng + ?Sized>(rng: &mut R, count: usize, radius: f32) -> Vec<Vec4> {
    (0..count)
        .map(|_| (sample_unit_ball(rng).normalize_or_zero() * radius).extend(1.0))
        .collect()
}

/// `count` points uniformly inside the ball of `radius`, `w = 1`.
pub fn in_sphere<R: Rng + ?Sized>(rng: &mut R, count: usize, radius: f32) -> Vec<Vec4> {
    (0..count)
        .map(|_| (sample_unit_ball(rng) * radius).extend(1.0))
        .collect()
}

/// Seeds `count` texels with the given shape.
pub fn seed_positions<R: Rng + ?Sized>(
    rng: &mut R,
    shape: SeedShape,
    count: usize,
    radius: f32,
) -> Vec<[f32; 4]> {
    let points = match shape {
        SeedShape::Surface => get_sphere(rng, count, radius),
        SeedShape::Ball => in_sphere(rng, count, radius),
    };
    points.iter().map(|p| p.to_array()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const EPS: f32 = 1e-5;

    #[test]
    fn get_sphere_four_points_radius_one() {
        let mut rng = StdRng::seed_from_u64(2);
        let points = get_sphere(&mut rng, 4, 1.0);

        assert_eq!(points.len(), 4);
        for p in points {
            assert!(p.truncate().length() <= 1.0 + EPS, "{p:?}");
        }
    }

    #[test]
    fn get_sphere_lands_on_the_radius() {
        let mut rng = StdRng::seed_from_u64(7);
        for p in get_sphere(&mut rng, 1000, 128.0) {
            let len = p.truncate().length();
            assert!(len <= 128.0 * (1.0 + EPS));
            assert!(len >= 128.0 * (1.0 - 1e-4));
            assert_eq!(p.w, 1.0);
        }
    }

    #[test]
    fn in_sphere_stays_inside_the_radius() {
        let mut rng = StdRng::seed_from_u64(11);
        let points = in_sphere(&mut rng, 5000, 2.0);

        for p in &points {
            assert!(p.truncate().length() <= 2.0 + EPS);
        }

        // Uniform in the ball: about 1/8 of the samples fall within half the radius.
        let inner = points.iter().filter(|p| p.truncate().length() < 1.0).count();
        let share = inner as f32 / points.len() as f32;
        assert!((0.09..0.16).contains(&share), "inner share {share}");
    }

    #[test]
    fn unit_ball_samples_are_bounded_for_many_draws() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..10_000 {
            assert!(sample_unit_ball(&mut rng).length() <= 1.0 + EPS);
        }
    }

    #[test]
    fn seed_positions_matches_count_and_shape() {
        let mut rng = StdRng::seed_from_u64(3);
        let texels = seed_positions(&mut rng, SeedShape::Surface, 16, 3.0);

        assert_eq!(texels.len(), 16);
        for [x, y, z, w] in texels {
            assert!((Vec3::new(x, y, z).length() - 3.0).abs() < 1e-4);
            assert_eq!(w, 1.0);
        }
    }
}
