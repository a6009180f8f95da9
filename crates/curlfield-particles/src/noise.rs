//! CPU reference of the noise functions in `shaders/noise.wgsl`.
//!
//! Both sides use the same integer hash and the same evaluation order, so the
//! CPU results track the GPU within float rounding. Tests use this module to
//! check field properties without a device.

use glam::{UVec3, Vec3};

/// Central-difference step for the curl. A power of two, so `p ± eps` is exact
/// for lattice-aligned inputs.
pub const CURL_EPS: f32 = 1.0 / 64.0;

/// Offsets decorrelating the three potential channels.
const PSI_OFFSET_Y: Vec3 = Vec3::new(31.416, -47.853, 12.679);
const PSI_OFFSET_Z: Vec3 = Vec3::new(-233.145, 71.731, 101.335);

/// PCG-based 3D hash (Jarzynski & Olano).
#[inline]
fn pcg3d(v: UVec3) -> UVec3 {
    let mut v = UVec3::new(
        v.x.wrapping_mul(1_664_525).wrapping_add(1_013_904_223),
        v.y.wrapping_mul(1_664_525).wrapping_add(1_013_904_223),
        v.z.wrapping_mul(1_664_525).wrapping_add(1_013_904_223),
    );

    v.x = v.x.wrapping_add(v.y.wrapping_mul(v.z));
    v.y = v.y.wrapping_add(v.z.wrapping_mul(v.x));
    v.z = v.z.wrapping_add(v.x.wrapping_mul(v.y));

    v = v ^ (v >> 16u32);

    v.x = v.x.wrapping_add(v.y.wrapping_mul(v.z));
    v.y = v.y.wrapping_add(v.z.wrapping_mul(v.x));
    v.z = v.z.wrapping_add(v.x.wrapping_mul(v.y));

    v
}

/// Pseudo-random gradient in `[-1, 1]³` for a lattice point.
#[inline]
fn gradient(cell: Vec3) -> Vec3 {
    let c = UVec3::new(
        (cell.x as i32) as u32,
        (cell.y as i32) as u32,
        (cell.z as i32) as u32,
    );
    let h = pcg3d(c) >> 8u32;
    Vec3::new(h.x as f32, h.y as f32, h.z as f32) * (2.0 / 16_777_215.0) - Vec3::ONE
}

#[inline]
fn fade(t: Vec3) -> Vec3 {
    t * t * t * (t * (t * 6.0 - Vec3::splat(15.0)) + Vec3::splat(10.0))
}

#[inline]
fn corner(cell: Vec3, frac: Vec3, offset: Vec3) -> f32 {
    gradient(cell + offset).dot(frac - offset)
}

/// 3D gradient noise, roughly in `[-1, 1]`, zero at lattice points.
pub fn noise(p: Vec3) -> f32 {
    let cell = p.floor();
    let f = p - cell;
    let u = fade(f);

    let n000 = corner(cell, f, Vec3::new(0.0, 0.0, 0.0));
    let n100 = corner(cell, f, Vec3::new(1.0, 0.0, 0.0));
    let n010 = corner(cell, f, Vec3::new(0.0, 1.0, 0.0));
    let n110 = corner(cell, f, Vec3::new(1.0, 1.0, 0.0));
    let n001 = corner(cell, f, Vec3::new(0.0, 0.0, 1.0));
    let n101 = corner(cell, f, Vec3::new(1.0, 0.0, 1.0));
    let n011 = corner(cell, f, Vec3::new(0.0, 1.0, 1.0));
    let n111 = corner(cell, f, Vec3::new(1.0, 1.0, 1.0));

    let x00 = lerp(n000, n100, u.x);
    let x10 = lerp(n010, n110, u.x);
    let x01 = lerp(n001, n101, u.x);
    let x11 = lerp(n011, n111, u.x);

    let y0 = lerp(x00, x10, u.y);
    let y1 = lerp(x01, x11, u.y);

    lerp(y0, y1, u.z)
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Vector potential ψ whose curl is the flow field.
#[inline]
pub fn potential(p: Vec3) -> Vec3 {
    Vec3::new(noise(p), noise(p + PSI_OFFSET_Y), noise(p + PSI_OFFSET_Z))
}

/// Curl of [`potential`] by central differences. Divergence-free up to rounding.
pub fn curl(p: Vec3) -> Vec3 {
    let dx = Vec3::new(CURL_EPS, 0.0, 0.0);
    let dy = Vec3::new(0.0, CURL_EPS, 0.0);
    let dz = Vec3::new(0.0, 0.0, CURL_EPS);

    let px0 = potential(p - dx);
    let px1 = potential(p + dx);
    let py0 = potential(p - dy);
    let py1 = potential(p + dy);
    let pz0 = potential(p - dz);
    let pz1 = potential(p + dz);

    let x = (py1.z - py0.z) - (pz1.y - pz0.y);
    let y = (pz1.x - pz0.x) - (px1.z - px0.z);
    let z = (px1.y - px0.y) - (py1.x - py0.x);

    Vec3::new(x, y, z) / (2.0 * CURL_EPS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe_points() -> impl Iterator<Item = Vec3> {
        (0..64).map(|i| {
            let f = i as f32;
            // Snapped to a 1/1024 grid so the stencil offsets add exactly.
            let y = ((f * 1.91).sin() * 5.0 * 1024.0).round() / 1024.0;
            Vec3::new(f * 0.375 - 7.0, y, f * -0.125 + 2.5)
        })
    }

    #[test]
    fn hash_matches_reference_values() {
        assert_eq!(pcg3d(UVec3::ZERO), UVec3::new(2_611_992_518, 2_833_812_075, 1_058_359_340));
        assert_eq!(
            pcg3d(UVec3::new(1, 2, 3)),
            UVec3::new(4_204_755_366, 1_223_881_804, 1_500_469_937)
        );
        // Negative lattice cells wrap through `as u32`, same as WGSL `u32(i32)`.
        assert_eq!(
            pcg3d(UVec3::new(-1i32 as u32, 5, -7i32 as u32)),
            UVec3::new(4_181_134_013, 84_228_192, 1_811_866_596)
        );
    }

    #[test]
    fn gradient_components_stay_in_unit_range() {
        for p in probe_points() {
            let g = gradient(p.floor());
            assert!(g.abs().max_element() <= 1.0, "gradient at {p} = {g}");
        }
    }

    #[test]
    fn noise_is_deterministic_and_bounded() {
        for p in probe_points() {
            let a = noise(p);
            assert_eq!(a.to_bits(), noise(p).to_bits());
            assert!(a.abs() <= 2.0, "noise({p}) = {a}");
        }
    }

    #[test]
    fn noise_vanishes_on_lattice_points() {
        for p in [Vec3::ZERO, Vec3::new(3.0, -2.0, 9.0), Vec3::new(-100.0, 4.0, 1.0)] {
            assert_eq!(noise(p), 0.0);
        }
    }

    #[test]
    fn noise_varies_between_lattice_points() {
        let distinct = probe_points()
            .map(|p| (noise(p) * 1e4).round() as i64)
            .collect::<std::collections::HashSet<_>>();
        assert!(distinct.len() > 32);
    }

    #[test]
    fn curl_field_is_divergence_free() {
        let h = CURL_EPS;
        for p in probe_points() {
            let dx = Vec3::new(h, 0.0, 0.0);
            let dy = Vec3::new(0.0, h, 0.0);
            let dz = Vec3::new(0.0, 0.0, h);

            let div = (curl(p + dx).x - curl(p - dx).x
                + curl(p + dy).y - curl(p - dy).y
                + curl(p + dz).z - curl(p - dz).z)
                / (2.0 * h);

            let scale = curl(p).length().max(1.0);
            assert!(div.abs() < 1e-3 * scale, "div at {p} = {div}");
        }
    }

    #[test]
    fn curl_is_not_trivially_zero() {
        let total: f32 = probe_points().map(|p| curl(p).length()).sum();
        assert!(total > 1.0);
    }
}
