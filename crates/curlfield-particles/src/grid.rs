//! Particle indexing.
//!
//! A particle is its index `i` in `[0, N²)`. Its only persistent attribute is
//! the UV of the texel holding its position: `((i mod N)/N, floor(i/N)/N)`.

use crate::error::FieldError;

/// Largest supported grid side. 4096² particles is 256 MiB of position data
/// per target.
pub const MAX_GRID_SIZE: u32 = 4096;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ParticleGrid {
    size: u32,
}

impl ParticleGrid {
    /// Creates an `size × size` grid. `size` must be a power of two in `[2, 4096]`
    /// so that every UV is exactly representable in `f32`.
    pub fn new(size: u32) -> Result<Self, FieldError> {
        if !(2..=MAX_GRID_SIZE).contains(&size) || !size.is_power_of_two() {
            return Err(FieldError::InvalidGridSize(size));
        }
        Ok(Self { size })
    }

    #[inline]
    pub fn size(self) -> u32 {
        self.size
    }

    /// Number of particles, `N²`.
    #[inline]
    pub fn count(self) -> u32 {
        self.size * self.size
    }

    /// Texel holding particle `index`.
    #[inline]
    pub fn texel(self, index: u32) -> (u32, u32) {
        (index % self.size, index / self.size)
    }

    /// UV of particle `index`, in `[0, 1)²`.
    #[inline]
    pub fn uv(self, index: u32) -> [f32; 2] {
        let (x, y) = self.texel(index);
        let n = self.size as f32;
        [x as f32 / n, y as f32 / n]
    }

    /// Inverse of [`ParticleGrid::uv`].
    #[inline]
    pub fn index_of(self, uv: [f32; 2]) -> u32 {
        let n = self.size as f32;
        let x = (uv[0] * n).round() as u32;
        let y = (uv[1] * n).round() as u32;
        y * self.size + x
    }

    /// Per-particle UV attributes in index order.
    pub fn uvs(self) -> Vec<[f32; 2]> {
        (0..self.count()).map(|i| self.uv(i)).collect()
    }
}
