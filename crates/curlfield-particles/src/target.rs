//! Offscreen position targets.
//!
//! A target is a `size × size` `Rgba32Float` texture, usable both as a color
//! attachment and as a shader input. It has no depth/stencil attachment and is
//! only ever read with `textureLoad`, i.e. exact texel fetches: interpolating
//! would blend unrelated particles.

use std::sync::mpsc;

use anyhow::{Context, Result};

use crate::error::FieldError;

pub const POSITION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// Bytes per `Rgba32Float` texel.
const TEXEL_BYTES: u32 = 16;

pub struct OffscreenTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: u32,
}

impl OffscreenTarget {
    /// Allocates a target.
    ///
    /// Fails if `size` exceeds the device's 2D texture limit, or if the device
    /// rejects the texture (downlevel adapters cannot render to `Rgba32Float`).
    pub fn new(device: &wgpu::Device, size: u32, label: &str) -> Result<Self, FieldError> {
        let limit = device.limits().max_texture_dimension_2d;
        if size == 0 || size > limit {
            return Err(FieldError::TargetTooLarge { size, limit });
        }

        let oom_scope = device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let validation_scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: POSITION_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        // Scopes pop innermost first.
        let invalid = pollster::block_on(validation_scope.pop());
        let exhausted = pollster::block_on(oom_scope.pop());
        check_allocation(size, invalid.or(exhausted))?;

        log::debug!("allocated {label}: {size}x{size} {POSITION_FORMAT:?}");

        Ok(Self { texture, view, size })
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Overwrites every texel. `texels` is row-major and must hold `size²` entries.
    pub fn upload(&self, queue: &wgpu::Queue, texels: &[[f32; 4]]) -> Result<(), FieldError> {
        let expected = (self.size * self.size) as usize;
        if texels.len() != expected {
            return Err(FieldError::TexelCount {
                got: texels.len(),
                expected,
            });
        }

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(texels),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.size * TEXEL_BYTES),
                rows_per_image: Some(self.size),
            },
            extent(self.size),
        );
        Ok(())
    }

    /// Copies the target back to host memory, row-major. Blocks until the GPU
    /// has finished all submitted work.
    pub fn read_back(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Vec<[f32; 4]>> {
        let unpadded = self.size * TEXEL_BYTES;
        let padded = padded_bytes_per_row(unpadded);

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("curlfield target readback"),
            size: u64::from(padded) * u64::from(self.size),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("curlfield readback encoder"),
        });
        encoder.copy_texture_to_buffer(
            self.texture.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(self.size),
                },
            },
            extent(self.size),
        );
        queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .context("device poll failed during read-back")?;

        rx.recv()
            .map_err(|e| FieldError::ReadBack(e.to_string()))?
            .map_err(|e| FieldError::ReadBack(e.to_string()))?;

        let mut texels = Vec::with_capacity((self.size * self.size) as usize);
        {
            let data = slice.get_mapped_range();
            for row in data.chunks_exact(padded as usize) {
                let row: &[[f32; 4]] = bytemuck::cast_slice(&row[..unpadded as usize]);
                texels.extend_from_slice(row);
            }
        }
        buffer.unmap();

        Ok(texels)
    }
}

/// Maps an error captured around target creation to [`FieldError::TargetRejected`].
fn check_allocation(size: u32, captured: Option<wgpu::Error>) -> Result<(), FieldError> {
    match captured {
        None => Ok(()),
        Some(err) => Err(FieldError::TargetRejected {
            size,
            reason: err.to_string(),
        }),
    }
}

#[inline]
fn extent(size: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size,
        height: size,
        depth_or_array_layers: 1,
    }
}

/// Rounds a row size up to `COPY_BYTES_PER_ROW_ALIGNMENT`.
#[inline]
pub(crate) fn padded_bytes_per_row(unpadded: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Two targets behind one logical handle.
///
/// Each frame the simulation reads [`PingPong::front`] (last completed output)
/// and writes [`PingPong::back`]; the point pass of the same frame reads `back`;
/// then [`PingPong::swap`] publishes `back` as the new `front`. A pass never
/// samples the texture it renders into.
pub struct PingPong {
    targets: [OffscreenTarget; 2],
    front: usize,
}

impl PingPong {
    pub fn new(device: &wgpu::Device, size: u32) -> Result<Self, FieldError> {
        Ok(Self {
            targets: [
                OffscreenTarget::new(device, size, "curlfield positions A")?,
                OffscreenTarget::new(device, size, "curlfield positions B")?,
            ],
            front: 0,
        })
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.targets[0].size()
    }

    /// Last completed output.
    #[inline]
    pub fn front(&self) -> &OffscreenTarget {
        &self.targets[self.front]
    }

    /// Target being written this frame.
    #[inline]
    pub fn back(&self) -> &OffscreenTarget {
        &self.targets[1 - self.front]
    }

    /// Index (0 or 1) of the back target; lets callers cache per-target bind groups.
    #[inline]
    pub fn back_index(&self) -> usize {
        1 - self.front
    }

    #[inline]
    pub fn front_index(&self) -> usize {
        self.front
    }

    #[inline]
    pub fn swap(&mut self) {
        self.front = 1 - self.front;
    }

    /// Both targets, by index.
    #[inline]
    pub fn targets(&self) -> &[OffscreenTarget; 2] {
        &self.targets
    }
}

/// Headless device able to render into position targets, or `None` when the
/// machine has no adapter or the adapter cannot render to `Rgba32Float`.
#[cfg(test)]
pub(crate) fn test_gpu() -> Option<curlfield_engine::device::HeadlessGpu> {
    let gpu = curlfield_engine::device::HeadlessGpu::new_blocking(Default::default()).ok()?;
    match OffscreenTarget::new(gpu.device(), 1, "capability check") {
        Ok(_) => Some(gpu),
        Err(err) => {
            log::warn!("skipping GPU test on {}: {err}", gpu.adapter_name());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captured_device_errors_become_field_errors() {
        assert!(check_allocation(64, None).is_ok());

        let err = check_allocation(
            64,
            Some(wgpu::Error::Validation {
                source: Box::new(std::fmt::Error),
                description: "usage not allowed on Rgba32Float".into(),
            }),
        )
        .unwrap_err();
        match err {
            FieldError::TargetRejected { size, reason } => {
                assert_eq!(size, 64);
                assert!(reason.contains("Rgba32Float"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_and_oversized_targets_are_refused() {
        let Ok(gpu) = curlfield_engine::device::HeadlessGpu::new_blocking(Default::default()) else {
            return;
        };
        let limit = gpu.device().limits().max_texture_dimension_2d;
        assert!(matches!(
            OffscreenTarget::new(gpu.device(), 0, "empty"),
            Err(FieldError::TargetTooLarge { size: 0, .. })
        ));
        assert!(matches!(
            OffscreenTarget::new(gpu.device(), limit + 1, "huge"),
            Err(FieldError::TargetTooLarge { .. })
        ));
    }

    #[test]
    fn allocation_failure_does_not_reach_the_device_error_handler() {
        let Ok(gpu) = curlfield_engine::device::HeadlessGpu::new_blocking(Default::default()) else {
            return;
        };
        let device = gpu.device();

        let outer = device.push_error_scope(wgpu::ErrorFilter::Validation);
        let result = OffscreenTarget::new(device, 4, "scoped target");
        let leaked = pollster::block_on(outer.pop());

        assert!(leaked.is_none(), "error escaped: {leaked:?}");
        match result {
            Ok(target) => assert_eq!(target.size(), 4),
            Err(err) => assert!(matches!(err, FieldError::TargetRejected { size: 4, .. }), "{err}"),
        }
    }

    #[test]
    fn row_padding_rounds_up_to_alignment() {
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(256), 256);
        assert_eq!(padded_bytes_per_row(257), 512);
        assert_eq!(padded_bytes_per_row(512 * TEXEL_BYTES), 8192);
    }
}
