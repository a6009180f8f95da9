use anyhow::Result;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::init::{create_instance, open_device, pick_adapter};
use super::surface::SurfaceState;
use super::{GpuInit, SurfaceErrorAction};

/// One acquired swapchain image and the encoder recording into it.
///
/// Short-lived: the next image cannot be acquired until this one is handed
/// back through [`Gpu::submit`].
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

/// Device, queue and the window surface they present to.
///
/// `'w` is the window borrow the surface is tied to.
pub struct Gpu<'w> {
    _instance: wgpu::Instance,
    surface: SurfaceState<'w>,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl<'w> Gpu<'w> {
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let instance = create_instance();
        let raw_surface = instance.create_surface(window)?;
        let adapter = pick_adapter(&instance, Some(&raw_surface)).await?;
        let (device, queue) = open_device(&adapter, &init, "curlfield device").await?;
        let surface = SurfaceState::configure(raw_surface, &adapter, &device, &init, size)?;

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
        })
    }

    #[inline]
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface.format()
    }

    /// Drawable size, physical pixels.
    #[inline]
    pub fn size(&self) -> PhysicalSize<u32> {
        self.surface.size()
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.surface.resize(&self.device, new_size);
    }

    pub fn begin_frame(&self) -> Result<GpuFrame, wgpu::SurfaceError> {
        let surface_texture = self.surface.acquire()?;
        let view = surface_texture.texture.create_view(&Default::default());
        let encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("curlfield frame encoder"),
        });

        Ok(GpuFrame {
            surface_texture,
            view,
            encoder,
        })
    }

    /// Submits everything recorded into `frame` as one command buffer, then presents.
    pub fn submit(&self, frame: GpuFrame) {
        let GpuFrame {
            surface_texture,
            view,
            encoder,
        } = frame;
        self.queue.submit(std::iter::once(encoder.finish()));
        drop(view);
        surface_texture.present();
    }

    pub fn handle_surface_error(&mut self, err: wgpu::SurfaceError) -> SurfaceErrorAction {
        self.surface.recover(&self.device, err)
    }
}
