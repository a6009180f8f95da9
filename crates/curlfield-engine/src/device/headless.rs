use anyhow::Result;

use super::GpuInit;
use super::init::{create_instance, open_device, pick_adapter};

/// Device and queue without a surface.
pub struct HeadlessGpu {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_name: String,
}

impl HeadlessGpu {
    pub async fn new(init: GpuInit) -> Result<Self> {
        let instance = create_instance();
        let adapter = pick_adapter(&instance, None).await?;
        let (device, queue) = open_device(&adapter, &init, "curlfield headless device").await?;

        Ok(Self {
            device,
            queue,
            adapter_name: adapter.get_info().name,
        })
    }

    /// Blocks on [`HeadlessGpu::new`]. Tests use this and skip when it fails.
    pub fn new_blocking(init: GpuInit) -> Result<Self> {
        pollster::block_on(Self::new(init))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }
}
