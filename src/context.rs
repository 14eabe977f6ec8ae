use anyhow::Context as _;

use crate::resources::texture::GpuTextures;

/// Device and queue that models are uploaded with.
///
/// Textures and buffers created through a context are only valid with that
/// context's device.
#[derive(Debug, Clone)]
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }

    /// Request a device without a surface, for tools and tests.
    pub async fn headless() -> anyhow::Result<Self> {
        log::info!("WGPU headless setup");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable GPU adapter")?;
        log::info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("flow-model device"),
                ..Default::default()
            })
            .await
            .context("failed to create device")?;

        Ok(Self { device, queue })
    }

    pub fn headless_blocking() -> anyhow::Result<Self> {
        futures::executor::block_on(Self::headless())
    }

    /// A texture factory creating textures on this context.
    pub fn textures(&self) -> GpuTextures {
        GpuTextures::new(&self.device, &self.queue)
    }
}
