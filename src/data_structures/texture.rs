//! Decoded images and GPU textures.
//!
//! [`DecodedImage`] is the CPU side: an image normalized to one of the three
//! pixel layouts a model texture can have, plus its mip chain. [`Texture`] wraps
//! the WGPU texture, view and sampler created from it.

use anyhow::*;
use image::{DynamicImage, GenericImageView, imageops::FilterType};

/// Pixel layout of a decoded image, chosen from its channel count.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// Single channel.
    Red,
    Rgb,
    Rgba,
}

impl PixelFormat {
    /// 1 → red, 3 → RGB, 4 → RGBA. Anything else (grey + alpha) is widened to RGBA.
    pub fn from_channels(channels: u8) -> Self {
        match channels {
            1 => PixelFormat::Red,
            3 => PixelFormat::Rgb,
            _ => PixelFormat::Rgba,
        }
    }

    /// WGPU has no 3-channel 8-bit format, so RGB data is uploaded as RGBA.
    pub fn wgpu_format(self, srgb: bool) -> wgpu::TextureFormat {
        match (self, srgb) {
            (PixelFormat::Red, _) => wgpu::TextureFormat::R8Unorm,
            (_, true) => wgpu::TextureFormat::Rgba8UnormSrgb,
            (_, false) => wgpu::TextureFormat::Rgba8Unorm,
        }
    }

    /// Bytes per pixel of the uploaded data.
    pub fn upload_bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Red => 1,
            PixelFormat::Rgb | PixelFormat::Rgba => 4,
        }
    }
}

/// One level of a mip chain, ready for upload.
#[derive(Clone, Debug)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// An image decoded from a texture file.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    /// Channel count of the source file before normalization.
    pub channels: u8,
    pub format: PixelFormat,
    image: DynamicImage,
}

impl DecodedImage {
    pub fn from_dynamic(img: DynamicImage) -> Self {
        let channels = img.color().channel_count();
        let format = PixelFormat::from_channels(channels);
        let image = match format {
            PixelFormat::Red => DynamicImage::ImageLuma8(img.to_luma8()),
            PixelFormat::Rgb => DynamicImage::ImageRgb8(img.to_rgb8()),
            PixelFormat::Rgba => DynamicImage::ImageRgba8(img.to_rgba8()),
        };
        Self {
            channels,
            format,
            image,
        }
    }

    /// Decode raw image file data (PNG, JPEG, ...), guessing the format.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)?;
        Ok(Self::from_dynamic(img))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Number of levels in a full mip chain down to 1x1.
    pub fn mip_level_count(&self) -> u32 {
        let (width, height) = self.dimensions();
        u32::BITS - width.max(height).max(1).leading_zeros()
    }

    /// Upload data for level 0 and, when requested, every smaller level.
    pub fn mip_levels(&self, generate_mipmaps: bool) -> Vec<MipLevel> {
        let count = if generate_mipmaps {
            self.mip_level_count()
        } else {
            1
        };
        let (mut width, mut height) = self.dimensions();
        let mut levels = Vec::with_capacity(count as usize);
        levels.push(self.level_data(&self.image));
        for _ in 1..count {
            width = (width / 2).max(1);
            height = (height / 2).max(1);
            let scaled = self.image.resize_exact(width, height, FilterType::Triangle);
            levels.push(self.level_data(&scaled));
        }
        levels
    }

    fn level_data(&self, img: &DynamicImage) -> MipLevel {
        let (width, height) = img.dimensions();
        let data = match self.format {
            PixelFormat::Red => img.to_luma8().into_raw(),
            PixelFormat::Rgb | PixelFormat::Rgba => img.to_rgba8().into_raw(),
        };
        MipLevel {
            width,
            height,
            data,
        }
    }
}

/// A GPU texture with a view and optional sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

impl Texture {
    /// Create a sampled 2D texture from a decoded image.
    ///
    /// # Arguments
    ///
    /// * `label` is used as a debug label for the GPU resource
    /// * `srgb` selects an sRGB colour format for multi-channel images
    /// * `generate_mipmaps` uploads a full mip chain instead of a single level
    pub fn from_decoded(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &DecodedImage,
        label: Option<&str>,
        srgb: bool,
        generate_mipmaps: bool,
    ) -> Result<Self> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            bail!("image has no pixels ({width}x{height})");
        }
        let levels = img.mip_levels(generate_mipmaps);
        let format = img.format.wgpu_format(srgb);
        let bytes_per_pixel = img.format.upload_bytes_per_pixel();

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip_level, level) in levels.iter().enumerate() {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &texture,
                    mip_level: mip_level as u32,
                    origin: wgpu::Origin3d::ZERO,
                },
                &level.data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_pixel * level.width),
                    rows_per_image: Some(level.height),
                },
                wgpu::Extent3d {
                    width: level.width,
                    height: level.height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(create_default_sampler(device));

        Ok(Self {
            texture,
            view,
            sampler,
        })
    }
}

/// Repeat wrapping, linear filtering within and between mip levels.
pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Linear,
        ..Default::default()
    })
}
