use std::path::{Component, Path, PathBuf};

use anyhow::Context;

use crate::{
    data_structures::{
        model::{TextureCache, TextureHandle, TextureRef, TextureRole},
        scene_graph::Scene,
        texture::{DecodedImage, Texture},
    },
    resources::LoadOptions,
};

/// Creates GPU textures for decoded images.
///
/// The loader calls this at most once per distinct texture path of a model.
/// Implementations hand out handles that stay valid until they release them.
pub trait TextureFactory {
    fn create_texture(
        &mut self,
        image: &DecodedImage,
        label: &str,
        options: &LoadOptions,
    ) -> anyhow::Result<TextureHandle>;
}

/// WGPU backed [`TextureFactory`]. Handles index into the owned texture list.
#[derive(Debug)]
pub struct GpuTextures {
    device: wgpu::Device,
    queue: wgpu::Queue,
    textures: Vec<Option<Texture>>,
}

impl GpuTextures {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self {
            device: device.clone(),
            queue: queue.clone(),
            textures: Vec::new(),
        }
    }

    pub fn get(&self, handle: TextureHandle) -> Option<&Texture> {
        self.textures
            .get(handle.0 as usize)
            .and_then(|texture| texture.as_ref())
    }

    /// Destroy the texture behind `handle`. Releasing twice is a no-op.
    pub fn release(&mut self, handle: TextureHandle) {
        if let Some(texture) = self
            .textures
            .get_mut(handle.0 as usize)
            .and_then(Option::take)
        {
            texture.texture.destroy();
        }
    }

    /// Number of live textures.
    pub fn len(&self) -> usize {
        self.textures.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TextureFactory for GpuTextures {
    fn create_texture(
        &mut self,
        image: &DecodedImage,
        label: &str,
        options: &LoadOptions,
    ) -> anyhow::Result<TextureHandle> {
        let texture = Texture::from_decoded(
            &self.device,
            &self.queue,
            image,
            Some(label),
            options.srgb,
            options.generate_mipmaps,
        )?;
        let handle = TextureHandle(u32::try_from(self.textures.len())?);
        self.textures.push(Some(texture));
        Ok(handle)
    }
}

pub fn load_binary(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))
}

/// `path` below `directory`. Absolute texture paths are taken relative to the
/// directory as well, so a material never points outside of it by its root.
pub fn texture_file(directory: &Path, path: &Path) -> PathBuf {
    let relative: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::Prefix(_) | Component::RootDir))
        .collect();
    directory.join(relative)
}

/// Resolves material texture slots for one model, going through its dedup cache.
pub(crate) struct TextureLoader<'a, F: TextureFactory + ?Sized> {
    directory: &'a Path,
    scene: &'a Scene,
    factory: &'a mut F,
    options: &'a LoadOptions,
    cache: TextureCache,
}

impl<'a, F: TextureFactory + ?Sized> TextureLoader<'a, F> {
    pub(crate) fn new(
        directory: &'a Path,
        scene: &'a Scene,
        factory: &'a mut F,
        options: &'a LoadOptions,
    ) -> Self {
        Self {
            directory,
            scene,
            factory,
            options,
            cache: TextureCache::default(),
        }
    }

    pub(crate) fn into_cache(self) -> TextureCache {
        self.cache
    }

    /// One [`TextureRef`] per slot path; slots whose image fails are left out.
    pub(crate) fn load_material_textures(
        &mut self,
        paths: &[String],
        role: TextureRole,
    ) -> Vec<TextureRef> {
        paths
            .iter()
            .filter_map(|path| self.resolve(path, role))
            .collect()
    }

    fn resolve(&mut self, path: &str, role: TextureRole) -> Option<TextureRef> {
        log::warn!("Texture ({}): {}", role.tag(), path);

        if let Some(cached) = self.cache.get(path) {
            return Some(TextureRef {
                role,
                ..cached.clone()
            });
        }
        if self.cache.has_failed(path) {
            return None;
        }

        match self.create(path) {
            Ok(handle) => {
                let texture = TextureRef {
                    handle,
                    role,
                    path: path.to_string(),
                };
                self.cache.insert(texture.clone());
                Some(texture)
            }
            Err(e) => {
                log::error!("Texture failed to load at path {}: {:#}", path, e);
                self.cache.mark_failed(path);
                None
            }
        }
    }

    fn create(&mut self, path: &str) -> anyhow::Result<TextureHandle> {
        let image = match self.scene.embedded_textures.get(path) {
            Some(bytes) => DecodedImage::from_bytes(bytes)
                .with_context(|| format!("cannot decode embedded image {path}"))?,
            None => {
                let file = match self.scene.texture_files.get(path) {
                    Some(file) => texture_file(self.directory, file),
                    None => texture_file(self.directory, Path::new(path)),
                };
                let bytes = load_binary(&file)?;
                DecodedImage::from_bytes(&bytes)
                    .with_context(|| format!("cannot decode {}", file.display()))?
            }
        };
        self.factory.create_texture(&image, path, self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_texture_paths_join_the_model_directory() {
        let file = texture_file(Path::new("assets/house"), Path::new("tex/wall.png"));
        assert_eq!(file, PathBuf::from("assets/house/tex/wall.png"));
    }

    #[cfg(unix)]
    #[test]
    fn absolute_texture_paths_stay_inside_the_model_directory() {
        let file = texture_file(Path::new("assets/house"), Path::new("/etc/wall.png"));
        assert_eq!(file, PathBuf::from("assets/house/etc/wall.png"));
    }
}
