use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};

use crate::{
    data_structures::model::Model,
    resources::texture::{TextureFactory, TextureLoader},
};

/**
 * This module contains all logic for loading models and their textures from external files.
 */
pub mod import;
pub mod mesh;
pub mod texture;

/// Knobs of a single [`load_model`] call.
#[derive(Clone, Debug)]
pub struct LoadOptions {
    /// Ask the importer to split polygons into triangles.
    pub triangulate: bool,
    /// Store texture coordinates with the origin at the top-left (OBJ is flipped).
    pub flip_uvs: bool,
    /// Deepest node level that is still traversed; deeper trees fail to load.
    pub max_depth: usize,
    pub generate_mipmaps: bool,
    /// Create colour textures in an sRGB format.
    pub srgb: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            triangulate: true,
            flip_uvs: true,
            max_depth: 256,
            generate_mipmaps: true,
            srgb: true,
        }
    }
}

/// Directory that texture paths of the model at `path` are relative to.
pub fn model_directory(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Load the model at `path`.
///
/// Never fails from the caller's point of view: if the file can't be read, the
/// scene is incomplete or malformed, the error is logged and an empty model is
/// returned. Textures that fail to load are logged and left out of their mesh.
pub fn load_model<F: TextureFactory + ?Sized>(
    path: impl AsRef<Path>,
    options: &LoadOptions,
    factory: &mut F,
) -> Model {
    let path = path.as_ref();
    match try_load_model(path, options, factory) {
        Ok(model) => model,
        Err(e) => {
            log::error!("{}: {:#}", path.display(), e);
            Model::empty(model_directory(path))
        }
    }
}

/// Like [`load_model`], but hands the structural error to the caller.
pub fn try_load_model<F: TextureFactory + ?Sized>(
    path: impl AsRef<Path>,
    options: &LoadOptions,
    factory: &mut F,
) -> anyhow::Result<Model> {
    let path = path.as_ref();
    let scene = import::import_scene(path, options)?;
    if scene.incomplete {
        bail!("scene {} is incomplete", path.display());
    }
    let root = scene
        .root
        .as_ref()
        .ok_or_else(|| anyhow!("scene {} has no root node", path.display()))?;

    let directory = model_directory(path);
    let mut textures = TextureLoader::new(&directory, &scene, factory, options);
    let mut meshes = Vec::new();

    for (depth, node) in root.pre_order() {
        if depth > options.max_depth {
            bail!(
                "node {} is nested {} levels deep, the limit is {}",
                node.name,
                depth,
                options.max_depth
            );
        }
        log::debug!("Processing node {} ({} meshes)", node.name, node.meshes.len());
        for &mesh_index in &node.meshes {
            let imported = scene
                .meshes
                .get(mesh_index)
                .ok_or_else(|| anyhow!("node {} references missing mesh {}", node.name, mesh_index))?;
            let sub_mesh = mesh::process_mesh(imported, &scene.materials, &mut textures)
                .with_context(|| format!("in {}", path.display()))?;
            meshes.push(sub_mesh);
        }
    }

    let cache = textures.into_cache();
    log::info!(
        "Loaded {}: {} meshes, {} textures",
        path.display(),
        meshes.len(),
        cache.len()
    );
    Ok(Model::new(meshes, directory, cache))
}
