//! Loaded models: vertices, sub-meshes, texture references and their GPU counterparts.
//!
//! A [`Model`] is produced once by [`crate::resources::load_model`] and is immutable
//! afterwards. Its sub-meshes can be turned into GPU buffers with [`Model::upload`]
//! and drawn through [`DrawModel`].

use std::{
    collections::{HashMap, HashSet},
    fmt,
    path::{Path, PathBuf},
};

use wgpu::util::DeviceExt;

/// A single vertex as it is laid out in the vertex buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl ModelVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Opaque identifier of a texture created by a [`TextureFactory`](crate::resources::texture::TextureFactory).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

impl fmt::Display for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The material channel a texture feeds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TextureRole {
    Diffuse,
    Specular,
}

impl TextureRole {
    /// Type tag used as the sampler name prefix in shaders.
    pub fn tag(self) -> &'static str {
        match self {
            TextureRole::Diffuse => "texture_diffuse",
            TextureRole::Specular => "texture_specular",
        }
    }

    /// Name of the single-sampler material uniform for this role.
    pub fn material_uniform(self) -> &'static str {
        match self {
            TextureRole::Diffuse => "material.diffuse",
            TextureRole::Specular => "material.specular",
        }
    }
}

/// A texture bound to a sub-mesh.
///
/// `path` is the string stored in the source material and doubles as the
/// dedup key of the owning model's [`TextureCache`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureRef {
    pub handle: TextureHandle,
    pub role: TextureRole,
    pub path: String,
}

/// One drawable unit of geometry sharing a single material.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubMesh {
    name: String,
    vertices: Vec<ModelVertex>,
    indices: Vec<u32>,
    textures: Vec<TextureRef>,
}

impl SubMesh {
    pub(crate) fn new(
        name: String,
        vertices: Vec<ModelVertex>,
        indices: Vec<u32>,
        textures: Vec<TextureRef>,
    ) -> Self {
        debug_assert!(indices.len() % 3 == 0);
        debug_assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
        Self {
            name,
            vertices,
            indices,
            textures,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[ModelVertex] {
        &self.vertices
    }

    /// Triangle list indices; the length is always a multiple of 3.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn textures(&self) -> &[TextureRef] {
        &self.textures
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Sampler names following the `texture_diffuseN` / `texture_specularN` convention.
    ///
    /// Numbering is per role and starts at 1, in the order the textures were
    /// resolved from the material.
    pub fn sampler_bindings(&self) -> Vec<(String, TextureHandle)> {
        let mut diffuse = 0;
        let mut specular = 0;
        self.textures
            .iter()
            .map(|texture| {
                let counter = match texture.role {
                    TextureRole::Diffuse => &mut diffuse,
                    TextureRole::Specular => &mut specular,
                };
                *counter += 1;
                (format!("{}{}", texture.role.tag(), counter), texture.handle)
            })
            .collect()
    }

    /// The first texture of each role bound as `material.diffuse` / `material.specular`.
    pub fn material_bindings(&self) -> Vec<(&'static str, TextureHandle)> {
        [TextureRole::Diffuse, TextureRole::Specular]
            .into_iter()
            .filter_map(|role| {
                self.textures
                    .iter()
                    .find(|texture| texture.role == role)
                    .map(|texture| (role.material_uniform(), texture.handle))
            })
            .collect()
    }
}

/// Per-model texture dedup cache, keyed by the material's texture path.
#[derive(Clone, Debug, Default)]
pub struct TextureCache {
    loaded: HashMap<String, TextureRef>,
    failed: HashSet<String>,
}

impl TextureCache {
    pub fn get(&self, path: &str) -> Option<&TextureRef> {
        self.loaded.get(path)
    }

    pub(crate) fn insert(&mut self, texture: TextureRef) {
        self.loaded.insert(texture.path.clone(), texture);
    }

    pub fn has_failed(&self, path: &str) -> bool {
        self.failed.contains(path)
    }

    pub(crate) fn mark_failed(&mut self, path: &str) {
        self.failed.insert(path.to_string());
    }

    /// Number of distinct textures created for the model.
    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    /// Every created handle, for releasing them once the model is gone.
    pub fn handles(&self) -> impl Iterator<Item = TextureHandle> + '_ {
        self.loaded.values().map(|texture| texture.handle)
    }
}

/// A model loaded from a scene file.
#[derive(Clone, Debug, Default)]
pub struct Model {
    meshes: Vec<SubMesh>,
    directory: PathBuf,
    textures: TextureCache,
}

impl Model {
    pub(crate) fn new(meshes: Vec<SubMesh>, directory: PathBuf, textures: TextureCache) -> Self {
        Self {
            meshes,
            directory,
            textures,
        }
    }

    /// The result of a failed load: no sub-meshes, no textures.
    pub fn empty(directory: PathBuf) -> Self {
        Self {
            directory,
            ..Default::default()
        }
    }

    /// Sub-meshes in pre-order of the scene's node tree.
    pub fn meshes(&self) -> &[SubMesh] {
        &self.meshes
    }

    /// Directory relative texture paths were resolved against.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Create vertex and index buffers for every sub-mesh.
    pub fn upload(&self, device: &wgpu::Device) -> Vec<GpuMesh> {
        self.meshes
            .iter()
            .map(|mesh| GpuMesh::new(device, mesh))
            .collect()
    }
}

/// GPU buffers of one [`SubMesh`].
#[derive(Debug)]
pub struct GpuMesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub textures: Vec<TextureRef>,
}

impl GpuMesh {
    pub fn new(device: &wgpu::Device, mesh: &SubMesh) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", mesh.name())),
            contents: bytemuck::cast_slice(mesh.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", mesh.name())),
            contents: bytemuck::cast_slice(mesh.indices()),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            name: mesh.name().to_string(),
            vertex_buffer,
            index_buffer,
            num_elements: mesh.indices().len() as u32,
            textures: mesh.textures().to_vec(),
        }
    }
}

/// Draw calls for uploaded meshes. Texture binding is left to the caller's pipeline.
pub trait DrawModel {
    fn draw_mesh(&mut self, mesh: &GpuMesh);
    fn draw_model(&mut self, meshes: &[GpuMesh]);
}

impl DrawModel for wgpu::RenderPass<'_> {
    fn draw_mesh(&mut self, mesh: &GpuMesh) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.num_elements, 0, 0..1);
    }

    fn draw_model(&mut self, meshes: &[GpuMesh]) {
        for mesh in meshes {
            self.draw_mesh(mesh);
        }
    }
}
