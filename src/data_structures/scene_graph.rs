//! Imported scene representation.
//!
//! Format front-ends in [`crate::resources::import`] convert OBJ and glTF files into
//! this owned structure: a tree of [`SceneNode`]s referencing meshes and materials
//! by index. The model loader only ever walks this tree, never the raw formats.

use std::{collections::HashMap, path::PathBuf};

/// A node of the scene tree. A node without children is a leaf.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneNode {
    pub name: String,
    /// Indices into [`Scene::meshes`].
    pub meshes: Vec<usize>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_meshes(mut self, meshes: Vec<usize>) -> Self {
        self.meshes = meshes;
        self
    }

    pub fn with_children(mut self, children: Vec<SceneNode>) -> Self {
        self.children = children;
        self
    }

    /// Visit this node and its descendants: the node first, then each child
    /// subtree in order. Yields the depth alongside each node (root is 0).
    pub fn pre_order(&self) -> PreOrder<'_> {
        PreOrder {
            stack: vec![(0, self)],
        }
    }
}

/// Stack based pre-order walk, see [`SceneNode::pre_order`].
pub struct PreOrder<'a> {
    stack: Vec<(usize, &'a SceneNode)>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = (usize, &'a SceneNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(|child| (depth + 1, child)));
        Some((depth, node))
    }
}

/// Mesh data as delivered by an importer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportedMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    /// Either empty or one normal per position.
    pub normals: Vec<[f32; 3]>,
    /// First UV channel, if the mesh has one.
    pub tex_coords: Option<Vec<[f32; 2]>>,
    /// Faces as index lists into `positions`.
    pub faces: Vec<Vec<u32>>,
    /// Index into [`Scene::materials`].
    pub material: Option<usize>,
}

/// Texture slots of a material, as the paths stored in the source file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportedMaterial {
    pub name: String,
    pub diffuse: Vec<String>,
    pub specular: Vec<String>,
}

/// A whole imported scene.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    /// Set by the importer when the file parsed but carries no usable geometry.
    pub incomplete: bool,
    pub root: Option<SceneNode>,
    pub meshes: Vec<ImportedMesh>,
    pub materials: Vec<ImportedMaterial>,
    /// Image bytes stored inside the scene file, keyed by the `*N` texture path
    /// the materials reference them with.
    pub embedded_textures: HashMap<String, Vec<u8>>,
    /// File, relative to the scene's directory, for texture paths that do not name
    /// their file verbatim (percent-encoded glTF URIs).
    pub texture_files: HashMap<String, PathBuf>,
}

impl Scene {
    /// Texture path under which the importer registers embedded image `index`.
    pub fn embedded_texture_key(index: usize) -> String {
        format!("*{index}")
    }
}
