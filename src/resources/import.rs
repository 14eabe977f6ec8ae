//! Format front-ends turning scene files into a [`Scene`].
//!
//! OBJ files go through `tobj` (materials come from the referenced MTL file),
//! glTF files through `gltf`. Both produce a root node whose children mirror the
//! file's own structure.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};

use crate::{
    data_structures::scene_graph::{ImportedMaterial, ImportedMesh, Scene, SceneNode},
    resources::LoadOptions,
};

/// Parse the file at `path`, picking the importer from the file extension.
pub fn import_scene(path: &Path, options: &LoadOptions) -> Result<Scene> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let mut scene = match extension.as_deref() {
        Some("obj") => import_obj(path, options)?,
        Some("gltf") | Some("glb") => import_gltf(path, options)?,
        _ => bail!("unsupported model format: {}", path.display()),
    };
    if scene.meshes.is_empty() {
        scene.incomplete = true;
    }
    Ok(scene)
}

fn root_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "root".to_string())
}

/// Wavefront OBJ: one child node per object, one mesh per object.
pub fn import_obj(path: &Path, options: &LoadOptions) -> Result<Scene> {
    let (models, obj_materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: options.triangulate,
            single_index: true,
            ignore_points: true,
            ignore_lines: true,
            ..Default::default()
        },
    )
    .with_context(|| format!("failed to parse OBJ file {}", path.display()))?;

    let materials = match obj_materials {
        Ok(materials) => materials
            .into_iter()
            .map(|m| ImportedMaterial {
                name: m.name,
                diffuse: m.diffuse_texture.into_iter().collect(),
                specular: m.specular_texture.into_iter().collect(),
            })
            .collect(),
        Err(e) => {
            log::warn!("Materials of {} could not be loaded: {}", path.display(), e);
            Vec::new()
        }
    };

    let mut meshes = Vec::with_capacity(models.len());
    let mut children = Vec::with_capacity(models.len());
    for model in models {
        let mesh = model.mesh;
        let positions: Vec<[f32; 3]> = mesh
            .positions
            .chunks_exact(3)
            .map(|p| [p[0], p[1], p[2]])
            .collect();
        let normals = mesh
            .normals
            .chunks_exact(3)
            .map(|n| [n[0], n[1], n[2]])
            .collect();
        // OBJ stores v with the origin at the bottom
        let tex_coords = (!mesh.texcoords.is_empty()).then(|| {
            mesh.texcoords
                .chunks_exact(2)
                .map(|t| {
                    if options.flip_uvs {
                        [t[0], 1.0 - t[1]]
                    } else {
                        [t[0], t[1]]
                    }
                })
                .collect()
        });
        let faces = split_faces(&mesh.indices, &mesh.face_arities)
            .with_context(|| format!("object {} in {}", model.name, path.display()))?;

        children.push(SceneNode::new(model.name.clone()).with_meshes(vec![meshes.len()]));
        meshes.push(ImportedMesh {
            name: model.name,
            positions,
            normals,
            tex_coords,
            faces,
            material: mesh.material_id,
        });
    }

    Ok(Scene {
        incomplete: false,
        root: Some(SceneNode::new(root_name(path)).with_children(children)),
        meshes,
        materials,
        ..Default::default()
    })
}

/// `face_arities` is empty when every face is a triangle.
fn split_faces(indices: &[u32], face_arities: &[u32]) -> Result<Vec<Vec<u32>>> {
    if face_arities.is_empty() {
        if indices.len() % 3 != 0 {
            bail!("{} indices do not form whole triangles", indices.len());
        }
        return Ok(indices.chunks(3).map(<[u32]>::to_vec).collect());
    }
    let mut faces = Vec::with_capacity(face_arities.len());
    let mut rest = indices;
    for &arity in face_arities {
        let arity = arity as usize;
        if rest.len() < arity {
            bail!("face with {} indices runs past the index list", arity);
        }
        let (face, tail) = rest.split_at(arity);
        faces.push(face.to_vec());
        rest = tail;
    }
    Ok(faces)
}

/// glTF 2.0: nodes map one to one, each primitive becomes its own mesh.
pub fn import_gltf(path: &Path, options: &LoadOptions) -> Result<Scene> {
    let gltf::Gltf { document, blob } = gltf::Gltf::open(path)
        .with_context(|| format!("failed to parse glTF file {}", path.display()))?;
    let buffers = gltf::import_buffers(&document, path.parent(), blob)
        .with_context(|| format!("failed to load buffers of {}", path.display()))?;

    let mut scene = Scene::default();

    for image in document.images() {
        match image.source() {
            gltf::image::Source::View { view, .. } => {
                let buffer = buffers
                    .get(view.buffer().index())
                    .ok_or_else(|| anyhow!("image {} points at a missing buffer", image.index()))?;
                let bytes = buffer
                    .0
                    .get(view.offset()..view.offset() + view.length())
                    .ok_or_else(|| anyhow!("image {} lies outside its buffer", image.index()))?;
                scene
                    .embedded_textures
                    .insert(Scene::embedded_texture_key(image.index()), bytes.to_vec());
            }
            gltf::image::Source::Uri { uri, .. } if uri.starts_with("data:") => {
                log::warn!(
                    "Image {} of {} is a data URI, which is not supported",
                    image.index(),
                    path.display()
                );
            }
            gltf::image::Source::Uri { uri, .. } => match urlencoding::decode(uri) {
                Ok(file) if file != uri => {
                    scene
                        .texture_files
                        .insert(uri.to_string(), PathBuf::from(file.into_owned()));
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("Image URI {} of {} is not valid UTF-8: {}", uri, path.display(), e)
                }
            },
        }
    }

    scene.materials = document
        .materials()
        .map(|material| {
            let specular = material
                .specular()
                .and_then(|specular| {
                    specular
                        .specular_color_texture()
                        .or_else(|| specular.specular_texture())
                })
                .map(|info| texture_path(&info.texture()))
                .into_iter()
                .collect();
            ImportedMaterial {
                name: material.name().unwrap_or("unnamed_material").to_string(),
                diffuse: material
                    .pbr_metallic_roughness()
                    .base_color_texture()
                    .map(|info| texture_path(&info.texture()))
                    .into_iter()
                    .collect(),
                specular,
            }
        })
        .collect();

    // glTF mesh index -> imported mesh indices, one per primitive
    let mut primitives_of = Vec::new();
    for mesh in document.meshes() {
        let mut indices = Vec::new();
        for primitive in mesh.primitives() {
            let imported = import_primitive(&mesh, &primitive, &buffers)
                .with_context(|| format!("mesh {} in {}", mesh.index(), path.display()))?;
            indices.push(scene.meshes.len());
            scene.meshes.push(imported);
        }
        primitives_of.push(indices);
    }

    let Some(gltf_scene) = document
        .default_scene()
        .or_else(|| document.scenes().next())
    else {
        // no root node
        return Ok(scene);
    };
    let children = build_node_tree(
        gltf_scene.nodes(),
        document.nodes().count(),
        &primitives_of,
        options.max_depth,
    )?;
    scene.root = Some(SceneNode::new(root_name(path)).with_children(children));

    Ok(scene)
}

fn texture_path(texture: &gltf::Texture) -> String {
    let image = texture.source();
    match image.source() {
        gltf::image::Source::Uri { uri, .. } if !uri.starts_with("data:") => uri.to_string(),
        _ => Scene::embedded_texture_key(image.index()),
    }
}

fn import_primitive(
    mesh: &gltf::Mesh,
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
) -> Result<ImportedMesh> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        bail!("primitive mode {:?} is not a triangle list", primitive.mode());
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or_else(|| anyhow!("primitive {} has no positions", primitive.index()))?
        .collect();
    let normals = reader
        .read_normals()
        .map(|normals| normals.collect())
        .unwrap_or_default();
    let tex_coords = reader
        .read_tex_coords(0)
        .map(|tex_coords| tex_coords.into_f32().collect());
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    let faces = split_faces(&indices, &[])?;

    let name = match mesh.name() {
        Some(name) if mesh.primitives().count() > 1 => format!("{}.{}", name, primitive.index()),
        Some(name) => name.to_string(),
        None => format!("mesh_{}.{}", mesh.index(), primitive.index()),
    };

    Ok(ImportedMesh {
        name,
        positions,
        normals,
        tex_coords,
        faces,
        material: primitive.material().index(),
    })
}

/// Converts the node hierarchy below the scene roots without recursing.
///
/// Roots sit at depth 1 under the synthetic root. A node reached twice (a cycle
/// or a node shared between parents) fails, as does a node deeper than `max_depth`.
fn build_node_tree<'a>(
    roots: impl Iterator<Item = gltf::Node<'a>>,
    node_count: usize,
    primitives_of: &[Vec<usize>],
    max_depth: usize,
) -> Result<Vec<SceneNode>> {
    let mut visited = vec![false; node_count];
    // pre-order list of (parent slot, node without its children)
    let mut flat: Vec<(Option<usize>, Option<SceneNode>)> = Vec::new();
    let mut work: Vec<(gltf::Node, usize, Option<usize>)> =
        roots.map(|node| (node, 1, None)).collect();
    work.reverse();

    while let Some((node, depth, parent)) = work.pop() {
        let name = node
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("node_{}", node.index()));
        if depth > max_depth {
            bail!(
                "node {} is nested {} levels deep, the limit is {}",
                name,
                depth,
                max_depth
            );
        }
        let seen = visited
            .get_mut(node.index())
            .ok_or_else(|| anyhow!("node {} is out of range", node.index()))?;
        if *seen {
            bail!("node {} appears more than once in the node hierarchy", name);
        }
        *seen = true;

        let meshes = node
            .mesh()
            .and_then(|mesh| primitives_of.get(mesh.index()))
            .cloned()
            .unwrap_or_default();
        let slot = flat.len();
        flat.push((parent, Some(SceneNode::new(name).with_meshes(meshes))));

        let children: Vec<_> = node.children().collect();
        work.extend(
            children
                .into_iter()
                .rev()
                .map(|child| (child, depth + 1, Some(slot))),
        );
    }

    // children come after their parent, so attaching back to front completes
    // every subtree before it is moved into its parent
    let mut trees = Vec::new();
    for slot in (0..flat.len()).rev() {
        let (parent, node) = &mut flat[slot];
        let parent = *parent;
        let Some(mut node) = node.take() else {
            continue;
        };
        node.children.reverse();
        match parent.and_then(|p| flat.get_mut(p)).and_then(|(_, n)| n.as_mut()) {
            Some(parent) => parent.children.push(node),
            None => trees.push(node),
        }
    }
    trees.reverse();
    Ok(trees)
}
