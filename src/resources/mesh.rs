use anyhow::{Result, bail};

use crate::{
    data_structures::{
        model::{ModelVertex, SubMesh, TextureRole},
        scene_graph::{ImportedMaterial, ImportedMesh},
    },
    resources::texture::{TextureFactory, TextureLoader},
};

/// Turn one imported mesh into a [`SubMesh`].
///
/// Positions and normals are copied as-is, texture coordinates come from the
/// first UV channel or default to `(0, 0)`. Every face has to be a triangle.
pub(crate) fn process_mesh<F: TextureFactory + ?Sized>(
    mesh: &ImportedMesh,
    materials: &[ImportedMaterial],
    textures: &mut TextureLoader<'_, F>,
) -> Result<SubMesh> {
    let vertices: Vec<ModelVertex> = mesh
        .positions
        .iter()
        .enumerate()
        .map(|(i, &position)| ModelVertex {
            position,
            normal: mesh.normals.get(i).copied().unwrap_or_default(),
            tex_coords: mesh
                .tex_coords
                .as_ref()
                .and_then(|tex_coords| tex_coords.get(i))
                .copied()
                .unwrap_or([0.0, 0.0]),
        })
        .collect();

    let mut indices = Vec::with_capacity(mesh.faces.len() * 3);
    for (face_index, face) in mesh.faces.iter().enumerate() {
        if face.len() != 3 {
            bail!(
                "face {} of mesh {} has {} indices, expected a triangle",
                face_index,
                mesh.name,
                face.len()
            );
        }
        if let Some(&index) = face.iter().find(|&&i| i as usize >= vertices.len()) {
            bail!(
                "face {} of mesh {} references vertex {} of {}",
                face_index,
                mesh.name,
                index,
                vertices.len()
            );
        }
        indices.extend_from_slice(face);
    }

    let mut mesh_textures = Vec::new();
    match mesh.material.map(|index| (index, materials.get(index))) {
        Some((_, Some(material))) => {
            mesh_textures.extend(textures.load_material_textures(&material.diffuse, TextureRole::Diffuse));
            mesh_textures.extend(textures.load_material_textures(&material.specular, TextureRole::Specular));
        }
        Some((index, None)) => {
            log::warn!("Mesh {} references missing material {}", mesh.name, index);
        }
        None => {}
    }

    Ok(SubMesh::new(
        mesh.name.clone(),
        vertices,
        indices,
        mesh_textures,
    ))
}
