#[cfg(feature = "integration-tests")]
mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn should_upload_textures_and_meshes_to_the_gpu() {
    use common::test_utils::{GltfBuilder, fixture_dir, write_png};
    use flow_model::{LoadOptions, context::GpuContext, load_model};

    let ctx = GpuContext::headless_blocking().expect("no GPU available");
    let dir = fixture_dir("gpu_upload");
    write_png(&dir, "tex.png", 3);
    let mut gltf = GltfBuilder::new();
    let texture = gltf.texture("tex.png");
    let material = gltf.material(Some(texture), None);
    let left = gltf.mesh("left", true, Some(material));
    let right = gltf.mesh("right", true, Some(material));
    let left = gltf.node("left", Some(left), &[]);
    let right = gltf.node("right", Some(right), &[]);
    let path = gltf.root(left).root(right).write(&dir, "pair.gltf");

    let mut textures = ctx.textures();
    let model = load_model(&path, &LoadOptions::default(), &mut textures);
    assert_eq!(model.meshes().len(), 2);
    assert_eq!(textures.len(), 1);

    let handle = model.meshes()[0].textures()[0].handle;
    let texture = textures.get(handle).expect("texture was created");
    // 4x4 source: 4x4, 2x2, 1x1
    assert_eq!(texture.texture.mip_level_count(), 3);
    assert_eq!(
        texture.texture.format(),
        wgpu::TextureFormat::Rgba8UnormSrgb
    );

    let meshes = model.upload(&ctx.device);
    assert_eq!(meshes.len(), 2);
    assert!(meshes.iter().all(|mesh| mesh.num_elements == 3));
    assert_eq!(meshes[0].vertex_buffer.size(), 3 * 32);

    for handle in model.textures().handles() {
        textures.release(handle);
    }
    assert!(textures.is_empty());
}
