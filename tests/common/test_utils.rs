use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use flow_model::{
    LoadOptions, TextureHandle,
    data_structures::texture::{DecodedImage, PixelFormat},
    resources::texture::TextureFactory,
};

/// Fresh, empty directory for one test's fixture files.
pub fn fixture_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join("flow-model-tests")
        .join(format!("{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("failed to create fixture dir");
    dir
}

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("failed to write fixture");
    path
}

/// A 4x4 RGBA PNG, encoded in memory.
pub fn png_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 255, 255])))
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("failed to encode png fixture");
    bytes
}

/// A 4x4 PNG with the given channel count (1, 3 or 4).
pub fn write_png(dir: &Path, name: &str, channels: u8) -> PathBuf {
    let path = dir.join(name);
    match channels {
        1 => image::GrayImage::from_pixel(4, 4, image::Luma([128])).save(&path),
        3 => image::RgbImage::from_pixel(4, 4, image::Rgb([255, 0, 0])).save(&path),
        _ => image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 255, 0, 255])).save(&path),
    }
    .expect("failed to write png fixture");
    path
}

#[derive(Clone, Debug)]
pub struct CreatedTexture {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// Texture factory that only records what it was asked to create.
#[derive(Default)]
pub struct RecordingTextures {
    pub created: Vec<CreatedTexture>,
}

impl RecordingTextures {
    pub fn creations_for(&self, label: &str) -> usize {
        self.created.iter().filter(|t| t.label == label).count()
    }
}

impl TextureFactory for RecordingTextures {
    fn create_texture(
        &mut self,
        image: &DecodedImage,
        label: &str,
        _: &LoadOptions,
    ) -> anyhow::Result<TextureHandle> {
        let (width, height) = image.dimensions();
        let handle = TextureHandle(self.created.len() as u32 + 100);
        self.created.push(CreatedTexture {
            label: label.to_string(),
            width,
            height,
            format: image.format,
        });
        Ok(handle)
    }
}

static RECORDS: Mutex<Vec<(log::Level, String)>> = Mutex::new(Vec::new());

struct CaptureLogger;

impl log::Log for CaptureLogger {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if let Ok(mut records) = RECORDS.lock() {
            records.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

/// Route `log` output of this test binary into memory.
pub fn capture_logs() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Trace);
    }
}

/// Whether a record at `level` containing `needle` was logged by any test so far.
pub fn logged(level: log::Level, needle: &str) -> bool {
    RECORDS
        .lock()
        .map(|records| {
            records
                .iter()
                .any(|(l, message)| *l == level && message.contains(needle))
        })
        .unwrap_or(false)
}

const POSITIONS: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
const NORMALS: [f32; 9] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
pub const TEX_COORDS: [[f32; 2]; 3] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
const INDICES: [u16; 4] = [0, 1, 2, 0];

enum ImageSource {
    Uri(String),
    /// PNG bytes stored in the binary buffer.
    Embedded(Vec<u8>),
}

struct MeshSpec {
    name: String,
    with_uvs: bool,
    material: Option<usize>,
}

struct NodeSpec {
    name: String,
    mesh: Option<usize>,
    children: Vec<usize>,
}

/// Writes glTF files in which every mesh is the same single triangle.
#[derive(Default)]
pub struct GltfBuilder {
    images: Vec<ImageSource>,
    materials: Vec<(Option<usize>, Option<usize>)>,
    meshes: Vec<MeshSpec>,
    nodes: Vec<NodeSpec>,
    roots: Vec<usize>,
}

impl GltfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an image and a texture sampling it; returns the texture index.
    pub fn texture(&mut self, uri: &str) -> usize {
        self.images.push(ImageSource::Uri(uri.to_string()));
        self.images.len() - 1
    }

    /// Like [`GltfBuilder::texture`], with the image stored in the buffer.
    pub fn embedded_texture(&mut self, png: Vec<u8>) -> usize {
        self.images.push(ImageSource::Embedded(png));
        self.images.len() - 1
    }

    pub fn material(&mut self, diffuse: Option<usize>, specular: Option<usize>) -> usize {
        self.materials.push((diffuse, specular));
        self.materials.len() - 1
    }

    pub fn mesh(&mut self, name: &str, with_uvs: bool, material: Option<usize>) -> usize {
        self.meshes.push(MeshSpec {
            name: name.to_string(),
            with_uvs,
            material,
        });
        self.meshes.len() - 1
    }

    pub fn node(&mut self, name: &str, mesh: Option<usize>, children: &[usize]) -> usize {
        self.nodes.push(NodeSpec {
            name: name.to_string(),
            mesh,
            children: children.to_vec(),
        });
        self.nodes.len() - 1
    }

    pub fn root(&mut self, node: usize) -> &mut Self {
        self.roots.push(node);
        self
    }

    pub fn write(&self, dir: &Path, file_name: &str) -> PathBuf {
        let bin_name = format!("{}.bin", file_name.trim_end_matches(".gltf"));
        let mut bin: Vec<u8> = Vec::new();
        bin.extend_from_slice(bytemuck::cast_slice(&POSITIONS));
        bin.extend_from_slice(bytemuck::cast_slice(&NORMALS));
        bin.extend_from_slice(bytemuck::cast_slice(&TEX_COORDS));
        bin.extend_from_slice(bytemuck::cast_slice(&INDICES));

        let join = |items: Vec<String>| items.join(",");

        // views 0..=3 hold the triangle, embedded images get one view each after it
        let mut image_views = Vec::new();
        let images = join(
            self.images
                .iter()
                .map(|image| match image {
                    ImageSource::Uri(uri) => format!(r#"{{"uri":"{uri}"}}"#),
                    ImageSource::Embedded(png) => {
                        let view = 4 + image_views.len();
                        image_views.push(format!(
                            r#"{{"buffer": 0, "byteOffset": {}, "byteLength": {}}}"#,
                            bin.len(),
                            png.len()
                        ));
                        bin.extend_from_slice(png);
                        format!(r#"{{"bufferView":{view},"mimeType":"image/png"}}"#)
                    }
                })
                .collect(),
        );
        let image_views: String = image_views
            .iter()
            .map(|view| format!(",\n    {view}"))
            .collect();
        std::fs::write(dir.join(&bin_name), &bin).expect("failed to write buffer");
        let textures = join(
            (0..self.images.len())
                .map(|i| format!(r#"{{"source":{i}}}"#))
                .collect(),
        );
        let uses_specular = self.materials.iter().any(|(_, s)| s.is_some());
        let materials = join(
            self.materials
                .iter()
                .map(|(diffuse, specular)| {
                    let pbr = match diffuse {
                        Some(t) => format!(r#"{{"baseColorTexture":{{"index":{t}}}}}"#),
                        None => "{}".to_string(),
                    };
                    match specular {
                        Some(t) => format!(
                            r#"{{"pbrMetallicRoughness":{pbr},"extensions":{{"KHR_materials_specular":{{"specularTexture":{{"index":{t}}}}}}}}}"#
                        ),
                        None => format!(r#"{{"pbrMetallicRoughness":{pbr}}}"#),
                    }
                })
                .collect(),
        );
        let meshes = join(
            self.meshes
                .iter()
                .map(|mesh| {
                    let uvs = if mesh.with_uvs { r#","TEXCOORD_0":2"# } else { "" };
                    let material = mesh
                        .material
                        .map(|m| format!(r#","material":{m}"#))
                        .unwrap_or_default();
                    format!(
                        r#"{{"name":"{}","primitives":[{{"attributes":{{"POSITION":0,"NORMAL":1{uvs}}},"indices":3{material}}}]}}"#,
                        mesh.name
                    )
                })
                .collect(),
        );
        let nodes = join(
            self.nodes
                .iter()
                .map(|node| {
                    let mut fields = vec![format!(r#""name":"{}""#, node.name)];
                    if let Some(mesh) = node.mesh {
                        fields.push(format!(r#""mesh":{mesh}"#));
                    }
                    if !node.children.is_empty() {
                        let children = join(node.children.iter().map(|c| c.to_string()).collect());
                        fields.push(format!(r#""children":[{children}]"#));
                    }
                    format!("{{{}}}", fields.join(","))
                })
                .collect(),
        );
        let scenes = if self.roots.is_empty() {
            String::new()
        } else {
            let roots = join(self.roots.iter().map(|r| r.to_string()).collect());
            format!(r#""scene":0,"scenes":[{{"nodes":[{roots}]}}],"#)
        };
        let extensions = if uses_specular {
            r#""extensionsUsed":["KHR_materials_specular"],"#
        } else {
            ""
        };

        let json = format!(
            r#"{{
  "asset": {{"version": "2.0"}},
  {extensions}
  {scenes}
  "nodes": [{nodes}],
  "meshes": [{meshes}],
  "materials": [{materials}],
  "textures": [{textures}],
  "images": [{images}],
  "accessors": [
    {{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]}},
    {{"bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3"}},
    {{"bufferView": 2, "componentType": 5126, "count": 3, "type": "VEC2"}},
    {{"bufferView": 3, "componentType": 5123, "count": 3, "type": "SCALAR"}}
  ],
  "bufferViews": [
    {{"buffer": 0, "byteOffset": 0, "byteLength": 36}},
    {{"buffer": 0, "byteOffset": 36, "byteLength": 36}},
    {{"buffer": 0, "byteOffset": 72, "byteLength": 24}},
    {{"buffer": 0, "byteOffset": 96, "byteLength": 6}}{image_views}
  ],
  "buffers": [{{"uri": "{bin_name}", "byteLength": {}}}]
}}"#,
            bin.len()
        );
        write_file(dir, file_name, &json)
    }
}
