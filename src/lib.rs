//! flow-model
//!
//! Loads 3D model files (Wavefront OBJ, glTF) into GPU-ready models. A scene
//! file is parsed into a node tree, flattened into sub-meshes in pre-order and
//! every material texture is uploaded at most once per model.
//!
//! High-level modules
//! - `camera`: Euler-angle fly camera and the input controller driving it
//! - `context`: GPU device/queue used for uploads
//! - `data_structures`: models, sub-meshes, textures and the imported scene tree
//! - `resources`: the model loader, format importers and texture creation
//!
//! ```no_run
//! use flow_model::{context::GpuContext, resources::{LoadOptions, load_model}};
//!
//! flow_model::init_logging();
//! let ctx = GpuContext::headless_blocking()?;
//! let mut textures = ctx.textures();
//! let model = load_model("assets/backpack/backpack.obj", &LoadOptions::default(), &mut textures);
//! let meshes = model.upload(&ctx.device);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod camera;
pub mod context;
pub mod data_structures;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use data_structures::model::{Model, ModelVertex, SubMesh, TextureHandle, TextureRef, TextureRole};
pub use resources::{LoadOptions, load_model, try_load_model};

/// Install `env_logger` as the `log` backend. Controlled through `RUST_LOG`.
pub fn init_logging() {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    }
}
