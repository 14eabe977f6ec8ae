//! Data structures shared by the loader and the GPU side.
//!
//! - `model` contains vertices, sub-meshes, texture references and GPU meshes
//! - `scene_graph` is the owned scene tree produced by the importers
//! - `texture` contains decoded images and the GPU texture wrapper

pub mod model;
pub mod scene_graph;
pub mod texture;
