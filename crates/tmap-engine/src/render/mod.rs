//! wgpu realisation of the batching engine's backend.
//!
//! Geometry arrives already in clip space; the vertex shader passes it
//! through and the fragment combiner is specialised per render mode.

mod ctx;
mod pipeline;
mod textures;
mod wgpu_backend;

pub use ctx::RenderTarget;
pub use textures::TextureRegistry;
pub use wgpu_backend::{BackendConfig, FogParams, WgpuGeometryBackend};
