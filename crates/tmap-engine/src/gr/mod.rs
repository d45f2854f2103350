//! Input model of the legacy immediate-mode renderer.
//!
//! These are the value types callers hand to
//! [`DynamicGeometryRenderer`](crate::batch::DynamicGeometryRenderer): screen-space
//! vertices, render modes, texture bindings and the drawing colour.

mod color;
mod mode;
mod texture;
mod vertex;

pub use color::Rgba8;
pub use mode::{AlphaSource, BlendMode, ColorSource, DepthTest, Fog, RenderMode, TextureSource};
pub use texture::{Bitmap, TextureBinding, TextureHandle, TextureMetrics, TextureSize};
pub use vertex::{LegacyVertex, VertexAttributes};
