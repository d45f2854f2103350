//! Screen-space geometry shared by the batching engine and its callers.
//!
//! Canonical CPU space:
//! - pixels of the legacy clip window
//! - origin top-left
//! - +X right, +Y down
//!
//! The geometry encoder converts to clip space on the CPU; shaders receive
//! already-transformed vertices.

mod rect;
mod screen;

pub use rect::PixelRect;
pub use screen::ScreenMetrics;
