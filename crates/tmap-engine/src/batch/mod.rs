//! Dynamic geometry batching.
//!
//! Turns a stream of immediate-mode primitives into as few indexed draw calls
//! as possible:
//!
//! ```text
//! add_* -> state check (flush on change) -> capacity check (flush if full)
//!       -> ring alloc -> encode -> ... -> flush -> ring submit -> draw
//! ```
//!
//! The engine is backend-agnostic; GPU specifics live behind
//! [`GeometryBackend`]. See [`crate::render`] for the wgpu implementation.

mod backend;
mod config;
pub mod encode;
mod error;
mod renderer;
mod ring;
mod state;

#[cfg(test)]
pub(crate) mod recording;

pub use backend::{BufferKind, DrawCall, GeometryBackend, Topology};
pub use config::BatchConfig;
pub use encode::{DrawParams, Flip, GpuVertex};
pub use error::BatchError;
pub use renderer::{BatchStats, DynamicGeometryRenderer};
pub use ring::{Allocation, RingBuffer, RingRegion};
pub use state::{BatchKey, BatchState};
