//! Batching engine for legacy immediate-mode geometry.
//!
//! Callers submit screen-space polygons, lines and bitmap blits one at a time;
//! [`batch::DynamicGeometryRenderer`] packs them into ring-allocated vertex and
//! index buffers and issues one indexed draw per run of compatible state.

pub mod batch;
pub mod coords;
pub mod device;
pub mod gr;
pub mod logging;
pub mod render;
