use anyhow::Result;

use crate::gr::{RenderMode, TextureBinding};

/// Which of the two dynamic buffers an operation targets.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
}

impl BufferKind {
    #[inline]
    pub(crate) const fn index(self) -> usize {
        match self {
            BufferKind::Vertex => 0,
            BufferKind::Index => 1,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Topology {
    #[default]
    TriangleList,
    LineList,
}

/// One indexed draw over a range of the dynamic index buffer.
///
/// Indices are absolute into the vertex buffer. The draw always uses the
/// pre-transformed vertex shader, no back-face culling and a zero UV offset.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DrawCall {
    pub topology: Topology,
    pub mode: RenderMode,
    pub textures: TextureBinding,
    pub first_index: u32,
    pub index_count: u32,
}

/// GPU capabilities the batching engine needs.
///
/// The mapping policy (how "discard" and "append" are realised) belongs to the
/// backend; the ring buffers only decide *when* each one is required:
/// - `map_discard`: previous contents may be thrown away (start of a
///   generation, after wrap-around). Draws already issued must keep seeing
///   the old data.
/// - `map_append`: the engine promises to write only past everything it has
///   already submitted in this generation.
pub trait GeometryBackend {
    /// Creates (or recreates) the dynamic buffer of `kind`.
    fn create_buffer(&mut self, kind: BufferKind, size_bytes: u64) -> Result<()>;

    fn map_discard(&mut self, kind: BufferKind) -> Result<()>;

    fn map_append(&mut self, kind: BufferKind) -> Result<()>;

    /// Ends a mapping; `data` is what was written starting at `byte_offset`.
    fn unmap(&mut self, kind: BufferKind, byte_offset: u64, data: &[u8]);

    fn draw(&mut self, call: &DrawCall);
}
