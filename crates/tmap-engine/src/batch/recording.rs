//! In-memory backend that records every call, for tests.

use anyhow::Result;

use super::{BufferKind, DrawCall, GeometryBackend};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BackendCall {
    CreateBuffer { kind: BufferKind, size_bytes: u64 },
    MapDiscard(BufferKind),
    MapAppend(BufferKind),
    Unmap { kind: BufferKind, byte_offset: u64, len: usize },
    Draw(DrawCall),
}

#[derive(Debug, Default)]
pub(crate) struct RecordingBackend {
    pub calls: Vec<BackendCall>,
    /// Buffer contents as the GPU would see them, per [`BufferKind::index`].
    pub memory: [Vec<u8>; 2],
    pub mapped: [bool; 2],
    pub fail_maps: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draws(&self) -> Vec<DrawCall> {
        self.calls
            .iter()
            .filter_map(|c| if let BackendCall::Draw(d) = c { Some(*d) } else { None })
            .collect()
    }

    pub fn vertices(&self) -> Vec<super::GpuVertex> {
        bytemuck::pod_collect_to_vec(&self.memory[BufferKind::Vertex.index()])
    }

    pub fn indices(&self) -> Vec<u16> {
        bytemuck::pod_collect_to_vec(&self.memory[BufferKind::Index.index()])
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn map(&mut self, kind: BufferKind) -> Result<()> {
        anyhow::ensure!(!self.fail_maps, "simulated map failure");
        assert!(!self.mapped[kind.index()], "{kind:?} buffer mapped twice");
        self.mapped[kind.index()] = true;
        Ok(())
    }
}

impl GeometryBackend for RecordingBackend {
    fn create_buffer(&mut self, kind: BufferKind, size_bytes: u64) -> Result<()> {
        self.memory[kind.index()] = vec![0; size_bytes as usize];
        self.mapped[kind.index()] = false;
        self.calls.push(BackendCall::CreateBuffer { kind, size_bytes });
        Ok(())
    }

    fn map_discard(&mut self, kind: BufferKind) -> Result<()> {
        self.map(kind)?;
        self.calls.push(BackendCall::MapDiscard(kind));
        Ok(())
    }

    fn map_append(&mut self, kind: BufferKind) -> Result<()> {
        self.map(kind)?;
        self.calls.push(BackendCall::MapAppend(kind));
        Ok(())
    }

    fn unmap(&mut self, kind: BufferKind, byte_offset: u64, data: &[u8]) {
        assert!(self.mapped[kind.index()], "{kind:?} buffer unmapped while not mapped");
        self.mapped[kind.index()] = false;
        let start = byte_offset as usize;
        self.memory[kind.index()][start..start + data.len()].copy_from_slice(data);
        self.calls.push(BackendCall::Unmap { kind, byte_offset, len: data.len() });
    }

    fn draw(&mut self, call: &DrawCall) {
        assert!(
            !self.mapped[0] && !self.mapped[1],
            "draw issued while a dynamic buffer is still mapped"
        );
        self.calls.push(BackendCall::Draw(*call));
    }
}
