use crate::gr::{RenderMode, TextureBinding};

use super::Topology;

/// Everything a single draw call binds.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct BatchKey {
    pub topology: Topology,
    pub mode: RenderMode,
    pub textures: TextureBinding,
}

/// Tracks the state pending geometry was encoded under.
///
/// `active` is what the geometry currently sitting in the rings will be drawn
/// with; `pending` is what the next primitive asks for. The setters report
/// whether `pending` now differs from `active`, in which case the caller must
/// flush before writing geometry and then [`commit`](Self::commit).
#[derive(Debug, Default)]
pub struct BatchState {
    active: Option<BatchKey>,
    pending: BatchKey,
}

impl BatchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_topology(&mut self, topology: Topology) -> bool {
        self.pending.topology = topology;
        self.active.is_none_or(|a| a.topology != topology)
    }

    /// Also re-normalizes the pending texture binding for `mode`.
    pub fn set_mode(&mut self, mode: RenderMode) -> bool {
        self.pending.mode = mode;
        self.pending.textures = self.pending.textures.normalized_for(mode);
        self.active.is_none_or(|a| a.mode != mode)
    }

    /// Stores `textures` normalized for the pending mode.
    pub fn set_textures(&mut self, textures: TextureBinding) -> bool {
        let textures = textures.normalized_for(self.pending.mode);
        self.pending.textures = textures;
        self.active.is_none_or(|a| a.textures != textures)
    }

    /// Makes the pending state the one subsequent geometry is drawn with.
    pub fn commit(&mut self) {
        self.active = Some(self.pending);
    }

    /// State the currently buffered geometry belongs to, if defined.
    pub fn active(&self) -> Option<BatchKey> {
        self.active
    }

    /// Forgets the active state; the next setter always reports a change.
    pub fn invalidate(&mut self) {
        self.active = None;
    }
}
