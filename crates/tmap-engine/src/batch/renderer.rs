use anyhow::{Context, Result};

use crate::coords::PixelRect;
use crate::gr::{Bitmap, LegacyVertex, RenderMode, TextureBinding, VertexAttributes};

use super::encode::{self, BlitQuad, DrawParams, Flip, GpuVertex};
use super::{
    BatchConfig, BatchError, BatchState, BufferKind, DrawCall, GeometryBackend, RingBuffer,
    Topology,
};

/// Counters accumulated since the last [`DynamicGeometryRenderer::take_stats`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct BatchStats {
    pub draw_calls: u32,
    pub vertices: u32,
    pub indices: u32,
    /// Primitives rejected as malformed or lost to backend failures.
    pub dropped_primitives: u32,
    /// Flushes caused by a ring running out of room mid-frame.
    pub forced_flushes: u32,
}

/// Emulates immediate-mode primitive drawing on top of batched buffers.
///
/// Primitives are appended to the current batch while topology, render mode
/// and texture binding stay the same and both rings have room; anything else
/// flushes the batch as one indexed draw first. Draw order always matches call
/// order.
///
/// Malformed input and backend mapping failures are logged and the primitive
/// dropped; the renderer stays usable.
pub struct DynamicGeometryRenderer<B: GeometryBackend> {
    backend: B,
    vertices: RingBuffer<GpuVertex>,
    indices: RingBuffer<u16>,
    state: BatchState,
    stats: BatchStats,
    warned_backend: [bool; 2],
}

impl<B: GeometryBackend> DynamicGeometryRenderer<B> {
    /// Creates both dynamic buffers on `backend`.
    pub fn new(mut backend: B, config: BatchConfig) -> Result<Self> {
        config.validate().context("invalid batch configuration")?;

        let vertices = RingBuffer::new(BufferKind::Vertex, config.vertex_capacity);
        let indices = RingBuffer::new(BufferKind::Index, config.index_capacity);

        backend
            .create_buffer(BufferKind::Vertex, vertices.size_bytes())
            .context("failed to create dynamic vertex buffer")?;
        backend
            .create_buffer(BufferKind::Index, indices.size_bytes())
            .context("failed to create dynamic index buffer")?;

        log::debug!(
            "dynamic geometry renderer: {} vertices, {} indices",
            config.vertex_capacity,
            config.index_capacity
        );

        Ok(Self {
            backend,
            vertices,
            indices,
            state: BatchState::new(),
            stats: BatchStats::default(),
            warned_backend: [false; 2],
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// True while geometry is waiting for a flush.
    pub fn has_pending(&self) -> bool {
        self.vertices.pending() > 0
    }

    pub fn take_stats(&mut self) -> BatchStats {
        std::mem::take(&mut self.stats)
    }

    /// Draws a convex polygon (triangle fan over `vertices`).
    pub fn add_polygon(
        &mut self,
        params: &DrawParams,
        vertices: &[LegacyVertex],
        attrs: VertexAttributes,
        textures: TextureBinding,
        mode: RenderMode,
    ) {
        if !self.accepts_screen(params) {
            return;
        }
        let nv = vertices.len();
        if nv < 3 {
            log::debug!("ignoring degenerate polygon with {nv} vertices");
            self.stats.dropped_primitives += 1;
            return;
        }
        let ni = encode::fan_index_count(nv);
        if nv > self.vertices.capacity() || ni > self.indices.capacity() {
            log::error!(
                "too many vertices/indices needed in dynamic geometry renderer: \
                 {nv} vertices, {ni} indices"
            );
            self.stats.dropped_primitives += 1;
            return;
        }

        self.apply_state(Topology::TriangleList, mode, textures.normalized_for(mode));
        let Some((out_v, out_i, base)) = self.reserve(nv, ni) else { return };
        encode::encode_polygon(params, vertices, attrs, mode, out_v, out_i, base);
    }

    /// Draws a screen-space line segment in the current drawing colour.
    pub fn add_line(
        &mut self,
        params: &DrawParams,
        vertices: &[LegacyVertex; 2],
        mode: RenderMode,
    ) {
        if !self.accepts_screen(params) {
            return;
        }
        self.apply_state(Topology::LineList, mode, TextureBinding::UNBOUND);
        let Some((out_v, out_i, base)) = self.reserve(2, 2) else { return };
        encode::encode_line(params, vertices, out_v, out_i, base);
    }

    /// Copies `src` texels of `bitmap` onto the `dst` pixels of the screen.
    pub fn draw_bitmap(
        &mut self,
        params: &DrawParams,
        bitmap: Bitmap,
        dst: PixelRect,
        src: PixelRect,
        flip: Flip,
        mode: RenderMode,
    ) {
        if !self.accepts_screen(params) {
            return;
        }
        if bitmap.width == 0 || bitmap.height == 0 {
            log::error!("cannot blit bitmap {:?} with zero size", bitmap.handle);
            self.stats.dropped_primitives += 1;
            return;
        }
        log::trace!("drawing bitmap {:?} {dst:?} <- {src:?}", bitmap.handle);

        let quad = BlitQuad::new(params.screen, bitmap, dst, src, flip);
        let textures = TextureBinding::single(bitmap.handle).normalized_for(mode);
        self.apply_state(Topology::TriangleList, mode, textures);
        let Some((out_v, out_i, base)) = self.reserve(4, 6) else { return };
        encode::encode_blit(&quad, params.color, out_v, out_i, base);
    }

    /// Fills `rect` with the current drawing colour.
    pub fn add_rect(&mut self, params: &DrawParams, rect: PixelRect, mode: RenderMode) {
        if rect.is_empty() {
            return;
        }
        let (x0, y0) = (rect.x as f32, rect.y as f32);
        let (x1, y1) = (rect.right() as f32, rect.bottom() as f32);
        let corners = [
            LegacyVertex::screen(x0, y0),
            LegacyVertex::screen(x1, y0),
            LegacyVertex::screen(x1, y1),
            LegacyVertex::screen(x0, y1),
        ];
        self.add_polygon(params, &corners, VertexAttributes::NONE, TextureBinding::UNBOUND, mode);
    }

    /// Draws everything batched so far as one indexed draw call.
    ///
    /// A no-op when nothing is pending.
    pub fn flush(&mut self) {
        let vertex_region = self.vertices.submit(&mut self.backend);
        let index_region = self.indices.submit(&mut self.backend);
        if vertex_region.count == 0 {
            return;
        }
        let Some(key) = self.state.active() else {
            log::warn!("discarding {} vertices batched without render state", vertex_region.count);
            return;
        };

        log::trace!(
            "drawing dynamic geometry num_vertex {} num_index {} textures {:?}",
            vertex_region.count,
            index_region.count,
            key.textures
        );

        self.backend.draw(&DrawCall {
            topology: key.topology,
            mode: key.mode,
            textures: key.textures,
            first_index: index_region.start,
            index_count: index_region.count,
        });

        self.stats.draw_calls += 1;
        self.stats.vertices += vertex_region.count;
        self.stats.indices += index_region.count;
    }

    /// Recreates both dynamic buffers after the device was lost.
    ///
    /// Pending geometry is discarded and the render state becomes undefined,
    /// so the next primitive always opens a new batch.
    pub fn reset_device(&mut self) -> Result<()> {
        self.vertices.reset();
        self.indices.reset();
        self.state.invalidate();
        self.warned_backend = [false; 2];

        self.backend
            .create_buffer(BufferKind::Vertex, self.vertices.size_bytes())
            .context("failed to recreate dynamic vertex buffer")?;
        self.backend
            .create_buffer(BufferKind::Index, self.indices.size_bytes())
            .context("failed to recreate dynamic index buffer")?;
        Ok(())
    }

    /// Rejects primitives drawn into an empty or non-finite clip window.
    fn accepts_screen(&mut self, params: &DrawParams) -> bool {
        if params.screen.is_valid() {
            return true;
        }
        log::error!("dropping primitive drawn into invalid clip window {:?}", params.screen);
        self.stats.dropped_primitives += 1;
        false
    }

    fn apply_state(&mut self, topology: Topology, mode: RenderMode, textures: TextureBinding) {
        let topology_changed = self.state.set_topology(topology);
        let mode_changed = self.state.set_mode(mode);
        let textures_changed = self.state.set_textures(textures);
        if topology_changed || mode_changed || textures_changed {
            // Pending geometry is drawn with the state it was written under.
            self.flush();
            self.state.commit();
        }
    }

    /// Reserves `nv` vertices and `ni` indices in the current batch, flushing
    /// first if either ring lacks room.
    fn reserve(&mut self, nv: usize, ni: usize) -> Option<(&mut [GpuVertex], &mut [u16], u16)> {
        if self.vertices.is_full(nv) || self.indices.is_full(ni) {
            if self.has_pending() {
                self.stats.forced_flushes += 1;
            }
            self.flush();
        }

        match self.try_reserve(nv, ni) {
            Ok((v, i)) => {
                let base = v.base as u16;
                Some((self.vertices.slice_mut(v), self.indices.slice_mut(i), base))
            }
            Err(err) => {
                self.report(err);
                None
            }
        }
    }

    fn try_reserve(
        &mut self,
        nv: usize,
        ni: usize,
    ) -> Result<(super::Allocation, super::Allocation), BatchError> {
        let v = self.vertices.alloc(&mut self.backend, nv)?;
        match self.indices.alloc(&mut self.backend, ni) {
            Ok(i) => Ok((v, i)),
            Err(err) => {
                self.vertices.release(v);
                Err(err)
            }
        }
    }

    fn report(&mut self, err: BatchError) {
        self.stats.dropped_primitives += 1;
        match &err {
            BatchError::Backend { kind, .. } => {
                let warned = &mut self.warned_backend[kind.index()];
                if !*warned {
                    log::warn!("dynamic geometry skipped: {err}");
                    *warned = true;
                }
            }
            _ => log::error!("dynamic geometry dropped: {err}"),
        }
    }
}
