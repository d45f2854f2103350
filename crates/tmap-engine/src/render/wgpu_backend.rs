use anyhow::{Context, Result, bail};
use bytemuck::{Pod, Zeroable};

use crate::batch::{BufferKind, DrawCall, GeometryBackend};
use crate::gr::{Rgba8, TextureHandle};
use crate::render::RenderTarget;

use super::pipeline::PipelineCache;
use super::textures::TextureRegistry;

/// Formats of the targets recorded geometry will be replayed into.
#[derive(Debug, Copy, Clone)]
pub struct BackendConfig {
    pub color_format: wgpu::TextureFormat,
    /// `None` renders without a depth attachment; depth-tested modes then
    /// draw unconditionally.
    pub depth_format: Option<wgpu::TextureFormat>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            color_format: wgpu::TextureFormat::Rgba8UnormSrgb,
            depth_format: Some(wgpu::TextureFormat::Depth32Float),
        }
    }
}

/// Linear fog over camera depth, applied to modes that allow fog.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FogParams {
    pub color: Rgba8,
    pub near: f32,
    pub far: f32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct Globals {
    fog_color: [f32; 4],
    // near, far, enabled, unused
    fog_range: [f32; 4],
}

impl Globals {
    fn new(fog: Option<FogParams>) -> Self {
        match fog {
            Some(f) => Self {
                fog_color: f.color.to_f32(),
                fog_range: [f.near, f.far, 1.0, 0.0],
            },
            None => Self::zeroed(),
        }
    }
}

/// Mapping bookkeeping of one dynamic buffer, independent of the GPU handle.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
struct MapState {
    drawn_from: bool,
    mapped: bool,
}

impl MapState {
    /// Starts a discard mapping. Returns true if the current buffer has been
    /// drawn from and must be replaced before writing.
    fn discard(&mut self) -> bool {
        let orphan = self.drawn_from;
        self.drawn_from = false;
        self.mapped = true;
        orphan
    }

    fn append(&mut self) {
        self.mapped = true;
    }

    fn unmap(&mut self) {
        self.mapped = false;
    }

    fn mark_drawn(&mut self) {
        self.drawn_from = true;
    }
}

/// Draws may only read buffers that are not mapped.
fn can_draw(vertex: MapState, index: MapState) -> bool {
    !vertex.mapped && !index.mapped
}

/// One of the two dynamic buffers.
///
/// Writes go through `queue.write_buffer`, which is ordered before every
/// command buffer of the next submit. The backend never observes that submit,
/// so a buffer that has been drawn from is never written again: a discard
/// orphans it, recorded draws keep the old buffer and new writes land in a
/// fresh one. Each wrap-around after a draw costs one buffer allocation.
struct DynamicBuffer {
    label: &'static str,
    usage: wgpu::BufferUsages,
    buffer: Option<wgpu::Buffer>,
    /// CPU mirror of the current buffer, used to widen writes to
    /// `COPY_BUFFER_ALIGNMENT`.
    shadow: Vec<u8>,
    state: MapState,
}

impl DynamicBuffer {
    fn new(kind: BufferKind) -> Self {
        let (label, usage) = match kind {
            BufferKind::Vertex => ("tmap dynamic vbo", wgpu::BufferUsages::VERTEX),
            BufferKind::Index => ("tmap dynamic ibo", wgpu::BufferUsages::INDEX),
        };
        Self {
            label,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            buffer: None,
            shadow: Vec::new(),
            state: MapState::default(),
        }
    }

    fn allocate(&mut self, device: &wgpu::Device) {
        self.buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(self.label),
            size: self.shadow.len() as u64,
            usage: self.usage,
            mapped_at_creation: false,
        }));
    }
}

/// Byte range covering `offset..offset + len`, widened outward to
/// `COPY_BUFFER_ALIGNMENT` and clamped to `size`.
fn aligned_range(offset: u64, len: u64, size: u64) -> (u64, u64) {
    let align = wgpu::COPY_BUFFER_ALIGNMENT;
    let start = offset / align * align;
    let end = (offset + len).div_ceil(align) * align;
    (start, end.min(size))
}

struct RecordedDraw {
    call: DrawCall,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
}

/// [`GeometryBackend`] on top of wgpu.
///
/// Draws are recorded as they are flushed and replayed, in order, by
/// [`encode`](Self::encode) into a caller-provided render target.
pub struct WgpuGeometryBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: BackendConfig,
    buffers: [DynamicBuffer; 2],
    draws: Vec<RecordedDraw>,

    textures: TextureRegistry,
    pipelines: PipelineCache,

    globals_ubo: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    fog: Option<FogParams>,
}

impl WgpuGeometryBackend {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, config: BackendConfig) -> Self {
        let textures = TextureRegistry::new(device, queue);

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tmap globals bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<Globals>() as u64),
                },
                count: None,
            }],
        });

        let globals_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tmap globals ubo"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tmap globals bind group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_ubo.as_entire_binding(),
            }],
        });

        let pipelines = PipelineCache::new(
            device,
            &[&globals_layout, textures.layout()],
            config.color_format,
            config.depth_format,
        );

        Self {
            device: device.clone(),
            queue: queue.clone(),
            config,
            buffers: [
                DynamicBuffer::new(BufferKind::Vertex),
                DynamicBuffer::new(BufferKind::Index),
            ],
            draws: Vec::new(),
            textures,
            pipelines,
            globals_ubo,
            globals_bind_group,
            fog: None,
        }
    }

    pub fn textures(&self) -> &TextureRegistry {
        &self.textures
    }

    /// Registers an externally created texture view; see
    /// [`TextureRegistry::register`].
    pub fn register_texture(
        &mut self,
        handle: TextureHandle,
        view: wgpu::TextureView,
        width: u32,
        height: u32,
    ) {
        self.textures.register(handle, view, width, height);
    }

    /// Uploads RGBA8 pixels as texture `handle`.
    pub fn create_texture_rgba8(
        &mut self,
        handle: TextureHandle,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<()> {
        self.textures
            .create_rgba8(&self.device, &self.queue, handle, width, height, pixels)
    }

    pub fn set_fog(&mut self, fog: FogParams) {
        self.fog = Some(fog);
    }

    pub fn clear_fog(&mut self) {
        self.fog = None;
    }

    /// Number of draws waiting for [`encode`](Self::encode).
    pub fn recorded_draws(&self) -> usize {
        self.draws.len()
    }

    /// Number of distinct pipelines built so far.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    /// Replays every recorded draw into `target` as one render pass and
    /// clears the recording.
    pub fn encode(&mut self, target: &mut RenderTarget<'_>) -> Result<()> {
        if self.draws.is_empty() {
            return Ok(());
        }
        if self.config.depth_format.is_some() && target.depth_view.is_none() {
            bail!("backend was configured with a depth format but the target has no depth view");
        }

        self.queue
            .write_buffer(&self.globals_ubo, 0, bytemuck::bytes_of(&Globals::new(self.fog)));

        let draws = std::mem::take(&mut self.draws);

        let depth_stencil_attachment = match (self.config.depth_format, target.depth_view) {
            (Some(_), Some(view)) => Some(wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            _ => None,
        };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tmap dynamic geometry pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_bind_group(0, &self.globals_bind_group, &[]);

        for draw in &draws {
            let call = draw.call;
            let pipeline = self
                .pipelines
                .get_or_create(&self.device, call.mode, call.topology);
            rpass.set_pipeline(pipeline);

            let textures = self
                .textures
                .bind_group(&self.device, call.textures, call.mode.texture);
            rpass.set_bind_group(1, textures, &[]);

            rpass.set_vertex_buffer(0, draw.vertex_buffer.slice(..));
            rpass.set_index_buffer(draw.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            rpass.draw_indexed(call.first_index..call.first_index + call.index_count, 0, 0..1);
        }

        log::trace!("encoded {} dynamic draws", draws.len());
        Ok(())
    }

    fn buffer_mut(&mut self, kind: BufferKind) -> &mut DynamicBuffer {
        &mut self.buffers[kind.index()]
    }
}

impl GeometryBackend for WgpuGeometryBackend {
    fn create_buffer(&mut self, kind: BufferKind, size_bytes: u64) -> Result<()> {
        let max = self.device.limits().max_buffer_size;
        let size = size_bytes.div_ceil(wgpu::COPY_BUFFER_ALIGNMENT) * wgpu::COPY_BUFFER_ALIGNMENT;
        if size == 0 || size > max {
            bail!("{kind:?} buffer of {size_bytes} bytes is outside the device limit of {max}");
        }
        let len = usize::try_from(size).context("buffer size does not fit in memory")?;

        let device = self.device.clone();
        let buf = self.buffer_mut(kind);
        buf.shadow = vec![0; len];
        buf.state = MapState::default();
        buf.allocate(&device);
        Ok(())
    }

    fn map_discard(&mut self, kind: BufferKind) -> Result<()> {
        let device = self.device.clone();
        let buf = self.buffer_mut(kind);
        if buf.buffer.is_none() {
            bail!("{kind:?} buffer mapped before it was created");
        }
        if buf.state.discard() {
            buf.allocate(&device);
        }
        Ok(())
    }

    fn map_append(&mut self, kind: BufferKind) -> Result<()> {
        let buf = self.buffer_mut(kind);
        if buf.buffer.is_none() {
            bail!("{kind:?} buffer mapped before it was created");
        }
        buf.state.append();
        Ok(())
    }

    fn unmap(&mut self, kind: BufferKind, byte_offset: u64, data: &[u8]) {
        let queue = self.queue.clone();
        let buf = self.buffer_mut(kind);
        buf.state.unmap();

        let size = buf.shadow.len() as u64;
        let Some(end) = byte_offset
            .checked_add(data.len() as u64)
            .filter(|end| *end <= size)
        else {
            log::error!(
                "{kind:?} write of {} bytes at {byte_offset} overruns the {size}-byte buffer",
                data.len()
            );
            return;
        };
        if data.is_empty() {
            return;
        }

        buf.shadow[byte_offset as usize..end as usize].copy_from_slice(data);
        let (start, stop) = aligned_range(byte_offset, data.len() as u64, size);
        if let Some(buffer) = buf.buffer.as_ref() {
            queue.write_buffer(buffer, start, &buf.shadow[start as usize..stop as usize]);
        }
    }

    fn draw(&mut self, call: &DrawCall) {
        let [vertex, index] = &mut self.buffers;
        if !can_draw(vertex.state, index.state) {
            log::error!("draw issued while a dynamic buffer is mapped; skipped");
            return;
        }
        let (Some(vertex_buffer), Some(index_buffer)) =
            (vertex.buffer.clone(), index.buffer.clone())
        else {
            log::error!("draw issued before dynamic buffers were created; skipped");
            return;
        };
        vertex.state.mark_drawn();
        index.state.mark_drawn();
        self.draws.push(RecordedDraw {
            call: *call,
            vertex_buffer,
            index_buffer,
        });
    }
}
