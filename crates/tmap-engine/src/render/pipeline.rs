use std::collections::HashMap;

use crate::batch::{GpuVertex, Topology};
use crate::gr::{AlphaSource, BlendMode, ColorSource, DepthTest, Fog, RenderMode, TextureSource};

const GPU_VERTEX_ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
    0 => Float32x4, // position (clip space)
    1 => Unorm8x4,  // diffuse
    2 => Float32x2  // uv
];

pub(super) fn gpu_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<GpuVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &GPU_VERTEX_ATTRS,
    }
}

const fn additive(src: wgpu::BlendFactor, dst: wgpu::BlendFactor) -> wgpu::BlendComponent {
    wgpu::BlendComponent {
        src_factor: src,
        dst_factor: dst,
        operation: wgpu::BlendOperation::Add,
    }
}

/// Fixed-function blend state for a blend mode. `None` disables blending.
pub(super) fn blend_state(mode: BlendMode) -> Option<wgpu::BlendState> {
    use wgpu::BlendFactor as F;
    let component = match mode {
        BlendMode::None => return None,
        BlendMode::Alpha => return Some(wgpu::BlendState::ALPHA_BLENDING),
        BlendMode::Additive => additive(F::One, F::One),
        BlendMode::AlphaAdditive => additive(F::SrcAlpha, F::One),
        BlendMode::Multiply => additive(F::Dst, F::Zero),
    };
    Some(wgpu::BlendState {
        color: component,
        alpha: component,
    })
}

pub(super) fn depth_state(
    format: wgpu::TextureFormat,
    depth: DepthTest,
) -> wgpu::DepthStencilState {
    let (write, compare) = match depth {
        DepthTest::None => (false, wgpu::CompareFunction::Always),
        DepthTest::Normal => (true, wgpu::CompareFunction::LessEqual),
    };
    wgpu::DepthStencilState {
        format,
        depth_write_enabled: write,
        depth_compare: compare,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Shader override constants selecting the fragment combiner for `mode`.
///
/// Constant colour and alpha are resolved into the vertex diffuse on the CPU,
/// so they share the vertex path here.
pub(super) fn shader_constants(mode: RenderMode) -> [(&'static str, f64); 4] {
    let texture = match mode.texture {
        TextureSource::None => 0.0,
        TextureSource::Wrap | TextureSource::Clamp => 1.0,
        TextureSource::Environment => 2.0,
    };
    let color = match mode.color {
        ColorSource::Vertex | ColorSource::Constant => 0.0,
        ColorSource::Texture => 1.0,
        ColorSource::VertexTimesTexture => 2.0,
        ColorSource::VertexPlusTexture => 3.0,
    };
    let alpha = match mode.alpha {
        AlphaSource::Vertex | AlphaSource::Constant => 0.0,
        AlphaSource::Texture => 1.0,
        AlphaSource::VertexTimesTexture => 2.0,
    };
    let fog = match mode.fog {
        Fog::Allowed => 1.0,
        Fog::Disallowed => 0.0,
    };
    [
        ("TEXTURE_SOURCE", texture),
        ("COLOR_SOURCE", color),
        ("ALPHA_SOURCE", alpha),
        ("FOG", fog),
    ]
}

/// Render pipelines for pre-transformed geometry, built lazily per
/// (mode, topology).
pub(super) struct PipelineCache {
    shader: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    depth_format: Option<wgpu::TextureFormat>,
    pipelines: HashMap<(RenderMode, Topology), wgpu::RenderPipeline>,
}

impl PipelineCache {
    pub(super) fn new(
        device: &wgpu::Device,
        bind_group_layouts: &[&wgpu::BindGroupLayout],
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("tmap transformed shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/transformed.wgsl").into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tmap transformed pipeline layout"),
            bind_group_layouts,
            immediate_size: 0,
        });

        Self {
            shader,
            layout,
            color_format,
            depth_format,
            pipelines: HashMap::new(),
        }
    }

    pub(super) fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub(super) fn get_or_create(
        &mut self,
        device: &wgpu::Device,
        mode: RenderMode,
        topology: Topology,
    ) -> &wgpu::RenderPipeline {
        if !self.pipelines.contains_key(&(mode, topology)) {
            let pipeline = self.build(device, mode, topology);
            log::debug!(
                "built pipeline for {mode:?} ({topology:?}); {} cached",
                self.pipelines.len() + 1
            );
            self.pipelines.insert((mode, topology), pipeline);
        }
        &self.pipelines[&(mode, topology)]
    }

    fn build(
        &self,
        device: &wgpu::Device,
        mode: RenderMode,
        topology: Topology,
    ) -> wgpu::RenderPipeline {
        let constants = shader_constants(mode);
        let compilation_options = wgpu::PipelineCompilationOptions {
            constants: &constants,
            ..Default::default()
        };

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("tmap transformed pipeline"),
            layout: Some(&self.layout),

            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs_main"),
                compilation_options: compilation_options.clone(),
                buffers: &[gpu_vertex_layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some("fs_main"),
                compilation_options,
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.color_format,
                    blend: blend_state(mode.blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: match topology {
                    Topology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
                    Topology::LineList => wgpu::PrimitiveTopology::LineList,
                },
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: self.depth_format.map(|format| depth_state(format, mode.depth)),
            multisample: wgpu::MultisampleState::default(),

            multiview_mask: None,
            cache: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_matches_gpu_vertex() {
        let layout = gpu_vertex_layout();
        assert_eq!(layout.array_stride, 28);
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 16, 20]);
    }

    #[test]
    fn blend_modes_map_to_expected_factors() {
        assert!(blend_state(BlendMode::None).is_none());
        assert_eq!(
            blend_state(BlendMode::Alpha),
            Some(wgpu::BlendState::ALPHA_BLENDING)
        );

        let add = blend_state(BlendMode::Additive).unwrap();
        assert_eq!(add.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(add.color.dst_factor, wgpu::BlendFactor::One);

        let alpha_add = blend_state(BlendMode::AlphaAdditive).unwrap();
        assert_eq!(alpha_add.color.src_factor, wgpu::BlendFactor::SrcAlpha);
        assert_eq!(alpha_add.color.dst_factor, wgpu::BlendFactor::One);

        let mul = blend_state(BlendMode::Multiply).unwrap();
        assert_eq!(mul.color.src_factor, wgpu::BlendFactor::Dst);
        assert_eq!(mul.color.dst_factor, wgpu::BlendFactor::Zero);
    }

    #[test]
    fn depth_none_never_writes() {
        let s = depth_state(wgpu::TextureFormat::Depth32Float, DepthTest::None);
        assert!(!s.depth_write_enabled);
        assert_eq!(s.depth_compare, wgpu::CompareFunction::Always);

        let s = depth_state(wgpu::TextureFormat::Depth32Float, DepthTest::Normal);
        assert!(s.depth_write_enabled);
        assert_eq!(s.depth_compare, wgpu::CompareFunction::LessEqual);
    }

    #[test]
    fn constant_sources_use_the_vertex_combiner() {
        let mode = RenderMode {
            color: ColorSource::Constant,
            alpha: AlphaSource::Constant,
            fog: Fog::Disallowed,
            ..RenderMode::BITMAP_2D
        };
        let c = shader_constants(mode);
        assert_eq!(c[0], ("TEXTURE_SOURCE", 1.0));
        assert_eq!(c[1], ("COLOR_SOURCE", 0.0));
        assert_eq!(c[2], ("ALPHA_SOURCE", 0.0));
        assert_eq!(c[3], ("FOG", 0.0));
    }
}
