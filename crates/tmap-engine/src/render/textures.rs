use std::collections::{HashMap, HashSet};

use anyhow::{Result, bail};

use crate::gr::{TextureBinding, TextureHandle, TextureMetrics, TextureSize, TextureSource};

struct TextureEntry {
    view: wgpu::TextureView,
    size: TextureSize,
}

/// GPU textures addressed by [`TextureHandle`], plus the bind groups that
/// expose them to the transformed shader.
///
/// Unbound or unknown handles sample a 1x1 white texel.
pub struct TextureRegistry {
    entries: HashMap<TextureHandle, TextureEntry>,
    white: wgpu::TextureView,
    repeat_sampler: wgpu::Sampler,
    clamp_sampler: wgpu::Sampler,
    layout: wgpu::BindGroupLayout,
    bind_groups: HashMap<(TextureBinding, bool), wgpu::BindGroup>,
    warned_missing: HashSet<TextureHandle>,
}

impl TextureRegistry {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let white = upload_rgba8(device, queue, "tmap white texel", 1, 1, &[255; 4]);

        let sampler = |label: &'static str, mode: wgpu::AddressMode| {
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some(label),
                address_mode_u: mode,
                address_mode_v: mode,
                address_mode_w: mode,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                ..Default::default()
            })
        };

        let texture_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let sampler_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tmap texture bgl"),
            entries: &[
                texture_entry(0),
                sampler_entry(1),
                texture_entry(2),
                sampler_entry(3),
            ],
        });

        Self {
            entries: HashMap::new(),
            white,
            repeat_sampler: sampler("tmap repeat sampler", wgpu::AddressMode::Repeat),
            clamp_sampler: sampler("tmap clamp sampler", wgpu::AddressMode::ClampToEdge),
            layout,
            bind_groups: HashMap::new(),
            warned_missing: HashSet::new(),
        }
    }

    pub(super) fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    /// Registers an externally created texture view under `handle`,
    /// replacing any previous registration.
    pub fn register(
        &mut self,
        handle: TextureHandle,
        view: wgpu::TextureView,
        width: u32,
        height: u32,
    ) {
        if !handle.is_bound() {
            log::warn!("ignoring texture registration with negative handle {}", handle.0);
            return;
        }
        self.forget_bind_groups(handle);
        self.warned_missing.remove(&handle);
        self.entries.insert(
            handle,
            TextureEntry {
                view,
                size: TextureSize { width, height },
            },
        );
    }

    /// Uploads tightly packed RGBA8 pixels and registers them under `handle`.
    pub fn create_rgba8(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        handle: TextureHandle,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<()> {
        if width == 0 || height == 0 {
            bail!("texture {} has zero size ({width}x{height})", handle.0);
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            bail!(
                "texture {} expects {expected} bytes of RGBA8, got {}",
                handle.0,
                pixels.len()
            );
        }
        let view = upload_rgba8(device, queue, "tmap bitmap", width, height, pixels);
        self.register(handle, view, width, height);
        Ok(())
    }

    /// Bind group for `binding` as sampled by `source`.
    pub(super) fn bind_group(
        &mut self,
        device: &wgpu::Device,
        binding: TextureBinding,
        source: TextureSource,
    ) -> &wgpu::BindGroup {
        let clamp = source == TextureSource::Clamp;
        let key = (binding, clamp);
        if !self.bind_groups.contains_key(&key) {
            for handle in binding.0 {
                if handle.is_bound()
                    && !self.entries.contains_key(&handle)
                    && self.warned_missing.insert(handle)
                {
                    log::warn!("texture {} is not registered; sampling white", handle.0);
                }
            }

            let base = self.view_or_white(binding.base());
            let secondary = self.view_or_white(binding.secondary());
            let base_sampler = if clamp { &self.clamp_sampler } else { &self.repeat_sampler };

            let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("tmap texture bind group"),
                layout: &self.layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(base),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(base_sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(secondary),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::Sampler(&self.repeat_sampler),
                    },
                ],
            });
            self.bind_groups.insert(key, group);
        }
        &self.bind_groups[&key]
    }

    fn view_or_white(&self, handle: TextureHandle) -> &wgpu::TextureView {
        self.entries
            .get(&handle)
            .map(|e| &e.view)
            .unwrap_or(&self.white)
    }

    fn forget_bind_groups(&mut self, handle: TextureHandle) {
        self.bind_groups
            .retain(|(binding, _), _| !binding.0.contains(&handle));
    }
}

impl TextureMetrics for TextureRegistry {
    fn texture_size(&self, handle: TextureHandle) -> Option<TextureSize> {
        self.entries.get(&handle).map(|e| e.size)
    }
}

fn upload_rgba8(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &'static str,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> wgpu::TextureView {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        size,
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
