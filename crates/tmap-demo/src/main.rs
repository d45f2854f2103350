//! Renders one HUD-like frame offscreen through the batching engine.
//!
//! Exercises the paths the in-game UI leans on: translucent chat box
//! rectangles, border lines, a textured fogged polygon and scaled/flipped
//! bitmap blits. Batch statistics are logged at the end.

use anyhow::{Context, Result};

use tmap_engine::batch::{BatchConfig, DrawParams, DynamicGeometryRenderer, Flip};
use tmap_engine::coords::{PixelRect, ScreenMetrics};
use tmap_engine::device::{GpuInit, HeadlessGpu};
use tmap_engine::gr::{
    Bitmap, BlendMode, ColorSource, DepthTest, Fog, LegacyVertex, RenderMode, Rgba8,
    TextureBinding, TextureHandle, TextureSource, VertexAttributes,
};
use tmap_engine::logging::{init_logging, LoggingConfig};
use tmap_engine::render::{BackendConfig, FogParams, RenderTarget, WgpuGeometryBackend};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;

const CHECKER: TextureHandle = TextureHandle(1);
const CHECKER_SIZE: u32 = 16;

const CHATBOX_BORDER_ALPHA: u8 = 0x30;
const CHATBOX_BG_ALPHA: u8 = 0x40;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let gpu = HeadlessGpu::new_blocking(GpuInit::default())?;
    let device = gpu.device();

    let config = BackendConfig::default();
    let color = create_target(device, "tmap demo color", config.color_format);
    let depth = create_target(
        device,
        "tmap demo depth",
        config.depth_format.context("demo expects a depth format")?,
    );

    let mut backend = WgpuGeometryBackend::new(device, gpu.queue(), config);
    backend.create_texture_rgba8(CHECKER, CHECKER_SIZE, CHECKER_SIZE, &checker_pixels())?;
    backend.set_fog(FogParams {
        color: Rgba8::new(40, 40, 60, 255),
        near: 2.0,
        far: 40.0,
    });

    let mut renderer = DynamicGeometryRenderer::new(backend, BatchConfig::default())?;
    let screen = ScreenMetrics::new(WIDTH as f32, HEIGHT as f32);

    draw_world(&mut renderer, screen);
    draw_chatbox(&mut renderer, screen);
    draw_icons(&mut renderer, screen)?;
    renderer.flush();
    let recorded = renderer.backend().recorded_draws();

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("tmap demo encoder"),
    });
    clear(&mut encoder, &color, &depth);
    let mut target = RenderTarget::new(&mut encoder, &color).with_depth(&depth);
    renderer.backend_mut().encode(&mut target)?;
    gpu.queue().submit(Some(encoder.finish()));

    let stats = renderer.take_stats();
    log::info!(
        "frame done: {} draws ({recorded} encoded), {} vertices, {} indices, {} dropped, \
         {} forced flushes, {} pipelines",
        stats.draw_calls,
        stats.vertices,
        stats.indices,
        stats.dropped_primitives,
        stats.forced_flushes,
        renderer.backend().pipeline_count()
    );
    Ok(())
}

/// A receding textured floor quad, depth tested and fogged.
fn draw_world(r: &mut DynamicGeometryRenderer<WgpuGeometryBackend>, screen: ScreenMetrics) {
    let params = DrawParams::new(screen).with_depth(1.0, 1.0);
    let mode = RenderMode {
        texture: TextureSource::Wrap,
        color: ColorSource::VertexTimesTexture,
        blend: BlendMode::None,
        depth: DepthTest::Normal,
        fog: Fog::Allowed,
        ..RenderMode::default()
    };
    let floor = [
        LegacyVertex::screen(260.0, 240.0).with_depth(1.0 / 30.0).with_uv(0.0, 0.0),
        LegacyVertex::screen(380.0, 240.0).with_depth(1.0 / 30.0).with_uv(8.0, 0.0),
        LegacyVertex::screen(640.0, 480.0).with_depth(1.0 / 2.0).with_uv(8.0, 8.0),
        LegacyVertex::screen(0.0, 480.0).with_depth(1.0 / 2.0).with_uv(0.0, 8.0),
    ];
    let shaded = floor.map(|v| v.with_rgba(200, 180, 160, 255));
    r.add_polygon(&params, &shaded, VertexAttributes::RGBA, TextureBinding::single(CHECKER), mode);
}

/// Bordered translucent message box, as the multiplayer chat draws it.
fn draw_chatbox(r: &mut DynamicGeometryRenderer<WgpuGeometryBackend>, screen: ScreenMetrics) {
    let mode = RenderMode::FLAT_ALPHA_2D;
    let (box_x, box_y, box_w, box_h, border) = (10, 10, 320, 98, 2);

    let params = DrawParams::new(screen).with_color(Rgba8::WHITE.with_alpha(CHATBOX_BORDER_ALPHA));
    r.add_rect(&params, PixelRect::new(box_x, box_y, box_w, box_h), mode);

    let params = DrawParams::new(screen).with_color(Rgba8::BLACK.with_alpha(CHATBOX_BG_ALPHA));
    r.add_rect(
        &params,
        PixelRect::new(box_x + border, box_y + border, box_w - 2 * border, box_h - 2 * border),
        mode,
    );

    // Separator under the newest message.
    let params = DrawParams::new(screen).with_color(Rgba8::new(52, 255, 57, 200));
    let (x0, x1, y) = (box_x + border, box_x + box_w - border, box_y + box_h - 20);
    let line = [
        LegacyVertex::screen(x0 as f32, y as f32),
        LegacyVertex::screen(x1 as f32, y as f32),
    ];
    r.add_line(&params, &line, mode);
}

/// The same bitmap unscaled, scaled up and mirrored.
fn draw_icons(
    r: &mut DynamicGeometryRenderer<WgpuGeometryBackend>,
    screen: ScreenMetrics,
) -> Result<()> {
    let bitmap = Bitmap::lookup(r.backend().textures(), CHECKER)
        .context("checker texture was not registered")?;
    let params = DrawParams::new(screen);
    let mode = RenderMode::BITMAP_2D;
    let src = PixelRect::new(0, 0, CHECKER_SIZE as i32, CHECKER_SIZE as i32);

    r.draw_bitmap(&params, bitmap, PixelRect::new(560, 20, 16, 16), src, Flip::NONE, mode);
    r.draw_bitmap(&params, bitmap, PixelRect::new(560, 48, 64, 64), src, Flip::X, mode);
    r.draw_bitmap(
        &params.with_color(Rgba8::WHITE.with_alpha(128)),
        bitmap,
        PixelRect::new(560, 124, 64, 32),
        PixelRect::new(0, 0, 8, 8),
        Flip::Y,
        RenderMode {
            blend: BlendMode::AlphaAdditive,
            ..mode
        },
    );
    Ok(())
}

fn checker_pixels() -> Vec<u8> {
    let mut pixels = Vec::with_capacity((CHECKER_SIZE * CHECKER_SIZE * 4) as usize);
    for y in 0..CHECKER_SIZE {
        for x in 0..CHECKER_SIZE {
            let light = ((x / 4) + (y / 4)) % 2 == 0;
            let v = if light { 230 } else { 60 };
            pixels.extend_from_slice(&[v, v, v, 255]);
        }
    }
    pixels
}

fn create_target(
    device: &wgpu::Device,
    label: &'static str,
    format: wgpu::TextureFormat,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: WIDTH,
            height: HEIGHT,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn clear(encoder: &mut wgpu::CommandEncoder, color: &wgpu::TextureView, depth: &wgpu::TextureView) {
    let _ = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("tmap demo clear"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: color,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: depth,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
}
