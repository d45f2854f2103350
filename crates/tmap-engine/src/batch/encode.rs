//! Conversion of legacy primitives into pre-transformed GPU vertices.
//!
//! All functions here are pure: they write into slices already reserved in
//! the rings and never touch batch state.

use bytemuck::{Pod, Zeroable};

use crate::coords::{PixelRect, ScreenMetrics};
use crate::gr::{
    AlphaSource, Bitmap, ColorSource, LegacyVertex, RenderMode, Rgba8, VertexAttributes,
};

/// Smallest inverse depth accepted before `1 / sw`.
///
/// Inputs closer to zero (or non-finite) are clamped so the perspective
/// divide never produces infinities.
pub const MIN_INV_DEPTH: f32 = 1e-6;

/// Vertex layout consumed by the "transformed" vertex shader.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct GpuVertex {
    /// Clip-space position.
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
    /// Packed RGBA8, see [`Rgba8::pack`].
    pub diffuse: u32,
    pub u: f32,
    pub v: f32,
}

/// Per-call inputs the legacy renderer used to read from globals.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawParams {
    pub screen: ScreenMetrics,
    /// Z scale of the active projection; zero before any 3D setup.
    pub depth_scale: f32,
    /// Maps inverse depth into the depth buffer range.
    pub depth_map_scale: f32,
    /// Current drawing colour, used wherever the mode does not read vertices.
    pub color: Rgba8,
}

impl DrawParams {
    #[inline]
    pub const fn new(screen: ScreenMetrics) -> Self {
        Self { screen, depth_scale: 1.0, depth_map_scale: 1.0, color: Rgba8::WHITE }
    }

    #[inline]
    pub const fn with_color(self, color: Rgba8) -> Self {
        Self { color, ..self }
    }

    #[inline]
    pub const fn with_depth(self, depth_scale: f32, depth_map_scale: f32) -> Self {
        Self { depth_scale, depth_map_scale, ..self }
    }

    /// Depth scale with the "no projection set up yet" value replaced by 1.
    #[inline]
    pub fn effective_depth_scale(&self) -> f32 {
        if self.depth_scale == 0.0 || !self.depth_scale.is_finite() {
            1.0
        } else {
            self.depth_scale
        }
    }
}

impl Default for DrawParams {
    fn default() -> Self {
        Self::new(ScreenMetrics::default())
    }
}

/// Independent horizontal/vertical mirroring of a blit.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Flip {
    pub x: bool,
    pub y: bool,
}

impl Flip {
    pub const NONE: Self = Self { x: false, y: false };
    pub const X: Self = Self { x: true, y: false };
    pub const Y: Self = Self { x: false, y: true };
}

/// Clamps `sw` away from zero, keeping the sign of finite negative values.
#[inline]
pub fn sanitize_inv_depth(sw: f32) -> f32 {
    if !sw.is_finite() {
        MIN_INV_DEPTH
    } else if sw.abs() < MIN_INV_DEPTH {
        if sw.is_sign_negative() { -MIN_INV_DEPTH } else { MIN_INV_DEPTH }
    } else {
        sw
    }
}

/// Number of indices a fan over `vertex_count` vertices produces.
#[inline]
pub const fn fan_index_count(vertex_count: usize) -> usize {
    vertex_count.saturating_sub(2) * 3
}

/// Source of one colour component group for a vertex.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Channel {
    /// The texture supplies it; the vertex carries full intensity.
    White,
    /// The current drawing colour.
    Constant,
    /// The vertex's own value.
    Vertex,
}

fn color_channel(mode: RenderMode, attrs: VertexAttributes) -> Channel {
    if !mode.uses_vertex_color() {
        return Channel::White;
    }
    match mode.color {
        ColorSource::Constant => Channel::Constant,
        _ if attrs.contains(VertexAttributes::RGB) => Channel::Vertex,
        _ => Channel::Constant,
    }
}

fn alpha_channel(mode: RenderMode, attrs: VertexAttributes) -> Channel {
    if !mode.uses_vertex_alpha() {
        return Channel::White;
    }
    match mode.alpha {
        AlphaSource::Constant => Channel::Constant,
        _ if attrs.contains(VertexAttributes::ALPHA) => Channel::Vertex,
        _ => Channel::Constant,
    }
}

/// Resolves the diffuse colour of one polygon vertex.
///
/// RGB and alpha are chosen independently.
pub fn resolve_diffuse(
    mode: RenderMode,
    attrs: VertexAttributes,
    vertex: &LegacyVertex,
    constant: Rgba8,
) -> Rgba8 {
    let (r, g, b) = match color_channel(mode, attrs) {
        Channel::White => (255, 255, 255),
        Channel::Constant => (constant.r, constant.g, constant.b),
        Channel::Vertex => (vertex.r, vertex.g, vertex.b),
    };
    let a = match alpha_channel(mode, attrs) {
        Channel::White => 255,
        Channel::Constant => constant.a,
        Channel::Vertex => vertex.a,
    };
    Rgba8::new(r, g, b, a)
}

/// Encodes a convex polygon as a triangle fan.
///
/// `out_vertices.len()` must equal `vertices.len()` and `out_indices.len()`
/// must equal [`fan_index_count`]. Indices are absolute: `base_vertex` is the
/// ring position of `out_vertices[0]`.
pub fn encode_polygon(
    params: &DrawParams,
    vertices: &[LegacyVertex],
    attrs: VertexAttributes,
    mode: RenderMode,
    out_vertices: &mut [GpuVertex],
    out_indices: &mut [u16],
    base_vertex: u16,
) {
    debug_assert_eq!(out_vertices.len(), vertices.len());
    debug_assert_eq!(out_indices.len(), fan_index_count(vertices.len()));

    let screen = params.screen;
    let scale_z = params.effective_depth_scale();

    for (src, dst) in vertices.iter().zip(out_vertices.iter_mut()) {
        let sw = sanitize_inv_depth(src.sw);
        // Camera-space depth, needed for perspective-correct interpolation.
        let w = 1.0 / sw / scale_z;
        *dst = GpuVertex {
            x: screen.ndc_x(src.sx - screen.offset_x) * w,
            y: screen.ndc_y(src.sy - screen.offset_y) * w,
            z: sw * params.depth_map_scale * w,
            w,
            diffuse: resolve_diffuse(mode, attrs, src, params.color).pack(),
            u: src.u,
            v: src.v,
        };
    }

    for (i, tri) in out_indices.chunks_exact_mut(3).enumerate() {
        let i = i as u16 + 2;
        tri.copy_from_slice(&[base_vertex, base_vertex + i - 1, base_vertex + i]);
    }
}

/// Encodes a screen-space line segment.
///
/// Positions are not multiplied by `w`; only the depth term is. Lines always
/// use the current drawing colour.
pub fn encode_line(
    params: &DrawParams,
    vertices: &[LegacyVertex; 2],
    out_vertices: &mut [GpuVertex],
    out_indices: &mut [u16],
    base_vertex: u16,
) {
    debug_assert_eq!(out_vertices.len(), 2);
    debug_assert_eq!(out_indices.len(), 2);

    let screen = params.screen;
    let scale_z = params.effective_depth_scale();
    let diffuse = params.color.pack();

    for (src, dst) in vertices.iter().zip(out_vertices.iter_mut()) {
        let sw = sanitize_inv_depth(src.sw);
        *dst = GpuVertex {
            x: screen.ndc_x(src.sx - screen.offset_x),
            y: screen.ndc_y(src.sy - screen.offset_y),
            z: sw * params.depth_map_scale,
            w: 1.0 / sw / scale_z,
            diffuse,
            u: 0.0,
            v: 0.0,
        };
    }
    out_indices.copy_from_slice(&[base_vertex, base_vertex + 1]);
}

/// Corner coordinates of an axis-aligned blit.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BlitQuad {
    /// Clip-space x of the left and right edges.
    pub x: [f32; 2],
    /// Clip-space y of the top and bottom edges.
    pub y: [f32; 2],
    /// Texture u at the left and right edges.
    pub u: [f32; 2],
    /// Texture v at the top and bottom edges.
    pub v: [f32; 2],
}

impl BlitQuad {
    /// Computes destination and texture coordinates for copying `src` (texels
    /// of `bitmap`) onto `dst` (pixels of the clip window).
    ///
    /// When an axis is scaled the UVs on that axis are inset by half a texel
    /// so bilinear filtering never pulls in the wrapped-around neighbour.
    pub fn new(
        screen: ScreenMetrics,
        bitmap: Bitmap,
        dst: PixelRect,
        src: PixelRect,
        flip: Flip,
    ) -> Self {
        let bm_w = bitmap.width as f32;
        let bm_h = bitmap.height as f32;

        let mut u = [src.x as f32 / bm_w, src.right() as f32 / bm_w];
        let mut v = [src.y as f32 / bm_h, src.bottom() as f32 / bm_h];

        if dst.w != src.w {
            u[0] += 0.5 / bm_w;
            u[1] -= 0.5 / bm_w;
        }
        if dst.h != src.h {
            v[0] += 0.5 / bm_h;
            v[1] -= 0.5 / bm_h;
        }
        if flip.x {
            u.swap(0, 1);
        }
        if flip.y {
            v.swap(0, 1);
        }

        Self {
            x: [screen.ndc_x(dst.x as f32), screen.ndc_x(dst.right() as f32)],
            y: [screen.ndc_y(dst.y as f32), screen.ndc_y(dst.bottom() as f32)],
            u,
            v,
        }
    }
}

/// Writes a blit as two triangles.
///
/// Corner order is top-left, top-right, bottom-right, bottom-left.
pub fn encode_blit(
    quad: &BlitQuad,
    color: Rgba8,
    out_vertices: &mut [GpuVertex],
    out_indices: &mut [u16],
    base_vertex: u16,
) {
    debug_assert_eq!(out_vertices.len(), 4);
    debug_assert_eq!(out_indices.len(), 6);

    let diffuse = color.pack();
    for (i, dst) in out_vertices.iter_mut().enumerate() {
        let left = i == 0 || i == 3;
        let top = i == 0 || i == 1;
        let column = if left { 0 } else { 1 };
        let row = if top { 0 } else { 1 };
        *dst = GpuVertex {
            x: quad.x[column],
            y: quad.y[row],
            z: 1.0,
            w: 1.0,
            diffuse,
            u: quad.u[column],
            v: quad.v[row],
        };
    }

    let b = base_vertex;
    out_indices.copy_from_slice(&[b, b + 1, b + 2, b, b + 2, b + 3]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gr::{TextureHandle, TextureSource};

    const EPS: f32 = 1e-5;

    fn params() -> DrawParams {
        DrawParams::new(ScreenMetrics::new(640.0, 480.0)).with_color(Rgba8::new(10, 20, 30, 40))
    }

    fn fan(n: usize) -> Vec<LegacyVertex> {
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32 * std::f32::consts::TAU;
                LegacyVertex::screen(320.0 + 100.0 * t.cos(), 240.0 + 100.0 * t.sin())
            })
            .collect()
    }

    fn encode(n: usize, base: u16) -> (Vec<GpuVertex>, Vec<u16>) {
        let src = fan(n);
        let mut v = vec![GpuVertex::default(); n];
        let mut i = vec![0u16; fan_index_count(n)];
        let mode = RenderMode::default();
        encode_polygon(&params(), &src, VertexAttributes::NONE, mode, &mut v, &mut i, base);
        (v, i)
    }

    #[test]
    fn fan_emits_n_vertices_and_fan_order_indices() {
        for n in [3usize, 4, 5, 9, 32] {
            let (v, idx) = encode(n, 100);
            assert_eq!(v.len(), n);
            assert_eq!(idx.len(), (n - 2) * 3);
            for (k, tri) in idx.chunks(3).enumerate() {
                let i = k as u16 + 2;
                assert_eq!(tri, &[100, 100 + i - 1, 100 + i]);
            }
        }
    }

    #[test]
    fn screen_corners_map_to_ndc_corners() {
        let p = params();
        let src = [
            LegacyVertex::screen(0.0, 0.0),
            LegacyVertex::screen(640.0, 0.0),
            LegacyVertex::screen(640.0, 480.0),
        ];
        let mut v = [GpuVertex::default(); 3];
        let mut i = [0u16; 3];
        encode_polygon(&p, &src, VertexAttributes::NONE, RenderMode::default(), &mut v, &mut i, 0);

        assert_eq!((v[0].x, v[0].y), (-1.0, 1.0));
        assert_eq!((v[1].x, v[1].y), (1.0, 1.0));
        assert_eq!((v[2].x, v[2].y), (1.0, -1.0));
        assert_eq!((v[0].z, v[0].w), (1.0, 1.0));
    }

    #[test]
    fn viewport_offset_is_subtracted() {
        let p = DrawParams {
            screen: ScreenMetrics::new(200.0, 100.0).with_offset(50.0, 20.0),
            ..params()
        };
        let src = [
            LegacyVertex::screen(50.0, 20.0),
            LegacyVertex::screen(250.0, 20.0),
            LegacyVertex::screen(250.0, 120.0),
        ];
        let mut v = [GpuVertex::default(); 3];
        let mut i = [0u16; 3];
        encode_polygon(&p, &src, VertexAttributes::NONE, RenderMode::default(), &mut v, &mut i, 0);
        assert_eq!((v[0].x, v[0].y), (-1.0, 1.0));
        assert_eq!((v[2].x, v[2].y), (1.0, -1.0));
    }

    #[test]
    fn perspective_terms_follow_inverse_depth() {
        let p = params().with_depth(2.0, 0.5);
        let src = [
            LegacyVertex::screen(0.0, 0.0).with_depth(0.25),
            LegacyVertex::screen(640.0, 0.0).with_depth(0.25),
            LegacyVertex::screen(640.0, 480.0).with_depth(0.25),
        ];
        let mut v = [GpuVertex::default(); 3];
        let mut i = [0u16; 3];
        encode_polygon(&p, &src, VertexAttributes::NONE, RenderMode::default(), &mut v, &mut i, 0);

        // w = 1 / 0.25 / 2 = 2
        assert!((v[0].w - 2.0).abs() < EPS);
        assert!((v[0].x - -2.0).abs() < EPS);
        assert!((v[0].y - 2.0).abs() < EPS);
        // z = sw * zm * w = 0.25 * 0.5 * 2
        assert!((v[0].z - 0.25).abs() < EPS);
    }

    #[test]
    fn zero_depth_scale_falls_back_to_one() {
        assert_eq!(params().with_depth(0.0, 1.0).effective_depth_scale(), 1.0);
        assert_eq!(params().with_depth(f32::NAN, 1.0).effective_depth_scale(), 1.0);
        assert_eq!(params().with_depth(3.0, 1.0).effective_depth_scale(), 3.0);
    }

    #[test]
    fn tiny_inverse_depth_is_clamped() {
        assert_eq!(sanitize_inv_depth(0.0), MIN_INV_DEPTH);
        assert_eq!(sanitize_inv_depth(f32::INFINITY), MIN_INV_DEPTH);
        assert_eq!(sanitize_inv_depth(-1e-9), -MIN_INV_DEPTH);
        assert_eq!(sanitize_inv_depth(0.5), 0.5);

        let src = [LegacyVertex::screen(0.0, 0.0).with_depth(0.0); 3];
        let mut v = [GpuVertex::default(); 3];
        let mut i = [0u16; 3];
        let mode = RenderMode::default();
        encode_polygon(&params(), &src, VertexAttributes::NONE, mode, &mut v, &mut i, 0);
        assert!(v.iter().all(|v| v.x.is_finite() && v.w.is_finite() && v.z.is_finite()));
    }

    #[test]
    fn diffuse_resolution_table() {
        let constant = Rgba8::new(1, 2, 3, 4);
        let vertex = LegacyVertex::screen(0.0, 0.0).with_rgba(100, 110, 120, 130);
        let textured = RenderMode { texture: TextureSource::Wrap, ..RenderMode::default() };

        // Vertex colour requested but not supplied: drawing colour.
        assert_eq!(resolve_diffuse(textured, VertexAttributes::NONE, &vertex, constant), constant);
        // Supplied: vertex colour.
        assert_eq!(
            resolve_diffuse(textured, VertexAttributes::RGBA, &vertex, constant),
            Rgba8::new(100, 110, 120, 130)
        );
        // Colour and alpha are independent.
        assert_eq!(
            resolve_diffuse(textured, VertexAttributes::RGB, &vertex, constant),
            Rgba8::new(100, 110, 120, 4)
        );
        assert_eq!(
            resolve_diffuse(textured, VertexAttributes::ALPHA, &vertex, constant),
            Rgba8::new(1, 2, 3, 130)
        );
        // Texture supplies colour: white, alpha still resolved.
        let tex_color = RenderMode { color: ColorSource::Texture, ..textured };
        assert_eq!(
            resolve_diffuse(tex_color, VertexAttributes::RGBA, &vertex, constant),
            Rgba8::new(255, 255, 255, 130)
        );
        // Texture supplies alpha.
        let tex_alpha = RenderMode { alpha: AlphaSource::Texture, ..textured };
        assert_eq!(
            resolve_diffuse(tex_alpha, VertexAttributes::NONE, &vertex, constant),
            Rgba8::new(1, 2, 3, 255)
        );
        // Constant source ignores vertex data.
        let constant_mode = RenderMode {
            color: ColorSource::Constant,
            alpha: AlphaSource::Constant,
            ..textured
        };
        assert_eq!(
            resolve_diffuse(constant_mode, VertexAttributes::RGBA, &vertex, constant),
            constant
        );
    }

    #[test]
    fn line_uses_drawing_color_and_unscaled_position() {
        let p = params().with_depth(2.0, 1.0);
        let src = [
            LegacyVertex::screen(0.0, 0.0).with_depth(0.5).with_rgba(9, 9, 9, 9),
            LegacyVertex::screen(640.0, 480.0).with_depth(0.5),
        ];
        let mut v = [GpuVertex::default(); 2];
        let mut i = [0u16; 2];
        encode_line(&p, &src, &mut v, &mut i, 7);

        assert_eq!(i, [7, 8]);
        assert_eq!((v[0].x, v[0].y), (-1.0, 1.0));
        assert_eq!((v[1].x, v[1].y), (1.0, -1.0));
        assert_eq!(v[0].z, 0.5);
        assert_eq!(v[0].w, 1.0);
        assert_eq!(v[0].diffuse, Rgba8::new(10, 20, 30, 40).pack());
    }

    fn bitmap() -> Bitmap {
        Bitmap::new(TextureHandle(1), 256, 128)
    }

    #[test]
    fn unscaled_blit_has_no_inset() {
        let screen = ScreenMetrics::new(640.0, 480.0);
        let src = PixelRect::new(64, 32, 64, 32);
        let dst = PixelRect::new(0, 0, 64, 32);
        let q = BlitQuad::new(screen, bitmap(), dst, src, Flip::NONE);
        assert_eq!(q.u, [0.25, 0.5]);
        assert_eq!(q.v, [0.25, 0.5]);
        assert_eq!(q.x[0], -1.0);
        assert_eq!(q.y[0], 1.0);
    }

    #[test]
    fn scaled_axis_gets_half_texel_inset_only() {
        let screen = ScreenMetrics::new(640.0, 480.0);
        let src = PixelRect::new(64, 32, 64, 32);
        let dst = PixelRect::new(0, 0, 128, 32);
        let q = BlitQuad::new(screen, bitmap(), dst, src, Flip::NONE);
        assert!((q.u[0] - (0.25 + 0.5 / 256.0)).abs() < EPS);
        assert!((q.u[1] - (0.5 - 0.5 / 256.0)).abs() < EPS);
        assert_eq!(q.v, [0.25, 0.5]);

        let dst = PixelRect::new(0, 0, 64, 64);
        let q = BlitQuad::new(screen, bitmap(), dst, src, Flip::NONE);
        assert_eq!(q.u, [0.25, 0.5]);
        assert!((q.v[0] - (0.25 + 0.5 / 128.0)).abs() < EPS);
    }

    #[test]
    fn horizontal_flip_mirrors_u_only() {
        let screen = ScreenMetrics::new(640.0, 480.0);
        let src = PixelRect::new(0, 0, 256, 128);
        let dst = PixelRect::new(10, 10, 100, 50);
        let plain = BlitQuad::new(screen, bitmap(), dst, src, Flip::NONE);
        let flipped = BlitQuad::new(screen, bitmap(), dst, src, Flip::X);
        assert_eq!(flipped.u, [plain.u[1], plain.u[0]]);
        assert_eq!(flipped.v, plain.v);
        assert_eq!(flipped.x, plain.x);
        assert_eq!(flipped.y, plain.y);

        let vflipped = BlitQuad::new(screen, bitmap(), dst, src, Flip::Y);
        assert_eq!(vflipped.v, [plain.v[1], plain.v[0]]);
        assert_eq!(vflipped.u, plain.u);
    }

    #[test]
    fn blit_emits_two_triangles_in_corner_order() {
        let screen = ScreenMetrics::new(640.0, 480.0);
        let dst = PixelRect::new(0, 0, 320, 240);
        let q = BlitQuad::new(screen, bitmap(), dst, PixelRect::new(0, 0, 256, 128), Flip::NONE);
        let mut v = [GpuVertex::default(); 4];
        let mut i = [0u16; 6];
        encode_blit(&q, Rgba8::WHITE, &mut v, &mut i, 40);

        assert_eq!(i, [40, 41, 42, 40, 42, 43]);
        assert_eq!((v[0].x, v[0].y), (q.x[0], q.y[0]));
        assert_eq!((v[1].x, v[1].y), (q.x[1], q.y[0]));
        assert_eq!((v[2].x, v[2].y), (q.x[1], q.y[1]));
        assert_eq!((v[3].x, v[3].y), (q.x[0], q.y[1]));
        assert_eq!((v[3].u, v[3].v), (q.u[0], q.v[1]));
        assert!(v.iter().all(|v| v.z == 1.0 && v.w == 1.0));
    }
}
