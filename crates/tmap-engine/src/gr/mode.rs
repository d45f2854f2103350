/// Where the base colour of a fragment is sampled from.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureSource {
    /// Untextured; vertex colour and alpha are always used.
    None,
    /// One texture, repeat addressing.
    Wrap,
    /// One texture, clamp-to-edge addressing.
    Clamp,
    /// Base texture modulated by a secondary (environment) texture.
    Environment,
}

impl TextureSource {
    /// Number of texture slots this source samples from.
    #[inline]
    pub const fn slots(self) -> usize {
        match self {
            TextureSource::None => 0,
            TextureSource::Wrap | TextureSource::Clamp => 1,
            TextureSource::Environment => 2,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ColorSource {
    Vertex,
    Texture,
    VertexTimesTexture,
    VertexPlusTexture,
    /// Always the current drawing colour, even if vertices carry RGB.
    Constant,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AlphaSource {
    Vertex,
    Texture,
    VertexTimesTexture,
    /// Always the current drawing alpha, even if vertices carry alpha.
    Constant,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BlendMode {
    None,
    Alpha,
    Additive,
    AlphaAdditive,
    Multiply,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DepthTest {
    None,
    /// Less-or-equal test with depth writes.
    Normal,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Fog {
    Allowed,
    Disallowed,
}

/// How a batch is shaded and composited.
///
/// Compared by value: two primitives can share a draw call only if their modes
/// are equal.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RenderMode {
    pub texture: TextureSource,
    pub color: ColorSource,
    pub alpha: AlphaSource,
    pub blend: BlendMode,
    pub depth: DepthTest,
    pub fog: Fog,
}

impl RenderMode {
    #[inline]
    pub const fn new(
        texture: TextureSource,
        color: ColorSource,
        alpha: AlphaSource,
        blend: BlendMode,
        depth: DepthTest,
        fog: Fog,
    ) -> Self {
        Self { texture, color, alpha, blend, depth, fog }
    }

    /// Flat-coloured, alpha-blended 2D geometry (rectangles, lines, HUD fills).
    pub const FLAT_ALPHA_2D: Self = Self::new(
        TextureSource::None,
        ColorSource::Vertex,
        AlphaSource::Vertex,
        BlendMode::Alpha,
        DepthTest::None,
        Fog::Disallowed,
    );

    /// Textured, alpha-blended 2D bitmap tinted by the drawing colour.
    pub const BITMAP_2D: Self = Self::new(
        TextureSource::Clamp,
        ColorSource::VertexTimesTexture,
        AlphaSource::VertexTimesTexture,
        BlendMode::Alpha,
        DepthTest::None,
        Fog::Disallowed,
    );

    /// Whether diffuse RGB is taken from vertex data (or the drawing colour
    /// standing in for it) rather than the texture alone.
    #[inline]
    pub fn uses_vertex_color(self) -> bool {
        if self.texture == TextureSource::None {
            return true;
        }
        self.color != ColorSource::Texture
    }

    /// Alpha counterpart of [`uses_vertex_color`](Self::uses_vertex_color).
    #[inline]
    pub fn uses_vertex_alpha(self) -> bool {
        if self.texture == TextureSource::None {
            return true;
        }
        self.alpha != AlphaSource::Texture
    }

    /// Whether texture slot `slot` (0 = base, 1 = secondary) is sampled.
    #[inline]
    pub fn uses_texture_slot(self, slot: usize) -> bool {
        slot < self.texture.slots()
    }
}

impl Default for RenderMode {
    /// Untextured, vertex-coloured, opaque, no depth test.
    fn default() -> Self {
        Self::new(
            TextureSource::None,
            ColorSource::Vertex,
            AlphaSource::Vertex,
            BlendMode::None,
            DepthTest::None,
            Fog::Allowed,
        )
    }
}
