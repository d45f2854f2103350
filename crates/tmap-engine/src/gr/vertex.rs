use std::ops::BitOr;

/// Screen-space vertex as produced by the legacy software transform.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct LegacyVertex {
    /// Screen position in pixels (top-left origin, +Y down).
    pub sx: f32,
    pub sy: f32,
    /// Inverse camera-space depth (`1 / z`), 1.0 for pure 2D geometry.
    pub sw: f32,
    pub u: f32,
    pub v: f32,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl LegacyVertex {
    /// A 2D vertex at `(sx, sy)` with unit inverse depth.
    #[inline]
    pub const fn screen(sx: f32, sy: f32) -> Self {
        Self { sx, sy, sw: 1.0, u: 0.0, v: 0.0, r: 255, g: 255, b: 255, a: 255 }
    }

    #[inline]
    pub const fn with_uv(self, u: f32, v: f32) -> Self {
        Self { u, v, ..self }
    }

    #[inline]
    pub const fn with_depth(self, sw: f32) -> Self {
        Self { sw, ..self }
    }

    #[inline]
    pub const fn with_rgba(self, r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a, ..self }
    }
}

/// Which optional fields of [`LegacyVertex`] the caller filled in.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct VertexAttributes(u8);

impl VertexAttributes {
    pub const NONE: Self = Self(0);
    /// `r`, `g`, `b` are meaningful.
    pub const RGB: Self = Self(1 << 0);
    /// `a` is meaningful.
    pub const ALPHA: Self = Self(1 << 1);
    pub const RGBA: Self = Self(Self::RGB.0 | Self::ALPHA.0);

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for VertexAttributes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}
