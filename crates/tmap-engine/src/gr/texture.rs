use super::RenderMode;

/// Opaque bitmap handle issued by the texture manager.
///
/// Negative values mean "unbound".
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub i32);

impl TextureHandle {
    pub const NONE: Self = Self(-1);

    #[inline]
    pub const fn is_bound(self) -> bool {
        self.0 >= 0
    }
}

impl Default for TextureHandle {
    fn default() -> Self {
        Self::NONE
    }
}

/// Base texture plus optional secondary (environment) texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct TextureBinding(pub [TextureHandle; 2]);

impl TextureBinding {
    pub const UNBOUND: Self = Self([TextureHandle::NONE, TextureHandle::NONE]);

    #[inline]
    pub const fn single(base: TextureHandle) -> Self {
        Self([base, TextureHandle::NONE])
    }

    #[inline]
    pub const fn pair(base: TextureHandle, secondary: TextureHandle) -> Self {
        Self([base, secondary])
    }

    #[inline]
    pub const fn base(self) -> TextureHandle {
        self.0[0]
    }

    #[inline]
    pub const fn secondary(self) -> TextureHandle {
        self.0[1]
    }

    /// Forces slots `mode` never samples to [`TextureHandle::NONE`].
    ///
    /// Geometry that differs only in an unused slot then compares equal and
    /// stays in the same batch.
    pub fn normalized_for(self, mode: RenderMode) -> Self {
        let mut out = self;
        for (slot, handle) in out.0.iter_mut().enumerate() {
            if !mode.uses_texture_slot(slot) {
                *handle = TextureHandle::NONE;
            }
        }
        out
    }
}

/// Texel dimensions of a texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TextureSize {
    pub width: u32,
    pub height: u32,
}

/// Source of texture metadata (owned by the bitmap manager).
pub trait TextureMetrics {
    fn texture_size(&self, handle: TextureHandle) -> Option<TextureSize>;
}

/// A bitmap to blit: handle plus its texel size, read once by the caller.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Bitmap {
    pub handle: TextureHandle,
    pub width: u32,
    pub height: u32,
}

impl Bitmap {
    #[inline]
    pub const fn new(handle: TextureHandle, width: u32, height: u32) -> Self {
        Self { handle, width, height }
    }

    /// Looks up `handle` in `metrics`; `None` if the texture is unknown.
    pub fn lookup(metrics: &dyn TextureMetrics, handle: TextureHandle) -> Option<Self> {
        metrics
            .texture_size(handle)
            .map(|size| Self::new(handle, size.width, size.height))
    }
}
