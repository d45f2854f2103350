/// Screen clip window the legacy renderer draws into, in pixels.
///
/// Read on every primitive; may change between frames (window resize,
/// split-screen viewports) without recreating the renderer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScreenMetrics {
    pub clip_width: f32,
    pub clip_height: f32,
    /// Top-left corner of the clip window relative to the render target.
    pub offset_x: f32,
    pub offset_y: f32,
}

impl ScreenMetrics {
    #[inline]
    pub const fn new(clip_width: f32, clip_height: f32) -> Self {
        Self { clip_width, clip_height, offset_x: 0.0, offset_y: 0.0 }
    }

    #[inline]
    pub const fn with_offset(self, offset_x: f32, offset_y: f32) -> Self {
        Self { offset_x, offset_y, ..self }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.clip_width > 0.0
            && self.clip_height > 0.0
            && self.clip_width.is_finite()
            && self.clip_height.is_finite()
    }

    /// Maps a clip-window x coordinate to normalized device x (`-1..1`).
    #[inline]
    pub fn ndc_x(self, x: f32) -> f32 {
        x / self.clip_width * 2.0 - 1.0
    }

    /// Maps a clip-window y coordinate to normalized device y (`1..-1`, +Y up).
    #[inline]
    pub fn ndc_y(self, y: f32) -> f32 {
        y / self.clip_height * -2.0 + 1.0
    }
}

impl Default for ScreenMetrics {
    fn default() -> Self {
        Self::new(640.0, 480.0)
    }
}
