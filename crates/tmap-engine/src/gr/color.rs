/// Straight-alpha RGBA colour, one byte per channel.
///
/// This is the legacy renderer's "current drawing colour" and per-vertex
/// colour format.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const WHITE: Self = Self::new(255, 255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0, 255);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Packs into the `Unorm8x4` vertex layout (bytes in memory: r, g, b, a).
    #[inline]
    pub const fn pack(self) -> u32 {
        u32::from_le_bytes([self.r, self.g, self.b, self.a])
    }

    /// Converts to normalized float components.
    #[inline]
    pub fn to_f32(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }
}

impl Default for Rgba8 {
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_is_byte_order_rgba() {
        let c = Rgba8::new(0x11, 0x22, 0x33, 0x44);
        assert_eq!(c.pack().to_le_bytes(), [0x11, 0x22, 0x33, 0x44]);
    }
}
