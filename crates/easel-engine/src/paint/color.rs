/// Normalized RGBA color as consumed by the solid fill shader.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Decodes a 24-bit `0xRRGGBB` value into a fully opaque color.
    ///
    /// Bits above the low 24 are ignored.
    #[inline]
    pub fn from_packed_rgb(value: u32) -> Self {
        let channel = |shift: u32| ((value >> shift) & 0xFF) as f32 / 255.0;
        Self { r: channel(16), g: channel(8), b: channel(0), a: 1.0 }
    }

    /// Channel array in `[r, g, b, a]` order, ready for a `vec4<f32>` uniform.
    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Packs 8-bit channels into the `0xRRGGBB` form used by `Style::background_color`.
#[inline]
pub const fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    (r as u32) << 16 | (g as u32) << 8 | b as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_red_is_opaque_red() {
        assert_eq!(Color::from_packed_rgb(0xFF0000).to_array(), [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn packed_channels_decode_independently() {
        let c = Color::from_packed_rgb(pack_rgb(0x00, 0x80, 0xFF));
        assert_eq!(c.r, 0.0);
        assert!((c.g - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(c.b, 1.0);
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn high_bits_are_ignored() {
        assert_eq!(Color::from_packed_rgb(0xAB00_00FF), Color::from_packed_rgb(0x0000FF));
    }
}
