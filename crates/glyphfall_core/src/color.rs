//! Display colors assigned once per source string.

use bytemuck::{Pod, Zeroable};
use rand::Rng;

/// An 8-bit RGBA color, laid out for direct upload to a pixel buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Rgba8 {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Rgba8 {
    /// Opaque white.
    pub const WHITE: Self = Self::opaque(255, 255, 255);

    /// Creates an opaque color.
    #[must_use]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Draws a saturated, mid-lightness color that reads well over video.
    ///
    /// Hue is uniform over the wheel; saturation and lightness stay in a
    /// narrow band so no string comes out grey or washed out.
    pub fn random_vivid<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let hue = rng.gen_range(0.0..360.0_f32);
        let saturation = rng.gen_range(0.7..=1.0_f32);
        let lightness = rng.gen_range(0.55..=0.7_f32);
        Self::from_hsl(hue, saturation, lightness)
    }

    /// Converts HSL (hue in degrees, saturation and lightness in `[0, 1]`).
    #[must_use]
    pub fn from_hsl(hue: f32, saturation: f32, lightness: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let s = saturation.clamp(0.0, 1.0);
        let l = lightness.clamp(0.0, 1.0);

        let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
        let m = l - chroma / 2.0;

        let (r, g, b) = match h as u32 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };

        let to_byte = |c: f32| ((c + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Self::opaque(to_byte(r), to_byte(g), to_byte(b))
    }

    /// CSS hex notation, e.g. `#ff8800`.
    #[must_use]
    pub fn to_css(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}
