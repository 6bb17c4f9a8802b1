//! Text measurement capability.
//!
//! The engine never rasterizes text itself; it asks a [`Measure`]
//! implementation for widths in mask pixels. Browsers, font rasterizers and
//! tests all plug in here.

use unicode_segmentation::UnicodeSegmentation;

/// Measures the rendered width of a piece of text at the configured font.
///
/// Implementations may return non-finite values for text they cannot
/// measure; the layout engine drops such glyphs instead of failing.
pub trait Measure {
    /// Width of `text` in pixels.
    fn measure(&self, text: &str) -> f32;
}

impl<F> Measure for F
where
    F: Fn(&str) -> f32,
{
    fn measure(&self, text: &str) -> f32 {
        self(text)
    }
}

/// Fixed-advance measurer: every grapheme cluster is `advance` pixels wide.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonospaceMeasure {
    /// Width of one cluster.
    pub advance: f32,
}

impl MonospaceMeasure {
    /// Creates a measurer with the given advance.
    #[must_use]
    pub const fn new(advance: f32) -> Self {
        Self { advance }
    }

    /// Derives the advance from a font size and an advance ratio.
    #[must_use]
    pub fn for_font(size: f32, advance_ratio: f32) -> Self {
        Self::new(size * advance_ratio)
    }
}

impl Measure for MonospaceMeasure {
    fn measure(&self, text: &str) -> f32 {
        text.graphemes(true).count() as f32 * self.advance
    }
}
