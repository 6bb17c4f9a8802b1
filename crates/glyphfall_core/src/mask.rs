//! # Occupancy Mask
//!
//! Per-pixel alpha buffer produced by an external body-segmentation source.
//! A pixel is occupied iff its alpha is above zero. The engine only reads
//! masks; producers hand over a fresh snapshot whenever they have one.

use std::sync::Arc;

use crate::error::{GlyphfallError, GlyphfallResult};

/// Read-only occupancy buffer, row-major, same dimensions as the surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OccupancyMask {
    width: u32,
    height: u32,
    alpha: Vec<u8>,
}

impl OccupancyMask {
    /// Wraps an alpha-only buffer.
    ///
    /// # Errors
    ///
    /// Returns [`GlyphfallError::MaskDimensions`] if `alpha.len()` is not
    /// `width * height`.
    pub fn from_alpha(width: u32, height: u32, alpha: Vec<u8>) -> GlyphfallResult<Self> {
        if alpha.len() != pixel_count(width, height) {
            return Err(GlyphfallError::MaskDimensions {
                width,
                height,
                len: alpha.len(),
            });
        }
        Ok(Self {
            width,
            height,
            alpha,
        })
    }

    /// Extracts the alpha channel from an RGBA8 buffer (canvas image data).
    ///
    /// # Errors
    ///
    /// Returns [`GlyphfallError::MaskDimensions`] if `rgba` is not exactly
    /// `width * height` four-byte pixels.
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> GlyphfallResult<Self> {
        let mismatch = || GlyphfallError::MaskDimensions {
            width,
            height,
            len: rgba.len(),
        };
        let pixels: &[[u8; 4]] = bytemuck::try_cast_slice(rgba).map_err(|_| mismatch())?;
        if pixels.len() != pixel_count(width, height) {
            return Err(mismatch());
        }
        Ok(Self {
            width,
            height,
            alpha: pixels.iter().map(|px| px[3]).collect(),
        })
    }

    /// Builds a binary mask from a predicate over pixel coordinates.
    #[must_use]
    pub fn from_fn<F>(width: u32, height: u32, mut occupied: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let mut alpha = Vec::with_capacity(pixel_count(width, height));
        for y in 0..height {
            for x in 0..width {
                alpha.push(if occupied(x, y) { 255 } else { 0 });
            }
        }
        Self {
            width,
            height,
            alpha,
        }
    }

    /// A mask with no occupied pixel.
    #[must_use]
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            alpha: vec![0; pixel_count(width, height)],
        }
    }

    /// Width in pixels.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// True for zero-dimension masks, which collide with nothing.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alpha.is_empty()
    }

    /// Raw alpha values, row-major.
    #[must_use]
    pub fn alpha(&self) -> &[u8] {
        &self.alpha
    }

    /// Whether the pixel at `(x, y)` is occupied. Out-of-bounds is free.
    #[inline]
    #[must_use]
    pub fn is_occupied(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return false;
        }
        self.alpha[y as usize * self.width as usize + x as usize] > 0
    }

    /// Number of occupied pixels.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.alpha.iter().filter(|&&a| a > 0).count()
    }
}

fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

/// Source of the most recent mask snapshot.
///
/// Implementations must never block: returning a stale snapshot is
/// expected, and `None` means "no collisions this frame".
pub trait MaskProvider {
    /// The latest delivered mask, if any.
    fn latest(&self) -> Option<Arc<OccupancyMask>>;
}

impl MaskProvider for Option<Arc<OccupancyMask>> {
    fn latest(&self) -> Option<Arc<OccupancyMask>> {
        self.clone()
    }
}

impl<P: MaskProvider + ?Sized> MaskProvider for Arc<P> {
    fn latest(&self) -> Option<Arc<OccupancyMask>> {
        (**self).latest()
    }
}
