// ============================================================================
// PIXEL BUFFER - flat RGBA8 grid shared by every op, layer and snapshot
// ============================================================================

use image::{Rgba, RgbaImage};

use crate::error::{EditError, Result};

/// A rectangular grid of straight-alpha RGBA8 samples, row-major.
///
/// Dimensions are always non-zero and `data.len() == width * height * 4`;
/// the constructors are the only way to build one, so every op can rely on
/// that without re-checking.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl PixelBuffer {
    // ---- construction -------------------------------------------------------

    /// Fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::new_filled(width, height, Rgba([0, 0, 0, 0]))
    }

    pub fn new_filled(width: u32, height: u32, color: Rgba<u8>) -> Result<Self> {
        check_dimensions(width, height)?;
        let data = color.0.repeat(width as usize * height as usize);
        Ok(Self { width, height, data })
    }

    /// Wrap decoded RGBA bytes. Fails if the byte count does not match.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        check_dimensions(width, height)?;
        if data.len() != width as usize * height as usize * 4 {
            return Err(EditError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height, data })
    }

    pub fn from_rgba_image(src: &RgbaImage) -> Result<Self> {
        Self::from_raw(src.width(), src.height(), src.as_raw().clone())
    }

    /// Build from a list of pixels in row-major order.
    pub fn from_pixels(width: u32, height: u32, pixels: &[Rgba<u8>]) -> Result<Self> {
        let data = pixels.iter().flat_map(|p| p.0).collect();
        Self::from_raw(width, height, data)
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        // Length invariant guarantees from_raw succeeds.
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    // ---- access -------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        let i = self.offset(x, y);
        Rgba([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, pixel: Rgba<u8>) {
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&pixel.0);
    }

    pub fn pixels(&self) -> impl Iterator<Item = Rgba<u8>> + '_ {
        self.data.chunks_exact(4).map(|c| Rgba([c[0], c[1], c[2], c[3]]))
    }

    /// Approximate heap footprint, used by the history memory report.
    pub fn memory_bytes(&self) -> usize {
        self.data.len()
    }

    /// Build a same-sized buffer from freshly computed bytes.
    /// Used by ops whose output dimensions match their input.
    pub(crate) fn with_data(&self, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), self.data.len());
        Self { width: self.width, height: self.height, data }
    }

    /// Internal constructor for ops that have already validated sizes.
    pub(crate) fn from_parts(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert!(width > 0 && height > 0);
        debug_assert_eq!(data.len(), width as usize * height as usize * 4);
        Self { width, height, data }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) outside {}×{}", self.width, self.height);
        (y as usize * self.width as usize + x as usize) * 4
    }
}

pub(crate) fn check_dimensions(width: u32, height: u32) -> Result<()> {
    // Cap at 256 megapixels to keep width*height*4 well inside usize on 32-bit targets.
    let total = width as u64 * height as u64;
    if width == 0 || height == 0 || total > 256_000_000 {
        return Err(EditError::InvalidDimensions { width, height });
    }
    Ok(())
}

/// Round and clamp a computed channel value into a byte.
#[inline]
pub(crate) fn clamp_channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
