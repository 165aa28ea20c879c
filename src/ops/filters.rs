// ============================================================================
// IMAGE FILTERS - general square-kernel convolution, sharpen, blur
// ============================================================================

use rayon::prelude::*;

use crate::error::{EditError, Result};
use crate::pixels::{PixelBuffer, clamp_channel};

/// Classic 4-neighbour sharpen.
pub const SHARPEN_KERNEL: [f32; 9] = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];

/// 3×3 box blur.
pub const BLUR_KERNEL: [f32; 9] = [1.0 / 9.0; 9];

/// A square convolution kernel with an odd side length.
#[derive(Clone, Debug, PartialEq)]
pub struct Kernel {
    side: usize,
    weights: Vec<f32>,
}

impl Kernel {
    /// Validate `weights` as a `side × side` kernel, row-major.
    pub fn new(weights: impl Into<Vec<f32>>) -> Result<Self> {
        let weights = weights.into();
        let len = weights.len();
        let side = (len as f64).sqrt().round() as usize;
        if len == 0 || side * side != len || side % 2 == 0 {
            return Err(EditError::InvalidKernel { len });
        }
        Ok(Self { side, weights })
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    fn radius(&self) -> i64 {
        (self.side / 2) as i64
    }
}

/// Convolve `src` with a square kernel given as raw weights.
///
/// Border pixels replicate the nearest edge. When `opaque` is set the source
/// alpha is copied through and only R, G, B are convolved.
pub fn convolve(src: &PixelBuffer, weights: &[f32], opaque: bool) -> Result<PixelBuffer> {
    let kernel = Kernel::new(weights)?;
    Ok(convolve_kernel(src, &kernel, opaque))
}

/// Convolve with an already validated [`Kernel`].
pub fn convolve_kernel(src: &PixelBuffer, kernel: &Kernel, opaque: bool) -> PixelBuffer {
    let w = src.width() as i64;
    let h = src.height() as i64;
    let stride = src.stride();
    let src_raw = src.as_raw();
    let radius = kernel.radius();
    let side = kernel.side() as i64;
    let weights = kernel.weights();

    let mut dst_raw = vec![0u8; src_raw.len()];

    dst_raw.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        let y = y as i64;
        for x in 0..w {
            let mut acc = [0.0f32; 4];
            for ky in 0..side {
                let sy = (y + ky - radius).clamp(0, h - 1) as usize;
                let row = &src_raw[sy * stride..(sy + 1) * stride];
                for kx in 0..side {
                    let weight = weights[(ky * side + kx) as usize];
                    if weight == 0.0 {
                        continue;
                    }
                    let sx = (x + kx - radius).clamp(0, w - 1) as usize;
                    let px = &row[sx * 4..sx * 4 + 4];
                    acc[0] += px[0] as f32 * weight;
                    acc[1] += px[1] as f32 * weight;
                    acc[2] += px[2] as f32 * weight;
                    acc[3] += px[3] as f32 * weight;
                }
            }

            let pi = x as usize * 4;
            row_out[pi] = clamp_channel(acc[0]);
            row_out[pi + 1] = clamp_channel(acc[1]);
            row_out[pi + 2] = clamp_channel(acc[2]);
            row_out[pi + 3] = if opaque {
                src_raw[y as usize * stride + pi + 3]
            } else {
                clamp_channel(acc[3])
            };
        }
    });

    src.with_data(dst_raw)
}

pub fn sharpen(src: &PixelBuffer) -> PixelBuffer {
    let kernel = Kernel { side: 3, weights: SHARPEN_KERNEL.to_vec() };
    convolve_kernel(src, &kernel, true)
}

pub fn box_blur(src: &PixelBuffer) -> PixelBuffer {
    let kernel = Kernel { side: 3, weights: BLUR_KERNEL.to_vec() };
    convolve_kernel(src, &kernel, false)
}

/// A filter request as issued by the UI or CLI.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Sharpen,
    Blur,
    Convolve { kernel: Kernel, opaque: bool },
}

impl Filter {
    pub fn apply(&self, src: &PixelBuffer) -> PixelBuffer {
        match self {
            Filter::Sharpen => sharpen(src),
            Filter::Blur => box_blur(src),
            Filter::Convolve { kernel, opaque } => convolve_kernel(src, kernel, *opaque),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Filter::Sharpen => "Apply sharpen Filter".to_string(),
            Filter::Blur => "Apply blur Filter".to_string(),
            Filter::Convolve { kernel, .. } => {
                format!("Apply {0}×{0} Convolution", kernel.side())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const IDENTITY: [f32; 9] = [0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];

    fn noisy(w: u32, h: u32) -> PixelBuffer {
        let pixels: Vec<_> = (0..w * h)
            .map(|i| {
                let v = i.wrapping_mul(2_654_435_761);
                Rgba([v as u8, (v >> 8) as u8, (v >> 16) as u8, (v >> 24) as u8])
            })
            .collect();
        PixelBuffer::from_pixels(w, h, &pixels).unwrap()
    }

    #[test]
    fn test_identity_kernel_returns_input() {
        let buf = noisy(7, 5);
        assert_eq!(convolve(&buf, &IDENTITY, false).unwrap(), buf);
        assert_eq!(convolve(&buf, &IDENTITY, true).unwrap(), buf);
    }

    #[test]
    fn test_kernel_validation() {
        assert_eq!(Kernel::new(vec![1.0; 4]), Err(EditError::InvalidKernel { len: 4 }));
        assert_eq!(Kernel::new(vec![1.0; 8]), Err(EditError::InvalidKernel { len: 8 }));
        assert_eq!(Kernel::new(Vec::new()), Err(EditError::InvalidKernel { len: 0 }));
        assert_eq!(Kernel::new(vec![1.0; 25]).unwrap().side(), 5);
        assert_eq!(Kernel::new(vec![2.0]).unwrap().side(), 1);
    }

    #[test]
    fn test_sharpen_flat_region_unchanged() {
        // Replicated edges keep a uniform image uniform.
        let buf = PixelBuffer::new_filled(4, 4, Rgba([90, 60, 30, 200])).unwrap();
        assert_eq!(sharpen(&buf), buf);
        assert_eq!(box_blur(&buf), buf);
    }

    #[test]
    fn test_sharpen_boosts_centre_pixel() {
        let mut buf = PixelBuffer::new_filled(3, 3, Rgba([100, 100, 100, 255])).unwrap();
        buf.put_pixel(1, 1, Rgba([120, 120, 120, 255]));
        let out = sharpen(&buf);
        // 5*120 - 4*100 = 200
        assert_eq!(out.get_pixel(1, 1), Rgba([200, 200, 200, 255]));
        // neighbours: 5*100 - 120 - 100*3 = 80 (edge replicate on the outside)
        assert_eq!(out.get_pixel(1, 0), Rgba([80, 80, 80, 255]));
    }

    #[test]
    fn test_opaque_copies_source_alpha() {
        let mut buf = PixelBuffer::new_filled(3, 3, Rgba([0, 0, 0, 0])).unwrap();
        buf.put_pixel(1, 1, Rgba([255, 255, 255, 255]));
        let blended = convolve(&buf, &BLUR_KERNEL, false).unwrap();
        let opaque = convolve(&buf, &BLUR_KERNEL, true).unwrap();
        assert_eq!(blended.get_pixel(0, 0)[3], 28); // 255/9
        assert_eq!(opaque.get_pixel(0, 0)[3], 0);
        assert_eq!(opaque.get_pixel(1, 1)[3], 255);
    }

    #[test]
    fn test_replicate_edge_border() {
        // Left column black, rest white; a horizontal [1,0,0] kernel shifts right.
        let mut buf = PixelBuffer::new_filled(3, 1, Rgba([255, 255, 255, 255])).unwrap();
        buf.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        let shift = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let out = convolve(&buf, &shift, true).unwrap();
        // x=0 samples x=-1, clamped to x=0 (black).
        assert_eq!(out.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
        assert_eq!(out.get_pixel(1, 0), Rgba([0, 0, 0, 255]));
        assert_eq!(out.get_pixel(2, 0), Rgba([255, 255, 255, 255]));
    }
}
