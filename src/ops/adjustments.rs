// ============================================================================
// ADJUSTMENT OPERATIONS - pure per-pixel colour adjustments
// ============================================================================
//
// Every function takes a source buffer and returns a new buffer of the same
// size. Alpha is never touched. Computed values are rounded and clamped to
// [0, 255]; parameter values outside their documented range are rejected.
// Rows are processed in parallel via rayon.
// ============================================================================

use rayon::prelude::*;

use crate::error::{EditError, Result};
use crate::pixels::{PixelBuffer, clamp_channel};

/// Channel delta per brightness step. ±100 spans the whole 0..=255 range.
pub const BRIGHTNESS_STEP: f32 = 2.55;

/// Slider range shared by brightness, saturation and exposure.
pub const LEVEL_RANGE: std::ops::RangeInclusive<i32> = -100..=100;

/// Contrast accepts the full range of the 259/255 contrast curve.
pub const CONTRAST_RANGE: std::ops::RangeInclusive<i32> = -255..=255;

// ============================================================================
// HELPER: parallel per-pixel transform
// ============================================================================

/// Apply `transform` to every pixel's (r, g, b) as f32; alpha is copied.
fn apply_pixel_transform<F>(src: &PixelBuffer, transform: F) -> PixelBuffer
where
    F: Fn(f32, f32, f32) -> (f32, f32, f32) + Sync,
{
    let stride = src.stride();
    let src_raw = src.as_raw();
    let mut dst_raw = vec![0u8; src_raw.len()];

    dst_raw.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        let row_in = &src_raw[y * stride..(y + 1) * stride];
        for (px_out, px_in) in row_out.chunks_exact_mut(4).zip(row_in.chunks_exact(4)) {
            let (nr, ng, nb) = transform(px_in[0] as f32, px_in[1] as f32, px_in[2] as f32);
            px_out[0] = clamp_channel(nr);
            px_out[1] = clamp_channel(ng);
            px_out[2] = clamp_channel(nb);
            px_out[3] = px_in[3];
        }
    });

    src.with_data(dst_raw)
}

fn check_level(name: &'static str, level: i32, range: std::ops::RangeInclusive<i32>) -> Result<()> {
    if range.contains(&level) {
        Ok(())
    } else {
        Err(EditError::InvalidParameter { name, value: level as f64 })
    }
}

// ============================================================================
// PARAMETERIZED OPERATIONS
// ============================================================================

/// Additive brightness. `level`: -100..=100, 0 = no change.
pub fn brightness(src: &PixelBuffer, level: i32) -> Result<PixelBuffer> {
    check_level("brightness", level, LEVEL_RANGE)?;
    let delta = level as f32 * BRIGHTNESS_STEP;
    Ok(apply_pixel_transform(src, move |r, g, b| (r + delta, g + delta, b + delta)))
}

/// Contrast around the 128 midpoint. `level`: -255..=255, 0 = no change.
pub fn contrast(src: &PixelBuffer, level: i32) -> Result<PixelBuffer> {
    check_level("contrast", level, CONTRAST_RANGE)?;
    let c = level as f32;
    let factor = (259.0 * (c + 255.0)) / (255.0 * (259.0 - c));
    Ok(apply_pixel_transform(src, move |r, g, b| {
        (
            factor * (r - 128.0) + 128.0,
            factor * (g - 128.0) + 128.0,
            factor * (b - 128.0) + 128.0,
        )
    }))
}

/// Push channels away from (or toward) the pixel's mean.
/// `level`: -100..=100; -100 = fully grey, 0 = no change.
pub fn saturation(src: &PixelBuffer, level: i32) -> Result<PixelBuffer> {
    check_level("saturation", level, LEVEL_RANGE)?;
    let factor = 1.0 + level as f32 / 100.0;
    Ok(apply_pixel_transform(src, move |r, g, b| {
        let avg = (r + g + b) / 3.0;
        (
            avg + (r - avg) * factor,
            avg + (g - avg) * factor,
            avg + (b - avg) * factor,
        )
    }))
}

/// Simulated exposure: gain of `2^(level / 50)`, so ±100 is ±2 stops.
pub fn exposure(src: &PixelBuffer, level: i32) -> Result<PixelBuffer> {
    check_level("exposure", level, LEVEL_RANGE)?;
    let gain = 2.0f32.powf(level as f32 / 50.0);
    Ok(apply_pixel_transform(src, move |r, g, b| (r * gain, g * gain, b * gain)))
}

// ============================================================================
// INSTANT OPERATIONS
// ============================================================================

/// Unweighted average of R, G and B.
pub fn grayscale(src: &PixelBuffer) -> PixelBuffer {
    apply_pixel_transform(src, |r, g, b| {
        let avg = (r + g + b) / 3.0;
        (avg, avg, avg)
    })
}

pub fn sepia(src: &PixelBuffer) -> PixelBuffer {
    apply_pixel_transform(src, |r, g, b| {
        (
            0.393 * r + 0.769 * g + 0.189 * b,
            0.349 * r + 0.686 * g + 0.168 * b,
            0.272 * r + 0.534 * g + 0.131 * b,
        )
    })
}

pub fn invert(src: &PixelBuffer) -> PixelBuffer {
    apply_pixel_transform(src, |r, g, b| (255.0 - r, 255.0 - g, 255.0 - b))
}

// ============================================================================
// ADJUSTMENT REQUESTS - explicit values instead of ambient slider state
// ============================================================================

/// A single adjustment request as issued by the UI or CLI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Adjustment {
    Brightness(i32),
    Contrast(i32),
    Saturation(i32),
    Exposure(i32),
    Grayscale,
    Sepia,
    Invert,
}

impl Adjustment {
    pub fn apply(&self, src: &PixelBuffer) -> Result<PixelBuffer> {
        match *self {
            Adjustment::Brightness(level) => brightness(src, level),
            Adjustment::Contrast(level) => contrast(src, level),
            Adjustment::Saturation(level) => saturation(src, level),
            Adjustment::Exposure(level) => exposure(src, level),
            Adjustment::Grayscale => Ok(grayscale(src)),
            Adjustment::Sepia => Ok(sepia(src)),
            Adjustment::Invert => Ok(invert(src)),
        }
    }

    /// History label for this adjustment.
    pub fn label(&self) -> String {
        match self {
            Adjustment::Brightness(v) => format!("Brightness {v:+}"),
            Adjustment::Contrast(v) => format!("Contrast {v:+}"),
            Adjustment::Saturation(v) => format!("Saturation {v:+}"),
            Adjustment::Exposure(v) => format!("Exposure {v:+}"),
            Adjustment::Grayscale => "Apply grayscale Filter".to_string(),
            Adjustment::Sepia => "Apply sepia Filter".to_string(),
            Adjustment::Invert => "Invert Colors".to_string(),
        }
    }
}

/// Last applied value of each slider-driven adjustment.
///
/// Captured alongside every history snapshot so undo/redo can restore the
/// sliders together with the pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdjustmentState {
    pub brightness: i32,
    pub contrast: i32,
    pub saturation: i32,
    pub exposure: i32,
}

impl AdjustmentState {
    /// Remember the slider value carried by `adjustment`, if any.
    pub fn note(&mut self, adjustment: &Adjustment) {
        match *adjustment {
            Adjustment::Brightness(v) => self.brightness = v,
            Adjustment::Contrast(v) => self.contrast = v,
            Adjustment::Saturation(v) => self.saturation = v,
            Adjustment::Exposure(v) => self.exposure = v,
            Adjustment::Grayscale | Adjustment::Sepia | Adjustment::Invert => {}
        }
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }
}
