// ============================================================================
// TRANSFORM OPERATIONS - crop, resize, rotate, flip on a single buffer
// ============================================================================

use image::imageops;
use rayon::prelude::*;

use crate::error::{EditError, Result};
use crate::pixels::{PixelBuffer, check_dimensions, clamp_channel};

/// Interpolation method for resize operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
}

impl Interpolation {
    pub fn label(&self) -> &'static str {
        match self {
            Interpolation::Nearest => "nearest",
            Interpolation::Bilinear => "bilinear",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "nearest" => Some(Interpolation::Nearest),
            "bilinear" | "linear" | "triangle" => Some(Interpolation::Bilinear),
            _ => None,
        }
    }

    pub fn to_filter(&self) -> imageops::FilterType {
        match self {
            Interpolation::Nearest => imageops::FilterType::Nearest,
            Interpolation::Bilinear => imageops::FilterType::Triangle,
        }
    }
}

/// A crop rectangle in buffer / canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Normalise a drag from `start` to `end` (either direction) into a rect.
    pub fn from_corners(start: (i64, i64), end: (i64, i64)) -> Self {
        let x = start.0.min(end.0);
        let y = start.1.min(end.1);
        let width = start.0.abs_diff(end.0).min(u32::MAX as u64) as u32;
        let height = start.1.abs_diff(end.1).min(u32::MAX as u64) as u32;
        Self { x, y, width, height }
    }

    /// Fails with `OutOfBounds` unless the rect lies inside `bound_w × bound_h`.
    pub fn check_within(&self, bound_w: u32, bound_h: u32) -> Result<()> {
        check_dimensions(self.width, self.height)?;
        let fits = self.x >= 0
            && self.y >= 0
            && self.x + self.width as i64 <= bound_w as i64
            && self.y + self.height as i64 <= bound_h as i64;
        if fits {
            Ok(())
        } else {
            Err(EditError::OutOfBounds {
                x: self.x,
                y: self.y,
                w: self.width,
                h: self.height,
                bound_w,
                bound_h,
            })
        }
    }
}

// ---------------------------------------------------------------------------
//  Crop / resize
// ---------------------------------------------------------------------------

/// Copy the sub-rectangle `rect` into a new buffer.
pub fn crop(src: &PixelBuffer, rect: CropRect) -> Result<PixelBuffer> {
    rect.check_within(src.width(), src.height())?;

    let stride = src.stride();
    let row_bytes = rect.width as usize * 4;
    let x_off = rect.x as usize * 4;
    let src_raw = src.as_raw();

    let mut data = Vec::with_capacity(row_bytes * rect.height as usize);
    for y in rect.y as usize..rect.y as usize + rect.height as usize {
        let start = y * stride + x_off;
        data.extend_from_slice(&src_raw[start..start + row_bytes]);
    }
    Ok(PixelBuffer::from_parts(rect.width, rect.height, data))
}

/// Resample into `new_w × new_h`.
///
/// `Bilinear` uses the image crate's triangle filter, `Nearest` picks the
/// closest source pixel; both are deterministic.
pub fn resize(
    src: &PixelBuffer,
    new_w: u32,
    new_h: u32,
    interp: Interpolation,
) -> Result<PixelBuffer> {
    check_dimensions(new_w, new_h)?;
    if src.dimensions() == (new_w, new_h) {
        return Ok(src.clone());
    }
    let resized = imageops::resize(&src.to_rgba_image(), new_w, new_h, interp.to_filter());
    Ok(PixelBuffer::from_parts(new_w, new_h, resized.into_raw()))
}

// ---------------------------------------------------------------------------
//  Flip / rotate
// ---------------------------------------------------------------------------

/// Mirror left↔right.
pub fn flip_horizontal(src: &PixelBuffer) -> PixelBuffer {
    let flipped = imageops::flip_horizontal(&src.to_rgba_image());
    src.with_data(flipped.into_raw())
}

/// Mirror top↔bottom.
pub fn flip_vertical(src: &PixelBuffer) -> PixelBuffer {
    let flipped = imageops::flip_vertical(&src.to_rgba_image());
    src.with_data(flipped.into_raw())
}

/// Quarter turns (clockwise) if `degrees` is a multiple of 90°.
fn quarter_turns(degrees: f64) -> Option<u32> {
    let quarters = degrees.rem_euclid(360.0) / 90.0;
    let nearest = quarters.round();
    if (quarters - nearest).abs() < 1e-9 {
        Some(nearest as u32 % 4)
    } else {
        None
    }
}

/// `(sin, cos)` of a clockwise rotation, exact for quarter turns.
pub fn rotation_sin_cos(degrees: f64) -> (f64, f64) {
    match quarter_turns(degrees) {
        Some(0) => (0.0, 1.0),
        Some(1) => (1.0, 0.0),
        Some(2) => (0.0, -1.0),
        Some(_) => (-1.0, 0.0),
        None => degrees.to_radians().sin_cos(),
    }
}

/// Whether rotating by `degrees` leaves a buffer unchanged.
pub fn is_full_turn(degrees: f64) -> bool {
    quarter_turns(degrees) == Some(0)
}

/// Output size of a rotation by `degrees` (clockwise) about the centre.
pub fn rotated_dimensions(width: u32, height: u32, degrees: f64) -> (u32, u32) {
    match quarter_turns(degrees) {
        Some(1) | Some(3) => (height, width),
        Some(_) => (width, height),
        None => {
            let (sin, cos) = degrees.to_radians().sin_cos();
            let (s, c) = (sin.abs(), cos.abs());
            let (w, h) = (width as f64, height as f64);
            // Shave float fuzz so an exact integer extent is not bumped up by ceil.
            let new_w = (h * s + w * c - 1e-9).ceil().max(1.0) as u32;
            let new_h = (h * c + w * s - 1e-9).ceil().max(1.0) as u32;
            (new_w, new_h)
        }
    }
}

/// Rotate clockwise by `degrees` about the buffer centre.
///
/// Multiples of 90° are exact pixel permutations. Any other angle grows the
/// canvas to the rotated bounding box and resamples bilinearly; destination
/// pixels that map outside the source are fully transparent.
pub fn rotate(src: &PixelBuffer, degrees: f64) -> Result<PixelBuffer> {
    if !degrees.is_finite() {
        return Err(EditError::InvalidParameter { name: "rotation", value: degrees });
    }

    let turned = match quarter_turns(degrees) {
        Some(0) => return Ok(src.clone()),
        Some(1) => imageops::rotate90(&src.to_rgba_image()),
        Some(2) => imageops::rotate180(&src.to_rgba_image()),
        Some(_) => imageops::rotate270(&src.to_rgba_image()),
        None => return rotate_arbitrary(src, degrees),
    };
    let (w, h) = turned.dimensions();
    Ok(PixelBuffer::from_parts(w, h, turned.into_raw()))
}

fn rotate_arbitrary(src: &PixelBuffer, degrees: f64) -> Result<PixelBuffer> {
    let (src_w, src_h) = src.dimensions();
    let (dst_w, dst_h) = rotated_dimensions(src_w, src_h, degrees);
    check_dimensions(dst_w, dst_h)?;
    let (sin, cos) = degrees.to_radians().sin_cos();

    let src_cx = src_w as f64 * 0.5;
    let src_cy = src_h as f64 * 0.5;
    let dst_cx = dst_w as f64 * 0.5;
    let dst_cy = dst_h as f64 * 0.5;

    let row_bytes = dst_w as usize * 4;
    let mut dst_raw = vec![0u8; row_bytes * dst_h as usize];

    dst_raw.par_chunks_mut(row_bytes).enumerate().for_each(|(dy, row)| {
        let v = dy as f64 + 0.5 - dst_cy;
        for dx in 0..dst_w as usize {
            let u = dx as f64 + 0.5 - dst_cx;
            // Inverse rotation back into source space (pixel-centre aligned).
            let sx = cos * u + sin * v + src_cx - 0.5;
            let sy = -sin * u + cos * v + src_cy - 0.5;
            let px = sample_bilinear(src, sx, sy);
            row[dx * 4..dx * 4 + 4].copy_from_slice(&px);
        }
    });

    Ok(PixelBuffer::from_parts(dst_w, dst_h, dst_raw))
}

/// Premultiplied bilinear sample; neighbours outside the buffer count as
/// transparent so edges fade instead of darkening.
fn sample_bilinear(src: &PixelBuffer, x: f64, y: f64) -> [u8; 4] {
    let w = src.width() as i64;
    let h = src.height() as i64;
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    if x0 < -1 || y0 < -1 || x0 >= w || y0 >= h {
        return [0, 0, 0, 0];
    }
    let fx = (x - x0 as f64) as f32;
    let fy = (y - y0 as f64) as f32;

    let raw = src.as_raw();
    let stride = src.stride();
    let mut acc = [0.0f32; 4];
    for (ox, oy, weight) in [
        (0, 0, (1.0 - fx) * (1.0 - fy)),
        (1, 0, fx * (1.0 - fy)),
        (0, 1, (1.0 - fx) * fy),
        (1, 1, fx * fy),
    ] {
        let (sx, sy) = (x0 + ox, y0 + oy);
        if weight == 0.0 || sx < 0 || sy < 0 || sx >= w || sy >= h {
            continue;
        }
        let i = sy as usize * stride + sx as usize * 4;
        let a = raw[i + 3] as f32 * weight;
        acc[0] += raw[i] as f32 * a;
        acc[1] += raw[i + 1] as f32 * a;
        acc[2] += raw[i + 2] as f32 * a;
        acc[3] += a;
    }

    if acc[3] <= 0.0 {
        return [0, 0, 0, 0];
    }
    [
        clamp_channel(acc[0] / acc[3]),
        clamp_channel(acc[1] / acc[3]),
        clamp_channel(acc[2] / acc[3]),
        clamp_channel(acc[3]),
    ]
}
