// ============================================================================
// CANVAS-LEVEL OPERATIONS - layer stack edits and whole-document transforms
// ============================================================================
//
// Every function validates its request before touching the document, so a
// returned error always means the document is unchanged. None of them record
// history; the editor does that once per successful call.
// ============================================================================

use rayon::prelude::*;

use crate::canvas::{Document, Layer};
use crate::error::{EditError, Result};
use crate::ops::transform::{self, CropRect, Interpolation};
use crate::pixels::PixelBuffer;

/// Narrow a computed layer offset back to `i32`, rejecting what does not fit.
fn layer_offset(value: i64) -> Result<i32> {
    i32::try_from(value).map_err(|_| EditError::InvalidParameter {
        name: "layer position",
        value: value as f64,
    })
}

/// Same as [`layer_offset`] for a scaled or rotated position.
fn rounded_offset(value: f64) -> Result<i32> {
    let rounded = value.round();
    if rounded.is_finite() && rounded >= i32::MIN as f64 && rounded <= i32::MAX as f64 {
        Ok(rounded as i32)
    } else {
        Err(EditError::InvalidParameter { name: "layer position", value })
    }
}

// ---------------------------------------------------------------------------
//  Layer stack
// ---------------------------------------------------------------------------

/// Add a new transparent, canvas-sized layer above the active layer.
/// Returns the index it was inserted at.
pub fn add_layer(doc: &mut Document, name: &str) -> Result<usize> {
    let pixels = PixelBuffer::new(doc.width, doc.height)?;
    let idx = doc.active_layer_index().map_or(doc.layer_count(), |i| i + 1);
    let layer = doc.new_layer(name, pixels);
    Ok(doc.insert_layer(idx, layer))
}

/// Remove the layer at `index`. The last layer may be deleted too, leaving
/// the document without an active layer.
pub fn delete_layer(doc: &mut Document, index: usize) -> Result<Layer> {
    doc.remove_layer(index)
}

/// Duplicate the layer at `index` directly above it.
pub fn duplicate_layer(doc: &mut Document, index: usize) -> Result<usize> {
    let src = doc.layer(index)?.clone();
    let mut dup = doc.new_layer(format!("{} Copy", src.name), src.pixels);
    dup.x = src.x;
    dup.y = src.y;
    dup.width = src.width;
    dup.height = src.height;
    dup.opacity = src.opacity;
    dup.visible = src.visible;
    Ok(doc.insert_layer(index + 1, dup))
}

pub fn set_layer_opacity(doc: &mut Document, index: usize, opacity: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&opacity) {
        return Err(EditError::InvalidParameter { name: "opacity", value: opacity as f64 });
    }
    doc.layer_mut(index)?.opacity = opacity;
    Ok(())
}

/// Swap the layer's pixels for `pixels`; the display size follows.
pub fn replace_layer_image(doc: &mut Document, index: usize, pixels: PixelBuffer) -> Result<()> {
    doc.layer_mut(index)?.set_pixels(pixels);
    Ok(())
}

/// Replace the active layer's pixels with `op(pixels)`.
///
/// The layer keeps its display size unless `op` changed the buffer size.
pub fn apply_to_active<F>(doc: &mut Document, op: F) -> Result<()>
where
    F: FnOnce(&PixelBuffer) -> Result<PixelBuffer>,
{
    let layer = doc.active_layer_mut()?;
    let result = op(&layer.pixels)?;
    if result.dimensions() == layer.pixels.dimensions() {
        layer.pixels = result;
    } else {
        layer.set_pixels(result);
    }
    Ok(())
}

/// Destructively crop the active layer. `rect` is in layer-local display
/// pixels; the layer keeps its on-canvas placement.
pub fn crop_active_layer(doc: &mut Document, rect: CropRect) -> Result<()> {
    let layer = doc.active_layer_mut()?;
    let cropped = transform::crop(&layer.display_pixels(), rect)?;
    let x = layer_offset(layer.x as i64 + rect.x)?;
    let y = layer_offset(layer.y as i64 + rect.y)?;
    (layer.x, layer.y) = (x, y);
    layer.set_pixels(cropped);
    Ok(())
}

// ---------------------------------------------------------------------------
//  Whole-canvas transforms (affect ALL layers)
// ---------------------------------------------------------------------------

/// Shrink the canvas to `rect`. Layer pixels are kept; every layer shifts by
/// `(-rect.x, -rect.y)` and whatever falls outside is clipped on composite.
pub fn crop_canvas(doc: &mut Document, rect: CropRect) -> Result<()> {
    rect.check_within(doc.width, doc.height)?;
    let shifted = doc
        .layers()
        .iter()
        .map(|l| -> Result<(i32, i32)> {
            Ok((layer_offset(l.x as i64 - rect.x)?, layer_offset(l.y as i64 - rect.y)?))
        })
        .collect::<Result<Vec<_>>>()?;
    for (layer, (x, y)) in doc.layers_mut().iter_mut().zip(shifted) {
        (layer.x, layer.y) = (x, y);
    }
    doc.width = rect.width;
    doc.height = rect.height;
    Ok(())
}

/// Resize the entire image (all layers) to new dimensions with given interpolation.
pub fn resize_canvas(
    doc: &mut Document,
    new_w: u32,
    new_h: u32,
    interp: Interpolation,
) -> Result<()> {
    crate::pixels::check_dimensions(new_w, new_h)?;
    let sx = new_w as f64 / doc.width as f64;
    let sy = new_h as f64 / doc.height as f64;

    let resized: Vec<(i32, i32, PixelBuffer)> = doc
        .layers()
        .par_iter()
        .map(|layer| -> Result<(i32, i32, PixelBuffer)> {
            let x = rounded_offset(layer.x as f64 * sx)?;
            let y = rounded_offset(layer.y as f64 * sy)?;
            let lw = ((layer.width as f64 * sx).round() as u32).max(1);
            let lh = ((layer.height as f64 * sy).round() as u32).max(1);
            Ok((x, y, transform::resize(&layer.pixels, lw, lh, interp)?))
        })
        .collect::<Result<_>>()?;

    for (layer, (x, y, pixels)) in doc.layers_mut().iter_mut().zip(resized) {
        (layer.x, layer.y) = (x, y);
        layer.set_pixels(pixels);
    }
    doc.width = new_w;
    doc.height = new_h;
    Ok(())
}

/// Rotate the whole document clockwise about the canvas centre.
///
/// Each layer is rotated about its own centre and re-placed so that centre
/// lands where the canvas rotation carries it. The canvas takes the rotated
/// bounding box.
pub fn rotate_canvas(doc: &mut Document, degrees: f64) -> Result<()> {
    if !degrees.is_finite() {
        return Err(EditError::InvalidParameter { name: "rotation", value: degrees });
    }
    let (new_w, new_h) = transform::rotated_dimensions(doc.width, doc.height, degrees);
    crate::pixels::check_dimensions(new_w, new_h)?;
    let (sin, cos) = transform::rotation_sin_cos(degrees);

    let rotated: Vec<PixelBuffer> = doc
        .layers()
        .par_iter()
        .map(|layer| transform::rotate(&layer.display_pixels(), degrees))
        .collect::<Result<_>>()?;

    let (cx, cy) = (doc.width as f64 * 0.5, doc.height as f64 * 0.5);
    let (ncx, ncy) = (new_w as f64 * 0.5, new_h as f64 * 0.5);
    let placed = doc
        .layers()
        .iter()
        .zip(&rotated)
        .map(|(layer, pixels)| -> Result<(i32, i32)> {
            let dx = layer.x as f64 + layer.width as f64 * 0.5 - cx;
            let dy = layer.y as f64 + layer.height as f64 * 0.5 - cy;
            let rx = cos * dx - sin * dy;
            let ry = sin * dx + cos * dy;
            Ok((
                rounded_offset(ncx + rx - pixels.width() as f64 * 0.5)?,
                rounded_offset(ncy + ry - pixels.height() as f64 * 0.5)?,
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    for ((layer, pixels), (x, y)) in doc.layers_mut().iter_mut().zip(rotated).zip(placed) {
        (layer.x, layer.y) = (x, y);
        layer.set_pixels(pixels);
    }
    doc.width = new_w;
    doc.height = new_h;
    Ok(())
}

/// Flip the entire canvas horizontally (mirror left↔right).
///
/// Fails without touching any layer if a mirrored offset leaves `i32`.
pub fn flip_canvas_horizontal(doc: &mut Document) -> Result<()> {
    let canvas_w = doc.width as i64;
    let mirrored = doc
        .layers()
        .iter()
        .map(|l| layer_offset(canvas_w - l.x as i64 - l.width as i64))
        .collect::<Result<Vec<_>>>()?;
    doc.layers_mut().par_iter_mut().zip(mirrored).for_each(|(layer, x)| {
        layer.pixels = transform::flip_horizontal(&layer.pixels);
        layer.x = x;
    });
    Ok(())
}

/// Flip the entire canvas vertically (mirror top↔bottom).
pub fn flip_canvas_vertical(doc: &mut Document) -> Result<()> {
    let canvas_h = doc.height as i64;
    let mirrored = doc
        .layers()
        .iter()
        .map(|l| layer_offset(canvas_h - l.y as i64 - l.height as i64))
        .collect::<Result<Vec<_>>>()?;
    doc.layers_mut().par_iter_mut().zip(mirrored).for_each(|(layer, y)| {
        layer.pixels = transform::flip_vertical(&layer.pixels);
        layer.y = y;
    });
    Ok(())
}
