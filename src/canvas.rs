use std::borrow::Cow;

use image::Rgba;
use rayon::prelude::*;

use crate::error::{EditError, Result};
use crate::ops::transform::{self, Interpolation};
use crate::pixels::{PixelBuffer, check_dimensions};

// ============================================================================
// LAYERS
// ============================================================================

/// Identifier unique within one document. Never reused after deletion.
pub type LayerId = u64;

#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub pixels: PixelBuffer,
    /// Top-left placement on the document canvas. May be negative or past
    /// the canvas edge; the compositor clips.
    pub x: i32,
    pub y: i32,
    /// Display size. Equal to the buffer size unless the layer was scaled
    /// without resampling its pixels.
    pub width: u32,
    pub height: u32,
    pub opacity: f32,
    pub visible: bool,
}

impl Layer {
    pub fn new(id: LayerId, name: impl Into<String>, pixels: PixelBuffer) -> Self {
        let (width, height) = pixels.dimensions();
        Self {
            id,
            name: name.into(),
            pixels,
            x: 0,
            y: 0,
            width,
            height,
            opacity: 1.0,
            visible: true,
        }
    }

    /// Replace the pixels and adopt their native size as the display size.
    pub fn set_pixels(&mut self, pixels: PixelBuffer) {
        (self.width, self.height) = pixels.dimensions();
        self.pixels = pixels;
    }

    pub fn is_scaled(&self) -> bool {
        self.pixels.dimensions() != (self.width, self.height)
    }

    /// The pixels at display size, resampled (bilinear) only when scaled.
    pub fn display_pixels(&self) -> Cow<'_, PixelBuffer> {
        if !self.is_scaled() {
            return Cow::Borrowed(&self.pixels);
        }
        match transform::resize(&self.pixels, self.width, self.height, Interpolation::Bilinear) {
            Ok(scaled) => Cow::Owned(scaled),
            Err(e) => {
                tracing::warn!("layer '{}' drawn at native size: {}", self.name, e);
                Cow::Borrowed(&self.pixels)
            }
        }
    }
}

// ============================================================================
// DOCUMENT
// ============================================================================

/// The editable document: canvas size plus an ordered layer stack.
///
/// `layers[0]` is painted first (bottom). `active_layer_index` is `Some`
/// with a valid index whenever the stack is non-empty, `None` otherwise.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub width: u32,
    pub height: u32,
    layers: Vec<Layer>,
    active_layer_index: Option<usize>,
    next_layer_id: LayerId,
}

impl Document {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            layers: Vec::new(),
            active_layer_index: None,
            next_layer_id: 1,
        })
    }

    // ---- layer access -------------------------------------------------------

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn active_layer_index(&self) -> Option<usize> {
        self.active_layer_index
    }

    pub fn active_layer(&self) -> Result<&Layer> {
        self.active_layer_index
            .and_then(|i| self.layers.get(i))
            .ok_or(EditError::NoActiveLayer)
    }

    pub fn active_layer_mut(&mut self) -> Result<&mut Layer> {
        self.active_layer_index
            .and_then(|i| self.layers.get_mut(i))
            .ok_or(EditError::NoActiveLayer)
    }

    pub fn layer(&self, index: usize) -> Result<&Layer> {
        let len = self.layers.len();
        self.layers.get(index).ok_or(EditError::LayerIndex { index, len })
    }

    pub fn layer_mut(&mut self, index: usize) -> Result<&mut Layer> {
        let len = self.layers.len();
        self.layers.get_mut(index).ok_or(EditError::LayerIndex { index, len })
    }

    pub fn set_active_layer(&mut self, index: usize) -> Result<()> {
        self.layer(index)?;
        self.active_layer_index = Some(index);
        Ok(())
    }

    // ---- layer stack edits --------------------------------------------------

    /// The id the next [`Document::allocate_layer_id`] call will return.
    pub fn next_layer_id(&self) -> LayerId {
        self.next_layer_id
    }

    /// Hand out the next unused layer id.
    pub fn allocate_layer_id(&mut self) -> LayerId {
        let id = self.next_layer_id;
        self.next_layer_id += 1;
        id
    }

    /// Build a layer owning `pixels` with a fresh id (not yet inserted).
    pub fn new_layer(&mut self, name: impl Into<String>, pixels: PixelBuffer) -> Layer {
        let id = self.allocate_layer_id();
        Layer::new(id, name, pixels)
    }

    /// Insert `layer` at `index` (clamped to the stack length) and make it active.
    pub fn insert_layer(&mut self, index: usize, layer: Layer) -> usize {
        let index = index.min(self.layers.len());
        self.layers.insert(index, layer);
        self.active_layer_index = Some(index);
        index
    }

    /// Append on top of the stack and make it active.
    pub fn push_layer(&mut self, layer: Layer) -> usize {
        self.insert_layer(self.layers.len(), layer)
    }

    pub fn remove_layer(&mut self, index: usize) -> Result<Layer> {
        self.layer(index)?;
        let removed = self.layers.remove(index);
        self.active_layer_index = match self.active_layer_index {
            _ if self.layers.is_empty() => None,
            Some(active) if active > index => Some(active - 1),
            Some(active) => Some(active.min(self.layers.len() - 1)),
            None => Some(0),
        };
        Ok(removed)
    }

    /// Move a layer in the paint order. The active selection follows the
    /// layer it pointed at.
    pub fn move_layer(&mut self, from: usize, to: usize) -> Result<()> {
        self.layer(from)?;
        self.layer(to)?;
        let active_id = self.active_layer().ok().map(|l| l.id);
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        if let Some(id) = active_id {
            self.active_layer_index = self.layers.iter().position(|l| l.id == id);
        }
        Ok(())
    }

    /// Approximate heap footprint of all layer pixels.
    pub fn memory_bytes(&self) -> usize {
        self.layers.iter().map(|l| l.pixels.memory_bytes() + l.name.len()).sum()
    }

    // ---- compositing --------------------------------------------------------

    /// Flatten all visible layers into a new canvas-sized buffer.
    ///
    /// The background is fully transparent. Layers are painted back to front
    /// with straight-alpha source-over, scaled by layer opacity; only the
    /// region each layer overlaps is touched. Layers are not modified.
    pub fn composite(&self) -> PixelBuffer {
        let canvas_w = self.width as i64;
        let stride = self.width as usize * 4;
        let mut result = vec![0u8; stride * self.height as usize];

        let visible: Vec<(&Layer, Cow<'_, PixelBuffer>)> = self
            .layers
            .iter()
            .filter(|l| l.visible && l.opacity > 0.0)
            .map(|l| (l, l.display_pixels()))
            .collect();

        result.par_chunks_mut(stride).enumerate().for_each(|(y, row)| {
            let y = y as i64;
            for (layer, pixels) in &visible {
                let ly = y - layer.y as i64;
                if ly < 0 || ly >= pixels.height() as i64 {
                    continue;
                }
                let lw = pixels.width() as i64;
                let x_start = (layer.x as i64).max(0);
                let x_end = (layer.x as i64 + lw).min(canvas_w);
                if x_start >= x_end {
                    continue;
                }
                let src_row = &pixels.as_raw()[ly as usize * pixels.stride()..][..pixels.stride()];
                for x in x_start..x_end {
                    let lx = (x - layer.x as i64) as usize * 4;
                    let di = x as usize * 4;
                    let top = Rgba([src_row[lx], src_row[lx + 1], src_row[lx + 2], src_row[lx + 3]]);
                    let base = Rgba([row[di], row[di + 1], row[di + 2], row[di + 3]]);
                    let out = blend_over(base, top, layer.opacity);
                    row[di..di + 4].copy_from_slice(&out.0);
                }
            }
        });

        PixelBuffer::from_parts(self.width, self.height, result)
    }
}

/// Straight-alpha "over": `a = a_t*o + a_b*(1 - a_t*o)`, colours weighted by
/// their effective alpha. Equivalent to premultiplied `src*o + dst*(1 - a_t*o)`.
pub fn blend_over(base: Rgba<u8>, top: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    // Fast path: fully transparent top pixel - nothing to blend
    if top[3] == 0 || opacity <= 0.0 {
        return base;
    }
    // Fast path: full opacity, fully opaque top pixel - just overwrite
    if opacity >= 1.0 && top[3] == 255 {
        return top;
    }

    let opacity = opacity.clamp(0.0, 1.0);
    let top_a = (top[3] as f32 / 255.0) * opacity;
    let base_a = base[3] as f32 / 255.0;

    let out_a = top_a + base_a * (1.0 - top_a);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let mix = |t: u8, b: u8| -> u8 {
        let v = (t as f32 * top_a + b as f32 * base_a * (1.0 - top_a)) / out_a;
        v.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        mix(top[0], base[0]),
        mix(top[1], base[1]),
        mix(top[2], base[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}
