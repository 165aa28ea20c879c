use std::path::Path;

use uuid::Uuid;

use crate::canvas::{Document, Layer, LayerId};
use crate::components::history::{HistoryEntry, HistoryManager};
use crate::config::EditorSettings;
use crate::error::{EditError, Result};
use crate::io::{self, IoError};
use crate::ops::adjustments::{Adjustment, AdjustmentState};
use crate::ops::canvas_ops;
use crate::ops::filters::{Filter, Kernel};
use crate::ops::transform::{self, CropRect};
use crate::pixels::PixelBuffer;

/// Single open document plus its undo history.
///
/// Every public mutator either succeeds and records exactly one history
/// entry, or fails and leaves both the document and the history untouched.
pub struct Editor {
    pub id: Uuid,
    /// Display name ("Untitled" until an image is opened)
    pub name: String,
    pub is_dirty: bool,
    document: Document,
    history: HistoryManager,
    adjustments: AdjustmentState,
    settings: EditorSettings,
}

impl Editor {
    /// Blank document of the configured default size holding one
    /// transparent "Background" layer.
    pub fn new(settings: EditorSettings) -> Result<Self> {
        let mut document = Document::new(settings.default_width, settings.default_height)?;
        let background = PixelBuffer::new(document.width, document.height)?;
        let layer = document.new_layer("Background", background);
        document.push_layer(layer);

        let mut editor = Self {
            id: Uuid::new_v4(),
            name: "Untitled".to_string(),
            is_dirty: false,
            document,
            history: HistoryManager::new(settings.max_undo_steps),
            adjustments: AdjustmentState::default(),
            settings,
        };
        editor.history.record("Initial State", &editor.document, editor.adjustments);
        Ok(editor)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn adjustments(&self) -> AdjustmentState {
        self.adjustments
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    /// Tab / window title, with a trailing `*` while there are unsaved edits.
    pub fn display_title(&self) -> String {
        if self.is_dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }

    pub fn composite(&self) -> PixelBuffer {
        self.document.composite()
    }

    /// Encode the flattened document as PNG at `path`.
    pub fn export_png(&self, path: &Path) -> std::result::Result<(), IoError> {
        io::save_png(&self.composite(), path)
    }

    // ========================================================================
    // HISTORY PLUMBING
    // ========================================================================

    fn commit(&mut self, label: String) {
        tracing::info!(editor = %self.id, "{}", label);
        self.history.record(label, &self.document, self.adjustments);
        self.mark_dirty();
    }

    /// Run `mutate` against the live document and record `label` on success.
    fn perform<T>(
        &mut self,
        label: impl Into<String>,
        mutate: impl FnOnce(&mut Document) -> Result<T>,
    ) -> Result<T> {
        let out = mutate(&mut self.document)?;
        self.commit(label.into());
        Ok(out)
    }

    fn restore(&mut self, entry: HistoryEntry) {
        self.document = entry.snapshot;
        self.adjustments = entry.adjustments;
        self.mark_dirty();
    }

    /// Step back one action. Returns the label of the action undone.
    pub fn undo(&mut self) -> Result<String> {
        let undone = self.history.current().map(|e| e.label.clone()).unwrap_or_default();
        let entry = self.history.undo()?.clone();
        self.restore(entry);
        tracing::debug!("undo {}", undone);
        Ok(undone)
    }

    /// Re-apply the next action. Returns its label.
    pub fn redo(&mut self) -> Result<String> {
        let entry = self.history.redo()?.clone();
        let label = entry.label.clone();
        self.restore(entry);
        tracing::debug!("redo {}", label);
        Ok(label)
    }

    /// Jump straight to history entry `index` (e.g. a click in the history
    /// panel). Returns that entry's label.
    pub fn goto_history(&mut self, index: usize) -> Result<String> {
        let entry = self.history.goto(index)?.clone();
        let label = entry.label.clone();
        self.restore(entry);
        Ok(label)
    }

    // ========================================================================
    // IMPORT
    // ========================================================================

    /// Wrap decoded RGBA bytes in a layer named "Background" with the given
    /// id. Touches neither the document nor the history.
    pub fn build_layer_from_decoded_image(
        id: LayerId,
        width: u32,
        height: u32,
        rgba: Vec<u8>,
    ) -> Result<Layer> {
        let pixels = PixelBuffer::from_raw(width, height, rgba)?;
        Ok(Layer::new(id, "Background", pixels))
    }

    /// Replace the whole document with a decoded image.
    pub fn open_image(&mut self, name: &str, width: u32, height: u32, rgba: Vec<u8>) -> Result<()> {
        let pixels = PixelBuffer::from_raw(width, height, rgba)?;
        let mut document = Document::new(width, height)?;
        let layer = document.new_layer("Background", pixels);
        document.push_layer(layer);

        self.document = document;
        self.adjustments = AdjustmentState::default();
        self.name = name.to_string();
        self.commit("Open Image".to_string());
        Ok(())
    }

    /// Add a decoded image as a new layer on top of the stack.
    pub fn import_layer(&mut self, name: &str, width: u32, height: u32, rgba: Vec<u8>) -> Result<usize> {
        let id = self.document.next_layer_id();
        let mut layer = Self::build_layer_from_decoded_image(id, width, height, rgba)?;
        layer.name = name.to_string();
        self.perform("Import Layer", |doc| {
            doc.allocate_layer_id();
            Ok(doc.push_layer(layer))
        })
    }

    // ========================================================================
    // LAYER STACK
    // ========================================================================

    pub fn add_layer(&mut self, name: &str) -> Result<usize> {
        self.perform("Add Layer", |doc| canvas_ops::add_layer(doc, name))
    }

    pub fn delete_layer(&mut self, index: usize) -> Result<()> {
        let name = self.document.layer(index)?.name.clone();
        self.perform(format!("Delete Layer: {name}"), |doc| {
            canvas_ops::delete_layer(doc, index).map(drop)
        })
    }

    pub fn duplicate_layer(&mut self, index: usize) -> Result<usize> {
        let name = self.document.layer(index)?.name.clone();
        self.perform(format!("Duplicate: {name}"), |doc| canvas_ops::duplicate_layer(doc, index))
    }

    pub fn move_layer(&mut self, from: usize, to: usize) -> Result<()> {
        self.document.layer(from)?;
        self.document.layer(to)?;
        if from == to {
            return Err(EditError::NoOp);
        }
        self.perform(format!("Move Layer {} → {}", from + 1, to + 1), |doc| doc.move_layer(from, to))
    }

    pub fn rename_layer(&mut self, index: usize, name: &str) -> Result<()> {
        let old = self.document.layer(index)?.name.clone();
        self.perform(format!("Rename: {old} → {name}"), |doc| {
            doc.layer_mut(index)?.name = name.to_string();
            Ok(())
        })
    }

    /// Selection only; not an undoable action.
    pub fn set_active_layer(&mut self, index: usize) -> Result<()> {
        self.document.set_active_layer(index)
    }

    pub fn set_layer_visibility(&mut self, index: usize, visible: bool) -> Result<()> {
        self.document.layer(index)?;
        let label = if visible { "Show Layer" } else { "Hide Layer" };
        self.perform(label, |doc| {
            doc.layer_mut(index)?.visible = visible;
            Ok(())
        })
    }

    pub fn toggle_layer_visibility(&mut self, index: usize) -> Result<()> {
        let visible = self.document.layer(index)?.visible;
        self.set_layer_visibility(index, !visible)
    }

    pub fn set_layer_opacity(&mut self, index: usize, opacity: f32) -> Result<()> {
        self.document.layer(index)?;
        let label = format!("Layer {} Opacity: {:.0}%", index + 1, opacity * 100.0);
        self.perform(label, |doc| canvas_ops::set_layer_opacity(doc, index, opacity))
    }

    pub fn set_layer_position(&mut self, index: usize, x: i32, y: i32) -> Result<()> {
        self.document.layer(index)?;
        self.perform("Move Layer Position", |doc| {
            let layer = doc.layer_mut(index)?;
            layer.x = x;
            layer.y = y;
            Ok(())
        })
    }

    pub fn replace_layer_image(&mut self, index: usize, pixels: PixelBuffer) -> Result<()> {
        self.perform("Replace Layer Image", |doc| canvas_ops::replace_layer_image(doc, index, pixels))
    }

    // ========================================================================
    // PIXEL OPS (active layer)
    // ========================================================================

    pub fn apply_adjustment(&mut self, adjustment: Adjustment) -> Result<()> {
        canvas_ops::apply_to_active(&mut self.document, |src| adjustment.apply(src))?;
        self.adjustments.note(&adjustment);
        self.commit(adjustment.label());
        Ok(())
    }

    pub fn apply_filter(&mut self, filter: &Filter) -> Result<()> {
        self.perform(filter.label(), |doc| {
            canvas_ops::apply_to_active(doc, |src| Ok(filter.apply(src)))
        })
    }

    /// Convolve the active layer with an arbitrary odd-square kernel.
    pub fn convolve(&mut self, weights: &[f32], opaque: bool) -> Result<()> {
        let kernel = Kernel::new(weights.to_vec())?;
        self.apply_filter(&Filter::Convolve { kernel, opaque })
    }

    // ========================================================================
    // GEOMETRY
    // ========================================================================

    /// Crop the canvas to `rect`. Layers keep their pixels and shift with
    /// the new origin.
    pub fn crop(&mut self, rect: CropRect) -> Result<()> {
        self.perform("Crop Image", |doc| canvas_ops::crop_canvas(doc, rect))
    }

    /// Destructively crop the active layer's pixels.
    pub fn crop_layer(&mut self, rect: CropRect) -> Result<()> {
        self.perform("Crop Layer", |doc| canvas_ops::crop_active_layer(doc, rect))
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let interp = self.settings.resize_interpolation;
        self.perform("Resize Image", |doc| canvas_ops::resize_canvas(doc, width, height, interp))
    }

    /// Rotate the whole document clockwise by `degrees`.
    /// A whole number of full turns changes nothing and reports `NoOp`.
    pub fn rotate(&mut self, degrees: f64) -> Result<()> {
        if degrees.is_finite() && transform::is_full_turn(degrees) {
            return Err(EditError::NoOp);
        }
        self.perform(format!("Rotate Image {degrees}°"), |doc| canvas_ops::rotate_canvas(doc, degrees))
    }

    pub fn flip_horizontal(&mut self) -> Result<()> {
        self.perform("Flip Horizontal", canvas_ops::flip_canvas_horizontal)
    }

    pub fn flip_vertical(&mut self) -> Result<()> {
        self.perform("Flip Vertical", canvas_ops::flip_canvas_vertical)
    }
}
