use crate::canvas::Document;
use crate::error::{EditError, Result};
use crate::ops::adjustments::AdjustmentState;

// ============================================================================
// HISTORY ENTRY - one full-document snapshot per user-visible action
// ============================================================================

/// A labelled deep copy of the document taken right after an action.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub label: String,
    pub snapshot: Document,
    pub adjustments: AdjustmentState,
}

impl HistoryEntry {
    pub fn memory_size(&self) -> usize {
        self.snapshot.memory_bytes() + self.label.len()
    }
}

// ============================================================================
// HISTORY MANAGER - linear undo/redo over snapshots
// ============================================================================

/// Linear undo/redo history.
///
/// `cursor` points at the entry matching the state currently shown.
/// Recording while the cursor is not at the end discards every later entry:
/// there is no branching, only truncation.
pub struct HistoryManager {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    max_history_size: usize,
    /// Running memory total across all entries.
    total_memory: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(50)
    }
}

impl HistoryManager {
    /// `max_history_size` caps the number of entries kept; the oldest are
    /// dropped first. Values below 1 are treated as 1.
    pub fn new(max_history_size: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            max_history_size: max_history_size.max(1),
            total_memory: 0,
        }
    }

    /// Capture `document` and `adjustments` under `label` and make it current.
    pub fn record(
        &mut self,
        label: impl Into<String>,
        document: &Document,
        adjustments: AdjustmentState,
    ) {
        // Remove any future history if we're not at the end
        if !self.entries.is_empty() && self.cursor + 1 < self.entries.len() {
            for dropped in self.entries.drain(self.cursor + 1..) {
                self.total_memory = self.total_memory.saturating_sub(dropped.memory_size());
            }
        }

        let entry = HistoryEntry {
            label: label.into(),
            snapshot: document.clone(),
            adjustments,
        };
        self.total_memory += entry.memory_size();
        self.entries.push(entry);
        self.cursor = self.entries.len() - 1;

        self.prune();
    }

    /// Jump to `index` and return the entry to restore.
    pub fn goto(&mut self, index: usize) -> Result<&HistoryEntry> {
        if index >= self.entries.len() {
            return Err(EditError::OutOfRange { index, len: self.entries.len() });
        }
        self.cursor = index;
        Ok(&self.entries[index])
    }

    /// Step back one entry. `NoOp` at the oldest entry (or when empty).
    pub fn undo(&mut self) -> Result<&HistoryEntry> {
        if !self.can_undo() {
            return Err(EditError::NoOp);
        }
        self.goto(self.cursor - 1)
    }

    /// Step forward one entry. `NoOp` at the newest entry (or when empty).
    pub fn redo(&mut self) -> Result<&HistoryEntry> {
        if !self.can_redo() {
            return Err(EditError::NoOp);
        }
        self.goto(self.cursor + 1)
    }

    pub fn can_undo(&self) -> bool {
        !self.entries.is_empty() && self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Index of the current entry, `None` while empty.
    pub fn cursor(&self) -> Option<usize> {
        (!self.entries.is_empty()).then_some(self.cursor)
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.cursor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All labels, oldest first.
    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.can_undo().then(|| self.entries[self.cursor].label.as_str())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.can_redo().then(|| self.entries[self.cursor + 1].label.as_str())
    }

    /// Get the current memory usage of the history (O(1) via cached total)
    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    pub fn max_history_size(&self) -> usize {
        self.max_history_size
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
        self.total_memory = 0;
    }

    /// Drop the oldest entries beyond the size cap, keeping the cursor on the
    /// same logical entry.
    fn prune(&mut self) {
        if self.entries.len() <= self.max_history_size {
            return;
        }
        let excess = self.entries.len() - self.max_history_size;
        for dropped in self.entries.drain(..excess) {
            self.total_memory = self.total_memory.saturating_sub(dropped.memory_size());
        }
        self.cursor = self.cursor.saturating_sub(excess);
        tracing::debug!(dropped = excess, "history pruned to {} entries", self.max_history_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixels::PixelBuffer;
    use image::Rgba;

    fn doc(shade: u8) -> Document {
        let mut doc = Document::new(2, 2).unwrap();
        let layer = doc.new_layer("L", PixelBuffer::new_filled(2, 2, Rgba([shade, shade, shade, 255])).unwrap());
        doc.push_layer(layer);
        doc
    }

    fn record(history: &mut HistoryManager, label: &str) {
        history.record(label, &doc(label.as_bytes()[0]), AdjustmentState::default());
    }

    #[test]
    fn test_record_after_undo_truncates_redo_branch() {
        let mut history = HistoryManager::default();
        record(&mut history, "A");
        record(&mut history, "B");
        record(&mut history, "C");
        history.undo().unwrap();
        record(&mut history, "D");
        assert_eq!(history.labels(), vec!["A", "B", "D"]);
        assert_eq!(history.cursor(), Some(2));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_undo_at_start_is_noop() {
        let mut history = HistoryManager::default();
        assert_eq!(history.undo().unwrap_err(), EditError::NoOp);
        record(&mut history, "A");
        assert_eq!(history.undo().unwrap_err(), EditError::NoOp);
        assert_eq!(history.cursor(), Some(0));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_redo_at_end_is_noop() {
        let mut history = HistoryManager::default();
        record(&mut history, "A");
        record(&mut history, "B");
        assert_eq!(history.redo().unwrap_err(), EditError::NoOp);
        assert_eq!(history.undo().unwrap().label, "A");
        assert_eq!(history.redo().unwrap().label, "B");
    }

    #[test]
    fn test_goto_out_of_range() {
        let mut history = HistoryManager::default();
        record(&mut history, "A");
        assert_eq!(history.goto(1).unwrap_err(), EditError::OutOfRange { index: 1, len: 1 });
        assert_eq!(history.goto(0).unwrap().label, "A");
    }

    #[test]
    fn test_snapshot_is_deep_copy() {
        let mut history = HistoryManager::default();
        let mut live = doc(10);
        history.record("Initial", &live, AdjustmentState::default());
        live.layers_mut()[0].pixels.put_pixel(0, 0, Rgba([99, 99, 99, 99]));
        live.layers_mut()[0].visible = false;
        let snap = &history.current().unwrap().snapshot;
        assert_eq!(snap.layers()[0].pixels.get_pixel(0, 0), Rgba([10, 10, 10, 255]));
        assert!(snap.layers()[0].visible);
    }

    #[test]
    fn test_prune_keeps_newest_and_cursor() {
        let mut history = HistoryManager::new(3);
        for label in ["A", "B", "C", "D", "E"] {
            record(&mut history, label);
        }
        assert_eq!(history.labels(), vec!["C", "D", "E"]);
        assert_eq!(history.cursor(), Some(2));
        assert_eq!(history.memory_usage(), history.entries().iter().map(|e| e.memory_size()).sum::<usize>());
    }

    #[test]
    fn test_descriptions() {
        let mut history = HistoryManager::default();
        record(&mut history, "A");
        record(&mut history, "B");
        assert_eq!(history.undo_description(), Some("B"));
        assert_eq!(history.redo_description(), None);
        history.undo().unwrap();
        assert_eq!(history.redo_description(), Some("B"));
        assert_eq!(history.undo_description(), None);
    }
}
