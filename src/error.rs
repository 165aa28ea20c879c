// ============================================================================
// EDIT ERRORS - every recoverable failure the editing core can report
// ============================================================================

use thiserror::Error;

/// Errors returned by pixel ops, the history stack and the editor.
///
/// None of these are fatal: the caller (UI or CLI) reports them and the
/// document is left exactly as it was before the failed request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("invalid dimensions {width}×{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("kernel of {len} weights is not an odd square")]
    InvalidKernel { len: usize },

    #[error("region {w}×{h} at ({x}, {y}) exceeds {bound_w}×{bound_h}")]
    OutOfBounds {
        x: i64,
        y: i64,
        w: u32,
        h: u32,
        bound_w: u32,
        bound_h: u32,
    },

    #[error("history index {index} out of range (0..{len})")]
    OutOfRange { index: usize, len: usize },

    #[error("no active layer")]
    NoActiveLayer,

    #[error("layer index {index} out of range (0..{len})")]
    LayerIndex { index: usize, len: usize },

    #[error("invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    /// Undo/redo at a stack boundary. A signal rather than a failure.
    #[error("nothing to do")]
    NoOp,
}

pub type Result<T> = std::result::Result<T, EditError>;
