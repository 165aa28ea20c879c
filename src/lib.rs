//! Layered raster image editing core.
//!
//! Pure pixel operations live in [`ops`]; [`canvas`] holds the layer model
//! and compositor; [`project::Editor`] ties a document to its undo history.

pub mod canvas;
pub mod components;
pub mod config;
pub mod error;
pub mod io;
pub mod logger;
pub mod ops;
pub mod pixels;
pub mod project;

pub use canvas::{Document, Layer, LayerId};
pub use components::history::{HistoryEntry, HistoryManager};
pub use config::EditorSettings;
pub use error::{EditError, Result};
pub use ops::adjustments::{Adjustment, AdjustmentState};
pub use ops::filters::{Filter, Kernel};
pub use ops::transform::{CropRect, Interpolation};
pub use pixels::PixelBuffer;
pub use project::Editor;
