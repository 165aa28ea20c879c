// ============================================================================
// IMPORT / EXPORT BOUNDARY - decode files into the editor, encode composites
// ============================================================================

use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageError};
use thiserror::Error;

use crate::error::EditError;
use crate::pixels::PixelBuffer;
use crate::project::Editor;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("image codec error: {0}")]
    Image(#[from] ImageError),

    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Edit(#[from] EditError),
}

/// A decoded image ready to hand to the editor.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedImage {
    /// File stem, used as the layer / document name
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Decode any format the `image` crate understands into straight RGBA8.
pub fn decode_image(path: &Path) -> Result<DecodedImage, IoError> {
    let img = image::open(path)?.to_rgba8();
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Background")
        .to_string();
    tracing::debug!("decoded {} ({}×{})", path.display(), img.width(), img.height());
    Ok(DecodedImage {
        name,
        width: img.width(),
        height: img.height(),
        rgba: img.into_raw(),
    })
}

/// Open `path` as the editor's whole document.
pub fn load_image(editor: &mut Editor, path: &Path) -> Result<(), IoError> {
    let decoded = decode_image(path)?;
    editor.open_image(&decoded.name, decoded.width, decoded.height, decoded.rgba)?;
    tracing::info!("opened {}", path.display());
    Ok(())
}

/// Decode `path` and add it as a new top layer. Returns the layer index.
pub fn import_image_as_layer(editor: &mut Editor, path: &Path) -> Result<usize, IoError> {
    let decoded = decode_image(path)?;
    let index = editor.import_layer(&decoded.name, decoded.width, decoded.height, decoded.rgba)?;
    Ok(index)
}

fn write_png<W: Write>(buffer: &PixelBuffer, writer: W) -> Result<(), ImageError> {
    PngEncoder::new(writer).write_image(
        buffer.as_raw(),
        buffer.width(),
        buffer.height(),
        ColorType::Rgba8,
    )
}

/// PNG bytes for `buffer`, alpha preserved.
pub fn encode_png(buffer: &PixelBuffer) -> Result<Vec<u8>, IoError> {
    let mut bytes = Cursor::new(Vec::new());
    write_png(buffer, &mut bytes)?;
    Ok(bytes.into_inner())
}

pub fn save_png(buffer: &PixelBuffer, path: &Path) -> Result<(), IoError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_png(buffer, &mut writer)?;
    writer.flush()?;
    tracing::info!("exported {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorSettings;
    use image::Rgba;

    fn scratch_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("retouch-io-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_encode_png_keeps_alpha() {
        let buffer = PixelBuffer::from_pixels(
            2,
            1,
            &[Rgba([10, 20, 30, 0]), Rgba([200, 100, 50, 128])],
        )
        .unwrap();
        let bytes = encode_png(&buffer).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(1, 0), &Rgba([200, 100, 50, 128]));
        assert_eq!(decoded.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_load_names_document_after_file() {
        let dir = scratch_dir();
        let path = dir.join("holiday.png");
        let src = PixelBuffer::new_filled(3, 2, Rgba([1, 2, 3, 255])).unwrap();
        save_png(&src, &path).unwrap();

        let mut editor = Editor::new(EditorSettings::default()).unwrap();
        load_image(&mut editor, &path).unwrap();
        assert_eq!(editor.name, "holiday");
        assert_eq!((editor.document().width, editor.document().height), (3, 2));
        assert_eq!(editor.composite(), src);
        assert_eq!(editor.history().labels(), vec!["Initial State", "Open Image"]);

        let idx = import_image_as_layer(&mut editor, &path).unwrap();
        assert_eq!(editor.document().layers()[idx].name, "holiday");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let mut editor = Editor::new(EditorSettings::default()).unwrap();
        let path = std::env::temp_dir().join("retouch-no-such-image.png");
        assert!(load_image(&mut editor, &path).is_err());
        assert_eq!(editor.history().len(), 1);
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let dir = scratch_dir();
        let path = dir.join("broken.png");
        std::fs::write(&path, b"not really a png").unwrap();
        assert!(matches!(decode_image(&path), Err(IoError::Image(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
