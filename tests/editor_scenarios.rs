use image::Rgba;
use retouch::{
    Adjustment, CropRect, EditError, Editor, EditorSettings, Filter, Interpolation, PixelBuffer,
};

fn settings(width: u32, height: u32) -> EditorSettings {
    EditorSettings {
        default_width: width,
        default_height: height,
        ..EditorSettings::default()
    }
}

fn quad_rgba() -> Vec<u8> {
    vec![
        255, 0, 0, 255, //
        0, 255, 0, 255, //
        0, 0, 255, 255, //
        255, 255, 255, 255,
    ]
}

fn gradient_editor(width: u32, height: u32) -> Editor {
    let mut editor = Editor::new(settings(width, height)).unwrap();
    let rgba = (0..width * height)
        .flat_map(|i| [(i * 7) as u8, (i * 13) as u8, (i * 29) as u8, 255])
        .collect();
    editor.open_image("gradient", width, height, rgba).unwrap();
    editor
}

#[test]
fn grayscale_of_loaded_quad() {
    let mut editor = Editor::new(EditorSettings::default()).unwrap();
    editor.open_image("quad", 2, 2, quad_rgba()).unwrap();
    editor.apply_adjustment(Adjustment::Grayscale).unwrap();

    let out = editor.composite();
    assert_eq!(out.get_pixel(0, 0), Rgba([85, 85, 85, 255]));
    assert_eq!(out.get_pixel(1, 1), Rgba([255, 255, 255, 255]));
    assert_eq!(
        editor.history().labels(),
        vec!["Initial State", "Open Image", "Apply grayscale Filter"]
    );
}

#[test]
fn every_successful_action_adds_one_entry() {
    let mut editor = gradient_editor(6, 4);
    let mut expected = editor.history().len();

    editor.apply_adjustment(Adjustment::Brightness(10)).unwrap();
    editor.apply_adjustment(Adjustment::Sepia).unwrap();
    editor.apply_filter(&Filter::Sharpen).unwrap();
    editor.apply_filter(&Filter::Blur).unwrap();
    editor.add_layer("Paint").unwrap();
    editor.set_layer_opacity(1, 0.5).unwrap();
    editor.toggle_layer_visibility(1).unwrap();
    editor.move_layer(1, 0).unwrap();
    editor.rename_layer(0, "Under").unwrap();
    editor.crop(CropRect::new(1, 1, 4, 2)).unwrap();
    editor.resize(8, 4).unwrap();
    editor.rotate(90.0).unwrap();
    editor.flip_horizontal().unwrap();
    editor.flip_vertical().unwrap();
    expected += 14;

    assert_eq!(editor.history().len(), expected);
    assert_eq!(editor.history().cursor(), Some(expected - 1));
    assert_eq!(editor.history().labels().last(), Some(&"Flip Vertical"));
}

#[test]
fn failed_actions_add_nothing() {
    let mut editor = gradient_editor(4, 4);
    let len = editor.history().len();
    let before = editor.document().clone();

    assert!(matches!(
        editor.crop(CropRect::new(2, 0, 3, 3)),
        Err(EditError::OutOfBounds { .. })
    ));
    assert!(matches!(
        editor.convolve(&[1.0, 2.0], false),
        Err(EditError::InvalidKernel { len: 2 })
    ));
    assert!(editor.apply_adjustment(Adjustment::Brightness(500)).is_err());
    assert!(editor.rotate(f64::NAN).is_err());
    assert!(editor.move_layer(0, 3).is_err());
    assert_eq!(editor.goto_history(99).unwrap_err(), EditError::OutOfRange { index: 99, len });

    assert_eq!(editor.history().len(), len);
    assert_eq!(editor.document(), &before);
}

#[test]
fn undo_restores_layer_properties_not_just_pixels() {
    let mut editor = gradient_editor(4, 4);
    editor.add_layer("Overlay").unwrap();
    editor.set_layer_position(1, 2, -1).unwrap();
    editor.set_layer_visibility(1, false).unwrap();
    editor.set_layer_opacity(0, 0.25).unwrap();

    editor.undo().unwrap();
    assert_eq!(editor.document().layers()[0].opacity, 1.0);
    assert_eq!(editor.undo().unwrap(), "Hide Layer");
    assert!(editor.document().layers()[1].visible);
    editor.undo().unwrap();
    let overlay = &editor.document().layers()[1];
    assert_eq!((overlay.x, overlay.y), (0, 0));

    editor.redo().unwrap();
    editor.redo().unwrap();
    let overlay = &editor.document().layers()[1];
    assert_eq!((overlay.x, overlay.y), (2, -1));
    assert!(!overlay.visible);
}

#[test]
fn recording_after_undo_discards_redo_branch() {
    let mut editor = gradient_editor(3, 3);
    editor.apply_adjustment(Adjustment::Invert).unwrap();
    editor.apply_adjustment(Adjustment::Grayscale).unwrap();
    editor.undo().unwrap();
    editor.flip_horizontal().unwrap();

    assert_eq!(
        editor.history().labels(),
        vec!["Initial State", "Open Image", "Invert Colors", "Flip Horizontal"]
    );
    assert_eq!(editor.redo().unwrap_err(), EditError::NoOp);
}

#[test]
fn undo_at_oldest_entry_is_noop() {
    let mut editor = Editor::new(settings(2, 2)).unwrap();
    assert_eq!(editor.undo().unwrap_err(), EditError::NoOp);
    assert_eq!(editor.history().cursor(), Some(0));
    assert_eq!(editor.history().len(), 1);
}

#[test]
fn quarter_turn_and_back_restores_document() {
    let mut editor = gradient_editor(5, 3);
    let original = editor.composite();

    editor.rotate(90.0).unwrap();
    assert_eq!((editor.document().width, editor.document().height), (3, 5));
    editor.rotate(-90.0).unwrap();
    assert_eq!(editor.composite(), original);
}

#[test]
fn arbitrary_rotation_grows_canvas_with_transparent_corners() {
    let mut editor = gradient_editor(10, 10);
    editor.rotate(45.0).unwrap();
    let out = editor.composite();
    assert_eq!(out.dimensions(), (15, 15));
    assert_eq!(out.get_pixel(0, 0)[3], 0);
    assert_eq!(out.get_pixel(14, 14)[3], 0);
    assert_eq!(out.get_pixel(7, 7)[3], 255);
    assert_eq!(editor.history().labels().last(), Some(&"Rotate Image 45°"));
}

#[test]
fn hidden_layer_does_not_affect_composite() {
    let mut editor = gradient_editor(4, 4);
    let base = editor.composite();
    let red = PixelBuffer::new_filled(4, 4, Rgba([255, 0, 0, 255])).unwrap();
    let idx = editor.add_layer("Red").unwrap();
    editor.replace_layer_image(idx, red).unwrap();
    assert_ne!(editor.composite(), base);
    editor.set_layer_visibility(idx, false).unwrap();
    assert_eq!(editor.composite(), base);
}

#[test]
fn canvas_crop_then_undo_round_trips() {
    let mut editor = gradient_editor(6, 6);
    let full = editor.composite();
    editor.crop(CropRect::new(2, 1, 3, 4)).unwrap();
    let cropped = editor.composite();
    assert_eq!(cropped.dimensions(), (3, 4));
    assert_eq!(cropped.get_pixel(0, 0), full.get_pixel(2, 1));

    assert_eq!(editor.undo().unwrap(), "Crop Image");
    assert_eq!(editor.composite(), full);
    assert_eq!(editor.redo().unwrap(), "Crop Image");
    assert_eq!(editor.composite(), cropped);
}

#[test]
fn resize_honours_configured_interpolation() {
    let mut editor = Editor::new(EditorSettings {
        resize_interpolation: Interpolation::Nearest,
        ..settings(2, 2)
    })
    .unwrap();
    editor.open_image("quad", 2, 2, quad_rgba()).unwrap();
    editor.resize(4, 4).unwrap();
    let out = editor.composite();
    assert_eq!(out.dimensions(), (4, 4));
    assert_eq!(out.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
    assert_eq!(out.get_pixel(3, 3), Rgba([255, 255, 255, 255]));
}

#[test]
fn history_cap_drops_oldest_entries() {
    let mut editor = Editor::new(EditorSettings {
        max_undo_steps: 3,
        ..settings(2, 2)
    })
    .unwrap();
    for _ in 0..5 {
        editor.flip_horizontal().unwrap();
    }
    assert_eq!(editor.history().len(), 3);
    assert_eq!(editor.history().cursor(), Some(2));
    editor.undo().unwrap();
    editor.undo().unwrap();
    assert_eq!(editor.undo().unwrap_err(), EditError::NoOp);
}

#[test]
fn goto_history_jumps_and_keeps_entries() {
    let mut editor = gradient_editor(3, 3);
    let opened = editor.composite();
    editor.apply_adjustment(Adjustment::Invert).unwrap();
    editor.apply_adjustment(Adjustment::Saturation(-100)).unwrap();

    assert_eq!(editor.goto_history(1).unwrap(), "Open Image");
    assert_eq!(editor.composite(), opened);
    assert_eq!(editor.history().len(), 4);
    assert!(editor.history().can_redo());
}
