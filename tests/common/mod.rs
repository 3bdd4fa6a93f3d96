#![allow(dead_code)]

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::Object;

use bookpress::fonts::FontSet;

/// Loads the font set the same way the server does at startup.
pub fn fonts() -> FontSet {
    FontSet::load(Path::new("fonts")).unwrap()
}

/// A small opaque blue PNG standing in for the fetched logo. 48 by 24 pixels, so an image block
/// scaled to a known width has a known height.
pub fn logo_png() -> Vec<u8> {
    let mut logo = image::RgbaImage::new(48, 24);
    for pixel in logo.pixels_mut() {
        *pixel = image::Rgba([20, 60, 160, 255]);
    }
    let mut png_bytes = Vec::new();
    logo.write_to(
        &mut std::io::Cursor::new(&mut png_bytes),
        image::ImageFormat::Png,
    )
    .unwrap();
    png_bytes
}

/// Parses the produced document back and returns the decoded content operations of its single
/// page, so the tests can assert on what was actually drawn.
pub fn content_operations(pdf_bytes: &[u8]) -> Vec<Operation> {
    let document = lopdf::Document::load_mem(pdf_bytes).unwrap();
    let page_id = document.page_iter().next().unwrap();
    let page_content = document.get_page_content(page_id).unwrap();
    Content::decode(&page_content).unwrap().operations
}

/// Numeric operands come back as `Integer` when the written real had no fractional part.
pub fn number(object: &Object) -> f32 {
    match object {
        Object::Integer(value) => *value as f32,
        Object::Real(value) => *value,
        other => panic!("expected a numeric operand, found {:?}", other),
    }
}

/// One `Tj` drawing call together with the text state it was issued under.
#[derive(Debug, Clone)]
pub struct TextRun {
    pub font: String,
    pub font_size: f32,
    pub x: f32,
    pub y: f32,
    pub color: [f32; 3],
    pub glyphs: Vec<u8>,
}

/// Replays the content operations collecting every text run with its font, position and color.
pub fn text_runs(operations: &[Operation]) -> Vec<TextRun> {
    let mut runs = Vec::new();
    let mut font = String::new();
    let mut font_size = 0.0;
    let mut position = [0.0f32; 2];
    let mut color = [0.0f32; 3];
    for operation in operations {
        match operation.operator.as_str() {
            "Tf" => {
                if let Object::Name(name) = &operation.operands[0] {
                    font = String::from_utf8_lossy(name).into_owned();
                }
                font_size = number(&operation.operands[1]);
            }
            "Td" => {
                position = [number(&operation.operands[0]), number(&operation.operands[1])];
            }
            "rg" => {
                color = [
                    number(&operation.operands[0]),
                    number(&operation.operands[1]),
                    number(&operation.operands[2]),
                ];
            }
            "Tj" => {
                if let Object::String(glyph_bytes, _) = &operation.operands[0] {
                    runs.push(TextRun {
                        font: font.clone(),
                        font_size,
                        x: position[0],
                        y: position[1],
                        color,
                        glyphs: glyph_bytes.clone(),
                    });
                }
            }
            _ => {}
        }
    }
    runs
}

/// Finds the run drawing exactly the given glyph bytes.
pub fn find_run<'a>(runs: &'a [TextRun], glyphs: &[u8]) -> Option<&'a TextRun> {
    runs.iter().find(|run| run.glyphs == glyphs)
}

pub fn assert_close(left: f32, right: f32) {
    assert!(
        (left - right).abs() < 0.05,
        "expected {} to equal {} within tolerance",
        left,
        right
    );
}
