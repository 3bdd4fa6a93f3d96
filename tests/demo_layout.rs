use similar_asserts::assert_eq;

use bookpress::error::ContextError;
use bookpress::layout;
use bookpress::render;

mod common;
use common::{assert_close, content_operations, find_run, fonts, logo_png, number, text_runs};

#[test]
fn the_demo_draws_the_image_and_the_headline_at_their_fixed_offsets() {
    let fonts = fonts();
    let pdf_bytes = render::demo_document(&fonts, &logo_png()).unwrap();
    let operations = content_operations(&pdf_bytes);

    let placement_index = operations
        .iter()
        .position(|operation| operation.operator == "Do")
        .unwrap();
    let placement_matrix = &operations[placement_index - 1];
    assert_eq!(placement_matrix.operator, "cm");
    // The 48 by 24 pixel fixture scaled to the 100 point block width is 50 points tall
    let drawn_height = layout::DEMO_IMAGE_WIDTH * 24.0 / 48.0;
    assert_close(number(&placement_matrix.operands[0]), layout::DEMO_IMAGE_WIDTH);
    assert_close(number(&placement_matrix.operands[3]), drawn_height);
    assert_close(
        number(&placement_matrix.operands[4]),
        (layout::PAGE_WIDTH - layout::DEMO_IMAGE_WIDTH) / 2.0,
    );
    assert_close(
        number(&placement_matrix.operands[5]),
        layout::PAGE_HEIGHT - layout::DEMO_IMAGE_OFFSET - drawn_height,
    );

    let runs = text_runs(&operations);
    let headline_run = find_run(
        &runs,
        &fonts.regular.encode_glyphs(layout::DEMO_HEADLINE),
    )
    .unwrap();
    assert_eq!(headline_run.font_size, layout::DEMO_HEADLINE_SIZE);

    // Centered between the uniform margins, with its baseline hanging from the fixed offset
    let headline_width = fonts
        .regular
        .text_width(layout::DEMO_HEADLINE, layout::DEMO_HEADLINE_SIZE);
    let printable_width = layout::PAGE_WIDTH - 2.0 * layout::DEMO_MARGIN;
    assert_close(
        headline_run.x,
        layout::DEMO_MARGIN + (printable_width - headline_width) / 2.0,
    );
    assert_close(
        headline_run.y,
        layout::PAGE_HEIGHT
            - layout::DEMO_HEADLINE_OFFSET
            - fonts.regular.ascent(layout::DEMO_HEADLINE_SIZE),
    );
}

#[test]
fn the_demo_replaces_the_headline_with_the_error_message_on_a_failed_fetch() {
    let fonts = fonts();
    let fetch_error = ContextError::with_context("Failed to fetch the image");

    let pdf_bytes = render::demo_document_or_notice(&fonts, Err(fetch_error)).unwrap();
    let operations = content_operations(&pdf_bytes);

    // No image made it into the page
    assert!(operations.iter().all(|operation| operation.operator != "Do"));

    let runs = text_runs(&operations);
    let notice_run = find_run(&runs, &fonts.regular.encode_glyphs(layout::ERROR_MESSAGE))
        .expect("the error message must replace the headline");
    assert_eq!(notice_run.font_size, layout::ERROR_SIZE);
    assert_eq!(notice_run.color, layout::ERROR_COLOR);
    assert!(find_run(&runs, &fonts.regular.encode_glyphs(layout::DEMO_HEADLINE)).is_none());
}

#[test]
fn the_demo_render_is_reproducible() {
    let fonts = fonts();
    let png_bytes = logo_png();

    let first_bytes = render::demo_document(&fonts, &png_bytes).unwrap();
    let second_bytes = render::demo_document(&fonts, &png_bytes).unwrap();
    assert_eq!(first_bytes, second_bytes);
}
