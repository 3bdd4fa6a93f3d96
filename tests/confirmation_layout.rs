use std::collections::BTreeMap;

use similar_asserts::assert_eq;

use bookpress::booking::{self, BookingRecord};
use bookpress::error::ContextError;
use bookpress::layout;
use bookpress::render;

mod common;
use common::{assert_close, content_operations, find_run, fonts, logo_png, number, text_runs};

#[test]
fn the_confirmation_is_a_well_formed_single_page_document() {
    let pdf_bytes =
        render::confirmation_document(&fonts(), &logo_png(), &BookingRecord::sample()).unwrap();

    let document = lopdf::Document::load_mem(&pdf_bytes).unwrap();
    assert_eq!(document.page_iter().count(), 1);
}

#[test]
fn the_streaming_and_buffer_procedures_emit_identical_bytes() {
    let fonts = fonts();
    let record = BookingRecord::sample();
    let png_bytes = logo_png();

    let strict_bytes = render::confirmation_document(&fonts, &png_bytes, &record).unwrap();
    let streaming_bytes =
        render::confirmation_document_or_notice(&fonts, Ok(png_bytes.clone()), &record).unwrap();
    assert_eq!(strict_bytes, streaming_bytes);

    // Rendering carries no hidden state between invocations
    let repeated_bytes = render::confirmation_document(&fonts, &png_bytes, &record).unwrap();
    assert_eq!(strict_bytes, repeated_bytes);
}

#[test]
fn exactly_three_separator_rules_span_the_printable_width() {
    let pdf_bytes =
        render::confirmation_document(&fonts(), &logo_png(), &BookingRecord::sample()).unwrap();
    let operations = content_operations(&pdf_bytes);

    let mut rules = Vec::new();
    for (index, operation) in operations.iter().enumerate() {
        if operation.operator == "S" {
            // A rule is emitted as the operation run m, l, S
            let move_operation = &operations[index - 2];
            let line_operation = &operations[index - 1];
            assert_eq!(move_operation.operator, "m");
            assert_eq!(line_operation.operator, "l");
            rules.push((
                number(&move_operation.operands[0]),
                number(&line_operation.operands[0]),
            ));
        }
    }

    assert_eq!(rules.len(), 3);
    for (from_x, to_x) in rules {
        assert_close(from_x, layout::MARGIN_LEFT);
        assert_close(to_x, layout::PAGE_WIDTH - layout::MARGIN_RIGHT);
    }
}

#[test]
fn the_header_image_is_centered_at_its_fixed_offset() {
    let pdf_bytes =
        render::confirmation_document(&fonts(), &logo_png(), &BookingRecord::sample()).unwrap();
    let operations = content_operations(&pdf_bytes);

    let placements: Vec<usize> = operations
        .iter()
        .enumerate()
        .filter(|(_, operation)| operation.operator == "Do")
        .map(|(index, _)| index)
        .collect();
    assert_eq!(placements.len(), 1);

    let placement_matrix = &operations[placements[0] - 1];
    assert_eq!(placement_matrix.operator, "cm");
    // The 48 by 24 pixel fixture scaled to the 80 point block width is 40 points tall
    let drawn_height = layout::CONFIRMATION_IMAGE_WIDTH * 24.0 / 48.0;
    assert_close(
        number(&placement_matrix.operands[0]),
        layout::CONFIRMATION_IMAGE_WIDTH,
    );
    assert_close(number(&placement_matrix.operands[3]), drawn_height);
    assert_close(
        number(&placement_matrix.operands[4]),
        (layout::PAGE_WIDTH - layout::CONFIRMATION_IMAGE_WIDTH) / 2.0,
    );
    assert_close(
        number(&placement_matrix.operands[5]),
        layout::PAGE_HEIGHT - layout::CONFIRMATION_IMAGE_OFFSET - drawn_height,
    );
}

#[test]
fn eight_label_value_rows_share_their_baselines() {
    let fonts = fonts();
    let record = BookingRecord::sample();
    let pdf_bytes = render::confirmation_document(&fonts, &logo_png(), &record).unwrap();
    let runs = text_runs(&content_operations(&pdf_bytes));

    // The greeting pins down which embedded font is the regular weight, the title which one is
    // the bold weight
    let regular_font = find_run(&runs, &fonts.regular.encode_glyphs("Dear "))
        .unwrap()
        .font
        .clone();
    let bold_font = find_run(&runs, &fonts.bold.encode_glyphs(layout::TITLE_TEXT))
        .unwrap()
        .font
        .clone();
    assert_ne!(regular_font, bold_font);

    // Group the runs by baseline; a label/value row is the only place a regular run is followed
    // by a bold one on the same line
    let mut baselines: BTreeMap<i64, Vec<&common::TextRun>> = BTreeMap::new();
    for run in &runs {
        baselines
            .entry((run.y * 100.0).round() as i64)
            .or_default()
            .push(run);
    }
    let rows: Vec<&Vec<&common::TextRun>> = baselines
        .values()
        .filter(|group| {
            group.len() == 2 && group[0].font == regular_font && group[1].font == bold_font
        })
        .collect();
    assert_eq!(rows.len(), 8);

    // Baselines ascend bottom-up in PDF space, so the drawing order is the reverse
    let expected_rows = record.detail_rows();
    for (row, (label, value)) in rows.iter().rev().zip(expected_rows) {
        assert_eq!(row[0].glyphs, fonts.regular.encode_glyphs(label));
        assert_eq!(row[1].glyphs, fonts.bold.encode_glyphs(value));
        // The value continues on the same line exactly where the label ends
        assert_close(row[0].x, layout::MARGIN_LEFT);
        assert_close(
            row[1].x,
            layout::MARGIN_LEFT + fonts.regular.text_width(label, row[0].font_size),
        );
    }
}

#[test]
fn the_selections_are_drawn_in_the_semibold_weight() {
    let fonts = fonts();
    let record = BookingRecord::sample();
    let pdf_bytes = render::confirmation_document(&fonts, &logo_png(), &record).unwrap();
    let runs = text_runs(&content_operations(&pdf_bytes));

    let regular_font = find_run(&runs, &fonts.regular.encode_glyphs("Dear "))
        .unwrap()
        .font
        .clone();
    let bold_font = find_run(&runs, &fonts.bold.encode_glyphs(layout::TITLE_TEXT))
        .unwrap()
        .font
        .clone();

    for selection in &record.selections {
        let selection_run =
            find_run(&runs, &fonts.semibold.encode_glyphs(selection)).unwrap();
        assert_ne!(selection_run.font, regular_font);
        assert_ne!(selection_run.font, bold_font);
    }
}

#[test]
fn digit_prefixed_notes_are_indented_and_the_others_are_not() {
    let fonts = fonts();
    let pdf_bytes =
        render::confirmation_document(&fonts, &logo_png(), &BookingRecord::sample()).unwrap();
    let runs = text_runs(&content_operations(&pdf_bytes));

    let mut indented_count = 0;
    for note_line in booking::NOTE_LINES {
        let bullet_line = format!("{} {}", layout::NOTE_BULLET, note_line);
        let note_run = find_run(&runs, &fonts.regular.encode_glyphs(&bullet_line)).unwrap();

        if booking::note_is_nested(note_line) {
            assert_close(note_run.x, layout::MARGIN_LEFT + layout::NOTE_INDENT);
            indented_count += 1;
        } else {
            assert_close(note_run.x, layout::MARGIN_LEFT);
        }
    }
    assert_eq!(indented_count, 3);
}

#[test]
fn a_failed_fetch_still_finalizes_a_document_carrying_the_notice() {
    let fonts = fonts();
    let record = BookingRecord::sample();
    let fetch_error = ContextError::with_context("Failed to fetch the image");

    let pdf_bytes =
        render::confirmation_document_or_notice(&fonts, Err(fetch_error), &record).unwrap();
    let runs = text_runs(&content_operations(&pdf_bytes));

    let notice_run = find_run(&runs, &fonts.regular.encode_glyphs(layout::ERROR_MESSAGE))
        .expect("the notice must be drawn into the degraded document");
    assert_eq!(notice_run.color, layout::ERROR_COLOR);
    assert_eq!(notice_run.font_size, layout::ERROR_SIZE);

    // None of the regular content made it into the document
    assert!(find_run(&runs, &fonts.bold.encode_glyphs(layout::TITLE_TEXT)).is_none());
}
