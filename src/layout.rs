use crate::booking::{self, BookingRecord};
use crate::error::ContextError;
use crate::fonts::{FontSet, LoadedFont};
use crate::pdf::PdfDocument;

/// A4 page size in points.
pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;

/// The asymmetric margins of the confirmation page, in points.
pub const MARGIN_TOP: f32 = 80.0;
pub const MARGIN_BOTTOM: f32 = 20.0;
pub const MARGIN_LEFT: f32 = 125.0;
pub const MARGIN_RIGHT: f32 = 125.0;

/// The header image block of the confirmation: 80 points wide, centered on the page, with its
/// top 20 points below the page top.
pub const CONFIRMATION_IMAGE_WIDTH: f32 = 80.0;
pub const CONFIRMATION_IMAGE_OFFSET: f32 = 20.0;

/// The demo document keeps the original uniform margin and draws a wider image a little lower.
pub const DEMO_MARGIN: f32 = 50.0;
pub const DEMO_IMAGE_WIDTH: f32 = 100.0;
pub const DEMO_IMAGE_OFFSET: f32 = 30.0;
/// The demo headline is forced to a fixed offset below the page top, clear of the image.
pub const DEMO_HEADLINE_OFFSET: f32 = 150.0;
pub const DEMO_HEADLINE: &str = "Lorem ipsum";
pub const DEMO_HEADLINE_SIZE: f32 = 24.0;

pub const TITLE_TEXT: &str = "Booking Confirmation";
pub const TITLE_SIZE: f32 = 18.0;
pub const SECTION_SIZE: f32 = 12.0;
pub const BODY_SIZE: f32 = 11.0;
pub const NOTE_SIZE: f32 = 10.0;
/// Digit-prefixed note lines are pushed this far to the right of the left margin.
pub const NOTE_INDENT: f32 = 15.0;
pub const NOTE_BULLET: char = '\u{2022}';

/// The cream page background of the confirmation, distinct from the default page white.
pub const BACKGROUND_COLOR: [f32; 3] = [0.992, 0.973, 0.937];
pub const TEXT_COLOR: [f32; 3] = [0.13, 0.13, 0.13];
/// The muted gray-green of the separator rules, stroked one point wide.
pub const RULE_COLOR: [f32; 3] = [0.56, 0.64, 0.58];
pub const RULE_WIDTH: f32 = 1.0;

pub const ERROR_COLOR: [f32; 3] = [0.84, 0.16, 0.16];
pub const ERROR_MESSAGE: &str = "Error: Could not generate the PDF.";
pub const ERROR_SIZE: f32 = 16.0;

/// The sentence following the greeting line.
pub const GREETING_SENTENCE: &str = "Thank you for booking with us. Please look through the \
    details of your reservation below and get in touch if anything needs to be amended.";

/// Fixed identifiers keep the finalized documents reproducible byte for byte.
pub const CONFIRMATION_DOCUMENT_ID: &str = "bXfXjtpNQm2aHKLeuQ7wRkViifDHe4Fq";
pub const CONFIRMATION_INSTANCE_ID: &str = "cT1yUzH1SYSGrFvV0AqkdxM2vLeJDmub";
pub const DEMO_DOCUMENT_ID: &str = "wAnyhPK4mESFmMSkx3kJlUXxZCDTqEbn";
pub const DEMO_INSTANCE_ID: &str = "kQtrJHbcOwUAR0jAxjWg5C2m96vDFNAq";

/// The page margins of one sheet, in points.
#[derive(Clone, Copy, Debug)]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Margins {
    pub fn uniform(value: f32) -> Margins {
        Margins {
            top: value,
            bottom: value,
            left: value,
            right: value,
        }
    }
}

/// The font weight a piece of text is drawn with, resolved against the `FontSet`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontRole {
    Regular,
    Semibold,
    Bold,
}

impl FontRole {
    fn slot(self) -> usize {
        match self {
            FontRole::Regular => 0,
            FontRole::Semibold => 1,
            FontRole::Bold => 2,
        }
    }
}

/// The page geometry and palette one `LayoutSheet` is created with.
#[derive(Clone, Copy, Debug)]
pub struct SheetStyle {
    pub document_identifier: &'static str,
    pub page_width: f32,
    pub page_height: f32,
    pub margins: Margins,
    /// A full-page fill drawn before any content, or `None` for the default page white.
    pub background: Option<[f32; 3]>,
    pub text_color: [f32; 3],
}

/// The style of the booking confirmation page.
pub fn confirmation_style() -> SheetStyle {
    SheetStyle {
        document_identifier: CONFIRMATION_DOCUMENT_ID,
        page_width: PAGE_WIDTH,
        page_height: PAGE_HEIGHT,
        margins: Margins {
            top: MARGIN_TOP,
            bottom: MARGIN_BOTTOM,
            left: MARGIN_LEFT,
            right: MARGIN_RIGHT,
        },
        background: Some(BACKGROUND_COLOR),
        text_color: TEXT_COLOR,
    }
}

/// The style of the image-and-headline demo page: default colors, uniform margin.
pub fn demo_style() -> SheetStyle {
    SheetStyle {
        document_identifier: DEMO_DOCUMENT_ID,
        page_width: PAGE_WIDTH,
        page_height: PAGE_HEIGHT,
        margins: Margins::uniform(DEMO_MARGIN),
        background: None,
        text_color: [0.0, 0.0, 0.0],
    }
}

/// A single page being laid out top to bottom over the PDF backend.
///
/// The sheet exposes ordered content-block operations (centered image, title, mixed-weight
/// line, section header, separator rule, bulleted note) and tracks the vertical cursor
/// internally, so the fixed document procedures below are sequences of builder calls instead
/// of manual position arithmetic. The cursor is the distance from the page top to the top of
/// whatever is drawn next; it only ever grows.
pub struct LayoutSheet {
    document: PdfDocument,
    page_index: usize,
    layer_index: usize,
    fonts: FontSet,
    /// Fonts are registered into the document on first use, keyed by `FontRole::slot`, so a
    /// document only embeds the weights it draws with.
    registered_fonts: [Option<usize>; 3],
    page_width: f32,
    page_height: f32,
    margins: Margins,
    text_color: [f32; 3],
    cursor: f32,
}

impl LayoutSheet {
    /// Opens a fresh single-page document in the given style. The cursor starts at the top
    /// margin.
    pub fn new(fonts: &FontSet, style: &SheetStyle) -> Result<LayoutSheet, ContextError> {
        let mut document = PdfDocument::new(style.document_identifier.to_string());
        let (page_index, layer_index) =
            document.add_page_with_layer(style.page_width, style.page_height);

        let mut sheet = LayoutSheet {
            document,
            page_index,
            layer_index,
            fonts: fonts.clone(),
            registered_fonts: [None; 3],
            page_width: style.page_width,
            page_height: style.page_height,
            margins: style.margins,
            text_color: style.text_color,
            cursor: style.margins.top,
        };

        if let Some(background_color) = style.background {
            sheet.document.fill_rectangle_to_layer_in_page(
                sheet.page_index,
                sheet.layer_index,
                background_color,
                [0.0, 0.0],
                [style.page_width, style.page_height],
            )?;
        }

        Ok(sheet)
    }

    fn font(&self, role: FontRole) -> &LoadedFont {
        match role {
            FontRole::Regular => &self.fonts.regular,
            FontRole::Semibold => &self.fonts.semibold,
            FontRole::Bold => &self.fonts.bold,
        }
    }

    fn font_index(&mut self, role: FontRole) -> usize {
        if let Some(font_index) = self.registered_fonts[role.slot()] {
            return font_index;
        }
        let font_face = self.font(role).clone();
        let font_index = self.document.add_font_face(&font_face);
        self.registered_fonts[role.slot()] = Some(font_index);

        font_index
    }

    /// The width available to content between the left and right margins.
    pub fn printable_width(&self) -> f32 {
        self.page_width - self.margins.left - self.margins.right
    }

    /// Writes the segments one after the other on a shared baseline starting at `x`, then
    /// advances the cursor by the tallest line among the used weights. This is what keeps a
    /// label and its value on the same line with no break in between.
    fn write_segments_at(
        &mut self,
        x: f32,
        segments: &[(&str, FontRole)],
        font_size: f32,
    ) -> Result<(), ContextError> {
        let mut tallest_ascent: f32 = 0.0;
        let mut tallest_line: f32 = 0.0;
        for (_, role) in segments {
            tallest_ascent = tallest_ascent.max(self.font(*role).ascent(font_size));
            tallest_line = tallest_line.max(self.font(*role).line_height(font_size));
        }

        let baseline = self.page_height - self.cursor - tallest_ascent;
        let mut caret_x = x;
        for (text, role) in segments {
            let font_index = self.font_index(*role);
            let text_color = self.text_color;
            self.document.write_text_to_layer_in_page(
                self.page_index,
                self.layer_index,
                text_color,
                (*text).to_string(),
                font_index,
                font_size,
                [caret_x, baseline],
            )?;
            caret_x += self.font(*role).text_width(text, font_size);
        }
        self.cursor += tallest_line;

        Ok(())
    }

    /// A single line of text at the left margin.
    pub fn line(&mut self, text: &str, role: FontRole, font_size: f32) -> Result<(), ContextError> {
        let segments = [(text, role)];
        self.write_segments_at(self.margins.left, &segments, font_size)
    }

    /// A line mixing font weights, such as a greeting or a label/value row.
    pub fn mixed_line(
        &mut self,
        segments: &[(&str, FontRole)],
        font_size: f32,
    ) -> Result<(), ContextError> {
        self.write_segments_at(self.margins.left, segments, font_size)
    }

    /// A line horizontally centered between the margins.
    pub fn centered_line(
        &mut self,
        text: &str,
        role: FontRole,
        font_size: f32,
    ) -> Result<(), ContextError> {
        let text_width = self.font(role).text_width(text, font_size);
        let x = self.margins.left + (self.printable_width() - text_width) / 2.0;
        let segments = [(text, role)];
        self.write_segments_at(x, &segments, font_size)
    }

    /// A bold section header.
    pub fn section_header(&mut self, title: &str) -> Result<(), ContextError> {
        self.line(title, FontRole::Bold, SECTION_SIZE)
    }

    /// A paragraph greedily word-wrapped at the printable width.
    pub fn paragraph(
        &mut self,
        text: &str,
        role: FontRole,
        font_size: f32,
    ) -> Result<(), ContextError> {
        let printable_width = self.printable_width();
        let font = self.font(role).clone();

        let mut current_line = String::new();
        for word in text.split_whitespace() {
            let candidate_line = if current_line.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current_line, word)
            };
            if font.text_width(&candidate_line, font_size) > printable_width
                && !current_line.is_empty()
            {
                let segments = [(current_line.as_str(), role)];
                self.write_segments_at(self.margins.left, &segments, font_size)?;
                current_line = word.to_string();
            } else {
                current_line = candidate_line;
            }
        }
        if !current_line.is_empty() {
            let segments = [(current_line.as_str(), role)];
            self.write_segments_at(self.margins.left, &segments, font_size)?;
        }

        Ok(())
    }

    /// Advances the cursor by half a line of the given size without drawing anything.
    pub fn half_line_gap(&mut self, font_size: f32) {
        self.cursor += self.font(FontRole::Regular).line_height(font_size) / 2.0;
    }

    /// A horizontal rule spanning the printable width at the current cursor position, with a
    /// full-line gap inserted immediately before it is drawn.
    pub fn separator_rule(&mut self) -> Result<(), ContextError> {
        self.cursor += self.font(FontRole::Regular).line_height(BODY_SIZE);
        let y = self.page_height - self.cursor;
        self.document.draw_line_to_layer_in_page(
            self.page_index,
            self.layer_index,
            RULE_COLOR,
            RULE_WIDTH,
            [self.margins.left, y],
            [self.page_width - self.margins.right, y],
        )?;
        self.cursor += self.font(FontRole::Regular).line_height(BODY_SIZE) / 2.0;

        Ok(())
    }

    /// A bulleted note line; nested notes are pushed right by the fixed indent.
    pub fn note(&mut self, text: &str, nested: bool) -> Result<(), ContextError> {
        let indent = if nested { NOTE_INDENT } else { 0.0 };
        let bullet_line = format!("{} {}", NOTE_BULLET, text);
        let segments = [(bullet_line.as_str(), FontRole::Regular)];
        self.write_segments_at(self.margins.left + indent, &segments, NOTE_SIZE)
    }

    /// A block image of the given width, horizontally centered on the page, with its top at the
    /// fixed offset below the page top. If the image reaches below the cursor, the cursor is
    /// pushed past it.
    pub fn centered_image(
        &mut self,
        image_bytes: &[u8],
        width: f32,
        top_offset: f32,
    ) -> Result<(), ContextError> {
        let x = (self.page_width - width) / 2.0;
        let drawn_height = self.document.add_image_to_layer_in_page(
            self.page_index,
            self.layer_index,
            image_bytes,
            [x, self.page_height - top_offset],
            width,
        )?;

        let image_bottom = top_offset + drawn_height;
        if image_bottom > self.cursor {
            self.cursor = image_bottom;
        }

        Ok(())
    }

    /// Moves the cursor to an absolute offset below the page top.
    pub fn move_cursor_to(&mut self, offset_from_top: f32) {
        self.cursor = offset_from_top;
    }

    /// Switches the text color to the error red and writes the centered failure notice at the
    /// current position, in place of whatever content remains.
    pub fn error_notice(&mut self, message: &str, font_size: f32) -> Result<(), ContextError> {
        self.text_color = ERROR_COLOR;
        self.centered_line(message, FontRole::Regular, font_size)
    }

    /// Finalizes the document and hands back the assembled bytes. The sheet always reaches this
    /// point, whether its content was drawn in full or replaced by the failure notice.
    pub fn finish(mut self, instance_identifier: &str) -> Result<Vec<u8>, ContextError> {
        self.document.write_all(instance_identifier.to_string())?;
        self.document.save_to_bytes()
    }
}

/// Draws the full booking confirmation onto the sheet, top to bottom in fixed order: header
/// image, title, greeting, the three ruled sections and the notes.
pub fn draw_confirmation(
    sheet: &mut LayoutSheet,
    image_bytes: &[u8],
    record: &BookingRecord,
) -> Result<(), ContextError> {
    sheet.centered_image(image_bytes, CONFIRMATION_IMAGE_WIDTH, CONFIRMATION_IMAGE_OFFSET)?;

    sheet.centered_line(TITLE_TEXT, FontRole::Bold, TITLE_SIZE)?;
    sheet.half_line_gap(BODY_SIZE);

    sheet.mixed_line(
        &[
            ("Dear ", FontRole::Regular),
            (record.point_of_contact.as_str(), FontRole::Bold),
            (",", FontRole::Regular),
        ],
        BODY_SIZE,
    )?;
    sheet.paragraph(GREETING_SENTENCE, FontRole::Regular, BODY_SIZE)?;
    sheet.half_line_gap(BODY_SIZE);

    sheet.section_header("Booking Dates")?;
    sheet.line(record.booking_dates.as_str(), FontRole::Regular, BODY_SIZE)?;
    sheet.separator_rule()?;

    sheet.section_header("Bouncy Castle Selection")?;
    for selection in &record.selections {
        sheet.line(selection.as_str(), FontRole::Semibold, BODY_SIZE)?;
    }
    let collection_line = format!("Collection Method: {}", record.collection_method);
    sheet.line(collection_line.as_str(), FontRole::Regular, BODY_SIZE)?;
    sheet.separator_rule()?;

    sheet.section_header("Key Event Details")?;
    let detail_rows = record.detail_rows();
    let row_count = detail_rows.len();
    for (row_index, (label, value)) in detail_rows.into_iter().enumerate() {
        sheet.mixed_line(
            &[(label, FontRole::Regular), (value, FontRole::Bold)],
            BODY_SIZE,
        )?;
        if row_index + 1 < row_count {
            sheet.half_line_gap(BODY_SIZE);
        }
    }
    sheet.separator_rule()?;

    sheet.section_header("Notes")?;
    for note_line in booking::NOTE_LINES {
        sheet.note(note_line, booking::note_is_nested(note_line))?;
    }

    Ok(())
}

/// Draws the simpler demo document: the centered image, then the headline at its fixed offset.
pub fn draw_demo(sheet: &mut LayoutSheet, image_bytes: &[u8]) -> Result<(), ContextError> {
    sheet.centered_image(image_bytes, DEMO_IMAGE_WIDTH, DEMO_IMAGE_OFFSET)?;
    sheet.move_cursor_to(DEMO_HEADLINE_OFFSET);
    sheet.centered_line(DEMO_HEADLINE, FontRole::Regular, DEMO_HEADLINE_SIZE)
}
