use std::path::Path;

use crate::booking::BookingRecord;
use crate::error::ContextError;
use crate::fetch;
use crate::fonts::{FontSet, DEFAULT_FONTS_DIRECTORY};
use crate::layout::{self, LayoutSheet};

/// Renders the booking confirmation strictly: any failure while drawing the content is
/// propagated to the caller instead of producing a degraded document.
pub fn confirmation_document(
    fonts: &FontSet,
    image_bytes: &[u8],
    record: &BookingRecord,
) -> Result<Vec<u8>, ContextError> {
    let mut sheet = LayoutSheet::new(fonts, &layout::confirmation_style())?;
    layout::draw_confirmation(&mut sheet, image_bytes, record)?;
    sheet.finish(layout::CONFIRMATION_INSTANCE_ID)
}

/// Renders the booking confirmation for the streaming route: a failed fetch or any content
/// failure is trapped and replaced by the in-document notice, and the document is finalized
/// either way. Only a failure of the finalization machinery itself is returned as an error.
pub fn confirmation_document_or_notice(
    fonts: &FontSet,
    image: Result<Vec<u8>, ContextError>,
    record: &BookingRecord,
) -> Result<Vec<u8>, ContextError> {
    let mut sheet = LayoutSheet::new(fonts, &layout::confirmation_style())?;
    let content_result =
        image.and_then(|image_bytes| layout::draw_confirmation(&mut sheet, &image_bytes, record));
    if let Err(error) = content_result {
        log::warn!(
            "Unable to draw the confirmation content, replacing it with a notice: {}",
            error
        );
        sheet.error_notice(layout::ERROR_MESSAGE, layout::ERROR_SIZE)?;
    }

    sheet.finish(layout::CONFIRMATION_INSTANCE_ID)
}

/// Fetches the header image and returns the finished confirmation as an in-memory buffer, for
/// callers that attach the document elsewhere instead of streaming it. Unlike the streaming
/// variant, any failure (fetch, font loading, drawing) rejects the operation: a partial or
/// degraded document is never handed to an attachment pipeline.
pub async fn confirmation_pdf_bytes(
    image_url: &str,
    record: &BookingRecord,
) -> Result<Vec<u8>, ContextError> {
    let fonts = FontSet::load(Path::new(DEFAULT_FONTS_DIRECTORY))?;
    let image_bytes = fetch::fetch_image(image_url).await?;
    confirmation_document(&fonts, &image_bytes, record)
}

/// Renders the demo document strictly, propagating any content failure.
pub fn demo_document(fonts: &FontSet, image_bytes: &[u8]) -> Result<Vec<u8>, ContextError> {
    let mut sheet = LayoutSheet::new(fonts, &layout::demo_style())?;
    layout::draw_demo(&mut sheet, image_bytes)?;
    sheet.finish(layout::DEMO_INSTANCE_ID)
}

/// Renders the demo document for the streaming route, writing the error message in place of the
/// headline when the image could not be fetched or drawn.
pub fn demo_document_or_notice(
    fonts: &FontSet,
    image: Result<Vec<u8>, ContextError>,
) -> Result<Vec<u8>, ContextError> {
    let mut sheet = LayoutSheet::new(fonts, &layout::demo_style())?;
    let content_result =
        image.and_then(|image_bytes| layout::draw_demo(&mut sheet, &image_bytes));
    if let Err(error) = content_result {
        log::warn!(
            "Unable to draw the demo content, replacing it with a notice: {}",
            error
        );
        sheet.error_notice(layout::ERROR_MESSAGE, layout::ERROR_SIZE)?;
    }

    sheet.finish(layout::DEMO_INSTANCE_ID)
}
