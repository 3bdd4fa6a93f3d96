use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::booking::BookingRecord;
use crate::fetch;
use crate::fonts::FontSet;
use crate::render;

/// The state shared by every request: the font set loaded once at startup and the URL of the
/// header image. Requests are otherwise independent, each one builds its own document and sink.
#[derive(Clone)]
pub struct AppState {
    pub fonts: Arc<FontSet>,
    pub image_url: Arc<str>,
}

/// Builds the router with the two document routes. Neither takes parameters or a body.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/generate-pdf", get(generate_pdf))
        .route("/booking-confirmation", get(booking_confirmation))
        .with_state(state)
}

/// `GET /generate-pdf`: the image-and-headline demo document. A failed fetch still answers 200
/// with a valid PDF carrying the error message, the failure is only visible inside the document.
async fn generate_pdf(State(state): State<AppState>) -> Response {
    let image = fetch::fetch_image(&state.image_url).await;
    match render::demo_document_or_notice(&state.fonts, image) {
        Ok(pdf_bytes) => pdf_response("inline; filename=document.pdf", pdf_bytes),
        Err(error) => {
            log::error!("Failed to render the demo document: {}", error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `GET /booking-confirmation`: the full confirmation for the fixed sample reservation, with
/// the same degraded-but-200 behavior on content failures.
async fn booking_confirmation(State(state): State<AppState>) -> Response {
    let image = fetch::fetch_image(&state.image_url).await;
    let record = BookingRecord::sample();
    match render::confirmation_document_or_notice(&state.fonts, image, &record) {
        Ok(pdf_bytes) => pdf_response("inline; filename=booking-confirmation.pdf", pdf_bytes),
        Err(error) => {
            log::error!("Failed to render the booking confirmation: {}", error);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn pdf_response(content_disposition: &'static str, pdf_bytes: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (header::CONTENT_DISPOSITION, content_disposition),
        ],
        pdf_bytes,
    )
        .into_response()
}
