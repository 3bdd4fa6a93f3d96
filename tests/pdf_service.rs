use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt as _;

use bookpress::booking::BookingRecord;
use bookpress::layout;
use bookpress::render;
use bookpress::server::{self, AppState};

mod common;
use common::{content_operations, find_run, fonts, text_runs};

/// Nothing listens on this address, so every fetch through it fails immediately and the tests
/// exercise the degraded paths without touching the network.
const UNREACHABLE_IMAGE_URL: &str = "http://127.0.0.1:1/logo.png";

fn test_state() -> AppState {
    AppState {
        fonts: Arc::new(fonts()),
        image_url: UNREACHABLE_IMAGE_URL.into(),
    }
}

#[tokio::test]
async fn the_demo_route_answers_200_with_a_degraded_document_when_the_fetch_fails() {
    let app = server::router(test_state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/generate-pdf")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "inline; filename=document.pdf"
    );

    let pdf_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let runs = text_runs(&content_operations(&pdf_bytes));
    let fonts = fonts();
    assert!(find_run(&runs, &fonts.regular.encode_glyphs(layout::ERROR_MESSAGE)).is_some());
}

#[tokio::test]
async fn the_confirmation_route_answers_200_with_a_degraded_document_when_the_fetch_fails() {
    let app = server::router(test_state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/booking-confirmation")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "inline; filename=booking-confirmation.pdf"
    );

    let pdf_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let document = lopdf::Document::load_mem(&pdf_bytes).unwrap();
    assert_eq!(document.page_iter().count(), 1);

    let runs = text_runs(&content_operations(&pdf_bytes));
    let fonts = fonts();
    assert!(find_run(&runs, &fonts.regular.encode_glyphs(layout::ERROR_MESSAGE)).is_some());
}

#[tokio::test]
async fn the_buffer_entry_point_rejects_when_the_fetch_fails() {
    let record = BookingRecord::sample();

    let result = render::confirmation_pdf_bytes(UNREACHABLE_IMAGE_URL, &record).await;

    // Unlike the streaming routes, the programmatic caller gets the failure propagated instead
    // of a degraded document
    assert!(result.is_err());
}
