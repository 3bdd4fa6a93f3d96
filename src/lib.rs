//! bookpress renders fixed-layout booking confirmation documents as PDFs, built around a header
//! image fetched from a remote URL at render time. The crate is consumed two ways: the `server`
//! module exposes the HTTP routes that stream a finished document back as the response body,
//! and `render::confirmation_pdf_bytes` assembles the same document into an in-memory buffer
//! for callers that attach it elsewhere, such as an email pipeline.
//!
//! The layout itself is deterministic: given the same booking record and the same image bytes,
//! the produced documents are identical byte for byte. This falls out of the `pdf` module
//! pinning its timestamps and taking the document identifiers from the caller.

/// The booking record populating the confirmation, the fixed sample reservation and the note
/// list with its digit-prefix nesting rule.
pub mod booking;

/// The `ContextError` type used throughout this crate: an explanation of what failed, plus the
/// propagated source error whenever one exists.
pub mod error;

/// The image fetcher: one GET request per call, no retries, no validation.
pub mod fetch;

/// Font loading and measurement.
///
/// The three weights of the set are read once from the fonts directory and shared by reference
/// from then on; the render path never reloads or mutates them. This module also owns the
/// embedding of a TTF face into a PDF document (`Type0`/`CIDFontType2` with Identity-H encoding
/// and a `ToUnicode` character map), which is the part of the PDF specification the `pdf`
/// module delegates here.
pub mod fonts;

/// The document layouts: a cursor-tracked sheet builder over the PDF backend, the layout
/// constants, and the two fixed drawing procedures (the booking confirmation and the simpler
/// image-and-headline demo).
pub mod layout;

/// The module where the `PdfDocument` interface for working with PDF documents is presented.
///
/// This work was partially adapted from the one of [fschutt](https://github.com/fschutt) for
/// the crate [printpdf](https://github.com/fschutt/printpdf), with the random generation of the
/// document parameters removed: the PDF identifier and the instance ID are chosen by the
/// caller and the timestamps are fixed, which keeps the output reproducible and therefore
/// testable. The documents produced here are parsed fine by PDF applications, but can be run
/// through `gs` or `ps2pdf` whenever a smaller, cleaned-up file is wanted.
pub mod pdf;

/// The render entry points tying fetching and layout together. The streaming variants trap
/// content failures and finalize a degraded document carrying a visible notice; the buffer
/// variant propagates the failure instead. The two contracts are deliberately different and
/// both are part of the public surface.
pub mod render;

/// The HTTP route layer: route registration, header setting and the shared process state.
pub mod server;
