//! Error types for the pdf-slicer library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SlicerError`] — **Fatal** for the call that returns it: the source
//!   cannot be probed, the configuration is invalid, or the caller asked for
//!   strict page lookups and a page is missing from a converted tree.
//!
//! * [`ConverterError`] — **Stage-local**: one converter stage failed on one
//!   page. The extractor logs it and moves on to the next stage; it never
//!   escapes [`crate::extract::ContentExtractor::extract_page`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-slicer library.
///
/// Stage failures use [`ConverterError`] and are recovered inside the
/// extractor rather than propagated here.
#[derive(Debug, Error)]
pub enum SlicerError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The requested page is absent from a tree the converter did produce.
    ///
    /// Only surfaced when `raises_on_error` is set; lenient runs treat the
    /// page as having no usable document.
    #[error("Page {page} not found in the converted document")]
    PageNotFound { page: usize },

    /// The page-count probe could not read the source.
    #[error("Failed to count pages of '{source_name}': {detail}")]
    PageCountFailed { source_name: String, detail: String },

    // ── Stage errors ──────────────────────────────────────────────────────
    /// A converter stage could not be constructed.
    #[error("Failed to initialise the {stage} stage: {detail}")]
    StageInit { stage: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Place libpdfium next to the executable or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A stage-local failure reported by a [`crate::converter::Converter`].
#[derive(Debug, Clone, Error)]
pub enum ConverterError {
    /// The converter ran but could not produce a document.
    #[error("Conversion of pages {first}-{last} failed: {detail}")]
    ConversionFailed {
        first: usize,
        last: usize,
        detail: String,
    },

    /// The requested page does not exist in the source.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// The converter does not support the requested stage or source.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// pdfium-render returned an error.
    #[error("pdfium error: {0}")]
    Pdfium(String),
}
