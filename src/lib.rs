//! # pdf-slicer
//!
//! Decompose PDF pages into typed, positioned content slices, falling back
//! to full-page recognition on pages without a usable text layer.
//!
//! ## Why slices?
//!
//! Search indexes and retrieval pipelines want small, self-contained pieces
//! of a document: a paragraph, a table, a figure with its caption. Each
//! piece needs its page and bounding box so results can be highlighted in
//! the original. This crate flattens a converter's document tree into such
//! pieces, numbered continuously across the whole document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Stages   fast (text layer) → full-ocr, per page, first with text wins
//!  ├─ 2. Page     scope the converted tree to the page, number its slices
//!  ├─ 3. Slice    text / table grid / caption / positions per node
//!  ├─ 4. Clean    strip glyph placeholders, collapse whitespace
//!  ├─ 5. Images   page and region renders → webp/png/jpeg → base64
//!  └─ 6. Output   Page / Slice records, serialisable to JSON
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_slicer::{ContentExtractor, ExtractionConfig, Source};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::default();
//!     let extractor = ContentExtractor::with_pdfium(Source::from_path("report.pdf"), config)?;
//!     for item in extractor.extract_pages(1, None)? {
//!         let (page_no, page) = item?;
//!         match page {
//!             Some(page) => println!("page {page_no}: {} slices", page.slice_count()),
//!             None => println!("page {page_no}: skipped"),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfslice` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-slicer = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod converter;
pub mod document;
pub mod error;
pub mod extract;
pub mod output;
pub mod pdfium;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, ImageFormat, ImageOptions, OcrPipeline};
pub use converter::{
    ConversionResult, Converter, PageCounter, Source, Stage, StageFactory, StageKind, StageOptions,
};
pub use document::{CellValue, CoordOrigin, Document, Label, Node, NodeKind, PageInfo};
pub use error::{ConverterError, SlicerError};
pub use extract::{clean_text, ContentExtractor, ImageExtractor, PageExtractor, PageIter, SliceExtractor};
pub use output::{write_output, ExtractionOutput, Image, Page, Position, Slice};
pub use pdfium::{PdfiumPageCounter, PdfiumStageFactory};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{extract_stream, PageStream};
