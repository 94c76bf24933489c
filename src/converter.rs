//! The external converter contract.
//!
//! A [`Converter`] turns a page range of a [`Source`] into a [`Document`]
//! tree. Recognition, layout analysis and table structure all happen behind
//! this trait; the extractor only orchestrates stages and reads the tree.
//!
//! Converters are explicit handles. A [`StageFactory`] builds one per stage
//! when a [`crate::extract::ContentExtractor`] is constructed, and the
//! extractor reuses it for every page. There is no process-wide cache.

use crate::document::Document;
use crate::error::ConverterError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The document to decompose: raw bytes with a declared filename, or a path.
#[derive(Clone)]
pub enum Source {
    Bytes { name: String, data: Arc<[u8]> },
    Path(PathBuf),
}

impl Source {
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Source::Bytes {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Source::Path(path.as_ref().to_path_buf())
    }

    /// Declared filename for bytes, file name for paths.
    pub fn name(&self) -> String {
        match self {
            Source::Bytes { name, .. } => name.clone(),
            Source::Path(p) => p
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.display().to_string()),
        }
    }

    /// Size in bytes, if it can be determined without reading the file.
    pub fn size(&self) -> Option<usize> {
        match self {
            Source::Bytes { data, .. } => Some(data.len()),
            Source::Path(p) => std::fs::metadata(p).ok().map(|m| m.len() as usize),
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Bytes { name, data } => f
                .debug_struct("Bytes")
                .field("name", name)
                .field("len", &data.len())
                .finish(),
            Source::Path(p) => f.debug_tuple("Path").field(p).finish(),
        }
    }
}

/// Outcome of one converter call.
///
/// `document` is `None` when the converter ran but produced nothing usable;
/// `errors` carries whatever diagnostics it collected along the way.
#[derive(Debug, Default)]
pub struct ConversionResult {
    pub document: Option<Document>,
    pub errors: Vec<String>,
}

impl ConversionResult {
    pub fn success(document: Document) -> Self {
        Self {
            document: Some(document),
            errors: Vec::new(),
        }
    }

    pub fn empty(errors: Vec<String>) -> Self {
        Self {
            document: None,
            errors,
        }
    }
}

/// Turns a page range of a source into a document tree.
///
/// Implementations are used sequentially by one extractor. They must be
/// `Send` so an extractor can move onto a blocking thread, but are not
/// required to be reentrant.
pub trait Converter: Send {
    /// Convert pages `page_range.0..=page_range.1` (1-indexed).
    ///
    /// With `raises_on_error` unset, a converter should prefer returning a
    /// partial or empty [`ConversionResult`] over an error.
    fn convert(
        &self,
        source: &Source,
        page_range: (usize, usize),
        raises_on_error: bool,
    ) -> Result<ConversionResult, ConverterError>;
}

impl<F> Converter for F
where
    F: Fn(&Source, (usize, usize), bool) -> Result<ConversionResult, ConverterError> + Send,
{
    fn convert(
        &self,
        source: &Source,
        page_range: (usize, usize),
        raises_on_error: bool,
    ) -> Result<ConversionResult, ConverterError> {
        self(source, page_range, raises_on_error)
    }
}

/// Which recognition pass a stage runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Cheap pass: native text layer, OCR only on bitmap regions.
    Fast,
    /// Expensive pass: recognise the whole rendered page.
    FullOcr,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Fast => f.write_str("fast"),
            StageKind::FullOcr => f.write_str("full-ocr"),
        }
    }
}

/// Settings a [`StageFactory`] receives for each stage it builds.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOptions {
    pub kind: StageKind,
    /// Scale factor for page, table and picture renders. 1.0 = 72 DPI.
    pub images_scale: f32,
    pub generate_page_images: bool,
    pub generate_picture_images: bool,
    pub generate_table_images: bool,
    /// Minimum OCR confidence for a recognised word to be kept.
    pub ocr_confidence_threshold: f32,
    /// Fraction of page area a bitmap must cover before the fast stage OCRs it.
    pub ocr_bitmap_area_threshold: f32,
    pub password: Option<String>,
}

impl StageOptions {
    pub fn new(kind: StageKind, images_scale: f32) -> Self {
        Self {
            kind,
            images_scale,
            generate_page_images: true,
            generate_picture_images: true,
            generate_table_images: true,
            ocr_confidence_threshold: 0.01,
            ocr_bitmap_area_threshold: 0.1,
            password: None,
        }
    }

    pub fn is_full_ocr(&self) -> bool {
        self.kind == StageKind::FullOcr
    }
}

/// Builds the converter for a stage.
pub trait StageFactory {
    fn create_stage(&self, options: &StageOptions) -> Result<Box<dyn Converter>, ConverterError>;
}

/// One configured converter plus the pass it runs.
pub struct Stage {
    kind: StageKind,
    converter: Box<dyn Converter>,
}

impl Stage {
    pub fn new(kind: StageKind, converter: Box<dyn Converter>) -> Self {
        Self { kind, converter }
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn convert(
        &self,
        source: &Source,
        page_no: usize,
        raises_on_error: bool,
    ) -> Result<ConversionResult, ConverterError> {
        self.converter
            .convert(source, (page_no, page_no), raises_on_error)
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("kind", &self.kind)
            .field("converter", &"<dyn Converter>")
            .finish()
    }
}

/// Probe for the number of pages in a source.
pub trait PageCounter: Send {
    fn count_pages(&self, source: &Source) -> Result<usize, ConverterError>;
}

impl<F> PageCounter for F
where
    F: Fn(&Source) -> Result<usize, ConverterError> + Send,
{
    fn count_pages(&self, source: &Source) -> Result<usize, ConverterError> {
        self(source)
    }
}
