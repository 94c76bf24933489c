//! pdfium-backed stages and page counting.
//!
//! Two stages are provided:
//!
//! * [`PdfiumTextConverter`] reads the native text layer, one text node per
//!   pdfium text segment. It is the fast stage: born-digital pages produce
//!   text immediately, scanned pages produce nothing and fall through.
//! * [`PdfiumPageImageConverter`] renders the page and emits it as a single
//!   picture node. No recogniser is bundled; supply an OCR-capable
//!   [`StageFactory`] to get text from scans.
//!
//! pdfium keeps thread-local state, so every call binds the library afresh
//! and runs synchronously on the calling thread. Async callers go through
//! [`crate::stream::extract_stream`], which moves the work onto a blocking
//! thread.

use crate::converter::{
    ConversionResult, Converter, PageCounter, Source, StageFactory, StageKind, StageOptions,
};
use crate::document::{BoundingBox, CoordOrigin, Document, Label, Node, PageInfo};
use crate::error::{ConverterError, SlicerError};
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, info, warn};

/// Reference of the synthetic root every emitted node hangs off.
pub const BODY_REF: &str = "#/body";

/// Bind to pdfium: a library next to the working directory first, then the
/// system library.
pub fn bind_pdfium() -> Result<Pdfium, SlicerError> {
    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| SlicerError::PdfiumBindingFailed(format!("{:?}", e)))
}

/// Load `source` and run `f` against the open document.
fn with_document<T>(
    source: &Source,
    password: Option<&str>,
    f: impl FnOnce(&PdfDocument<'_>) -> Result<T, ConverterError>,
) -> Result<T, ConverterError> {
    let pdfium = bind_pdfium().map_err(|e| ConverterError::Pdfium(e.to_string()))?;
    let document = match source {
        Source::Path(path) => pdfium.load_pdf_from_file(path, password),
        Source::Bytes { data, .. } => pdfium.load_pdf_from_byte_slice(&data[..], password),
    }
    .map_err(|e| ConverterError::Pdfium(format!("{}: {:?}", source.name(), e)))?;
    f(&document)
}

// ── Page counting ────────────────────────────────────────────────────────

/// Counts pages by opening the document with pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumPageCounter {
    password: Option<String>,
}

impl PdfiumPageCounter {
    pub fn new(password: Option<String>) -> Self {
        Self { password }
    }
}

impl PageCounter for PdfiumPageCounter {
    fn count_pages(&self, source: &Source) -> Result<usize, ConverterError> {
        with_document(source, self.password.as_deref(), |doc| {
            let count = doc.pages().len() as usize;
            info!("PDF loaded: {} pages", count);
            Ok(count)
        })
    }
}

// ── Shared page walk ─────────────────────────────────────────────────────

/// Run `emit` on every page of the range, collecting a single document.
///
/// With `page_images` set each page entry carries its render. Pages past the
/// end of the document fail the call in strict mode and are reported as
/// diagnostics otherwise.
fn convert_range(
    source: &Source,
    options: &StageOptions,
    page_range: (usize, usize),
    raises_on_error: bool,
    page_images: bool,
    mut emit: impl FnMut(&PdfPage<'_>, usize, &mut Document) -> Result<(), ConverterError>,
) -> Result<ConversionResult, ConverterError> {
    let (first, last) = page_range;
    let loaded = with_document(source, options.password.as_deref(), |pdf| {
        let pages = pdf.pages();
        let total = pages.len() as usize;
        let mut document = Document::new(source.name());
        document.push(Node::group(BODY_REF, Label::Text), 0);
        let mut errors = Vec::new();

        for page_no in first..=last {
            if page_no == 0 || page_no > total {
                if raises_on_error {
                    return Err(ConverterError::PageOutOfRange {
                        page: page_no,
                        total,
                    });
                }
                warn!("Skipping page {} (out of range, total={})", page_no, total);
                errors.push(format!("page {page_no} out of range ({total} pages)"));
                continue;
            }

            let page = pages
                .get((page_no - 1) as u16)
                .map_err(|e| ConverterError::Pdfium(format!("page {}: {:?}", page_no, e)))?;

            let mut info = PageInfo::new(page_no, page.width().value as f64, page.height().value as f64);
            if page_images {
                match render(&page, options.images_scale) {
                    Ok(image) => info = info.with_image(image),
                    Err(e) => errors.push(format!("page {page_no} render: {e}")),
                }
            }
            document.add_page(info);

            if let Err(e) = emit(&page, page_no, &mut document) {
                if raises_on_error {
                    return Err(e);
                }
                errors.push(e.to_string());
            }
        }
        Ok((document, errors))
    });

    match loaded {
        Ok((document, errors)) => Ok(ConversionResult {
            document: Some(document),
            errors,
        }),
        Err(e) if raises_on_error => Err(e),
        Err(e) => Ok(ConversionResult::empty(vec![e.to_string()])),
    }
}

fn render(page: &PdfPage<'_>, scale: f32) -> Result<DynamicImage, ConverterError> {
    let config = PdfRenderConfig::new().scale_page_by_factor(scale);
    let bitmap = page
        .render_with_config(&config)
        .map_err(|e| ConverterError::Pdfium(format!("{:?}", e)))?;
    let image = bitmap.as_image();
    debug!("Rendered page → {}x{} px", image.width(), image.height());
    Ok(image)
}

/// A text node for one segment, in PDF user space.
///
/// Refs carry the page number so they stay unique when pages are converted
/// one call at a time.
fn segment_node(
    index: usize,
    page_no: usize,
    text: String,
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
) -> Node {
    let bbox = BoundingBox::new(
        left as f64,
        top as f64,
        right as f64,
        bottom as f64,
        CoordOrigin::BottomLeft,
    );
    Node::text(format!("#/texts/{page_no}-{index}"), Label::Text, text)
        .with_parent(BODY_REF)
        .with_prov(page_no, bbox)
}

/// A picture node covering the whole page.
fn page_picture_node(page_no: usize, width: f64, height: f64) -> Node {
    Node::picture(format!("#/pictures/{page_no}"))
        .with_parent(BODY_REF)
        .with_prov(
            page_no,
            BoundingBox::new(0.0, height, width, 0.0, CoordOrigin::BottomLeft),
        )
}

// ── Text-layer stage ─────────────────────────────────────────────────────

/// Fast stage: the page's native text layer.
#[derive(Debug, Clone)]
pub struct PdfiumTextConverter {
    options: StageOptions,
}

impl PdfiumTextConverter {
    pub fn new(options: StageOptions) -> Self {
        Self { options }
    }
}

impl Converter for PdfiumTextConverter {
    fn convert(
        &self,
        source: &Source,
        page_range: (usize, usize),
        raises_on_error: bool,
    ) -> Result<ConversionResult, ConverterError> {
        let page_images = self.options.generate_page_images;
        convert_range(
            source,
            &self.options,
            page_range,
            raises_on_error,
            page_images,
            |page, page_no, doc| {
                let text = page
                    .text()
                    .map_err(|e| ConverterError::ConversionFailed {
                        first: page_no,
                        last: page_no,
                        detail: format!("{:?}", e),
                    })?;
                let mut emitted = 0;
                for segment in text.segments().iter() {
                    let content = segment.text();
                    if content.trim().is_empty() {
                        continue;
                    }
                    let bounds = segment.bounds();
                    doc.push(
                        segment_node(
                            emitted,
                            page_no,
                            content,
                            bounds.left().value,
                            bounds.top().value,
                            bounds.right().value,
                            bounds.bottom().value,
                        ),
                        1,
                    );
                    emitted += 1;
                }
                debug!("Page {}: {} text segments", page_no, emitted);
                Ok(())
            },
        )
    }
}

// ── Full-page stage ──────────────────────────────────────────────────────

/// Full stage: the rendered page as one picture node.
///
/// The render is produced once per page. It goes on the picture node when
/// picture images are enabled, and on the page entry otherwise.
#[derive(Debug, Clone)]
pub struct PdfiumPageImageConverter {
    options: StageOptions,
}

impl PdfiumPageImageConverter {
    pub fn new(options: StageOptions) -> Self {
        Self { options }
    }
}

impl Converter for PdfiumPageImageConverter {
    fn convert(
        &self,
        source: &Source,
        page_range: (usize, usize),
        raises_on_error: bool,
    ) -> Result<ConversionResult, ConverterError> {
        let options = &self.options;
        let page_images = full_stage_page_images(options);
        convert_range(
            source,
            options,
            page_range,
            raises_on_error,
            page_images,
            |page, page_no, doc| {
                let (width, height) = (page.width().value as f64, page.height().value as f64);
                let mut node = page_picture_node(page_no, width, height);
                if options.generate_picture_images {
                    node = node.with_image(render(page, options.images_scale)?);
                }
                doc.push(node, 1);
                Ok(())
            },
        )
    }
}

/// Whether the full stage puts its render on the page entry. The picture
/// node takes it instead whenever picture images are enabled.
fn full_stage_page_images(options: &StageOptions) -> bool {
    options.generate_page_images && !options.generate_picture_images
}

// ── Factory ──────────────────────────────────────────────────────────────

/// Builds [`PdfiumTextConverter`] for the fast stage and
/// [`PdfiumPageImageConverter`] for the full stage.
///
/// Binding is checked up front so a missing library fails at construction
/// rather than on the first page.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfiumStageFactory;

impl StageFactory for PdfiumStageFactory {
    fn create_stage(&self, options: &StageOptions) -> Result<Box<dyn Converter>, ConverterError> {
        bind_pdfium().map_err(|e| ConverterError::Pdfium(e.to_string()))?;
        Ok(match options.kind {
            StageKind::Fast => Box::new(PdfiumTextConverter::new(options.clone())),
            StageKind::FullOcr => Box::new(PdfiumPageImageConverter::new(options.clone())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::NodeKind;

    fn pdfium_tests_enabled() -> bool {
        std::env::var("PDFIUM_TESTS").is_ok()
    }

    #[test]
    fn segment_node_uses_pdf_user_space() {
        let node = segment_node(4, 2, "Hello".into(), 72.0, 720.5, 300.0, 700.25);
        assert_eq!(node.self_ref, "#/texts/2-4");
        assert_eq!(node.parent_ref.as_deref(), Some(BODY_REF));
        assert_eq!(node.prov.len(), 1);
        let prov = node.prov[0];
        assert_eq!(prov.page_no, 2);
        assert_eq!(prov.bbox.coord_origin, CoordOrigin::BottomLeft);
        assert_eq!((prov.bbox.left, prov.bbox.top), (72.0, 720.5));
        assert_eq!((prov.bbox.right, prov.bbox.bottom), (300.0, 700.25));
        assert!(matches!(node.kind, NodeKind::Text(ref t) if t.text == "Hello"));
    }

    #[test]
    fn page_picture_covers_page() {
        let node = page_picture_node(1, 612.0, 792.0);
        assert_eq!(node.self_ref, "#/pictures/1");
        assert_eq!(node.label, Label::Picture);
        let bbox = node.prov[0].bbox;
        assert_eq!((bbox.left, bbox.top, bbox.right, bbox.bottom), (0.0, 792.0, 612.0, 0.0));
    }

    #[test]
    fn refs_differ_between_pages() {
        let a = segment_node(0, 1, "a".into(), 0.0, 1.0, 1.0, 0.0);
        let b = segment_node(0, 2, "b".into(), 0.0, 1.0, 1.0, 0.0);
        assert_ne!(a.self_ref, b.self_ref);
        assert_ne!(
            page_picture_node(1, 10.0, 10.0).self_ref,
            page_picture_node(2, 10.0, 10.0).self_ref
        );
    }

    #[test]
    fn full_stage_renders_once() {
        let mut options = StageOptions::new(StageKind::FullOcr, 1.0);
        assert!(!full_stage_page_images(&options));
        options.generate_picture_images = false;
        assert!(full_stage_page_images(&options));
        options.generate_page_images = false;
        assert!(!full_stage_page_images(&options));
    }

    #[test]
    fn invalid_bytes_fail_to_count() {
        if !pdfium_tests_enabled() {
            return;
        }
        let source = Source::from_bytes("junk.pdf", b"not a pdf".to_vec());
        assert!(PdfiumPageCounter::default().count_pages(&source).is_err());
    }

    #[test]
    fn invalid_bytes_give_empty_result_when_lenient() {
        if !pdfium_tests_enabled() {
            return;
        }
        let source = Source::from_bytes("junk.pdf", b"not a pdf".to_vec());
        let conv = PdfiumTextConverter::new(StageOptions::new(StageKind::Fast, 1.0));
        let result = conv.convert(&source, (1, 1), false).expect("lenient");
        assert!(result.document.is_none());
        assert!(!result.errors.is_empty());
        assert!(conv.convert(&source, (1, 1), true).is_err());
    }
}
