//! Stage orchestration: convert each page with the cheapest stage that
//! yields text, falling back to the next stage otherwise.
//!
//! ## Stage acceptance
//!
//! For every page the stages run in pipeline order, each on the single-page
//! range `(n, n)`:
//!
//! 1. A stage that returns an error is logged and skipped.
//! 2. A stage whose result has no document is logged and skipped.
//! 3. A page with at least one non-empty normalised text node is accepted.
//! 4. The last stage's page is accepted even without text, so a genuinely
//!    blank page still yields its geometry and render.
//!
//! No stage yielding a document leaves the page as `None`. Stage failures
//! never escape [`ContentExtractor::extract_page`]; only a converted tree
//! that lacks the requested page escalates, and only in strict mode.

use crate::config::ExtractionConfig;
use crate::converter::{PageCounter, Source, Stage, StageFactory, StageKind, StageOptions};
use crate::error::SlicerError;
use crate::extract::page::PageExtractor;
use crate::output::{ExtractionOutput, Page};
use crate::pdfium::{PdfiumPageCounter, PdfiumStageFactory};
use std::fmt;
use tracing::{debug, error, info, warn};

/// MIME type reported for every extracted source.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Decomposes a PDF into pages of slices.
///
/// Holds the source, the configuration and one converter per stage. The
/// converters are built once and reused for every page.
pub struct ContentExtractor {
    source: Source,
    config: ExtractionConfig,
    stages: Vec<Stage>,
    page_counter: Box<dyn PageCounter>,
}

impl ContentExtractor {
    /// Build the stages for `config.ocr_pipeline` through `factory`.
    ///
    /// # Errors
    /// [`SlicerError::FileNotFound`] for a path source that does not exist,
    /// [`SlicerError::StageInit`] if the factory cannot build a stage.
    pub fn new(
        source: Source,
        config: ExtractionConfig,
        factory: &dyn StageFactory,
    ) -> Result<Self, SlicerError> {
        if let Source::Path(path) = &source {
            if !path.exists() {
                return Err(SlicerError::FileNotFound { path: path.clone() });
            }
        }

        let stages = config
            .ocr_pipeline
            .stages()
            .iter()
            .map(|&kind| build_stage(kind, &config, factory))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::from_stages(source, config, stages))
    }

    /// Build from raw bytes, named after `config.filename`.
    pub fn from_bytes(
        data: impl Into<std::sync::Arc<[u8]>>,
        config: ExtractionConfig,
        factory: &dyn StageFactory,
    ) -> Result<Self, SlicerError> {
        let source = Source::from_bytes(config.filename.clone(), data);
        Self::new(source, config, factory)
    }

    /// Build with the bundled pdfium stages.
    pub fn with_pdfium(source: Source, config: ExtractionConfig) -> Result<Self, SlicerError> {
        Self::new(source, config, &PdfiumStageFactory)
    }

    /// Use prebuilt stages, tried in the given order.
    pub fn from_stages(source: Source, config: ExtractionConfig, stages: Vec<Stage>) -> Self {
        let page_counter = Box::new(PdfiumPageCounter::new(config.password.clone()));
        Self {
            source,
            config,
            stages,
            page_counter,
        }
    }

    /// Replace the page-count probe used when no last page is given.
    pub fn with_page_counter(mut self, counter: impl PageCounter + 'static) -> Self {
        self.page_counter = Box::new(counter);
        self
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Stage kinds in the order they are tried.
    pub fn stage_kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(Stage::kind).collect()
    }

    /// Number of pages in the source, via the page-count probe.
    pub fn count_pages(&self) -> Result<usize, SlicerError> {
        self.page_counter
            .count_pages(&self.source)
            .map_err(|e| SlicerError::PageCountFailed {
                source_name: self.source.name(),
                detail: e.to_string(),
            })
    }

    /// Convert one page, numbering its slices from 1.
    pub fn extract_page(&self, page_no: usize) -> Result<Option<PageExtractor>, SlicerError> {
        self.extract_page_from(page_no, 1)
    }

    /// Convert one page, numbering its slices from `first_slice_no`.
    ///
    /// # Errors
    /// [`SlicerError::PageNotFound`] when a stage returns a tree without the
    /// page and `raises_on_error` is set. Every other stage failure is
    /// recovered.
    pub fn extract_page_from(
        &self,
        page_no: usize,
        first_slice_no: usize,
    ) -> Result<Option<PageExtractor>, SlicerError> {
        let callback = self.config.progress_callback.as_ref();
        let raises = self.config.raises_on_error;
        if let Some(cb) = callback {
            cb.on_page_start(page_no);
        }

        let last = self.stages.len().saturating_sub(1);
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                let from = self.stages[i - 1].kind().to_string();
                debug!("Page {}: falling back from {} to {}", page_no, from, stage.kind());
                if let Some(cb) = callback {
                    cb.on_stage_fallback(page_no, &from, &stage.kind().to_string());
                }
            }

            let result = match stage.convert(&self.source, page_no, raises) {
                Ok(r) => r,
                Err(e) => {
                    error!("Failed to convert page {} ({} stage): {}", page_no, stage.kind(), e);
                    continue;
                }
            };
            for msg in &result.errors {
                debug!("Page {} ({} stage) diagnostic: {}", page_no, stage.kind(), msg);
            }

            let Some(document) = result.document else {
                warn!("{} stage produced no document for page {}", stage.kind(), page_no);
                continue;
            };

            let page = match PageExtractor::new(
                document,
                page_no,
                first_slice_no,
                self.config.bbox_precision,
            ) {
                Ok(p) => p.with_image_options(self.config.image_options()),
                Err(e) if raises => return Err(e),
                Err(e) => {
                    warn!("{} stage: {}", stage.kind(), e);
                    continue;
                }
            };

            if i == last || page.has_text_slices() {
                debug!("Page {} accepted from {} stage", page_no, stage.kind());
                if let Some(cb) = callback {
                    cb.on_page_complete(page_no, page.slice_count());
                }
                return Ok(Some(page));
            }
        }

        warn!("No stage produced page {}", page_no);
        if let Some(cb) = callback {
            cb.on_page_skipped(page_no);
        }
        Ok(None)
    }

    /// Lazily convert pages `first_page..=last_page`.
    ///
    /// An unset `last_page` is resolved through the page-count probe. Page
    /// numbers start at 1; a `first_page` of 0 is treated as 1. A range with
    /// `first_page > last_page` yields nothing.
    pub fn extract_pages(
        &self,
        first_page: usize,
        last_page: Option<usize>,
    ) -> Result<PageIter<'_>, SlicerError> {
        let first_page = first_page.max(1);
        let last_page = match last_page {
            Some(n) => n,
            None => self.count_pages()?,
        };
        debug!("Processing page range {} to {}", first_page, last_page);
        if let Some(cb) = &self.config.progress_callback {
            cb.on_extraction_start(first_page, last_page);
        }

        Ok(PageIter {
            extractor: self,
            next_page: first_page,
            last_page,
            next_slice_no: 1,
            pages_accepted: 0,
            finished: false,
        })
    }

    /// Convert the range into output pages, dropping pages no stage produced.
    pub fn extract_pages_model(
        &self,
        first_page: usize,
        last_page: Option<usize>,
    ) -> Result<Vec<Page>, SlicerError> {
        let mut pages = Vec::new();
        for item in self.extract_pages(first_page, last_page)? {
            if let (_, Some(page)) = item? {
                pages.push(page.into_page());
            }
        }
        Ok(pages)
    }

    /// Convert the range and wrap it with the source's metadata.
    pub fn extract_document(
        &self,
        first_page: usize,
        last_page: Option<usize>,
    ) -> Result<ExtractionOutput, SlicerError> {
        info!("Starting extraction: {}", self.source.name());
        let pages = self.extract_pages_model(first_page, last_page)?;
        let output = ExtractionOutput {
            document: self.source.name(),
            size: self.source.size(),
            content_type: PDF_CONTENT_TYPE.to_string(),
            pages,
        };
        info!(
            "Extraction complete: {} pages, {} slices",
            output.pages.len(),
            output.slice_count()
        );
        Ok(output)
    }
}

impl fmt::Debug for ContentExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentExtractor")
            .field("source", &self.source)
            .field("config", &self.config)
            .field("stages", &self.stages)
            .finish()
    }
}

fn build_stage(
    kind: StageKind,
    config: &ExtractionConfig,
    factory: &dyn StageFactory,
) -> Result<Stage, SlicerError> {
    let mut options = StageOptions::new(kind, config.images_scale);
    options.password = config.password.clone();
    info!("Initialising {} stage (images_scale={})", kind, options.images_scale);
    factory
        .create_stage(&options)
        .map(|converter| Stage::new(kind, converter))
        .map_err(|e| SlicerError::StageInit {
            stage: kind.to_string(),
            detail: e.to_string(),
        })
}

/// Forward-only iterator over a page range.
///
/// Each call to `next` converts exactly one page. The iterator carries the
/// running slice number so slice numbers are continuous across pages. After
/// an error it is exhausted.
pub struct PageIter<'a> {
    extractor: &'a ContentExtractor,
    next_page: usize,
    last_page: usize,
    next_slice_no: usize,
    pages_accepted: usize,
    finished: bool,
}

impl PageIter<'_> {
    /// Number the next accepted page's first slice will get.
    pub fn next_slice_no(&self) -> usize {
        self.next_slice_no
    }

    fn finish(&mut self) {
        self.finished = true;
        if let Some(cb) = &self.extractor.config.progress_callback {
            cb.on_extraction_complete(self.pages_accepted, self.next_slice_no - 1);
        }
    }
}

impl Iterator for PageIter<'_> {
    type Item = Result<(usize, Option<PageExtractor>), SlicerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.next_page > self.last_page {
            self.finish();
            return None;
        }

        let page_no = self.next_page;
        self.next_page += 1;

        match self.extractor.extract_page_from(page_no, self.next_slice_no) {
            Ok(Some(page)) => {
                self.next_slice_no = page.next_slice_no();
                self.pages_accepted += 1;
                Some(Ok((page_no, Some(page))))
            }
            Ok(None) => Some(Ok((page_no, None))),
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for PageIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::ConversionResult;
    use crate::document::{BoundingBox, CoordOrigin, Document, Label, Node, PageInfo};
    use crate::error::ConverterError;

    fn text_page(page_no: usize, text: &str) -> Document {
        let mut doc = Document::new("t.pdf");
        doc.add_page(PageInfo::new(page_no, 612.0, 792.0));
        doc.push(
            Node::text(format!("#/texts/{page_no}"), Label::Text, text).with_prov(
                page_no,
                BoundingBox::new(0.0, 10.0, 10.0, 0.0, CoordOrigin::BottomLeft),
            ),
            1,
        );
        doc
    }

    fn stage(kind: StageKind, text: &'static str) -> Stage {
        Stage::new(
            kind,
            Box::new(
                move |_: &Source, (p, _): (usize, usize), _: bool| -> Result<ConversionResult, ConverterError> {
                    Ok(ConversionResult::success(text_page(p, text)))
                },
            ),
        )
    }

    fn extractor(stages: Vec<Stage>) -> ContentExtractor {
        ContentExtractor::from_stages(
            Source::from_bytes("t.pdf", Vec::new()),
            ExtractionConfig::default(),
            stages,
        )
        .with_page_counter(|_: &Source| -> Result<usize, ConverterError> { Ok(3) })
    }

    #[test]
    fn first_stage_with_text_wins() {
        let ex = extractor(vec![stage(StageKind::Fast, "fast"), stage(StageKind::FullOcr, "ocr")]);
        let page = ex.extract_page(1).expect("ok").expect("page");
        let text = page.slices().next().and_then(|(_, s)| s.content_text());
        assert_eq!(text.as_deref(), Some("fast"));
    }

    #[test]
    fn empty_fast_result_falls_back() {
        let ex = extractor(vec![stage(StageKind::Fast, " "), stage(StageKind::FullOcr, "ocr")]);
        let page = ex.extract_page(2).expect("ok").expect("page");
        let text = page.slices().next().and_then(|(_, s)| s.content_text());
        assert_eq!(text.as_deref(), Some("ocr"));
    }

    #[test]
    fn no_stages_yields_none() {
        let ex = extractor(vec![]);
        assert!(ex.extract_page(1).expect("ok").is_none());
    }

    #[test]
    fn unset_last_page_uses_counter() {
        let ex = extractor(vec![stage(StageKind::Fast, "x")]);
        let pages: Vec<usize> = ex
            .extract_pages(1, None)
            .expect("range")
            .map(|r| r.expect("page").0)
            .collect();
        assert_eq!(pages, vec![1, 2, 3]);
    }

    #[test]
    fn inverted_range_is_empty() {
        let ex = extractor(vec![stage(StageKind::Fast, "x")]);
        assert_eq!(ex.extract_pages(3, Some(2)).expect("range").count(), 0);
    }

    #[test]
    fn count_failure_is_fatal() {
        let ex = extractor(vec![]).with_page_counter(|_: &Source| -> Result<usize, ConverterError> {
            Err(ConverterError::Unsupported("not a pdf".into()))
        });
        let err = ex.extract_pages(1, None).err().expect("count fails");
        assert!(matches!(err, SlicerError::PageCountFailed { .. }));
    }

    #[test]
    fn missing_path_is_rejected() {
        let err = ContentExtractor::new(
            Source::from_path("/definitely/not/here.pdf"),
            ExtractionConfig::default(),
            &PdfiumStageFactory,
        )
        .expect_err("missing file");
        assert!(matches!(err, SlicerError::FileNotFound { .. }));
    }

    #[test]
    fn extract_document_reports_metadata() {
        let ex = extractor(vec![stage(StageKind::Fast, "x")]);
        let out = ex.extract_document(1, Some(2)).expect("document");
        assert_eq!(out.document, "t.pdf");
        assert_eq!(out.size, Some(0));
        assert_eq!(out.content_type, PDF_CONTENT_TYPE);
        assert_eq!(out.pages.len(), 2);
    }
}
