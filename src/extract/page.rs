//! One accepted page of a converted document.

use crate::config::ImageOptions;
use crate::document::{Document, NodeKind};
use crate::error::SlicerError;
use crate::extract::image::ImageExtractor;
use crate::extract::slice::SliceExtractor;
use crate::extract::text::clean_text;
use crate::output::{Page, Slice};
use once_cell::unsync::OnceCell;
use tracing::{debug, warn};

/// Owns the converted tree of a single page and numbers its slices.
///
/// Slice numbers start at `first_slice_no` and increase by one for every
/// node that becomes a slice; nodes without content are skipped before
/// numbering, so numbers have no gaps.
///
/// Slice records are assembled at most once, on the first call that needs
/// them ([`slice_count`](Self::slice_count), [`to_page`](Self::to_page) and
/// friends), and reused afterwards.
#[derive(Debug)]
pub struct PageExtractor {
    document: Document,
    page_no: usize,
    width: f64,
    height: f64,
    first_slice_no: usize,
    bbox_precision: u32,
    options: ImageOptions,
    assembled: OnceCell<Vec<Slice>>,
}

impl PageExtractor {
    /// Wrap `document` for `page_no`.
    ///
    /// # Errors
    /// [`SlicerError::PageNotFound`] if the tree has no entry for the page.
    pub fn new(
        document: Document,
        page_no: usize,
        first_slice_no: usize,
        bbox_precision: u32,
    ) -> Result<Self, SlicerError> {
        let info = document
            .page(page_no)
            .ok_or(SlicerError::PageNotFound { page: page_no })?;
        let (width, height) = (info.width, info.height);
        Ok(Self {
            document,
            page_no,
            width,
            height,
            first_slice_no,
            bbox_precision,
            options: ImageOptions::default(),
            assembled: OnceCell::new(),
        })
    }

    /// Output options used to decide which nodes become slices and how
    /// renders are encoded.
    pub fn with_image_options(mut self, options: ImageOptions) -> Self {
        self.options = options;
        self.assembled = OnceCell::new();
        self
    }

    pub fn page_no(&self) -> usize {
        self.page_no
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn first_slice_no(&self) -> usize {
        self.first_slice_no
    }

    pub fn image_options(&self) -> &ImageOptions {
        &self.options
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Render of the whole page, if the converter produced one.
    pub fn screenshot(&self) -> Option<ImageExtractor<'_>> {
        self.document
            .page(self.page_no)
            .and_then(|p| p.image.as_ref())
            .map(ImageExtractor::new)
    }

    /// True when at least one text node on the page still has text after
    /// normalisation. This is the stage acceptance test: a text layer made
    /// only of glyph placeholders counts as empty.
    pub fn has_text_slices(&self) -> bool {
        self.document
            .iterate_items(Some(self.page_no))
            .any(|(node, _)| match &node.kind {
                NodeKind::Text(t) => !clean_text(&t.text).is_empty(),
                _ => false,
            })
    }

    /// Slices on this page in document order, lazily, with their numbers.
    ///
    /// Nodes whose only content is a render are kept only when slice
    /// screenshots are enabled. A render that later fails to encode drops
    /// its slice at assembly, and the assembled records are renumbered
    /// without the gap.
    pub fn slices(&self) -> impl Iterator<Item = (usize, SliceExtractor<'_>)> + '_ {
        let first = self.first_slice_no;
        let precision = self.bbox_precision;
        let options = &self.options;
        let document = &self.document;
        document
            .iterate_items(Some(self.page_no))
            .filter(|(node, _)| SliceExtractor::is_eligible(node))
            .map(move |(node, level)| {
                SliceExtractor::new(document, node, level).with_bbox_precision(precision)
            })
            .filter(move |slice| slice.has_content(options))
            .enumerate()
            .map(move |(i, slice)| (first + i, slice))
    }

    /// Output records for this page's slices, assembled on first use.
    pub fn assembled_slices(&self) -> &[Slice] {
        self.assembled.get_or_init(|| {
            let mut next = self.first_slice_no;
            let slices: Vec<Slice> = self
                .slices()
                .filter_map(|(_, slice)| {
                    let out = slice.to_slice(next, &self.options)?;
                    next += 1;
                    Some(out)
                })
                .collect();
            debug!("Page {}: {} slices", self.page_no, slices.len());
            slices
        })
    }

    pub fn slice_count(&self) -> usize {
        self.assembled_slices().len()
    }

    /// First number the next page should use.
    pub fn next_slice_no(&self) -> usize {
        self.first_slice_no + self.slice_count()
    }

    /// Assemble the output record.
    pub fn to_page(&self) -> Page {
        self.page_with(self.assembled_slices().to_vec())
    }

    /// Assemble the output record, moving the cached slices out.
    pub fn into_page(mut self) -> Page {
        self.assembled_slices();
        let slices = self.assembled.take().unwrap_or_default();
        self.page_with(slices)
    }

    fn page_with(&self, slices: Vec<Slice>) -> Page {
        let options = &self.options;
        let screenshot = if options.include_page_screenshot {
            self.screenshot()
                .and_then(|img| match img.to_image(options.format, options.quality) {
                    Ok(image) => Some(image),
                    Err(e) => {
                        warn!("Failed to encode render of page {}: {}", self.page_no, e);
                        None
                    }
                })
        } else {
            None
        };

        Page {
            page_no: self.page_no,
            width: self.width,
            height: self.height,
            screenshot,
            slices,
        }
    }
}
