//! Configuration types for page decomposition.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. One struct carries every knob so a
//! run can be logged, cloned onto a worker, or compared against another run.

use crate::converter::StageKind;
use crate::error::SlicerError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration for an extraction.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf_slicer::{ExtractionConfig, ImageFormat, OcrPipeline};
///
/// let config = ExtractionConfig::builder()
///     .ocr_pipeline(OcrPipeline::Hybrid)
///     .image_format(ImageFormat::Png)
///     .bbox_precision(3)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Which stages run, and in what order. Default: [`OcrPipeline::Hybrid`].
    pub ocr_pipeline: OcrPipeline,

    /// Declared filename used when the source is raw bytes. Default: "file.pdf".
    pub filename: String,

    /// Scale factor for page, table and picture renders. Range: (0, 10]. Default: 3.0.
    ///
    /// 1.0 renders at 72 DPI; 3.0 gives 216 DPI, enough for a recogniser to
    /// read small print on the full-page stage.
    pub images_scale: f32,

    /// Decimal places kept in emitted positions. Range: 0–6. Default: 2.
    pub bbox_precision: u32,

    /// Encoding for every emitted raster. Default: [`ImageFormat::Webp`].
    pub image_format: ImageFormat,

    /// JPEG quality, 1–100. Default: 80.
    ///
    /// PNG and WEBP are encoded losslessly and ignore this value; the
    /// `image` crate has no lossy WebP encoder.
    pub image_quality: u8,

    /// Attach the page render to each [`crate::output::Page`]. Default: true.
    pub include_page_screenshot: bool,

    /// Attach table/picture renders to slices. Default: true.
    pub include_slice_screenshot: bool,

    /// Strict mode: a page missing from a converted tree is an error rather
    /// than a skipped stage. Also forwarded to every converter. Default: false.
    pub raises_on_error: bool,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            ocr_pipeline: OcrPipeline::default(),
            filename: "file.pdf".to_string(),
            images_scale: 3.0,
            bbox_precision: 2,
            image_format: ImageFormat::default(),
            image_quality: 80,
            include_page_screenshot: true,
            include_slice_screenshot: true,
            raises_on_error: false,
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("ocr_pipeline", &self.ocr_pipeline)
            .field("filename", &self.filename)
            .field("images_scale", &self.images_scale)
            .field("bbox_precision", &self.bbox_precision)
            .field("image_format", &self.image_format)
            .field("image_quality", &self.image_quality)
            .field("include_page_screenshot", &self.include_page_screenshot)
            .field("include_slice_screenshot", &self.include_slice_screenshot)
            .field("raises_on_error", &self.raises_on_error)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Output options derived from this config.
    pub fn image_options(&self) -> ImageOptions {
        ImageOptions {
            format: self.image_format,
            quality: self.image_quality,
            include_page_screenshot: self.include_page_screenshot,
            include_slice_screenshot: self.include_slice_screenshot,
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn ocr_pipeline(mut self, pipeline: OcrPipeline) -> Self {
        self.config.ocr_pipeline = pipeline;
        self
    }

    pub fn filename(mut self, name: impl Into<String>) -> Self {
        self.config.filename = name.into();
        self
    }

    pub fn images_scale(mut self, scale: f32) -> Self {
        self.config.images_scale = scale;
        self
    }

    pub fn bbox_precision(mut self, places: u32) -> Self {
        self.config.bbox_precision = places.min(6);
        self
    }

    pub fn image_format(mut self, format: ImageFormat) -> Self {
        self.config.image_format = format;
        self
    }

    /// JPEG quality, clamped to 1–100. PNG and WEBP output is lossless.
    pub fn image_quality(mut self, quality: u8) -> Self {
        self.config.image_quality = quality.clamp(1, 100);
        self
    }

    pub fn include_page_screenshot(mut self, v: bool) -> Self {
        self.config.include_page_screenshot = v;
        self
    }

    pub fn include_slice_screenshot(mut self, v: bool) -> Self {
        self.config.include_slice_screenshot = v;
        self
    }

    pub fn raises_on_error(mut self, v: bool) -> Self {
        self.config.raises_on_error = v;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, SlicerError> {
        let c = &self.config;
        if !(c.images_scale > 0.0 && c.images_scale <= 10.0) {
            return Err(SlicerError::InvalidConfig(format!(
                "images_scale must be in (0, 10], got {}",
                c.images_scale
            )));
        }
        if c.filename.trim().is_empty() {
            return Err(SlicerError::InvalidConfig("filename must not be empty".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which recognition stages an extraction runs.
///
/// | Mode | Stages | Use case |
/// |------|--------|----------|
/// | Fast | fast | Born-digital PDFs with a text layer |
/// | Full | full-ocr | Scans only; skip the text layer entirely |
/// | Hybrid | fast, then full-ocr for pages without text | Mixed documents (default) |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrPipeline {
    Fast,
    Full,
    #[default]
    Hybrid,
}

impl OcrPipeline {
    /// Stage kinds in the order they are tried.
    pub fn stages(&self) -> &'static [StageKind] {
        match self {
            OcrPipeline::Fast => &[StageKind::Fast],
            OcrPipeline::Full => &[StageKind::FullOcr],
            OcrPipeline::Hybrid => &[StageKind::Fast, StageKind::FullOcr],
        }
    }
}

/// Raster encoding for emitted images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Webp,
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Webp => "image/webp",
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

/// The subset of [`ExtractionConfig`] needed to assemble output records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageOptions {
    pub format: ImageFormat,
    pub quality: u8,
    pub include_page_screenshot: bool,
    pub include_slice_screenshot: bool,
}

impl Default for ImageOptions {
    fn default() -> Self {
        ExtractionConfig::default().image_options()
    }
}
