//! Raster encoding: `DynamicImage` → bytes in the requested format → base64.
//!
//! Converters hand over decoded rasters (page renders, table and picture
//! crops). Output records carry them base64-encoded so a page serialises to
//! a single JSON document.

use crate::config::ImageFormat;
use crate::output::Image;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Borrowing view over one decoded raster.
#[derive(Debug, Clone, Copy)]
pub struct ImageExtractor<'a> {
    image: &'a DynamicImage,
}

impl<'a> ImageExtractor<'a> {
    pub fn new(image: &'a DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Encode the raster.
    ///
    /// `quality` (1–100) applies to JPEG. PNG is lossless; WEBP uses the
    /// `image` crate's lossless encoder, so quality is ignored for both.
    pub fn encode(&self, format: ImageFormat, quality: u8) -> Result<Vec<u8>, image::ImageError> {
        let mut buf = Vec::new();
        match format {
            ImageFormat::Jpeg => {
                // JPEG has no alpha channel.
                let rgb = self.image.to_rgb8();
                JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).encode_image(&rgb)?;
            }
            ImageFormat::Png => {
                self.image
                    .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
            }
            ImageFormat::Webp => {
                // The WebP encoder only accepts 8-bit RGB(A).
                DynamicImage::ImageRgba8(self.image.to_rgba8())
                    .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::WebP)?;
            }
        }
        Ok(buf)
    }

    /// Encode and wrap as an output [`Image`].
    pub fn to_image(&self, format: ImageFormat, quality: u8) -> Result<Image, image::ImageError> {
        let bytes = self.encode(format, quality)?;
        let data = STANDARD.encode(&bytes);
        debug!(
            "Encoded {}x{} raster → {} bytes base64 ({})",
            self.width(),
            self.height(),
            data.len(),
            format.mime_type()
        );
        Ok(Image {
            data,
            content_type: format.mime_type().to_string(),
            width: self.width(),
            height: self.height(),
        })
    }
}
