//! Page decomposition, leaves first.
//!
//! | Module | Role |
//! |--------|------|
//! | [`text`] | Strip recognition artefacts from extracted text |
//! | [`image`] | Encode rasters to base64 output images |
//! | [`slice`] | One tree node as a typed slice |
//! | [`page`] | One accepted page and its slice numbering |
//! | [`content`] | Stage orchestration over a page range |

pub mod content;
pub mod image;
pub mod page;
pub mod slice;
pub mod text;

pub use content::{ContentExtractor, PageIter, PDF_CONTENT_TYPE};
pub use image::ImageExtractor;
pub use page::PageExtractor;
pub use slice::{SliceExtractor, DEFAULT_BBOX_PRECISION};
pub use text::clean_text;
