//! Output records: the JSON-serialisable product of an extraction.
//!
//! Records are built once by [`crate::extract::PageExtractor::to_page`] and
//! [`crate::extract::SliceExtractor::to_slice`] and never mutated afterwards.

use crate::document::{CellValue, CoordOrigin, Label};
use crate::error::SlicerError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A base64-encoded raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    /// Base64 (standard alphabet) of the encoded bytes.
    pub data: String,
    /// MIME type of the encoded bytes, e.g. `image/webp`.
    pub content_type: String,
    pub width: u32,
    pub height: u32,
}

/// One region of a slice, in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub page_no: usize,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
    pub coord_origin: CoordOrigin,
}

/// One flattened content fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    /// Document-wide sequence number, starting at 1.
    pub slice_no: usize,
    /// Depth of the node in the source hierarchy.
    pub level: usize,
    #[serde(rename = "ref")]
    pub ref_id: String,
    pub parent_ref: Option<String>,
    pub label: Label,
    pub content_text: Option<String>,
    pub caption_text: Option<String>,
    /// Row-major grid; row 0 is the header row when the table has one.
    pub table_data: Option<Vec<Vec<CellValue>>>,
    pub screenshot: Option<Image>,
    pub positions: Vec<Position>,
}

/// One page of output, slices in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub page_no: usize,
    pub width: f64,
    pub height: f64,
    pub screenshot: Option<Image>,
    pub slices: Vec<Slice>,
}

/// Everything extracted from one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Declared or on-disk filename.
    pub document: String,
    /// Source size in bytes, when known.
    pub size: Option<usize>,
    pub content_type: String,
    pub pages: Vec<Page>,
}

impl ExtractionOutput {
    pub fn slice_count(&self) -> usize {
        self.pages.iter().map(|p| p.slices.len()).sum()
    }

    /// All slices across pages, in order.
    pub fn slices(&self) -> impl Iterator<Item = &Slice> + '_ {
        self.pages.iter().flat_map(|p| p.slices.iter())
    }
}

/// Write `output` as pretty JSON to `path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_output(output: &ExtractionOutput, path: impl AsRef<Path>) -> Result<(), SlicerError> {
    let path = path.as_ref();
    let write_err = |e: std::io::Error| SlicerError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let json = serde_json::to_vec_pretty(output)
        .map_err(|e| SlicerError::Internal(format!("Failed to serialise output: {}", e)))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &json).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(no: usize) -> Slice {
        Slice {
            slice_no: no,
            level: 1,
            ref_id: format!("#/texts/{no}"),
            parent_ref: Some("#/body".into()),
            label: Label::Text,
            content_text: Some("hello".into()),
            caption_text: None,
            table_data: None,
            screenshot: None,
            positions: vec![Position {
                page_no: 1,
                top: 700.0,
                right: 200.0,
                bottom: 680.0,
                left: 10.0,
                coord_origin: CoordOrigin::BottomLeft,
            }],
        }
    }

    #[test]
    fn slice_serializes_ref_field_name() {
        let json = serde_json::to_value(slice(1)).expect("serialize");
        assert_eq!(json["ref"], "#/texts/1");
        assert_eq!(json["parent_ref"], "#/body");
        assert_eq!(json["label"], "text");
        assert_eq!(json["positions"][0]["coord_origin"], "BOTTOMLEFT");
        assert!(json.get("ref_id").is_none());
    }

    #[test]
    fn output_counts_slices_across_pages() {
        let page = |no: usize, slices: Vec<Slice>| Page {
            page_no: no,
            width: 612.0,
            height: 792.0,
            screenshot: None,
            slices,
        };
        let out = ExtractionOutput {
            document: "a.pdf".into(),
            size: Some(1024),
            content_type: "application/pdf".into(),
            pages: vec![page(1, vec![slice(1), slice(2)]), page(2, vec![slice(3)])],
        };
        assert_eq!(out.slice_count(), 3);
        let nos: Vec<usize> = out.slices().map(|s| s.slice_no).collect();
        assert_eq!(nos, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn write_output_is_atomic_and_readable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("out.json");
        let out = ExtractionOutput {
            document: "a.pdf".into(),
            size: None,
            content_type: "application/pdf".into(),
            pages: vec![],
        };
        write_output(&out, &path).await.expect("write");
        assert!(!path.with_extension("json.tmp").exists());
        let back: ExtractionOutput =
            serde_json::from_slice(&std::fs::read(&path).expect("read")).expect("parse");
        assert_eq!(back, out);
    }
}
