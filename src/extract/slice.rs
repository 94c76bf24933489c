//! One tree node viewed as a typed slice.

use crate::config::ImageOptions;
use crate::document::{CellValue, Document, Label, Node, NodeKind};
use crate::extract::image::ImageExtractor;
use crate::extract::text::clean_text;
use crate::output::{Image, Position, Slice};
use tracing::{debug, warn};

/// Default number of decimal places kept in positions.
pub const DEFAULT_BBOX_PRECISION: u32 = 2;

/// Borrowing view over one eligible node and its depth in the hierarchy.
///
/// Every accessor reads the node on demand; nothing is cached, so a
/// `SliceExtractor` is cheap to create and to drop unused.
#[derive(Debug, Clone, Copy)]
pub struct SliceExtractor<'a> {
    document: &'a Document,
    node: &'a Node,
    level: usize,
    bbox_precision: u32,
}

impl<'a> SliceExtractor<'a> {
    pub fn new(document: &'a Document, node: &'a Node, level: usize) -> Self {
        Self {
            document,
            node,
            level,
            bbox_precision: DEFAULT_BBOX_PRECISION,
        }
    }

    pub fn with_bbox_precision(mut self, places: u32) -> Self {
        self.bbox_precision = places;
        self
    }

    /// Text, table and picture nodes become slices; groups never do.
    pub fn is_eligible(node: &Node) -> bool {
        matches!(
            node.kind,
            NodeKind::Text(_) | NodeKind::Table(_) | NodeKind::Picture(_)
        )
    }

    pub fn ref_id(&self) -> &'a str {
        &self.node.self_ref
    }

    /// Reference of the containing node; `None` for roots.
    pub fn parent_ref(&self) -> Option<&'a str> {
        self.node.parent_ref.as_deref()
    }

    pub fn label(&self) -> Label {
        self.node.label
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Normalised text of a text node. `None` for other kinds, and for text
    /// that is empty once artefacts are stripped.
    pub fn content_text(&self) -> Option<String> {
        let NodeKind::Text(text) = &self.node.kind else {
            return None;
        };
        non_empty(clean_text(&text.text))
    }

    /// Normalised caption of a table or picture node.
    pub fn caption_text(&self) -> Option<String> {
        if !matches!(self.node.kind, NodeKind::Table(_) | NodeKind::Picture(_)) {
            return None;
        }
        self.document
            .caption_text(self.node)
            .and_then(|t| non_empty(clean_text(&t)))
    }

    /// Row-major grid of a table node.
    ///
    /// The header row comes first when the table has named columns. Short
    /// rows are padded with [`CellValue::Empty`] so every row has the same
    /// width, and text cells are normalised. Returns `None` for non-tables
    /// and for tables without a single cell.
    pub fn table_data(&self) -> Option<Vec<Vec<CellValue>>> {
        let NodeKind::Table(table) = &self.node.kind else {
            return None;
        };
        let grid = &table.grid;

        let mut rows: Vec<Vec<CellValue>> = Vec::with_capacity(grid.rows.len() + 1);
        if !grid.columns.is_empty() {
            rows.push(grid.columns.iter().cloned().map(CellValue::Text).collect());
        }
        rows.extend(grid.rows.iter().cloned());

        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        if width == 0 {
            return None;
        }

        for row in &mut rows {
            row.resize(width, CellValue::Empty);
            for cell in row.iter_mut() {
                if let CellValue::Text(s) = cell {
                    *s = clean_text(s);
                }
            }
        }
        Some(rows)
    }

    /// One position per provenance entry, rounded to the configured precision.
    pub fn positions(&self) -> Vec<Position> {
        let places = self.bbox_precision;
        self.node
            .prov
            .iter()
            .map(|prov| Position {
                page_no: prov.page_no,
                top: round_to(prov.bbox.top, places),
                right: round_to(prov.bbox.right, places),
                bottom: round_to(prov.bbox.bottom, places),
                left: round_to(prov.bbox.left, places),
                coord_origin: prov.bbox.coord_origin,
            })
            .collect()
    }

    /// Render of the node region, for tables, pictures, formulas and code.
    pub fn screenshot(&self) -> Option<ImageExtractor<'a>> {
        let image = match &self.node.kind {
            NodeKind::Table(t) => t.image.as_ref(),
            NodeKind::Picture(p) => p.image.as_ref(),
            NodeKind::Text(t) if matches!(self.node.label, Label::Formula | Label::Code) => {
                t.image.as_ref()
            }
            NodeKind::Text(_) | NodeKind::Group => None,
        };
        image.map(ImageExtractor::new)
    }

    /// Whether the node would carry anything in a slice built with
    /// `options`: text, a table grid, a caption, or a render that is going
    /// to be attached.
    pub fn has_content(&self, options: &ImageOptions) -> bool {
        self.content_text().is_some()
            || self.table_data().is_some()
            || self.caption_text().is_some()
            || (options.include_slice_screenshot && self.screenshot().is_some())
    }

    /// Encoded render, when enabled in `options`. A render that fails to
    /// encode is logged and left out.
    fn encoded_screenshot(&self, options: &ImageOptions) -> Option<Image> {
        if !options.include_slice_screenshot {
            return None;
        }
        self.screenshot()
            .and_then(|img| match img.to_image(options.format, options.quality) {
                Ok(image) => Some(image),
                Err(e) => {
                    warn!("Failed to encode render of {}: {}", self.node.self_ref, e);
                    None
                }
            })
    }

    /// Assemble the output record.
    ///
    /// Returns `None` when the slice would carry no text, caption, table or
    /// render, e.g. a picture whose only render failed to encode.
    pub fn to_slice(&self, slice_no: usize, options: &ImageOptions) -> Option<Slice> {
        debug!("Assembling slice {} from {}", slice_no, self.node.self_ref);
        let content_text = self.content_text();
        let caption_text = self.caption_text();
        let table_data = self.table_data();
        let screenshot = self.encoded_screenshot(options);

        if content_text.is_none()
            && caption_text.is_none()
            && table_data.is_none()
            && screenshot.is_none()
        {
            debug!("Dropping {}: nothing to emit", self.node.self_ref);
            return None;
        }

        Some(Slice {
            slice_no,
            level: self.level,
            ref_id: self.ref_id().to_string(),
            parent_ref: self.parent_ref().map(str::to_string),
            label: self.label(),
            content_text,
            caption_text,
            table_data,
            screenshot,
            positions: self.positions(),
        })
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Round half away from zero to `places` decimals.
fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageFormat;
    use crate::document::{BoundingBox, CoordOrigin, TableGrid};
    use image::{DynamicImage, Rgba, RgbaImage};

    fn bbox(l: f64, t: f64, r: f64, b: f64) -> BoundingBox {
        BoundingBox::new(l, t, r, b, CoordOrigin::TopLeft)
    }

    fn raster() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255])))
    }

    fn single(node: Node) -> Document {
        let mut doc = Document::new("t.pdf");
        doc.push(node, 1);
        doc
    }

    fn first(doc: &Document) -> SliceExtractor<'_> {
        let (node, level) = doc.iterate_items(None).next().expect("one node");
        SliceExtractor::new(doc, node, level)
    }

    #[test]
    fn content_text_is_normalised() {
        let doc = single(Node::text("#/texts/0", Label::Text, " Net\t GLYPH<5> income "));
        assert_eq!(first(&doc).content_text().as_deref(), Some("Net income"));
    }

    #[test]
    fn content_text_absent_for_artefact_only_text() {
        let doc = single(Node::text("#/texts/0", Label::Text, "GLYPH<1> glyph<2>"));
        let ex = first(&doc);
        assert!(ex.content_text().is_none());
        assert!(!ex.has_content(&ImageOptions::default()));
    }

    #[test]
    fn content_text_absent_for_tables() {
        let doc = single(Node::table("#/tables/0", TableGrid::default()));
        assert!(first(&doc).content_text().is_none());
    }

    #[test]
    fn caption_of_picture_is_resolved_and_cleaned() {
        let mut doc = Document::new("t.pdf");
        doc.push(Node::picture("#/pictures/0").with_caption("#/texts/0"), 1);
        doc.push(
            Node::text("#/texts/0", Label::Caption, "Figure  2:\tGLYPH<3>Results"),
            2,
        );
        let ex = first(&doc);
        assert_eq!(ex.caption_text().as_deref(), Some("Figure 2: Results"));
        assert!(ex.has_content(&ImageOptions::default()));
    }

    #[test]
    fn table_data_puts_header_first_and_pads_rows() {
        let grid = TableGrid::new(
            vec!["Name".into(), "Qty".into(), "Note".into()],
            vec![
                vec!["apple ".into(), CellValue::Integer(3)],
                vec!["pear".into(), CellValue::Integer(1), "GLYPH<9>ripe".into()],
            ],
        );
        let doc = single(Node::table("#/tables/0", grid));
        let data = first(&doc).table_data().expect("grid");
        assert_eq!(data.len(), 3);
        assert_eq!(data[0], vec![CellValue::from("Name"), "Qty".into(), "Note".into()]);
        assert_eq!(
            data[1],
            vec![CellValue::from("apple"), CellValue::Integer(3), CellValue::Empty]
        );
        assert_eq!(data[2][2], CellValue::from("ripe"));
        assert!(data.iter().all(|r| r.len() == 3));
    }

    #[test]
    fn table_without_header_starts_with_data() {
        let grid = TableGrid::new(vec![], vec![vec!["a".into(), "b".into()]]);
        let doc = single(Node::table("#/tables/0", grid));
        let data = first(&doc).table_data().expect("grid");
        assert_eq!(data, vec![vec![CellValue::from("a"), CellValue::from("b")]]);
    }

    #[test]
    fn empty_table_yields_none() {
        let grid = TableGrid::new(vec![], vec![vec![], vec![]]);
        let doc = single(Node::table("#/tables/0", grid));
        assert!(first(&doc).table_data().is_none());
    }

    #[test]
    fn positions_are_rounded() {
        let doc = single(
            Node::text("#/texts/0", Label::Text, "x")
                .with_prov(1, bbox(12.3456, 45.678, 10.001, 1.999)),
        );
        let pos = first(&doc).positions();
        assert_eq!(pos.len(), 1);
        assert_eq!(pos[0].left, 12.35);
        assert_eq!(pos[0].top, 45.68);
        assert_eq!(pos[0].right, 10.0);
        assert_eq!(pos[0].bottom, 2.0);
        assert_eq!(pos[0].coord_origin, CoordOrigin::TopLeft);
    }

    #[test]
    fn positions_respect_custom_precision() {
        let doc = single(
            Node::text("#/texts/0", Label::Text, "x").with_prov(1, bbox(1.23456, 0.0, 0.0, 0.0)),
        );
        let (node, level) = doc.iterate_items(None).next().expect("node");
        let ex = SliceExtractor::new(&doc, node, level).with_bbox_precision(0);
        assert_eq!(ex.positions()[0].left, 1.0);
    }

    #[test]
    fn column_split_text_has_two_positions() {
        let doc = single(
            Node::text("#/texts/0", Label::Text, "split paragraph")
                .with_prov(3, bbox(50.0, 100.0, 280.0, 400.0))
                .with_prov(3, bbox(320.0, 100.0, 550.0, 250.0)),
        );
        let pos = first(&doc).positions();
        assert_eq!(pos.len(), 2);
        assert!(pos.iter().all(|p| p.page_no == 3));
    }

    #[test]
    fn screenshot_only_for_visual_kinds() {
        let plain = single(Node::text("#/texts/0", Label::Text, "x").with_image(raster()));
        assert!(first(&plain).screenshot().is_none());

        let formula = single(Node::text("#/texts/0", Label::Formula, "E=mc^2").with_image(raster()));
        assert!(first(&formula).screenshot().is_some());

        let picture = single(Node::picture("#/pictures/0").with_image(raster()));
        assert_eq!(first(&picture).screenshot().map(|s| s.width()), Some(4));
    }

    #[test]
    fn to_slice_assembles_fields() {
        let mut doc = Document::new("t.pdf");
        doc.push(
            Node::picture("#/pictures/0")
                .with_parent("#/body")
                .with_prov(1, bbox(0.0, 0.0, 4.0, 4.0))
                .with_image(raster()),
            2,
        );
        let options = ImageOptions {
            format: ImageFormat::Png,
            ..ImageOptions::default()
        };
        let slice = first(&doc).to_slice(7, &options).expect("picture with render");
        assert_eq!(slice.slice_no, 7);
        assert_eq!(slice.level, 2);
        assert_eq!(slice.ref_id, "#/pictures/0");
        assert_eq!(slice.parent_ref.as_deref(), Some("#/body"));
        assert_eq!(slice.label, Label::Picture);
        assert!(slice.content_text.is_none());
        assert!(slice.table_data.is_none());
        let shot = slice.screenshot.expect("render attached");
        assert_eq!(shot.content_type, "image/png");
        assert_eq!(slice.positions.len(), 1);
    }

    #[test]
    fn uncaptioned_picture_needs_its_render() {
        let doc = single(Node::picture("#/pictures/0").with_image(raster()));
        let off = ImageOptions {
            include_slice_screenshot: false,
            ..ImageOptions::default()
        };
        let ex = first(&doc);
        assert!(ex.has_content(&ImageOptions::default()));
        assert!(!ex.has_content(&off));
        assert!(ex.to_slice(1, &off).is_none());
    }

    #[test]
    fn captioned_picture_survives_without_render() {
        let mut doc = Document::new("t.pdf");
        doc.push(
            Node::picture("#/pictures/0")
                .with_caption("#/texts/0")
                .with_image(raster()),
            1,
        );
        doc.push(Node::text("#/texts/0", Label::Caption, "Figure 1"), 2);
        let off = ImageOptions {
            include_slice_screenshot: false,
            ..ImageOptions::default()
        };
        let slice = first(&doc).to_slice(1, &off).expect("caption kept");
        assert!(slice.screenshot.is_none());
        assert_eq!(slice.caption_text.as_deref(), Some("Figure 1"));
    }
}
