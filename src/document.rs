//! The hierarchical document tree a [`crate::converter::Converter`] produces.
//!
//! The tree is owned by the converter's result: this crate only reads it.
//! Nodes are stored flat in document order together with their depth, and
//! linkage between nodes is expressed through opaque string references
//! (`#/texts/3`, `#/tables/0`, …) resolved through [`Document::resolve`].
//! Nothing here walks the parent/child graph; the order of `items` already
//! is the traversal order.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Structural role of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Text,
    Paragraph,
    Title,
    SectionHeader,
    ListItem,
    Caption,
    Footnote,
    PageHeader,
    PageFooter,
    Table,
    Picture,
    Chart,
    Formula,
    Code,
    DocumentIndex,
    Reference,
    CheckboxSelected,
    CheckboxUnselected,
    Form,
    KeyValueRegion,
}

/// Which corner of the page bounding-box coordinates are measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CoordOrigin {
    #[serde(rename = "TOPLEFT")]
    TopLeft,
    /// PDF user space. (default)
    #[default]
    #[serde(rename = "BOTTOMLEFT")]
    BottomLeft,
}

/// A rectangle in page units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub coord_origin: CoordOrigin,
}

impl BoundingBox {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64, coord_origin: CoordOrigin) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
            coord_origin,
        }
    }
}

/// One region a node occupies: the page and its bounding box there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub page_no: usize,
    pub bbox: BoundingBox,
}

/// A single table cell as exported by the converter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Empty,
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Integer(n)
    }
}

/// A table exported to a grid.
///
/// `columns` holds the header names; it is empty when the table has no
/// header row. Rows may be ragged; consumers pad them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableGrid {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl TableGrid {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }
}

/// Text-bearing node. Formula and code nodes may also carry a raster.
#[derive(Debug, Clone)]
pub struct TextNode {
    pub text: String,
    pub image: Option<DynamicImage>,
}

#[derive(Debug, Clone)]
pub struct TableNode {
    pub grid: TableGrid,
    /// References of caption nodes.
    pub captions: Vec<String>,
    pub image: Option<DynamicImage>,
}

#[derive(Debug, Clone)]
pub struct PictureNode {
    /// References of caption nodes.
    pub captions: Vec<String>,
    pub image: Option<DynamicImage>,
}

/// Kind-specific payload of a node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Text(TextNode),
    Table(TableNode),
    Picture(PictureNode),
    /// Structural container (body, list, section). Never emitted as a slice.
    Group,
}

/// One node of the converted tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub self_ref: String,
    pub parent_ref: Option<String>,
    pub label: Label,
    pub prov: Vec<Provenance>,
    pub kind: NodeKind,
}

impl Node {
    fn with_kind(self_ref: impl Into<String>, label: Label, kind: NodeKind) -> Self {
        Self {
            self_ref: self_ref.into(),
            parent_ref: None,
            label,
            prov: Vec::new(),
            kind,
        }
    }

    pub fn text(self_ref: impl Into<String>, label: Label, text: impl Into<String>) -> Self {
        Self::with_kind(
            self_ref,
            label,
            NodeKind::Text(TextNode {
                text: text.into(),
                image: None,
            }),
        )
    }

    pub fn table(self_ref: impl Into<String>, grid: TableGrid) -> Self {
        Self::with_kind(
            self_ref,
            Label::Table,
            NodeKind::Table(TableNode {
                grid,
                captions: Vec::new(),
                image: None,
            }),
        )
    }

    pub fn picture(self_ref: impl Into<String>) -> Self {
        Self::with_kind(
            self_ref,
            Label::Picture,
            NodeKind::Picture(PictureNode {
                captions: Vec::new(),
                image: None,
            }),
        )
    }

    pub fn group(self_ref: impl Into<String>, label: Label) -> Self {
        Self::with_kind(self_ref, label, NodeKind::Group)
    }

    pub fn with_parent(mut self, parent_ref: impl Into<String>) -> Self {
        self.parent_ref = Some(parent_ref.into());
        self
    }

    pub fn with_prov(mut self, page_no: usize, bbox: BoundingBox) -> Self {
        self.prov.push(Provenance { page_no, bbox });
        self
    }

    /// Attach a raster. Ignored for groups.
    pub fn with_image(mut self, image: DynamicImage) -> Self {
        match &mut self.kind {
            NodeKind::Text(t) => t.image = Some(image),
            NodeKind::Table(t) => t.image = Some(image),
            NodeKind::Picture(p) => p.image = Some(image),
            NodeKind::Group => {}
        }
        self
    }

    /// Link a caption node. Only tables and pictures carry captions.
    pub fn with_caption(mut self, caption_ref: impl Into<String>) -> Self {
        match &mut self.kind {
            NodeKind::Table(t) => t.captions.push(caption_ref.into()),
            NodeKind::Picture(p) => p.captions.push(caption_ref.into()),
            NodeKind::Text(_) | NodeKind::Group => {}
        }
        self
    }

    /// True when the node lies (at least partly) on `page_no`.
    pub fn is_on_page(&self, page_no: usize) -> bool {
        self.prov.iter().any(|p| p.page_no == page_no)
    }
}

/// Geometry and optional render of one converted page.
#[derive(Debug, Clone)]
pub struct PageInfo {
    pub page_no: usize,
    pub width: f64,
    pub height: f64,
    pub image: Option<DynamicImage>,
}

impl PageInfo {
    pub fn new(page_no: usize, width: f64, height: f64) -> Self {
        Self {
            page_no,
            width,
            height,
            image: None,
        }
    }

    pub fn with_image(mut self, image: DynamicImage) -> Self {
        self.image = Some(image);
        self
    }
}

/// A converted document: pages plus nodes in document order.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub name: String,
    pages: BTreeMap<usize, PageInfo>,
    items: Vec<(Node, usize)>,
    index: HashMap<String, usize>,
}

impl Document {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_page(&mut self, page: PageInfo) {
        self.pages.insert(page.page_no, page);
    }

    /// Append a node at the given depth. Later nodes with an existing
    /// reference shadow earlier ones in [`Document::resolve`].
    pub fn push(&mut self, node: Node, level: usize) {
        self.index.insert(node.self_ref.clone(), self.items.len());
        self.items.push((node, level));
    }

    pub fn pages(&self) -> &BTreeMap<usize, PageInfo> {
        &self.pages
    }

    pub fn page(&self, page_no: usize) -> Option<&PageInfo> {
        self.pages.get(&page_no)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Nodes in document order with their depth.
    ///
    /// With `page_no` set, only groups and nodes with provenance on that
    /// page are yielded.
    pub fn iterate_items(&self, page_no: Option<usize>) -> impl Iterator<Item = (&Node, usize)> + '_ {
        self.items.iter().filter_map(move |(node, level)| {
            let keep = match page_no {
                None => true,
                Some(_) if matches!(node.kind, NodeKind::Group) => true,
                Some(p) => node.is_on_page(p),
            };
            keep.then_some((node, *level))
        })
    }

    pub fn resolve(&self, self_ref: &str) -> Option<&Node> {
        self.index.get(self_ref).map(|&i| &self.items[i].0)
    }

    /// Text of the node's captions, joined by a space.
    ///
    /// Returns `None` for nodes that cannot carry captions or whose caption
    /// references resolve to no text.
    pub fn caption_text(&self, node: &Node) -> Option<String> {
        let refs = match &node.kind {
            NodeKind::Table(t) => &t.captions,
            NodeKind::Picture(p) => &p.captions,
            NodeKind::Text(_) | NodeKind::Group => return None,
        };
        let parts: Vec<&str> = refs
            .iter()
            .filter_map(|r| self.resolve(r))
            .filter_map(|n| match &n.kind {
                NodeKind::Text(t) if !t.text.is_empty() => Some(t.text.as_str()),
                _ => None,
            })
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}
