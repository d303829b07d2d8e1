//! The root `ProcessList`: document metadata plus an ordered node sequence.
//!
//! # Reading
//!
//! Documents can be read from a path ([`ProcessList::read_from_path`]) or
//! from memory ([`ProcessList::from_bytes`]). Gzip-compressed input is
//! detected by its magic bytes and decompressed transparently. Relative
//! Reference paths resolve against the directory of the file being read, or
//! [`ParseOptions::base_path`] for in-memory input.
//!
//! # Evaluation
//!
//! [`ProcessList::process`] runs every non-bypassed node in document order.
//! Unlike a Group, the list inserts no bit-depth adapters between nodes.
//!
//! # Example
//!
//! ```rust
//! use clf_lut::{MatrixParams, NodeOp, ProcessList, ProcessNode, RangeParams, WriteOptions};
//!
//! let list = ProcessList::new("example")
//!     .with_node(ProcessNode::new(NodeOp::Matrix(MatrixParams::scale([2.0, 1.0, 0.5]))))
//!     .with_node(ProcessNode::new(NodeOp::Range(RangeParams::new(0.0, 2.0, 0.0, 1.0))));
//! assert_eq!(list.process(&[2.0, 2.0, 2.0], 3), vec![1.0, 1.0, 0.5]);
//!
//! let bytes = list.to_bytes(&WriteOptions::default()).unwrap();
//! let again = ProcessList::from_bytes(&bytes, &Default::default()).unwrap();
//! assert_eq!(again, list);
//! ```

use crate::bit_depth::BitDepth;
use crate::codec::FloatEncoding;
use crate::document::Element;
use crate::node::{NodeOp, ProcessNode};
use crate::options::{ParseOptions, ReadContext, WriteOptions};
use crate::registry;
use crate::{ClfError, ClfResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Format version written to `compCLFversion` by default.
pub const CLF_VERSION: &str = "3.0";

const LIST_ATTRIBUTES: [&str; 4] = ["id", "name", "inverseOf", "compCLFversion"];
const METADATA_ELEMENTS: [&str; 4] = ["Description", "InputDescriptor", "OutputDescriptor", "Info"];
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A parsed or constructed CLF document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcessList {
    /// `id` attribute.
    pub id: String,
    /// `name` attribute.
    pub name: Option<String>,
    /// `inverseOf` attribute.
    pub inverse_of: Option<String>,
    /// `compCLFversion` attribute.
    pub version: Option<String>,
    /// Attributes not recognized on the root, in document order.
    pub extra_attributes: Vec<(String, String)>,
    /// Descriptions, descriptors and the `Info` block, in document order.
    pub elements: Vec<Element>,
    /// Other leaf children with text content.
    pub value_elements: Vec<(String, String)>,
    /// Nodes in evaluation order.
    pub nodes: Vec<ProcessNode>,
}

impl ProcessList {
    /// Empty list with the given id, versioned [`CLF_VERSION`].
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: Some(CLF_VERSION.to_string()),
            ..Default::default()
        }
    }

    /// Sets the `name` attribute.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Appends a `Description` element.
    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.elements.push(Element::with_text("Description", text));
        self
    }

    /// Appends a node.
    pub fn with_node(mut self, node: ProcessNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Appends a node.
    pub fn push(&mut self, node: ProcessNode) {
        self.nodes.push(node);
    }

    /// Text of every `Description` element.
    pub fn descriptions(&self) -> impl Iterator<Item = &str> {
        self.elements
            .iter()
            .filter(|e| e.name == "Description")
            .map(|e| e.text.as_str())
    }

    // === Reading ===

    /// Reads a document from disk.
    pub fn read_from_path(path: impl AsRef<Path>, options: &ParseOptions) -> ClfResult<Self> {
        let canonical = path.as_ref().canonicalize()?;
        let bytes = std::fs::read(&canonical)?;
        let mut ctx = ReadContext::new(options);
        ctx.base_dir = canonical.parent().map(Path::to_path_buf);
        ctx.chain.push(canonical.clone());
        debug!(path = %canonical.display(), "reading process list");
        Self::from_bytes_with_context(&bytes, &ctx)
    }

    /// Reads a document from memory, plain or gzip-compressed.
    pub fn from_bytes(bytes: &[u8], options: &ParseOptions) -> ClfResult<Self> {
        Self::from_bytes_with_context(bytes, &ReadContext::new(options))
    }

    pub(crate) fn from_bytes_with_context(bytes: &[u8], ctx: &ReadContext<'_>) -> ClfResult<Self> {
        let root = if bytes.starts_with(&GZIP_MAGIC) {
            let mut xml = Vec::new();
            GzDecoder::new(bytes).read_to_end(&mut xml)?;
            Element::parse(&xml)?
        } else {
            Element::parse(bytes)?
        };
        Self::read(&root, ctx)
    }

    /// Builds a list from a parsed `ProcessList` element.
    pub fn from_element(el: &Element, options: &ParseOptions) -> ClfResult<Self> {
        Self::read(el, &ReadContext::new(options))
    }

    fn read(el: &Element, ctx: &ReadContext<'_>) -> ClfResult<Self> {
        if el.name != "ProcessList" {
            return Err(ClfError::parse(format!(
                "root element is <{}>, expected <ProcessList>",
                el.name
            )));
        }

        let mut list = ProcessList {
            id: el.required_attr("id")?.to_string(),
            name: el.attr("name").map(str::to_string),
            inverse_of: el.attr("inverseOf").map(str::to_string),
            version: el.attr("compCLFversion").map(str::to_string),
            extra_attributes: el
                .attributes
                .iter()
                .filter(|(k, _)| !LIST_ATTRIBUTES.contains(&k.as_str()))
                .cloned()
                .collect(),
            ..Default::default()
        };

        for child in &el.children {
            let name = child.name.as_str();
            if registry::lookup(name).is_some() {
                if let Some(node) = ProcessNode::read(child, ctx)? {
                    list.nodes.push(node);
                }
            } else if METADATA_ELEMENTS.contains(&name) {
                list.elements.push(child.clone());
            } else if child.children.is_empty() && child.attributes.is_empty() {
                list.value_elements.push((child.name.clone(), child.text.clone()));
            } else {
                warn!(element = %name, "skipping unknown element in ProcessList");
            }
        }

        debug!(id = %list.id, nodes = list.nodes.len(), "parsed process list");
        Ok(list)
    }

    // === Writing ===

    /// Builds the `ProcessList` element.
    pub fn to_element(&self, opts: &WriteOptions) -> Element {
        let mut el = Element::new("ProcessList").with_attr("id", self.id.as_str());
        if let Some(name) = &self.name {
            el.push_attr("name", name.as_str());
        }
        if let Some(inverse_of) = &self.inverse_of {
            el.push_attr("inverseOf", inverse_of.as_str());
        }
        if let Some(version) = &self.version {
            el.push_attr("compCLFversion", version.as_str());
        }
        el.attributes.extend(self.extra_attributes.iter().cloned());

        el.children.extend(self.elements.iter().cloned());
        for (name, text) in &self.value_elements {
            el.children.push(Element::with_text(name.as_str(), text.as_str()));
        }
        for node in &self.nodes {
            node.write(&mut el, opts);
        }
        el
    }

    /// Serializes the document, gzip-compressed if requested.
    pub fn to_bytes(&self, opts: &WriteOptions) -> ClfResult<Vec<u8>> {
        let xml = self.to_element(opts).to_bytes()?;
        if !opts.gzip {
            return Ok(xml);
        }
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&xml)?;
        Ok(encoder.finish()?)
    }

    /// Serializes the document to disk.
    pub fn write_to_path(&self, path: impl AsRef<Path>, opts: &WriteOptions) -> ClfResult<()> {
        let path: PathBuf = path.as_ref().to_path_buf();
        std::fs::write(&path, self.to_bytes(opts)?)?;
        debug!(path = %path.display(), "wrote process list");
        Ok(())
    }

    /// Sets the float encoding of every array, including those inside Groups
    /// and resolved References.
    pub fn set_float_encoding(&mut self, encoding: FloatEncoding) {
        set_float_encoding(&mut self.nodes, encoding);
    }

    // === Evaluation ===

    /// Input depth of the first active node (32f for an empty list).
    pub fn in_bit_depth(&self) -> BitDepth {
        self.active_nodes()
            .next()
            .map(ProcessNode::in_bit_depth)
            .unwrap_or_default()
    }

    /// Output depth of the last active node (32f for an empty list).
    pub fn out_bit_depth(&self) -> BitDepth {
        self.active_nodes()
            .last()
            .map(ProcessNode::out_bit_depth)
            .unwrap_or_default()
    }

    /// Nodes that are not bypassed, in order.
    pub fn active_nodes(&self) -> impl Iterator<Item = &ProcessNode> {
        self.nodes.iter().filter(|n| !n.is_bypassed())
    }

    /// Evaluates a copy of `values`.
    pub fn process(&self, values: &[f32], stride: usize) -> Vec<f32> {
        let mut out = values.to_vec();
        self.process_in_place(&mut out, stride);
        out
    }

    /// Evaluates `values` in place, `stride` channels per pixel (0 = one
    /// sample).
    pub fn process_in_place(&self, values: &mut [f32], stride: usize) {
        trace!(id = %self.id, len = values.len(), stride, "evaluating process list");
        for node in self.active_nodes() {
            node.process_in_place(values, stride);
        }
    }

    /// Evaluates one pixel in place.
    pub fn process_pixel(&self, pixel: &mut [f32]) {
        for node in self.active_nodes() {
            node.process_pixel(pixel);
        }
    }

    /// Evaluates one RGB triple.
    pub fn apply_rgb(&self, rgb: [f32; 3]) -> [f32; 3] {
        let mut px = rgb;
        self.process_pixel(&mut px);
        px
    }
}

fn set_float_encoding(nodes: &mut [ProcessNode], encoding: FloatEncoding) {
    for node in nodes {
        match &mut node.op {
            NodeOp::Matrix(p) => p.array.set_float_encoding(encoding),
            NodeOp::Lut1D(p) => p.array.set_float_encoding(encoding),
            NodeOp::Lut3D(p) => p.array.set_float_encoding(encoding),
            NodeOp::Group(p) => set_float_encoding(&mut p.nodes, encoding),
            NodeOp::Reference(p) => {
                if let Some(list) = p.list_mut() {
                    list.set_float_encoding(encoding);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{MatrixParams, RangeParams};

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ProcessList id="abc" name="test" compCLFversion="3.0" xmlns:x="urn:x">
  <Description>first</Description>
  <InputDescriptor>ACES2065-1</InputDescriptor>
  <Info><Release>1</Release></Info>
  <Matrix inBitDepth="32f" outBitDepth="32f">
    <Array dim="3 3">2 0 0 0 1 0 0 0 0.5</Array>
  </Matrix>
  <Unknown a="1"><Inner/></Unknown>
  <Range inBitDepth="32f" outBitDepth="32f" bypass="true">
    <minInValue>0</minInValue><maxInValue>1</maxInValue>
    <minOutValue>0</minOutValue><maxOutValue>0.5</maxOutValue>
  </Range>
</ProcessList>"#;

    #[test]
    fn test_read_metadata() {
        let list = ProcessList::from_bytes(DOC.as_bytes(), &ParseOptions::default()).unwrap();
        assert_eq!(list.id, "abc");
        assert_eq!(list.name.as_deref(), Some("test"));
        assert_eq!(list.version.as_deref(), Some("3.0"));
        assert_eq!(list.extra_attributes.len(), 1);
        assert_eq!(list.elements.len(), 3);
        assert_eq!(list.descriptions().collect::<Vec<_>>(), vec!["first"]);
        assert_eq!(list.nodes.len(), 2);
    }

    #[test]
    fn test_bypass_skipped() {
        let list = ProcessList::from_bytes(DOC.as_bytes(), &ParseOptions::default()).unwrap();
        assert_eq!(list.process(&[1.0, 1.0, 1.0], 3), vec![2.0, 1.0, 0.5]);
        assert_eq!(list.active_nodes().count(), 1);
    }

    #[test]
    fn test_wrong_root() {
        let err = ProcessList::from_bytes(b"<Matrix/>", &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, ClfError::Parse(_)));
    }

    #[test]
    fn test_missing_id() {
        let err = ProcessList::from_bytes(b"<ProcessList/>", &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, ClfError::MissingAttribute { attribute: "id", .. }));
    }

    #[test]
    fn test_malformed_xml() {
        let err = ProcessList::from_bytes(b"<ProcessList id=\"a\">", &ParseOptions::default())
            .unwrap_err();
        assert!(matches!(err, ClfError::Xml(_)));
    }

    #[test]
    fn test_bit_depths() {
        let list = ProcessList::new("x")
            .with_node(
                ProcessNode::new(NodeOp::Range(RangeParams::new(0.0, 1023.0, 0.0, 1.0)))
                    .with_bit_depths(BitDepth::Uint10, BitDepth::Float32),
            )
            .with_node(
                ProcessNode::new(NodeOp::Matrix(MatrixParams::identity3()))
                    .with_bit_depths(BitDepth::Float32, BitDepth::Uint12),
            );
        assert_eq!(list.in_bit_depth(), BitDepth::Uint10);
        assert_eq!(list.out_bit_depth(), BitDepth::Uint12);
        assert_eq!(ProcessList::new("empty").in_bit_depth(), BitDepth::Float32);
    }

    #[test]
    fn test_gzip_roundtrip() {
        let list = ProcessList::new("gz")
            .with_node(ProcessNode::new(NodeOp::Matrix(MatrixParams::scale([0.5; 3]))));
        let bytes = list.to_bytes(&WriteOptions::new().gzip(true)).unwrap();
        assert_eq!(&bytes[..2], &GZIP_MAGIC);
        let again = ProcessList::from_bytes(&bytes, &ParseOptions::default()).unwrap();
        assert_eq!(again, list);
    }
}
