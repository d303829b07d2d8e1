//! Process nodes: one typed transform step of a Process List.
//!
//! A [`ProcessNode`] is the shared state every node carries ([`NodeCommon`])
//! plus a closed set of variants ([`NodeOp`]). Element-name dispatch goes
//! through [`crate::registry`].
//!
//! # Processing
//!
//! `process(values, stride)` treats `values` as consecutive pixels of
//! `stride` channels; a stride of 0 makes the whole slice one sample. Only
//! the first three channels of a pixel are transformed, except by Matrix
//! which covers as many channels as it has rows.

mod cdl;
mod exposure_contrast;
mod gamma;
mod group;
mod log;
mod lut1d;
mod lut3d;
mod matrix;
mod range;
mod reference;

pub use cdl::{CdlParams, CdlStyle};
pub use exposure_contrast::{
    EcStyle, ExposureContrastParams, LOG_EXPOSURE_STEP, LOG_MIDGRAY, MIN_CONTRAST, MIN_PIVOT,
    VIDEO_OETF_POWER,
};
pub use gamma::{Channel, GammaChannelParams, GammaParams, GammaStyle};
pub use group::GroupParams;
pub use log::{LogChannelParams, LogParams, LogStyle};
pub use lut1d::{Lut1DInterpolation, Lut1DParams};
pub use lut3d::{Lut3DInterpolation, Lut3DParams};
pub use matrix::MatrixParams;
pub use range::{RangeParams, RangeStyle};
pub use reference::ReferenceParams;

use crate::bit_depth::BitDepth;
use crate::document::{format_f64, parse_bool, parse_f64, Element};
use crate::options::{Extension, ParseOptions, ReadContext, WriteOptions};
use crate::registry;
use crate::{ClfError, ClfResult};
use tracing::{trace, warn};

/// Attributes handled by [`NodeCommon`] on every node.
const COMMON_ATTRIBUTES: [&str; 5] = ["id", "name", "inBitDepth", "outBitDepth", "bypass"];

/// State shared by every node variant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeCommon {
    /// `id` attribute.
    pub id: Option<String>,
    /// `name` attribute.
    pub name: Option<String>,
    /// Domain of the input values.
    pub in_bit_depth: BitDepth,
    /// Domain of the output values.
    pub out_bit_depth: BitDepth,
    /// `bypass` attribute; `None` when absent.
    pub bypass: Option<bool>,
    /// Free text children such as `Description`, in document order.
    pub elements: Vec<Element>,
    /// Named scalar children not consumed by the variant.
    pub value_elements: Vec<(String, f64)>,
    /// `DynamicParameter` names.
    pub dynamic_params: Vec<String>,
    /// Attributes not recognized by the node, in document order.
    pub extra_attributes: Vec<(String, String)>,
}

impl NodeCommon {
    fn read_attributes(&mut self, el: &Element, own: &[&str]) -> ClfResult<()> {
        self.id = el.attr("id").map(str::to_string);
        self.name = el.attr("name").map(str::to_string);
        self.in_bit_depth = el.required_attr("inBitDepth")?.parse()?;
        self.out_bit_depth = el.required_attr("outBitDepth")?.parse()?;
        self.bypass = parse_bool(el, "bypass")?;
        self.extra_attributes = el
            .attributes
            .iter()
            .filter(|(k, _)| !COMMON_ATTRIBUTES.contains(&k.as_str()) && !own.contains(&k.as_str()))
            .cloned()
            .collect();
        Ok(())
    }

    fn write_attributes(&self, el: &mut Element) {
        if let Some(id) = &self.id {
            el.push_attr("id", id.as_str());
        }
        if let Some(name) = &self.name {
            el.push_attr("name", name.as_str());
        }
        el.push_attr("inBitDepth", self.in_bit_depth.as_str());
        el.push_attr("outBitDepth", self.out_bit_depth.as_str());
        if let Some(bypass) = self.bypass {
            el.push_attr("bypass", if bypass { "true" } else { "false" });
        }
    }

    /// Handles a child no variant claimed. Unknown elements are logged and
    /// dropped.
    fn read_child(&mut self, node: &str, child: &Element, ctx: &ReadContext<'_>) -> ClfResult<()> {
        match child.name.as_str() {
            "Description" => self.elements.push(child.clone()),
            "DynamicParameter" => {
                ctx.require(Extension::Autodesk, "DynamicParameter")?;
                let param = child.required_attr("param")?;
                self.dynamic_params.push(param.to_string());
            }
            _ => {
                let scalar = child.children.is_empty() && child.attributes.is_empty();
                match parse_f64(&child.text) {
                    Some(v) if scalar => self.value_elements.push((child.name.clone(), v)),
                    _ => warn!(element = %child.name, node, "skipping unknown element"),
                }
            }
        }
        Ok(())
    }

    fn write_children(&self, el: &mut Element) {
        el.children.extend(self.elements.iter().cloned());
        for (name, v) in &self.value_elements {
            el.children.push(Element::with_text(name.as_str(), format_f64(*v)));
        }
        for param in &self.dynamic_params {
            el.children
                .push(Element::new("DynamicParameter").with_attr("param", param.as_str()));
        }
    }
}

/// Behavior every variant implements. Dispatch is a match over [`NodeOp`].
pub(crate) trait Operator {
    /// Attribute names owned by the variant.
    fn attributes(&self) -> &'static [&'static str] {
        &[]
    }

    fn read_attributes(&mut self, _el: &Element, _ctx: &ReadContext<'_>) -> ClfResult<()> {
        Ok(())
    }

    /// Consumes a child element. Returns false to hand it to [`NodeCommon`].
    fn read_child(
        &mut self,
        _child: &Element,
        _common: &NodeCommon,
        _ctx: &ReadContext<'_>,
    ) -> ClfResult<bool> {
        Ok(false)
    }

    /// Validation and resolution once every child is read.
    fn finish_read(
        &mut self,
        _el: &Element,
        _common: &NodeCommon,
        _ctx: &ReadContext<'_>,
    ) -> ClfResult<()> {
        Ok(())
    }

    fn write_attributes(&self, _el: &mut Element) {}

    fn write_payload(&self, _el: &mut Element, _opts: &WriteOptions) {}

    fn process_pixel(&self, common: &NodeCommon, pixel: &mut [f32]);
}

/// The closed set of node variants.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOp {
    /// `Matrix`.
    Matrix(MatrixParams),
    /// `Range`.
    Range(RangeParams),
    /// `ASC_CDL`.
    AscCdl(CdlParams),
    /// `ColorCorrection`: ASC-CDL without node attributes.
    ColorCorrection(CdlParams),
    /// `LUT1D`.
    Lut1D(Lut1DParams),
    /// `LUT3D`.
    Lut3D(Lut3DParams),
    /// `Log`.
    Log(LogParams),
    /// `Gamma`.
    Gamma(GammaParams),
    /// `ExposureContrast`.
    ExposureContrast(ExposureContrastParams),
    /// `Group`.
    Group(GroupParams),
    /// `Reference`.
    Reference(ReferenceParams),
}

impl NodeOp {
    /// Document element name.
    pub fn element_name(&self) -> &'static str {
        match self {
            NodeOp::Matrix(_) => "Matrix",
            NodeOp::Range(_) => "Range",
            NodeOp::AscCdl(_) => "ASC_CDL",
            NodeOp::ColorCorrection(_) => "ColorCorrection",
            NodeOp::Lut1D(_) => "LUT1D",
            NodeOp::Lut3D(_) => "LUT3D",
            NodeOp::Log(_) => "Log",
            NodeOp::Gamma(_) => "Gamma",
            NodeOp::ExposureContrast(_) => "ExposureContrast",
            NodeOp::Group(_) => "Group",
            NodeOp::Reference(_) => "Reference",
        }
    }

    pub(crate) fn as_operator(&self) -> &dyn Operator {
        match self {
            NodeOp::Matrix(p) => p,
            NodeOp::Range(p) => p,
            NodeOp::AscCdl(p) => p,
            NodeOp::ColorCorrection(p) => p,
            NodeOp::Lut1D(p) => p,
            NodeOp::Lut3D(p) => p,
            NodeOp::Log(p) => p,
            NodeOp::Gamma(p) => p,
            NodeOp::ExposureContrast(p) => p,
            NodeOp::Group(p) => p,
            NodeOp::Reference(p) => p,
        }
    }

    pub(crate) fn as_operator_mut(&mut self) -> &mut dyn Operator {
        match self {
            NodeOp::Matrix(p) => p,
            NodeOp::Range(p) => p,
            NodeOp::AscCdl(p) => p,
            NodeOp::ColorCorrection(p) => p,
            NodeOp::Lut1D(p) => p,
            NodeOp::Lut3D(p) => p,
            NodeOp::Log(p) => p,
            NodeOp::Gamma(p) => p,
            NodeOp::ExposureContrast(p) => p,
            NodeOp::Group(p) => p,
            NodeOp::Reference(p) => p,
        }
    }
}

/// One transform step: shared state plus its variant.
///
/// # Example
///
/// ```rust
/// use clf_lut::{MatrixParams, NodeOp, ProcessNode};
///
/// let node = ProcessNode::new(NodeOp::Matrix(MatrixParams::scale([2.0, 1.0, 0.5])));
/// assert_eq!(node.process(&[1.0, 1.0, 1.0], 3), vec![2.0, 1.0, 0.5]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessNode {
    /// Shared attributes and children.
    pub common: NodeCommon,
    /// Variant state.
    pub op: NodeOp,
}

impl ProcessNode {
    /// Node with default attributes (32f in and out).
    pub fn new(op: NodeOp) -> Self {
        Self {
            common: NodeCommon::default(),
            op,
        }
    }

    /// Sets the `id` attribute.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.common.id = Some(id.into());
        self
    }

    /// Sets the `name` attribute.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.common.name = Some(name.into());
        self
    }

    /// Sets input and output bit depths.
    pub fn with_bit_depths(mut self, input: BitDepth, output: BitDepth) -> Self {
        self.common.in_bit_depth = input;
        self.common.out_bit_depth = output;
        self
    }

    /// Sets the `bypass` attribute.
    pub fn with_bypass(mut self, bypass: bool) -> Self {
        self.common.bypass = Some(bypass);
        self
    }

    /// Appends a `Description` child.
    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.common.elements.push(Element::with_text("Description", text));
        self
    }

    /// Document element name.
    pub fn element_name(&self) -> &'static str {
        self.op.element_name()
    }

    /// True when containers must skip this node.
    pub fn is_bypassed(&self) -> bool {
        self.common.bypass.unwrap_or(false)
    }

    /// Input bit depth as seen by containers (ColorCorrection is always 32f).
    pub fn in_bit_depth(&self) -> BitDepth {
        match self.op {
            NodeOp::ColorCorrection(_) => BitDepth::Float32,
            _ => self.common.in_bit_depth,
        }
    }

    /// Output bit depth as seen by containers (ColorCorrection is always 32f).
    pub fn out_bit_depth(&self) -> BitDepth {
        match self.op {
            NodeOp::ColorCorrection(_) => BitDepth::Float32,
            _ => self.common.out_bit_depth,
        }
    }

    /// Parses a node element with the given options.
    ///
    /// Returns `Ok(None)` for element names that are not nodes.
    pub fn from_element(el: &Element, options: &ParseOptions) -> ClfResult<Option<Self>> {
        let ctx = ReadContext::new(options);
        Self::read(el, &ctx)
    }

    pub(crate) fn read(el: &Element, ctx: &ReadContext<'_>) -> ClfResult<Option<Self>> {
        let Some(entry) = registry::lookup(&el.name) else {
            warn!(element = %el.name, "skipping unknown node");
            return Ok(None);
        };
        if let Some(ext) = entry.extension {
            ctx.require(ext, entry.element)?;
        }

        let mut op = (entry.create)();
        let mut common = NodeCommon::default();
        // ColorCorrection ignores node attributes and always runs Fwd at 32f
        if !matches!(op, NodeOp::ColorCorrection(_)) {
            common.read_attributes(el, op.as_operator().attributes())?;
            op.as_operator_mut().read_attributes(el, ctx)?;
        }

        for child in &el.children {
            if !op.as_operator_mut().read_child(child, &common, ctx)? {
                common.read_child(&el.name, child, ctx)?;
            }
        }
        op.as_operator_mut().finish_read(el, &common, ctx)?;
        Ok(Some(Self { common, op }))
    }

    /// Appends this node's element(s) to `parent`.
    ///
    /// A resolved Reference written self-contained appends the referenced
    /// nodes instead of itself.
    pub fn write(&self, parent: &mut Element, opts: &WriteOptions) {
        if let NodeOp::Reference(reference) = &self.op {
            if opts.self_contained {
                if let Some(list) = reference.list() {
                    let start = parent.children.len();
                    for node in &list.nodes {
                        node.write(parent, opts);
                    }
                    if self.is_bypassed() {
                        for el in &mut parent.children[start..] {
                            el.attributes.retain(|(k, _)| k != "bypass");
                            el.push_attr("bypass", "true");
                        }
                    }
                    return;
                }
            }
        }

        let op = self.op.as_operator();
        let mut el = Element::new(self.element_name());
        if !matches!(self.op, NodeOp::ColorCorrection(_)) {
            self.common.write_attributes(&mut el);
            op.write_attributes(&mut el);
            el.attributes.extend(self.common.extra_attributes.iter().cloned());
        }
        self.common.write_children(&mut el);
        op.write_payload(&mut el, opts);
        parent.children.push(el);
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
        trace!(node = self.element_name(), id = ?self.common.id, len = values.len(), "evaluating");
        if stride == 0 {
            self.process_pixel(values);
            return;
        }
        for pixel in values.chunks_mut(stride) {
            self.process_pixel(pixel);
        }
    }

    /// Evaluates one pixel in place.
    #[inline]
    pub fn process_pixel(&self, pixel: &mut [f32]) {
        self.op.as_operator().process_pixel(&self.common, pixel);
    }
}

/// Parses a whitespace-separated list of exactly `N` numbers.
pub(crate) fn parse_numbers<const N: usize>(el: &Element) -> ClfResult<[f64; N]> {
    let values: Vec<f64> = el
        .text
        .split_whitespace()
        .map(|t| {
            parse_f64(t)
                .ok_or_else(|| ClfError::parse(format!("<{}> '{}' is not a number", el.name, t)))
        })
        .collect::<ClfResult<_>>()?;
    values.try_into().map_err(|v: Vec<f64>| {
        ClfError::parse(format!("<{}> expects {} values, found {}", el.name, N, v.len()))
    })
}

/// Parses the text of a scalar element.
pub(crate) fn parse_scalar(el: &Element) -> ClfResult<f64> {
    parse_f64(&el.text)
        .ok_or_else(|| ClfError::parse(format!("<{}> '{}' is not a number", el.name, el.text)))
}
