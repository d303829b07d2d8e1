//! Range node: affine remap with optional clamping.
//!
//! With all four bounds the node maps `[minIn, maxIn]` onto
//! `[minOut, maxOut]`. With only the min (or only the max) pair it shifts
//! values and clamps one side. Without bounds it only converts between its
//! bit depths, which is how Group adapts mismatched neighbors.

use super::{parse_scalar, NodeCommon, NodeOp, Operator, ProcessNode};
use crate::bit_depth::BitDepth;
use crate::document::{format_f64, Element};
use crate::options::{ReadContext, WriteOptions};
use crate::{ClfError, ClfResult};
use std::fmt;
use std::str::FromStr;

/// Clamping behavior of a Range node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeStyle {
    /// Clamp to the output bounds.
    #[default]
    Clamp,
    /// Extrapolate past the bounds.
    NoClamp,
}

impl RangeStyle {
    /// Attribute token.
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeStyle::Clamp => "Clamp",
            RangeStyle::NoClamp => "noClamp",
        }
    }
}

impl FromStr for RangeStyle {
    type Err = ClfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Clamp" | "clamp" => Ok(RangeStyle::Clamp),
            "noClamp" | "NoClamp" => Ok(RangeStyle::NoClamp),
            other => Err(ClfError::parse(format!("unknown Range style '{}'", other))),
        }
    }
}

impl fmt::Display for RangeStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounds of a Range node, in the node's bit depths.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RangeParams {
    /// `minInValue`, in the input depth.
    pub min_in: Option<f64>,
    /// `maxInValue`, in the input depth.
    pub max_in: Option<f64>,
    /// `minOutValue`, in the output depth.
    pub min_out: Option<f64>,
    /// `maxOutValue`, in the output depth.
    pub max_out: Option<f64>,
    /// `style` attribute; `None` when absent (clamps).
    pub style: Option<RangeStyle>,
}

impl RangeParams {
    /// Four-value range.
    pub fn new(min_in: f64, max_in: f64, min_out: f64, max_out: f64) -> Self {
        Self {
            min_in: Some(min_in),
            max_in: Some(max_in),
            min_out: Some(min_out),
            max_out: Some(max_out),
            style: None,
        }
    }

    /// Only the min pair: shift and clamp below.
    pub fn min_only(min_in: f64, min_out: f64) -> Self {
        Self {
            min_in: Some(min_in),
            min_out: Some(min_out),
            ..Default::default()
        }
    }

    /// Only the max pair: shift and clamp above.
    pub fn max_only(max_in: f64, max_out: f64) -> Self {
        Self {
            max_in: Some(max_in),
            max_out: Some(max_out),
            ..Default::default()
        }
    }

    /// Sets the clamping style.
    pub fn with_style(mut self, style: RangeStyle) -> Self {
        self.style = Some(style);
        self
    }

    /// True unless the style is `noClamp`.
    pub fn clamps(&self) -> bool {
        self.style.unwrap_or_default() == RangeStyle::Clamp
    }

    /// Evaluates one normalized value. Bounds are given normalized.
    fn eval(
        &self,
        v: f64,
        min_in: Option<f64>,
        max_in: Option<f64>,
        min_out: Option<f64>,
        max_out: Option<f64>,
    ) -> f64 {
        let clamp = self.clamps();
        match (min_in, max_in, min_out, max_out) {
            (Some(lo_in), Some(hi_in), Some(lo_out), Some(hi_out)) => {
                let scale = if hi_in == lo_in {
                    0.0
                } else {
                    (hi_out - lo_out) / (hi_in - lo_in)
                };
                let r = (v - lo_in) * scale + lo_out;
                if clamp {
                    r.max(lo_out.min(hi_out)).min(lo_out.max(hi_out))
                } else {
                    r
                }
            }
            (Some(lo_in), _, Some(lo_out), _) => {
                let r = v - lo_in + lo_out;
                if clamp { r.max(lo_out) } else { r }
            }
            (_, Some(hi_in), _, Some(hi_out)) => {
                let r = v - hi_in + hi_out;
                if clamp { r.min(hi_out) } else { r }
            }
            _ => v,
        }
    }
}

/// Range that only converts `from` values into `to` values.
pub(crate) fn bit_depth_adapter(from: BitDepth, to: BitDepth) -> ProcessNode {
    ProcessNode::new(NodeOp::Range(RangeParams::default())).with_bit_depths(from, to)
}

const RANGE_ELEMENTS: [&str; 4] = ["minInValue", "maxInValue", "minOutValue", "maxOutValue"];

impl Operator for RangeParams {
    fn attributes(&self) -> &'static [&'static str] {
        &["style"]
    }

    fn read_attributes(&mut self, el: &Element, _ctx: &ReadContext<'_>) -> ClfResult<()> {
        self.style = el.attr("style").map(str::parse).transpose()?;
        Ok(())
    }

    fn read_child(
        &mut self,
        child: &Element,
        _common: &NodeCommon,
        _ctx: &ReadContext<'_>,
    ) -> ClfResult<bool> {
        let slot = match child.name.as_str() {
            "minInValue" => &mut self.min_in,
            "maxInValue" => &mut self.max_in,
            "minOutValue" => &mut self.min_out,
            "maxOutValue" => &mut self.max_out,
            _ => return Ok(false),
        };
        *slot = Some(parse_scalar(child)?);
        Ok(true)
    }

    fn write_attributes(&self, el: &mut Element) {
        if let Some(style) = self.style {
            el.push_attr("style", style.as_str());
        }
    }

    fn write_payload(&self, el: &mut Element, _opts: &WriteOptions) {
        let values = [self.min_in, self.max_in, self.min_out, self.max_out];
        for (name, value) in RANGE_ELEMENTS.iter().zip(values) {
            if let Some(v) = value {
                el.children.push(Element::with_text(*name, format_f64(v)));
            }
        }
    }

    fn process_pixel(&self, common: &NodeCommon, pixel: &mut [f32]) {
        let in_scale = common.in_bit_depth.max_value() as f64;
        let out_scale = common.out_bit_depth.max_value() as f64;
        let min_in = self.min_in.map(|v| v / in_scale);
        let max_in = self.max_in.map(|v| v / in_scale);
        let min_out = self.min_out.map(|v| v / out_scale);
        let max_out = self.max_out.map(|v| v / out_scale);

        for x in pixel.iter_mut().take(3) {
            let v = common.in_bit_depth.to_normalized(*x) as f64;
            let r = self.eval(v, min_in, max_in, min_out, max_out);
            *x = common.out_bit_depth.from_normalized(r as f32);
        }
    }
}
