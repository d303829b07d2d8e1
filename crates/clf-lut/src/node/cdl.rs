//! ASC CDL nodes (`ASC_CDL` and `ColorCorrection`).
//!
//! Forward:
//! ```text
//! out = (in * slope + offset) ^ power
//! out = luma + sat * (out - luma)      luma = Rec.709 weights
//! ```
//! Clamping styles clamp to [0, 1] before the power and after saturation;
//! non-clamping styles pass negative values through the power unchanged.

use super::{parse_numbers, parse_scalar, NodeCommon, Operator};
use crate::document::{format_f64, Element};
use crate::options::{ReadContext, WriteOptions};
use crate::{ClfError, ClfResult};
use std::fmt;
use std::str::FromStr;

const LUMA_R: f64 = 0.2126;
const LUMA_G: f64 = 0.7152;
const LUMA_B: f64 = 0.0722;

/// Direction and clamping of a CDL node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CdlStyle {
    /// Forward with clamping (`Fwd`, `v1.2_Fwd`).
    #[default]
    Fwd,
    /// Forward without clamping (`FwdNoClamp`, `noClampFwd`).
    FwdNoClamp,
    /// Inverse with clamping (`Rev`, `v1.2_Rev`).
    Rev,
    /// Inverse without clamping (`RevNoClamp`, `noClampRev`).
    RevNoClamp,
}

impl CdlStyle {
    /// Canonical attribute token.
    pub fn as_str(&self) -> &'static str {
        match self {
            CdlStyle::Fwd => "Fwd",
            CdlStyle::FwdNoClamp => "FwdNoClamp",
            CdlStyle::Rev => "Rev",
            CdlStyle::RevNoClamp => "RevNoClamp",
        }
    }

    /// True for the clamping styles.
    pub fn clamps(&self) -> bool {
        matches!(self, CdlStyle::Fwd | CdlStyle::Rev)
    }

    /// True for the inverse styles.
    pub fn is_reverse(&self) -> bool {
        matches!(self, CdlStyle::Rev | CdlStyle::RevNoClamp)
    }
}

impl FromStr for CdlStyle {
    type Err = ClfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Fwd" | "v1.2_Fwd" => Ok(CdlStyle::Fwd),
            "FwdNoClamp" | "noClampFwd" => Ok(CdlStyle::FwdNoClamp),
            "Rev" | "v1.2_Rev" => Ok(CdlStyle::Rev),
            "RevNoClamp" | "noClampRev" => Ok(CdlStyle::RevNoClamp),
            other => Err(ClfError::parse(format!("unknown ASC_CDL style '{}'", other))),
        }
    }
}

impl fmt::Display for CdlStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slope, offset, power and saturation of a CDL node.
#[derive(Debug, Clone, PartialEq)]
pub struct CdlParams {
    /// Slope per channel.
    pub slope: [f64; 3],
    /// Offset per channel.
    pub offset: [f64; 3],
    /// Power per channel.
    pub power: [f64; 3],
    /// Saturation (1.0 = unchanged).
    pub saturation: f64,
    /// Direction and clamping.
    pub style: CdlStyle,
}

impl Default for CdlParams {
    fn default() -> Self {
        Self {
            slope: [1.0; 3],
            offset: [0.0; 3],
            power: [1.0; 3],
            saturation: 1.0,
            style: CdlStyle::Fwd,
        }
    }
}

impl CdlParams {
    /// Forward CDL with unit saturation.
    pub fn new(slope: [f64; 3], offset: [f64; 3], power: [f64; 3]) -> Self {
        Self {
            slope,
            offset,
            power,
            ..Default::default()
        }
    }

    /// Sets saturation.
    pub fn with_saturation(mut self, saturation: f64) -> Self {
        self.saturation = saturation;
        self
    }

    /// Sets the style.
    pub fn with_style(mut self, style: CdlStyle) -> Self {
        self.style = style;
        self
    }

    /// Applies the node to normalized RGB.
    pub fn apply(&self, rgb: [f64; 3]) -> [f64; 3] {
        if self.style.is_reverse() {
            self.reverse(rgb)
        } else {
            self.forward(rgb)
        }
    }

    fn forward(&self, rgb: [f64; 3]) -> [f64; 3] {
        let clamp = self.style.clamps();
        let mut out = [0.0; 3];
        for i in 0..3 {
            let v = rgb[i] * self.slope[i] + self.offset[i];
            out[i] = if clamp {
                clamp01(v).powf(self.power[i])
            } else if v > 0.0 {
                v.powf(self.power[i])
            } else {
                v
            };
        }
        let out = saturate(out, self.saturation);
        if clamp { out.map(clamp01) } else { out }
    }

    fn reverse(&self, rgb: [f64; 3]) -> [f64; 3] {
        let clamp = self.style.clamps();
        let rgb = if clamp { rgb.map(clamp01) } else { rgb };
        let mut v = if self.saturation.abs() > 1e-10 {
            saturate(rgb, 1.0 / self.saturation)
        } else {
            rgb
        };
        for i in 0..3 {
            let mut x = if clamp { clamp01(v[i]) } else { v[i] };
            if x > 0.0 && self.power[i].abs() > 1e-10 {
                x = x.powf(1.0 / self.power[i]);
            }
            x = if self.slope[i].abs() > 1e-10 {
                (x - self.offset[i]) / self.slope[i]
            } else {
                0.0
            };
            v[i] = if clamp { clamp01(x) } else { x };
        }
        v
    }

    fn read_sop(&mut self, el: &Element) -> ClfResult<()> {
        for child in &el.children {
            match child.name.as_str() {
                "Slope" => self.slope = parse_numbers(child)?,
                "Offset" => self.offset = parse_numbers(child)?,
                "Power" => self.power = parse_numbers(child)?,
                _ => {}
            }
        }
        Ok(())
    }
}

#[inline]
fn clamp01(v: f64) -> f64 {
    v.max(0.0).min(1.0)
}

#[inline]
fn saturate(rgb: [f64; 3], sat: f64) -> [f64; 3] {
    if sat == 1.0 {
        return rgb;
    }
    let luma = rgb[0] * LUMA_R + rgb[1] * LUMA_G + rgb[2] * LUMA_B;
    rgb.map(|c| luma + sat * (c - luma))
}

fn join3(v: &[f64; 3]) -> String {
    v.iter().map(|x| format_f64(*x)).collect::<Vec<_>>().join(" ")
}

impl Operator for CdlParams {
    fn attributes(&self) -> &'static [&'static str] {
        &["style"]
    }

    fn read_attributes(&mut self, el: &Element, _ctx: &ReadContext<'_>) -> ClfResult<()> {
        if let Some(style) = el.attr("style") {
            self.style = style.parse()?;
        }
        Ok(())
    }

    fn read_child(
        &mut self,
        child: &Element,
        _common: &NodeCommon,
        _ctx: &ReadContext<'_>,
    ) -> ClfResult<bool> {
        match child.name.as_str() {
            "SOPNode" => self.read_sop(child)?,
            "SatNode" | "SATNode" => {
                if let Some(sat) = child.child("Saturation") {
                    self.saturation = parse_scalar(sat)?;
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn write_attributes(&self, el: &mut Element) {
        el.push_attr("style", self.style.as_str());
    }

    fn write_payload(&self, el: &mut Element, _opts: &WriteOptions) {
        let mut sop = Element::new("SOPNode");
        sop.children.push(Element::with_text("Slope", join3(&self.slope)));
        sop.children.push(Element::with_text("Offset", join3(&self.offset)));
        sop.children.push(Element::with_text("Power", join3(&self.power)));
        el.children.push(sop);

        let mut sat = Element::new("SatNode");
        sat.children
            .push(Element::with_text("Saturation", format_f64(self.saturation)));
        el.children.push(sat);
    }

    fn process_pixel(&self, common: &NodeCommon, pixel: &mut [f32]) {
        if pixel.len() < 3 {
            return;
        }
        let rgb = [0, 1, 2].map(|i| common.in_bit_depth.to_normalized(pixel[i]) as f64);
        let out = self.apply(rgb);
        for i in 0..3 {
            pixel[i] = common.out_bit_depth.from_normalized(out[i] as f32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Element;
    use crate::node::{NodeOp, ProcessNode};
    use crate::options::ParseOptions;
    use approx::assert_relative_eq;

    fn sample() -> CdlParams {
        CdlParams::new([1.2, 0.9, 1.0], [0.05, -0.02, 0.0], [1.1, 1.0, 0.8]).with_saturation(0.8)
    }

    #[test]
    fn test_identity() {
        let cdl = CdlParams::default();
        assert_eq!(cdl.apply([0.1, 0.5, 0.9]), [0.1, 0.5, 0.9]);
    }

    #[test]
    fn test_offset() {
        let cdl = CdlParams::new([1.0; 3], [0.1, 0.0, 0.0], [1.0; 3]);
        let out = cdl.apply([0.5, 0.5, 0.5]);
        assert_relative_eq!(out[0], 0.6, epsilon = 1e-12);
        assert_relative_eq!(out[1], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_fwd_rev_inverse() {
        for (fwd, rev) in [
            (CdlStyle::Fwd, CdlStyle::Rev),
            (CdlStyle::FwdNoClamp, CdlStyle::RevNoClamp),
        ] {
            let f = sample().with_style(fwd);
            let r = sample().with_style(rev);
            let rgb = [0.3, 0.45, 0.6];
            let back = r.apply(f.apply(rgb));
            for i in 0..3 {
                assert_relative_eq!(back[i], rgb[i], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_clamping() {
        let cdl = CdlParams::new([2.0; 3], [0.0; 3], [1.0; 3]);
        assert_eq!(cdl.apply([0.8, -0.5, 0.1]), [1.0, 0.0, 0.2]);
        let loose = cdl.with_style(CdlStyle::FwdNoClamp);
        assert_eq!(loose.apply([0.8, -0.5, 0.1]), [1.6, -1.0, 0.2]);
    }

    #[test]
    fn test_aliases() {
        assert_eq!("v1.2_Fwd".parse::<CdlStyle>().unwrap(), CdlStyle::Fwd);
        assert_eq!("noClampRev".parse::<CdlStyle>().unwrap(), CdlStyle::RevNoClamp);
        assert!("Sideways".parse::<CdlStyle>().is_err());
    }

    #[test]
    fn test_read_sat_node_spelling() {
        let el = Element::parse(
            br#"<ASC_CDL inBitDepth="32f" outBitDepth="32f" style="v1.2_Fwd">
                <SOPNode>
                    <Slope>1 1 1</Slope><Offset>0.1 0.1 0.1</Offset><Power>1 1 1</Power>
                </SOPNode>
                <SATNode><Saturation>0.5</Saturation></SATNode>
            </ASC_CDL>"#,
        )
        .unwrap();
        let node = ProcessNode::from_element(&el, &ParseOptions::default())
            .unwrap()
            .unwrap();
        let NodeOp::AscCdl(cdl) = &node.op else {
            panic!("expected ASC_CDL");
        };
        assert_eq!(cdl.saturation, 0.5);
        assert_eq!(cdl.offset, [0.1; 3]);
        assert_eq!(cdl.style, CdlStyle::Fwd);
    }

    #[test]
    fn test_color_correction_ignores_attributes() {
        let el = Element::parse(
            br#"<ColorCorrection id="cc1" style="Rev" inBitDepth="10i" outBitDepth="10i">
                <SOPNode><Slope>2 2 2</Slope><Offset>0 0 0</Offset><Power>1 1 1</Power></SOPNode>
            </ColorCorrection>"#,
        )
        .unwrap();
        let node = ProcessNode::from_element(&el, &ParseOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(node.common.id, None);
        assert_eq!(node.process(&[0.25, 0.25, 0.25], 3), vec![0.5, 0.5, 0.5]);

        let mut root = Element::new("Root");
        node.write(&mut root, &Default::default());
        assert!(root.children[0].attributes.is_empty());
    }
}
