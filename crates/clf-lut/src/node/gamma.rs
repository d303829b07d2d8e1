//! Gamma node: basic power law and monitor curve (sRGB-like with a linear
//! toe).

use super::{NodeCommon, Operator};
use crate::document::{format_f64, Element};
use crate::options::{ReadContext, WriteOptions};
use crate::{ClfError, ClfResult};
use std::fmt;
use std::str::FromStr;

/// Channel selector of a per-channel parameter element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Red.
    R,
    /// Green.
    G,
    /// Blue.
    B,
}

impl Channel {
    /// Attribute token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::R => "R",
            Channel::G => "G",
            Channel::B => "B",
        }
    }

    /// Pixel index.
    pub fn index(&self) -> usize {
        match self {
            Channel::R => 0,
            Channel::G => 1,
            Channel::B => 2,
        }
    }
}

impl FromStr for Channel {
    type Err = ClfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "R" => Ok(Channel::R),
            "G" => Ok(Channel::G),
            "B" => Ok(Channel::B),
            other => Err(ClfError::parse(format!("unknown channel '{}'", other))),
        }
    }
}

/// Gamma curve family and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GammaStyle {
    /// `x^g`, negatives clamp to 0.
    #[default]
    BasicFwd,
    /// `x^(1/g)`, negatives clamp to 0.
    BasicRev,
    /// Monitor curve encode-to-linear.
    MoncurveFwd,
    /// Monitor curve linear-to-encode.
    MoncurveRev,
}

impl GammaStyle {
    /// Attribute token.
    pub fn as_str(&self) -> &'static str {
        match self {
            GammaStyle::BasicFwd => "basicFwd",
            GammaStyle::BasicRev => "basicRev",
            GammaStyle::MoncurveFwd => "moncurveFwd",
            GammaStyle::MoncurveRev => "moncurveRev",
        }
    }
}

impl FromStr for GammaStyle {
    type Err = ClfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basicFwd" => Ok(GammaStyle::BasicFwd),
            "basicRev" => Ok(GammaStyle::BasicRev),
            "moncurveFwd" => Ok(GammaStyle::MoncurveFwd),
            "moncurveRev" => Ok(GammaStyle::MoncurveRev),
            other => Err(ClfError::parse(format!("unknown Gamma style '{}'", other))),
        }
    }
}

impl fmt::Display for GammaStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `GammaParams` element.
#[derive(Debug, Clone, PartialEq)]
pub struct GammaChannelParams {
    /// Exponent.
    pub gamma: f64,
    /// Monitor curve offset.
    pub offset: Option<f64>,
    /// Channel the element applies to; `None` applies to all.
    pub channel: Option<Channel>,
}

impl GammaChannelParams {
    /// Parameters for every channel.
    pub fn new(gamma: f64, offset: Option<f64>) -> Self {
        Self {
            gamma,
            offset,
            channel: None,
        }
    }

    fn eval(&self, style: GammaStyle, x: f64) -> f64 {
        let g = self.gamma;
        let offs = self.offset.unwrap_or(0.0);
        match style {
            GammaStyle::BasicFwd => x.max(0.0).powf(g),
            GammaStyle::BasicRev => x.max(0.0).powf(1.0 / g),
            // the linear segment degenerates without an offset or for g <= 1
            GammaStyle::MoncurveFwd if g <= 1.0 || offs <= 0.0 => x.max(0.0).powf(g),
            GammaStyle::MoncurveRev if g <= 1.0 || offs <= 0.0 => x.max(0.0).powf(1.0 / g),
            GammaStyle::MoncurveFwd => {
                let x_break = offs / (g - 1.0);
                let slope = ((g - 1.0) / offs) * (offs * g / ((g - 1.0) * (1.0 + offs))).powf(g);
                if x >= x_break {
                    ((x + offs) / (1.0 + offs)).powf(g)
                } else {
                    x * slope
                }
            }
            GammaStyle::MoncurveRev => {
                let y_break = (offs * g / ((g - 1.0) * (1.0 + offs))).powf(g);
                let slope = ((g - 1.0) / offs).powf(g - 1.0) * ((1.0 + offs) / g).powf(g);
                if x >= y_break {
                    (1.0 + offs) * x.powf(1.0 / g) - offs
                } else {
                    x * slope
                }
            }
        }
    }
}

/// Style and parameter elements of a Gamma node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GammaParams {
    /// Curve family and direction.
    pub style: GammaStyle,
    /// `GammaParams` elements in document order.
    pub params: Vec<GammaChannelParams>,
}

impl GammaParams {
    /// Single parameter set for all channels.
    pub fn new(style: GammaStyle, gamma: f64, offset: Option<f64>) -> Self {
        Self {
            style,
            params: vec![GammaChannelParams::new(gamma, offset)],
        }
    }

    /// Parameters applying to `channel`: a matching element, else one without
    /// a channel.
    pub fn for_channel(&self, channel: usize) -> Option<&GammaChannelParams> {
        self.params
            .iter()
            .find(|p| p.channel.map(|c| c.index()) == Some(channel))
            .or_else(|| self.params.iter().find(|p| p.channel.is_none()))
    }

    /// Applies the curve to a normalized value of `channel`.
    pub fn apply(&self, channel: usize, x: f64) -> f64 {
        match self.for_channel(channel) {
            Some(p) => p.eval(self.style, x),
            None => x,
        }
    }
}

impl Operator for GammaParams {
    fn attributes(&self) -> &'static [&'static str] {
        &["style"]
    }

    fn read_attributes(&mut self, el: &Element, _ctx: &ReadContext<'_>) -> ClfResult<()> {
        self.style = el.required_attr("style")?.parse()?;
        Ok(())
    }

    fn read_child(
        &mut self,
        child: &Element,
        _common: &NodeCommon,
        _ctx: &ReadContext<'_>,
    ) -> ClfResult<bool> {
        if child.name != "GammaParams" {
            return Ok(false);
        }
        let gamma = child
            .attr_f64("gamma")?
            .ok_or_else(|| ClfError::MissingAttribute {
                element: child.name.clone(),
                attribute: "gamma",
            })?;
        self.params.push(GammaChannelParams {
            gamma,
            offset: child.attr_f64("offset")?,
            channel: child.attr("channel").map(str::parse).transpose()?,
        });
        Ok(true)
    }

    fn write_attributes(&self, el: &mut Element) {
        el.push_attr("style", self.style.as_str());
    }

    fn write_payload(&self, el: &mut Element, _opts: &WriteOptions) {
        for p in &self.params {
            let mut child = Element::new("GammaParams").with_attr("gamma", format_f64(p.gamma));
            if let Some(offset) = p.offset {
                child.push_attr("offset", format_f64(offset));
            }
            if let Some(channel) = p.channel {
                child.push_attr("channel", channel.as_str());
            }
            el.children.push(child);
        }
    }

    fn process_pixel(&self, common: &NodeCommon, pixel: &mut [f32]) {
        for (i, x) in pixel.iter_mut().take(3).enumerate() {
            let v = common.in_bit_depth.to_normalized(*x) as f64;
            *x = common.out_bit_depth.from_normalized(self.apply(i, v) as f32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_basic() {
        let fwd = GammaParams::new(GammaStyle::BasicFwd, 2.2, None);
        let rev = GammaParams::new(GammaStyle::BasicRev, 2.2, None);
        assert_relative_eq!(fwd.apply(0, 0.5), 0.5f64.powf(2.2), epsilon = 1e-12);
        assert_relative_eq!(rev.apply(1, fwd.apply(1, 0.3)), 0.3, epsilon = 1e-12);
        assert_eq!(fwd.apply(2, -0.5), 0.0);
    }

    #[test]
    fn test_moncurve_srgb() {
        // sRGB: gamma 2.4, offset 0.055
        let fwd = GammaParams::new(GammaStyle::MoncurveFwd, 2.4, Some(0.055));
        let rev = GammaParams::new(GammaStyle::MoncurveRev, 2.4, Some(0.055));
        assert_relative_eq!(fwd.apply(0, 0.5), 0.214041140, epsilon = 1e-6);
        assert_relative_eq!(fwd.apply(0, 0.02), 0.02 / 12.92, epsilon = 1e-4);
        for x in [0.001, 0.01, 0.04, 0.2, 0.8, 1.0] {
            assert_relative_eq!(rev.apply(0, fwd.apply(0, x)), x, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_moncurve_degenerate() {
        let fwd = GammaParams::new(GammaStyle::MoncurveFwd, 1.0, Some(0.0));
        assert_relative_eq!(fwd.apply(0, 0.25), 0.25);
    }

    #[test]
    fn test_per_channel() {
        let params = GammaParams {
            style: GammaStyle::BasicFwd,
            params: vec![
                GammaChannelParams::new(1.0, None),
                GammaChannelParams {
                    gamma: 2.0,
                    offset: None,
                    channel: Some(Channel::G),
                },
            ],
        };
        assert_relative_eq!(params.apply(0, 0.5), 0.5);
        assert_relative_eq!(params.apply(1, 0.5), 0.25);
        assert_relative_eq!(params.apply(2, 0.5), 0.5);
    }
}
