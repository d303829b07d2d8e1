//! ExposureContrast node.
//!
//! Exposure is in stops, contrast pivots around `pivot`. Three styles cover
//! scene-linear, video (gamma-encoded) and log-encoded inputs; the `Rev`
//! variants apply the exact inverse.

use super::{NodeCommon, Operator};
use crate::document::{format_f64, Element};
use crate::options::{ReadContext, WriteOptions};
use crate::{ClfError, ClfResult};
use std::fmt;
use std::str::FromStr;

/// Approximate video OETF exponent.
pub const VIDEO_OETF_POWER: f64 = 1.0 / 1.83;
/// Smallest pivot used.
pub const MIN_PIVOT: f64 = 0.001;
/// Smallest contrast used.
pub const MIN_CONTRAST: f64 = 0.001;
/// Log-encoded value change per stop.
pub const LOG_EXPOSURE_STEP: f64 = 0.088;
/// Log-encoded value of 18% gray.
pub const LOG_MIDGRAY: f64 = 0.435;

/// Encoding the node expects, and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EcStyle {
    /// Scene-linear.
    #[default]
    Linear,
    /// Inverse of [`EcStyle::Linear`].
    LinearRev,
    /// Video (gamma) encoded.
    Video,
    /// Inverse of [`EcStyle::Video`].
    VideoRev,
    /// Log encoded.
    Log,
    /// Inverse of [`EcStyle::Log`].
    LogRev,
}

impl EcStyle {
    /// Attribute token.
    pub fn as_str(&self) -> &'static str {
        match self {
            EcStyle::Linear => "linear",
            EcStyle::LinearRev => "linearRev",
            EcStyle::Video => "video",
            EcStyle::VideoRev => "videoRev",
            EcStyle::Log => "log",
            EcStyle::LogRev => "logRev",
        }
    }
}

impl FromStr for EcStyle {
    type Err = ClfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(EcStyle::Linear),
            "linearRev" => Ok(EcStyle::LinearRev),
            "video" => Ok(EcStyle::Video),
            "videoRev" => Ok(EcStyle::VideoRev),
            "log" => Ok(EcStyle::Log),
            "logRev" => Ok(EcStyle::LogRev),
            other => Err(ClfError::parse(format!("unknown ExposureContrast style '{}'", other))),
        }
    }
}

impl fmt::Display for EcStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of an ExposureContrast node.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureContrastParams {
    /// Encoding and direction.
    pub style: EcStyle,
    /// Exposure in stops.
    pub exposure: f64,
    /// Contrast (1.0 = unchanged).
    pub contrast: f64,
    /// Contrast pivot, scene-linear.
    pub pivot: f64,
}

impl Default for ExposureContrastParams {
    fn default() -> Self {
        Self {
            style: EcStyle::Linear,
            exposure: 0.0,
            contrast: 1.0,
            pivot: 0.18,
        }
    }
}

impl ExposureContrastParams {
    /// Parameters with the given style.
    pub fn new(style: EcStyle, exposure: f64, contrast: f64, pivot: f64) -> Self {
        Self {
            style,
            exposure,
            contrast,
            pivot,
        }
    }

    /// Applies the node to one normalized value.
    pub fn apply(&self, x: f64) -> f64 {
        let contrast = self.contrast.max(MIN_CONTRAST);
        match self.style {
            EcStyle::Linear => {
                power_about(x, 2f64.powf(self.exposure), self.pivot.max(MIN_PIVOT), contrast)
            }
            EcStyle::LinearRev => {
                power_about_inv(x, 2f64.powf(self.exposure), self.pivot.max(MIN_PIVOT), contrast)
            }
            EcStyle::Video => power_about(
                x,
                2f64.powf(self.exposure).powf(VIDEO_OETF_POWER),
                self.pivot.max(MIN_PIVOT).powf(VIDEO_OETF_POWER),
                contrast,
            ),
            EcStyle::VideoRev => power_about_inv(
                x,
                2f64.powf(self.exposure).powf(VIDEO_OETF_POWER),
                self.pivot.max(MIN_PIVOT).powf(VIDEO_OETF_POWER),
                contrast,
            ),
            EcStyle::Log => {
                let log_pivot = self.log_pivot();
                let exposure = self.exposure * LOG_EXPOSURE_STEP;
                x * contrast + (exposure - log_pivot) * contrast + log_pivot
            }
            EcStyle::LogRev => {
                let log_pivot = self.log_pivot();
                let exposure = self.exposure * LOG_EXPOSURE_STEP;
                (x - log_pivot) / contrast + log_pivot - exposure
            }
        }
    }

    fn log_pivot(&self) -> f64 {
        ((self.pivot.max(MIN_PIVOT) / 0.18).log2() * LOG_EXPOSURE_STEP + LOG_MIDGRAY).max(0.0)
    }
}

/// `pivot * (x * gain / pivot) ^ contrast`, negatives clamp to 0.
#[inline]
fn power_about(x: f64, gain: f64, pivot: f64, contrast: f64) -> f64 {
    if contrast == 1.0 {
        x * gain
    } else {
        (x * gain / pivot).max(0.0).powf(contrast) * pivot
    }
}

#[inline]
fn power_about_inv(x: f64, gain: f64, pivot: f64, contrast: f64) -> f64 {
    if contrast == 1.0 {
        x / gain
    } else {
        (x / pivot).max(0.0).powf(1.0 / contrast) * pivot / gain
    }
}

impl Operator for ExposureContrastParams {
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
        if child.name != "ECParams" {
            return Ok(false);
        }
        if let Some(v) = child.attr_f64("exposure")? {
            self.exposure = v;
        }
        if let Some(v) = child.attr_f64("contrast")? {
            self.contrast = v;
        }
        if let Some(v) = child.attr_f64("pivot")? {
            self.pivot = v;
        }
        Ok(true)
    }

    fn write_attributes(&self, el: &mut Element) {
        el.push_attr("style", self.style.as_str());
    }

    fn write_payload(&self, el: &mut Element, _opts: &WriteOptions) {
        el.children.push(
            Element::new("ECParams")
                .with_attr("exposure", format_f64(self.exposure))
                .with_attr("contrast", format_f64(self.contrast))
                .with_attr("pivot", format_f64(self.pivot)),
        );
    }

    fn process_pixel(&self, common: &NodeCommon, pixel: &mut [f32]) {
        for x in pixel.iter_mut().take(3) {
            let v = common.in_bit_depth.to_normalized(*x) as f64;
            *x = common.out_bit_depth.from_normalized(self.apply(v) as f32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_exposure_only() {
        let ec = ExposureContrastParams::new(EcStyle::Linear, 1.0, 1.0, 0.18);
        assert_relative_eq!(ec.apply(0.25), 0.5);
    }

    #[test]
    fn test_pivot_fixed() {
        for style in [EcStyle::Linear, EcStyle::Video] {
            let ec = ExposureContrastParams::new(style, 0.0, 1.5, 0.18);
            let pivot = if style == EcStyle::Video {
                0.18f64.powf(VIDEO_OETF_POWER)
            } else {
                0.18
            };
            assert_relative_eq!(ec.apply(pivot), pivot, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_inverse() {
        let pairs = [
            (EcStyle::Linear, EcStyle::LinearRev),
            (EcStyle::Video, EcStyle::VideoRev),
            (EcStyle::Log, EcStyle::LogRev),
        ];
        for (fwd, rev) in pairs {
            let f = ExposureContrastParams::new(fwd, 0.7, 1.3, 0.2);
            let r = ExposureContrastParams::new(rev, 0.7, 1.3, 0.2);
            for x in [0.05, 0.18, 0.6] {
                assert_relative_eq!(r.apply(f.apply(x)), x, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_log_midgray() {
        let ec = ExposureContrastParams::new(EcStyle::Log, 1.0, 1.0, 0.18);
        assert_relative_eq!(
            ec.apply(LOG_MIDGRAY),
            LOG_MIDGRAY + LOG_EXPOSURE_STEP,
            epsilon = 1e-12
        );
    }
}
