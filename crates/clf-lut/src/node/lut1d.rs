//! LUT1D node: per-channel 1D lookup.
//!
//! Input reaches the table through, in priority order: Index Maps (one shared
//! or one per channel), the half-float domain, or bit-depth normalization.
//! Table values are already in the output depth.

use super::{NodeCommon, Operator};
use crate::array::{Array, ArrayLayout};
use crate::document::{parse_bool, Element};
use crate::index_map::IndexMap;
use crate::options::{Extension, ReadContext, WriteOptions};
use crate::{ClfError, ClfResult};
use std::str::FromStr;

/// Interpolation between table rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lut1DInterpolation {
    /// Linear.
    #[default]
    Linear,
    /// Catmull-Rom cubic.
    Cubic,
}

impl Lut1DInterpolation {
    /// Attribute token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lut1DInterpolation::Linear => "linear",
            Lut1DInterpolation::Cubic => "cubic",
        }
    }
}

impl FromStr for Lut1DInterpolation {
    type Err = ClfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(Lut1DInterpolation::Linear),
            "cubic" => Ok(Lut1DInterpolation::Cubic),
            other => Err(ClfError::parse(format!("unknown LUT1D interpolation '{}'", other))),
        }
    }
}

/// Table, index maps and flags of a LUT1D node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Lut1DParams {
    /// `size x channels` table, channels 1 or 3.
    pub array: Array,
    /// Optional input remaps.
    pub index_maps: Vec<IndexMap>,
    /// `interpolation` attribute.
    pub interpolation: Option<Lut1DInterpolation>,
    /// Table is indexed by half-float bit pattern (65536 rows).
    pub half_domain: bool,
    /// Table values are written as half bit patterns.
    pub raw_halfs: bool,
}

impl Lut1DParams {
    /// LUT1D over `array`.
    pub fn new(array: Array) -> Self {
        Self {
            array,
            ..Default::default()
        }
    }

    /// Sets interpolation.
    pub fn with_interpolation(mut self, interpolation: Lut1DInterpolation) -> Self {
        self.interpolation = Some(interpolation);
        self
    }

    /// Indexes the table by half-float bit pattern.
    pub fn with_half_domain(mut self, half_domain: bool) -> Self {
        self.half_domain = half_domain;
        self
    }

    /// Adds an input Index Map.
    pub fn with_index_map(mut self, map: IndexMap) -> Self {
        self.index_maps.push(map);
        self
    }

    fn index_map(&self, channel: usize) -> Option<&IndexMap> {
        match self.index_maps.len() {
            0 => None,
            1 => self.index_maps.first(),
            _ => self.index_maps.get(channel).or(self.index_maps.last()),
        }
    }

    /// Looks up one input value on `channel`.
    pub fn lookup(&self, common: &NodeCommon, channel: usize, x: f32) -> f32 {
        let position = match self.index_map(channel) {
            Some(map) => {
                let max = self.array.rows().saturating_sub(1).max(1) as f32;
                map.process(x) / max
            }
            None if self.half_domain => x,
            None => common.in_bit_depth.to_normalized(x),
        };
        if self.interpolation == Some(Lut1DInterpolation::Cubic) {
            self.array.lookup_1d_cubic(position, channel)
        } else if self.half_domain {
            self.array.lookup_1d_half_domain_interpolated(position, channel)
        } else {
            self.array.lookup_1d_linear(position, channel)
        }
    }
}

impl Operator for Lut1DParams {
    fn attributes(&self) -> &'static [&'static str] {
        &["interpolation", "halfDomain", "rawHalfs"]
    }

    fn read_attributes(&mut self, el: &Element, ctx: &ReadContext<'_>) -> ClfResult<()> {
        self.interpolation = el.attr("interpolation").map(str::parse).transpose()?;
        self.half_domain = parse_bool(el, "halfDomain")?.unwrap_or(false);
        self.raw_halfs = parse_bool(el, "rawHalfs")?.unwrap_or(false);
        if self.half_domain {
            ctx.require(Extension::Autodesk, "halfDomain")?;
        }
        if self.raw_halfs {
            ctx.require(Extension::Autodesk, "rawHalfs")?;
        }
        Ok(())
    }

    fn read_child(
        &mut self,
        child: &Element,
        _common: &NodeCommon,
        ctx: &ReadContext<'_>,
    ) -> ClfResult<bool> {
        match child.name.as_str() {
            "IndexMap" => self.index_maps.push(IndexMap::from_element(child, ctx)?),
            "Array" => {
                self.array = Array::from_element(child, ArrayLayout::Table, self.raw_halfs, ctx)?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn finish_read(
        &mut self,
        el: &Element,
        common: &NodeCommon,
        _ctx: &ReadContext<'_>,
    ) -> ClfResult<()> {
        if self.array.is_empty() {
            return Err(ClfError::parse(format!("<{}> has no Array", el.name)));
        }
        let channels = self.array.columns();
        if self.array.dims().len() != 2 || !(channels == 1 || channels == 3) {
            return Err(ClfError::parse(format!(
                "LUT1D Array dim {:?} must be 'size 1' or 'size 3'",
                self.array.dims()
            )));
        }
        self.array
            .set_integers(common.out_bit_depth.is_integer() && !self.raw_halfs);
        Ok(())
    }

    fn write_attributes(&self, el: &mut Element) {
        if let Some(interp) = self.interpolation {
            el.push_attr("interpolation", interp.as_str());
        }
        if self.half_domain {
            el.push_attr("halfDomain", "true");
        }
        if self.raw_halfs {
            el.push_attr("rawHalfs", "true");
        }
    }

    fn write_payload(&self, el: &mut Element, _opts: &WriteOptions) {
        for map in &self.index_maps {
            el.children.push(map.to_element());
        }
        let mut array = self.array.clone();
        array.set_raw_halfs(self.raw_halfs);
        el.children.push(array.to_element());
    }

    fn process_pixel(&self, common: &NodeCommon, pixel: &mut [f32]) {
        for (i, x) in pixel.iter_mut().take(3).enumerate() {
            *x = self.lookup(common, i, *x);
        }
    }
}
