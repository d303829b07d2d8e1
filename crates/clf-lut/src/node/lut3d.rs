//! LUT3D node: RGB lattice lookup.

use super::{NodeCommon, Operator};
use crate::array::{Array, ArrayLayout};
use crate::document::Element;
use crate::index_map::IndexMap;
use crate::options::{ReadContext, WriteOptions};
use crate::{ClfError, ClfResult};
use std::str::FromStr;

/// Interpolation inside a lattice cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lut3DInterpolation {
    /// Eight-corner blend.
    #[default]
    Trilinear,
    /// Four-corner blend inside one of six tetrahedra.
    Tetrahedral,
}

impl Lut3DInterpolation {
    /// Attribute token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lut3DInterpolation::Trilinear => "trilinear",
            Lut3DInterpolation::Tetrahedral => "tetrahedral",
        }
    }
}

impl FromStr for Lut3DInterpolation {
    type Err = ClfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trilinear" => Ok(Lut3DInterpolation::Trilinear),
            "tetrahedral" => Ok(Lut3DInterpolation::Tetrahedral),
            other => Err(ClfError::parse(format!("unknown LUT3D interpolation '{}'", other))),
        }
    }
}

/// Lattice and interpolation of a LUT3D node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Lut3DParams {
    /// `n x n x n x 3` lattice, R slowest.
    pub array: Array,
    /// Optional per-axis input remaps.
    pub index_maps: Vec<IndexMap>,
    /// `interpolation` attribute.
    pub interpolation: Option<Lut3DInterpolation>,
}

impl Lut3DParams {
    /// LUT3D over `array`.
    pub fn new(array: Array) -> Self {
        Self {
            array,
            ..Default::default()
        }
    }

    /// Sets interpolation.
    pub fn with_interpolation(mut self, interpolation: Lut3DInterpolation) -> Self {
        self.interpolation = Some(interpolation);
        self
    }

    /// Looks up normalized RGB.
    pub fn lookup(&self, rgb: [f32; 3]) -> [f32; 3] {
        match self.interpolation.unwrap_or_default() {
            Lut3DInterpolation::Trilinear => self.array.lookup_3d_trilinear(rgb),
            Lut3DInterpolation::Tetrahedral => self.array.lookup_3d_tetrahedral(rgb),
        }
    }

    fn position(&self, common: &NodeCommon, axis: usize, x: f32) -> f32 {
        let map = match self.index_maps.len() {
            0 => None,
            1 => self.index_maps.first(),
            _ => self.index_maps.get(axis),
        };
        match map {
            Some(map) => {
                let size = self.array.dims().get(axis).copied().unwrap_or(2);
                map.process(x) / size.saturating_sub(1).max(1) as f32
            }
            None => common.in_bit_depth.to_normalized(x),
        }
    }
}

impl Operator for Lut3DParams {
    fn attributes(&self) -> &'static [&'static str] {
        &["interpolation"]
    }

    fn read_attributes(&mut self, el: &Element, _ctx: &ReadContext<'_>) -> ClfResult<()> {
        self.interpolation = el.attr("interpolation").map(str::parse).transpose()?;
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
            "Array" => self.array = Array::from_element(child, ArrayLayout::Table, false, ctx)?,
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
        let dims = self.array.dims();
        if dims.len() != 4 || dims[3] != 3 {
            return Err(ClfError::parse(format!(
                "LUT3D Array dim {:?} must be 'r g b 3'",
                dims
            )));
        }
        self.array.set_integers(common.out_bit_depth.is_integer());
        Ok(())
    }

    fn write_attributes(&self, el: &mut Element) {
        if let Some(interp) = self.interpolation {
            el.push_attr("interpolation", interp.as_str());
        }
    }

    fn write_payload(&self, el: &mut Element, _opts: &WriteOptions) {
        for map in &self.index_maps {
            el.children.push(map.to_element());
        }
        el.children.push(self.array.to_element());
    }

    fn process_pixel(&self, common: &NodeCommon, pixel: &mut [f32]) {
        if pixel.len() < 3 {
            return;
        }
        let rgb = [0, 1, 2].map(|i| self.position(common, i, pixel[i]));
        let out = self.lookup(rgb);
        pixel[..3].copy_from_slice(&out);
    }
}
