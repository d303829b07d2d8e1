//! Piecewise-linear input remapping for 1D tables.

use crate::array::Array;
use crate::codec::half_to_f32;
use crate::document::{format_f64, parse_f64, Element};
use crate::options::{Extension, ReadContext};
use crate::{ClfError, ClfResult};

/// Maps input values onto table positions before a LUT1D lookup.
///
/// Breakpoints are non-decreasing. The optional cache holds the result for
/// every half-float input and is indexed with the half-domain kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMap {
    dim: usize,
    inputs: Vec<f64>,
    outputs: Vec<f64>,
    cache: Option<Array>,
}

impl IndexMap {
    /// Builds a map from parallel breakpoint / output lists.
    ///
    /// # Example
    ///
    /// ```rust
    /// use clf_lut::IndexMap;
    ///
    /// let map = IndexMap::new(2, vec![0.0, 10.0], vec![0.0, 1.0]).unwrap();
    /// assert_eq!(map.process(5.0), 0.5);
    /// assert_eq!(map.process(20.0), 1.0);
    /// ```
    pub fn new(dim: usize, inputs: Vec<f64>, outputs: Vec<f64>) -> ClfResult<Self> {
        if inputs.len() != outputs.len() {
            return Err(ClfError::parse(format!(
                "IndexMap has {} inputs but {} outputs",
                inputs.len(),
                outputs.len()
            )));
        }
        if inputs.is_empty() {
            return Err(ClfError::parse("IndexMap is empty"));
        }
        if inputs.windows(2).any(|w| w[1] < w[0]) {
            return Err(ClfError::parse("IndexMap inputs must be non-decreasing"));
        }
        Ok(Self {
            dim,
            inputs,
            outputs,
            cache: None,
        })
    }

    /// Declared input resolution.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of breakpoints.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// True when there are no breakpoints.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Input breakpoints.
    pub fn inputs(&self) -> &[f64] {
        &self.inputs
    }

    /// Output values.
    pub fn outputs(&self) -> &[f64] {
        &self.outputs
    }

    /// True once [`IndexMap::build_cache`] has run.
    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Precomputes the map for every half-float input.
    pub fn build_cache(&mut self) {
        let values = (0..=u16::MAX)
            .map(|bits| self.process_uncached(half_to_f32(bits)) as f64)
            .collect();
        // 65536 x 1 always matches its value count
        self.cache = Array::table(vec![65536, 1], values).ok();
    }

    /// Remaps `value`, using the cache when present.
    pub fn process(&self, value: f32) -> f32 {
        match &self.cache {
            Some(cache) => cache.lookup_1d_half_domain_interpolated(value, 0),
            None => self.process_uncached(value),
        }
    }

    /// Remaps `value` by searching the breakpoints.
    pub fn process_uncached(&self, value: f32) -> f32 {
        if !value.is_finite() {
            return value;
        }
        let n = self.inputs.len();
        if n == 0 {
            return value;
        }
        let v = value as f64;
        if v <= self.inputs[0] {
            return self.outputs[0] as f32;
        }
        if v >= self.inputs[n - 1] {
            return self.outputs[n - 1] as f32;
        }
        for i in 0..n - 1 {
            let (x0, x1) = (self.inputs[i], self.inputs[i + 1]);
            if v >= x0 && v < x1 {
                let (y0, y1) = (self.outputs[i], self.outputs[i + 1]);
                let t = (v - x0) / (x1 - x0);
                return (y0 + (y1 - y0) * t) as f32;
            }
        }
        self.outputs[n - 1] as f32
    }

    pub(crate) fn from_element(el: &Element, ctx: &ReadContext<'_>) -> ClfResult<Self> {
        ctx.require(Extension::Autodesk, "IndexMap")?;
        let dim_attr = el.required_attr("dim")?;
        let dim = dim_attr
            .trim()
            .parse::<usize>()
            .map_err(|_| ClfError::parse(format!("invalid IndexMap dim '{}'", dim_attr)))?;

        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        for pair in el.text.split_whitespace() {
            let (a, b) = pair
                .split_once('@')
                .ok_or_else(|| ClfError::parse(format!("IndexMap entry '{}' lacks '@'", pair)))?;
            let (Some(a), Some(b)) = (parse_f64(a), parse_f64(b)) else {
                return Err(ClfError::parse(format!("invalid IndexMap entry '{}'", pair)));
            };
            inputs.push(a);
            outputs.push(b);
        }

        let mut map = Self::new(dim, inputs, outputs)?;
        if ctx.options.cache_index_maps {
            map.build_cache();
        }
        Ok(map)
    }

    pub(crate) fn to_element(&self) -> Element {
        let pairs: Vec<String> = self
            .inputs
            .iter()
            .zip(&self.outputs)
            .map(|(a, b)| format!("{}@{}", format_f64(*a), format_f64(*b)))
            .collect();
        Element::with_text("IndexMap", pairs.join(" ")).with_attr("dim", self.dim.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::f32_to_half;
    use crate::options::ParseOptions;
    use approx::assert_relative_eq;

    fn sample() -> IndexMap {
        IndexMap::new(3, vec![-0.5, 0.0, 4.0], vec![0.0, 1.0, 2.0]).unwrap()
    }

    #[test]
    fn test_process() {
        let map = sample();
        assert_eq!(map.process(-10.0), 0.0);
        assert_eq!(map.process(-0.25), 0.5);
        assert_eq!(map.process(2.0), 1.5);
        assert_eq!(map.process(100.0), 2.0);
        assert!(map.process(f32::NAN).is_nan());
        assert_eq!(map.process(f32::INFINITY), f32::INFINITY);
    }

    #[test]
    fn test_invalid() {
        assert!(IndexMap::new(2, vec![0.0, 1.0], vec![0.0]).is_err());
        assert!(IndexMap::new(2, vec![1.0, 0.0], vec![0.0, 1.0]).is_err());
    }

    #[test]
    fn test_cache_agrees() {
        let plain = sample();
        let mut cached = sample();
        cached.build_cache();
        assert!(cached.is_cached());
        for bits in (0..=u16::MAX).step_by(97) {
            let v = half_to_f32(bits);
            if !v.is_finite() {
                continue;
            }
            let expect = plain.process(v);
            // the cache stores half inputs exactly; outputs stay f32
            assert_relative_eq!(cached.process(v), expect, epsilon = 1e-6);
            assert_eq!(f32_to_half(v), bits);
        }
    }

    #[test]
    fn test_element() {
        let opts = ParseOptions::default().cache_index_maps(true);
        let ctx = ReadContext::new(&opts);
        let el = Element::with_text("IndexMap", "-0.5@0 0@1 4@2").with_attr("dim", "3");
        let map = IndexMap::from_element(&el, &ctx).unwrap();
        assert!(map.is_cached());
        assert_eq!(map.to_element(), el);

        let strict = ParseOptions::strict();
        let ctx = ReadContext::new(&strict);
        assert!(IndexMap::from_element(&el, &ctx).unwrap_err().is_unsupported());

        let ctx = ReadContext::new(&opts);
        let bad = Element::with_text("IndexMap", "0:1").with_attr("dim", "1");
        assert!(IndexMap::from_element(&bad, &ctx).is_err());
    }
}
