//! Sampled arrays and their lookup kernels.
//!
//! An [`Array`] stores samples row-major. For 1D and 3D tables the last
//! dimension (channel count) is the fastest-varying; for 3D tables the lattice
//! order is R slowest, B fastest. Matrices store `rows x cols` coefficients,
//! columns fastest.
//!
//! Samples are kept as `f64` so 64-bit encodings survive a round trip. The
//! lookup kernels work in `f32`.

use crate::codec::{f32_to_half, half_to_f32, FloatEncoding};
use crate::document::Element;
use crate::options::{Extension, ReadContext};
use crate::{ClfError, ClfResult};

/// Half pattern read for NaN inputs.
pub const HALF_NAN_INDEX: i64 = 31745;
/// Half pattern of +Inf.
pub const HALF_POS_INF_INDEX: i64 = 31744;
/// Half pattern of -Inf.
pub const HALF_NEG_INF_INDEX: i64 = 64512;

/// How the dimensions of an [`Array`] are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayLayout {
    /// 1D/3D lookup table: last dimension is the channel count.
    #[default]
    Table,
    /// Matrix: `dims[0]` rows by `dims[1]` columns.
    Matrix,
}

/// An N-dimensional sampled table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Array {
    dims: Vec<usize>,
    values: Vec<f64>,
    layout: ArrayLayout,
    integers: bool,
    raw_halfs: bool,
    float_encoding: FloatEncoding,
}

impl Array {
    /// Lookup table with the given dimensions.
    ///
    /// `dims` ends with the channel count: `[size, channels]` for 1D tables,
    /// `[size, size, size, 3]` for 3D tables.
    ///
    /// # Example
    ///
    /// ```rust
    /// use clf_lut::Array;
    ///
    /// let arr = Array::table(vec![3, 1], vec![0.0, 0.25, 1.0]).unwrap();
    /// assert_eq!(arr.rows(), 3);
    /// assert_eq!(arr.lookup_1d_linear(0.25, 0), 0.125);
    /// ```
    pub fn table(dims: Vec<usize>, values: Vec<f64>) -> ClfResult<Self> {
        let arr = Self {
            dims,
            values,
            layout: ArrayLayout::Table,
            ..Default::default()
        };
        arr.validate()?;
        Ok(arr)
    }

    /// `rows x cols` matrix, row-major.
    pub fn matrix(rows: usize, cols: usize, values: Vec<f64>) -> ClfResult<Self> {
        let arr = Self {
            dims: vec![rows, cols],
            values,
            layout: ArrayLayout::Matrix,
            ..Default::default()
        };
        arr.validate()?;
        Ok(arr)
    }

    /// Identity 1D table of `size` rows and `channels` columns.
    pub fn identity_1d(size: usize, channels: usize) -> Self {
        let size = size.max(2);
        let channels = channels.max(1);
        let mut values = Vec::with_capacity(size * channels);
        for i in 0..size {
            let v = i as f64 / (size - 1) as f64;
            values.extend(std::iter::repeat_n(v, channels));
        }
        Self {
            dims: vec![size, channels],
            values,
            ..Default::default()
        }
    }

    /// Identity 3D lattice of `size` points per axis.
    pub fn identity_3d(size: usize) -> Self {
        let size = size.max(2);
        let n = (size - 1) as f64;
        let mut values = Vec::with_capacity(size * size * size * 3);
        for r in 0..size {
            for g in 0..size {
                for b in 0..size {
                    values.extend([r as f64 / n, g as f64 / n, b as f64 / n]);
                }
            }
        }
        Self {
            dims: vec![size, size, size, 3],
            values,
            ..Default::default()
        }
    }

    fn validate(&self) -> ClfResult<()> {
        if self.dims.iter().any(|&d| d == 0) {
            return Err(ClfError::parse(format!("array dimension of zero in {:?}", self.dims)));
        }
        let columns = self.columns();
        if columns == 0 || self.values.len() % columns != 0 {
            return Err(ClfError::parse(format!(
                "array holds {} values, not a multiple of {} columns",
                self.values.len(),
                columns
            )));
        }
        let counted = match self.layout {
            ArrayLayout::Table => &self.dims[..],
            ArrayLayout::Matrix => {
                if self.dims.len() < 2 {
                    return Err(ClfError::parse("matrix array needs two dimensions"));
                }
                &self.dims[..2]
            }
        };
        let expected = counted
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| ClfError::parse(format!("array dim {:?} overflows", self.dims)))?;
        if expected != self.values.len() {
            return Err(ClfError::parse(format!(
                "array dim {:?} expects {} values, found {}",
                self.dims,
                expected,
                self.values.len()
            )));
        }
        Ok(())
    }

    /// Dimensions as written in the `dim` attribute.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Flat samples.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Mutable flat samples.
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Layout of the dimensions.
    pub fn layout(&self) -> ArrayLayout {
        self.layout
    }

    /// Samples per row.
    pub fn columns(&self) -> usize {
        match self.layout {
            ArrayLayout::Table => self.dims.last().copied().unwrap_or(0),
            ArrayLayout::Matrix => self.dims.get(1).copied().unwrap_or(0),
        }
    }

    /// Number of rows (`len / columns`).
    pub fn rows(&self) -> usize {
        match self.columns() {
            0 => 0,
            c => self.values.len() / c,
        }
    }

    /// Total number of samples.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the array holds no samples.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether samples are integer code values.
    pub fn integers(&self) -> bool {
        self.integers
    }

    /// Marks samples as integer code values.
    pub fn set_integers(&mut self, integers: bool) {
        self.integers = integers;
    }

    /// Whether samples are written as raw half patterns.
    pub fn raw_halfs(&self) -> bool {
        self.raw_halfs
    }

    /// Writes samples as raw half patterns.
    pub fn set_raw_halfs(&mut self, raw_halfs: bool) {
        self.raw_halfs = raw_halfs;
    }

    /// Encoding used when writing.
    pub fn float_encoding(&self) -> FloatEncoding {
        self.float_encoding
    }

    /// Sets the encoding used when writing.
    pub fn set_float_encoding(&mut self, encoding: FloatEncoding) {
        self.float_encoding = encoding;
    }

    /// Builder form of [`Array::set_float_encoding`].
    pub fn with_float_encoding(mut self, encoding: FloatEncoding) -> Self {
        self.float_encoding = encoding;
        self
    }

    // ========================================================================
    // 1D kernels
    // ========================================================================

    /// Sample at row `index` (clamped) and `channel`.
    ///
    /// Single-column tables ignore `channel`.
    #[inline]
    pub fn lookup_1d_exact(&self, index: i64, channel: usize) -> f32 {
        let rows = self.rows();
        if rows == 0 {
            return 0.0;
        }
        let columns = self.columns();
        let row = index.clamp(0, rows as i64 - 1) as usize;
        let ch = if columns == 1 { 0 } else { channel.min(columns - 1) };
        self.values[row * columns + ch] as f32
    }

    /// Linear interpolation at normalized `position`.
    ///
    /// Positions outside [0, 1] resolve to the end rows.
    pub fn lookup_1d_linear(&self, position: f32, channel: usize) -> f32 {
        let max = self.rows().saturating_sub(1) as f32;
        let index = (position * max).max(0.0).min(max);
        let lo = index.floor();
        let t = index - lo;
        let a = self.lookup_1d_exact(lo as i64, channel);
        if t == 0.0 {
            return a;
        }
        let b = self.lookup_1d_exact(lo as i64 + 1, channel);
        a + (b - a) * t
    }

    /// Catmull-Rom interpolation at normalized `position`.
    ///
    /// End tangents reuse the boundary rows. Tables shorter than 3 rows fall
    /// back to linear.
    pub fn lookup_1d_cubic(&self, position: f32, channel: usize) -> f32 {
        let rows = self.rows();
        if rows < 3 {
            return self.lookup_1d_linear(position, channel);
        }
        let max = (rows - 1) as f32;
        let index = (position * max).max(0.0).min(max);
        let lo = index.floor();
        let t = index - lo;
        let i = lo as i64;
        let p0 = self.lookup_1d_exact(i - 1, channel);
        let p1 = self.lookup_1d_exact(i, channel);
        let p2 = self.lookup_1d_exact(i + 1, channel);
        let p3 = self.lookup_1d_exact(i + 2, channel);

        let t2 = t * t;
        let t3 = t2 * t;
        0.5 * (2.0 * p1
            + (p2 - p0) * t
            + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
            + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3)
    }

    /// Reads the row addressed by the half pattern nearest to `position`.
    pub fn lookup_1d_half_domain_nearest(&self, position: f32, channel: usize) -> f32 {
        self.lookup_1d_exact(f32_to_half(position) as i64, channel)
    }

    /// Interpolates between the half pattern nearest to `position` and its
    /// neighbor on the side of the rounding residual.
    pub fn lookup_1d_half_domain_interpolated(&self, position: f32, channel: usize) -> f32 {
        if position.is_nan() {
            return self.lookup_1d_exact(HALF_NAN_INDEX, channel);
        }
        if position.is_infinite() {
            let index = if position > 0.0 {
                HALF_POS_INF_INDEX
            } else {
                HALF_NEG_INF_INDEX
            };
            return self.lookup_1d_exact(index, channel);
        }

        let bits = f32_to_half(position);
        let base = half_to_f32(bits);
        let exact = self.lookup_1d_exact(bits as i64, channel);
        if base.is_infinite() {
            return exact;
        }
        let residual = position - base;
        if residual == 0.0 {
            return exact;
        }

        let neighbor_bits = if bits & 0x7fff == 0 {
            if residual > 0.0 { 0x0001 } else { 0x8001 }
        } else if (residual > 0.0) == (base > 0.0) {
            bits + 1
        } else {
            bits - 1
        };
        let neighbor = half_to_f32(neighbor_bits);
        if neighbor.is_infinite() {
            return exact;
        }
        let t = residual / (neighbor - base);
        let other = self.lookup_1d_exact(neighbor_bits as i64, channel);
        exact + (other - exact) * t
    }

    // ========================================================================
    // 3D kernels
    // ========================================================================

    fn grid(&self) -> [usize; 3] {
        [
            self.dims.first().copied().unwrap_or(0),
            self.dims.get(1).copied().unwrap_or(0),
            self.dims.get(2).copied().unwrap_or(0),
        ]
    }

    /// RGB sample at lattice point `(r, g, b)`, each axis clamped.
    #[inline]
    pub fn lookup_3d_exact(&self, r: i64, g: i64, b: i64) -> [f32; 3] {
        let [dr, dg, db] = self.grid();
        if dr == 0 || dg == 0 || db == 0 || self.values.len() < dr * dg * db * 3 {
            return [0.0; 3];
        }
        let ri = r.clamp(0, dr as i64 - 1) as usize;
        let gi = g.clamp(0, dg as i64 - 1) as usize;
        let bi = b.clamp(0, db as i64 - 1) as usize;
        let idx = ((ri * dg + gi) * db + bi) * 3;
        [
            self.values[idx] as f32,
            self.values[idx + 1] as f32,
            self.values[idx + 2] as f32,
        ]
    }

    /// Sample at the lattice point closest to normalized `rgb`.
    pub fn lookup_3d_nearest(&self, rgb: [f32; 3]) -> [f32; 3] {
        let [dr, dg, db] = self.grid();
        let pick = |v: f32, d: usize| (clamp01(v) * d.saturating_sub(1) as f32).round() as i64;
        self.lookup_3d_exact(pick(rgb[0], dr), pick(rgb[1], dg), pick(rgb[2], db))
    }

    /// Trilinear interpolation at normalized `rgb`.
    ///
    /// Blends along B, then G, then R.
    pub fn lookup_3d_trilinear(&self, rgb: [f32; 3]) -> [f32; 3] {
        let [dr, dg, db] = self.grid();
        let (ri, rf) = split(rgb[0], dr);
        let (gi, gf) = split(rgb[1], dg);
        let (bi, bf) = split(rgb[2], db);

        let c000 = self.lookup_3d_exact(ri, gi, bi);
        let c001 = self.lookup_3d_exact(ri, gi, bi + 1);
        let c010 = self.lookup_3d_exact(ri, gi + 1, bi);
        let c011 = self.lookup_3d_exact(ri, gi + 1, bi + 1);
        let c100 = self.lookup_3d_exact(ri + 1, gi, bi);
        let c101 = self.lookup_3d_exact(ri + 1, gi, bi + 1);
        let c110 = self.lookup_3d_exact(ri + 1, gi + 1, bi);
        let c111 = self.lookup_3d_exact(ri + 1, gi + 1, bi + 1);

        let mut out = [0.0f32; 3];
        for i in 0..3 {
            let c00 = mix(c000[i], c001[i], bf);
            let c01 = mix(c010[i], c011[i], bf);
            let c10 = mix(c100[i], c101[i], bf);
            let c11 = mix(c110[i], c111[i], bf);
            let c0 = mix(c00, c01, gf);
            let c1 = mix(c10, c11, gf);
            out[i] = mix(c0, c1, rf);
        }
        out
    }

    /// Tetrahedral interpolation at normalized `rgb`.
    ///
    /// The unit cell is split into six tetrahedra sharing the main diagonal;
    /// the ordering of the fractional parts selects one.
    pub fn lookup_3d_tetrahedral(&self, rgb: [f32; 3]) -> [f32; 3] {
        let [dr, dg, db] = self.grid();
        let (ri, rf) = split(rgb[0], dr);
        let (gi, gf) = split(rgb[1], dg);
        let (bi, bf) = split(rgb[2], db);

        let c000 = self.lookup_3d_exact(ri, gi, bi);
        let c111 = self.lookup_3d_exact(ri + 1, gi + 1, bi + 1);

        let mut out = [0.0f32; 3];
        if rf > gf {
            if gf > bf {
                // r > g > b
                let c100 = self.lookup_3d_exact(ri + 1, gi, bi);
                let c110 = self.lookup_3d_exact(ri + 1, gi + 1, bi);
                for i in 0..3 {
                    out[i] = c000[i]
                        + rf * (c100[i] - c000[i])
                        + gf * (c110[i] - c100[i])
                        + bf * (c111[i] - c110[i]);
                }
            } else if rf > bf {
                // r > b >= g
                let c100 = self.lookup_3d_exact(ri + 1, gi, bi);
                let c101 = self.lookup_3d_exact(ri + 1, gi, bi + 1);
                for i in 0..3 {
                    out[i] = c000[i]
                        + rf * (c100[i] - c000[i])
                        + bf * (c101[i] - c100[i])
                        + gf * (c111[i] - c101[i]);
                }
            } else {
                // b >= r > g
                let c001 = self.lookup_3d_exact(ri, gi, bi + 1);
                let c101 = self.lookup_3d_exact(ri + 1, gi, bi + 1);
                for i in 0..3 {
                    out[i] = c000[i]
                        + bf * (c001[i] - c000[i])
                        + rf * (c101[i] - c001[i])
                        + gf * (c111[i] - c101[i]);
                }
            }
        } else if gf > bf {
            let c010 = self.lookup_3d_exact(ri, gi + 1, bi);
            if rf > bf {
                // g >= r > b
                let c110 = self.lookup_3d_exact(ri + 1, gi + 1, bi);
                for i in 0..3 {
                    out[i] = c000[i]
                        + gf * (c010[i] - c000[i])
                        + rf * (c110[i] - c010[i])
                        + bf * (c111[i] - c110[i]);
                }
            } else {
                // g > b >= r
                let c011 = self.lookup_3d_exact(ri, gi + 1, bi + 1);
                for i in 0..3 {
                    out[i] = c000[i]
                        + gf * (c010[i] - c000[i])
                        + bf * (c011[i] - c010[i])
                        + rf * (c111[i] - c011[i]);
                }
            }
        } else {
            // b >= g >= r
            let c001 = self.lookup_3d_exact(ri, gi, bi + 1);
            let c011 = self.lookup_3d_exact(ri, gi + 1, bi + 1);
            for i in 0..3 {
                out[i] = c000[i]
                    + bf * (c001[i] - c000[i])
                    + gf * (c011[i] - c001[i])
                    + rf * (c111[i] - c011[i]);
            }
        }
        out
    }

    // ========================================================================
    // Document I/O
    // ========================================================================

    /// Reads an `Array` element. `raw_halfs` means tokens are half patterns.
    pub(crate) fn from_element(
        el: &Element,
        layout: ArrayLayout,
        raw_halfs: bool,
        ctx: &ReadContext<'_>,
    ) -> ClfResult<Self> {
        let dim_attr = el.required_attr("dim")?;
        let dims = dim_attr
            .split_whitespace()
            .map(|s| s.parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ClfError::parse(format!("invalid Array dim '{}'", dim_attr)))?;
        if dims.is_empty() {
            return Err(ClfError::parse("Array dim is empty"));
        }

        let float_encoding = match el.attr("floatEncoding") {
            None => FloatEncoding::Text,
            Some(s) => s.parse::<FloatEncoding>().map_err(ClfError::Parse)?,
        };
        if float_encoding != FloatEncoding::Text {
            ctx.require(Extension::DuikerResearch, "floatEncoding")?;
        }

        let values = el
            .text
            .split_whitespace()
            .map(|token| {
                let value = if raw_halfs {
                    token.parse::<u16>().ok().map(|b| half_to_f32(b) as f64)
                } else {
                    float_encoding.decode(token)
                };
                value.ok_or_else(|| {
                    ClfError::parse(format!("invalid Array value '{}' ({})", token, float_encoding))
                })
            })
            .collect::<ClfResult<Vec<f64>>>()?;

        let arr = Self {
            dims,
            values,
            layout,
            integers: false,
            raw_halfs,
            float_encoding,
        };
        arr.validate()?;
        Ok(arr)
    }

    /// Writes the `Array` element.
    pub(crate) fn to_element(&self) -> Element {
        let mut el = Element::new("Array");
        let dims: Vec<String> = self.dims.iter().map(|d| d.to_string()).collect();
        el.push_attr("dim", dims.join(" "));

        let encoding = if self.raw_halfs {
            FloatEncoding::Text
        } else {
            self.float_encoding
        };
        if let Some(attr) = encoding.attribute() {
            el.push_attr("floatEncoding", attr);
        }

        let columns = self.columns().max(1);
        let rows: Vec<String> = self
            .values
            .chunks(columns)
            .map(|row| {
                row.iter()
                    .map(|&v| {
                        if self.raw_halfs {
                            f32_to_half(v as f32).to_string()
                        } else {
                            encoding.encode(v)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        if !rows.is_empty() {
            el.text = format!("\n{}\n", rows.join("\n"));
        }
        el
    }
}

#[inline]
fn clamp01(v: f32) -> f32 {
    // NaN maps to 0
    if v > 0.0 { v.min(1.0) } else { 0.0 }
}

/// Lattice index and fraction of a normalized coordinate on an axis of `d`
/// points.
#[inline]
fn split(v: f32, d: usize) -> (i64, f32) {
    let max = d.saturating_sub(1) as f32;
    let x = clamp01(v) * max;
    let i = x.floor();
    (i as i64, x - i)
}

#[inline]
fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
