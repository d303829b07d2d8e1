//! Matrix node: `out[i] = sum_j m[i][j] * in[j] (+ offset[i])`.

use super::{NodeCommon, Operator};
use crate::array::{Array, ArrayLayout};
use crate::document::Element;
use crate::options::{ReadContext, WriteOptions};
use crate::{ClfError, ClfResult};

/// Coefficients of a Matrix node.
///
/// The array is `rows x cols`; `cols == rows + 1` adds a trailing offset
/// column. Coefficients already carry any bit-depth scaling, so no
/// normalization happens during evaluation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatrixParams {
    /// Coefficient array.
    pub array: Array,
}

impl MatrixParams {
    /// Matrix from row-major coefficients.
    pub fn new(rows: usize, cols: usize, values: Vec<f64>) -> ClfResult<Self> {
        let params = Self {
            array: Array::matrix(rows, cols, values)?,
        };
        params.validate()?;
        Ok(params)
    }

    /// 3x3 identity.
    pub fn identity3() -> Self {
        Self::scale([1.0, 1.0, 1.0])
    }

    /// 3x3 diagonal scale.
    pub fn scale(s: [f64; 3]) -> Self {
        let values = vec![s[0], 0.0, 0.0, 0.0, s[1], 0.0, 0.0, 0.0, s[2]];
        Self {
            array: Array::matrix(3, 3, values).unwrap_or_default(),
        }
    }

    /// Number of rows (output channels).
    pub fn rows(&self) -> usize {
        self.array.dims().first().copied().unwrap_or(0)
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.array.columns()
    }

    /// True when the last column is an offset.
    pub fn has_offset(&self) -> bool {
        self.cols() == self.rows() + 1
    }

    fn validate(&self) -> ClfResult<()> {
        let (rows, cols) = (self.rows(), self.cols());
        if rows == 0 {
            return Err(ClfError::parse("Matrix has no coefficients"));
        }
        if cols != rows && cols != rows + 1 {
            return Err(ClfError::parse(format!(
                "Matrix of {} rows needs {} or {} columns, found {}",
                rows,
                rows,
                rows + 1,
                cols
            )));
        }
        Ok(())
    }
}

impl Operator for MatrixParams {
    fn read_child(
        &mut self,
        child: &Element,
        _common: &NodeCommon,
        ctx: &ReadContext<'_>,
    ) -> ClfResult<bool> {
        if child.name != "Array" {
            return Ok(false);
        }
        self.array = Array::from_element(child, ArrayLayout::Matrix, false, ctx)?;
        Ok(true)
    }

    fn finish_read(
        &mut self,
        el: &Element,
        _common: &NodeCommon,
        _ctx: &ReadContext<'_>,
    ) -> ClfResult<()> {
        if self.array.is_empty() {
            return Err(ClfError::parse(format!("<{}> has no Array", el.name)));
        }
        self.validate()
    }

    fn write_payload(&self, el: &mut Element, _opts: &WriteOptions) {
        el.children.push(self.array.to_element());
    }

    fn process_pixel(&self, _common: &NodeCommon, pixel: &mut [f32]) {
        let rows = self.rows();
        let cols = self.cols();
        let m = self.array.values();
        let n = rows.min(pixel.len());
        if n == 0 || m.len() < rows * cols {
            return;
        }

        let mut input = [0.0f64; 4];
        let mut out = [0.0f64; 4];
        if rows <= 4 {
            for (dst, src) in input.iter_mut().zip(pixel.iter()) {
                *dst = *src as f64;
            }
            for (i, o) in out.iter_mut().enumerate().take(n) {
                *o = row_dot(&m[i * cols..(i + 1) * cols], &input[..rows], rows);
            }
            for (p, o) in pixel.iter_mut().zip(out.iter()).take(n) {
                *p = *o as f32;
            }
        } else {
            let input: Vec<f64> = pixel.iter().take(rows).map(|&v| v as f64).collect();
            let out: Vec<f64> = (0..n)
                .map(|i| row_dot(&m[i * cols..(i + 1) * cols], &input, rows))
                .collect();
            for (p, o) in pixel.iter_mut().zip(out) {
                *p = o as f32;
            }
        }
    }
}

/// Dot product of a coefficient row with the input, plus the offset column
/// when present. Missing input channels read as zero.
#[inline]
fn row_dot(row: &[f64], input: &[f64], rows: usize) -> f64 {
    let mut acc: f64 = row
        .iter()
        .take(rows)
        .zip(input.iter())
        .map(|(c, v)| c * v)
        .sum();
    if row.len() > rows {
        acc += row[rows];
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeOp, ProcessNode};
    use approx::assert_relative_eq;

    #[test]
    fn test_identity() {
        let node = ProcessNode::new(NodeOp::Matrix(MatrixParams::identity3()));
        let rgb = [0.1, -2.0, 7.5];
        assert_eq!(node.process(&rgb, 3), rgb.to_vec());
    }

    #[test]
    fn test_offset_column() {
        let m = MatrixParams::new(
            3,
            4,
            vec![1.0, 0.0, 0.0, 0.1, 0.0, 2.0, 0.0, 0.2, 0.5, 0.5, 0.0, 0.0],
        )
        .unwrap();
        assert!(m.has_offset());
        let node = ProcessNode::new(NodeOp::Matrix(m));
        let out = node.process(&[1.0, 1.0, 1.0], 3);
        assert_relative_eq!(out[0], 1.1, epsilon = 1e-6);
        assert_relative_eq!(out[1], 2.2, epsilon = 1e-6);
        assert_relative_eq!(out[2], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_bad_shape() {
        assert!(MatrixParams::new(3, 5, vec![0.0; 15]).is_err());
        assert!(MatrixParams::new(3, 3, vec![0.0; 8]).is_err());
    }

    #[test]
    fn test_short_pixel() {
        let node = ProcessNode::new(NodeOp::Matrix(MatrixParams::scale([2.0, 3.0, 4.0])));
        assert_eq!(node.process(&[1.0, 1.0], 2), vec![2.0, 3.0]);
    }
}
