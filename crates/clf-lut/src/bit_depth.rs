//! Bit depth of node inputs and outputs.

use crate::ClfError;
use std::fmt;
use std::str::FromStr;

/// Numeric domain of a node's input or output.
///
/// Integer depths are scaled code values in `[0, 2^n - 1]`; float depths
/// pass through unscaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BitDepth {
    /// 8-bit unsigned integer [0, 255].
    Uint8,
    /// 10-bit unsigned integer [0, 1023].
    Uint10,
    /// 12-bit unsigned integer [0, 4095].
    Uint12,
    /// 16-bit unsigned integer [0, 65535].
    Uint16,
    /// 16-bit half float.
    Float16,
    /// 32-bit float.
    #[default]
    Float32,
}

impl BitDepth {
    /// Maximum code value (1.0 for float depths).
    ///
    /// # Example
    ///
    /// ```rust
    /// use clf_lut::BitDepth;
    ///
    /// assert_eq!(BitDepth::Uint8.max_value(), 255.0);
    /// assert_eq!(BitDepth::Float32.max_value(), 1.0);
    /// ```
    #[inline]
    pub fn max_value(&self) -> f32 {
        match self {
            BitDepth::Uint8 => 255.0,
            BitDepth::Uint10 => 1023.0,
            BitDepth::Uint12 => 4095.0,
            BitDepth::Uint16 => 65535.0,
            BitDepth::Float16 | BitDepth::Float32 => 1.0,
        }
    }

    /// True for the unsigned integer depths.
    #[inline]
    pub fn is_integer(&self) -> bool {
        !self.is_float()
    }

    /// True for `16f` and `32f`.
    #[inline]
    pub fn is_float(&self) -> bool {
        matches!(self, BitDepth::Float16 | BitDepth::Float32)
    }

    /// Scales a value of this depth into [0, 1].
    #[inline]
    pub fn to_normalized(&self, value: f32) -> f32 {
        if self.is_float() {
            value
        } else {
            value / self.max_value()
        }
    }

    /// Scales a normalized value to this depth, clamping integer depths to
    /// `[0, max]`.
    #[inline]
    pub fn from_normalized(&self, value: f32) -> f32 {
        if self.is_float() {
            value
        } else {
            let max = self.max_value();
            (value * max).max(0.0).min(max)
        }
    }

    /// Document token (`8i`, `10i`, ... `32f`).
    pub fn as_str(&self) -> &'static str {
        match self {
            BitDepth::Uint8 => "8i",
            BitDepth::Uint10 => "10i",
            BitDepth::Uint12 => "12i",
            BitDepth::Uint16 => "16i",
            BitDepth::Float16 => "16f",
            BitDepth::Float32 => "32f",
        }
    }
}

impl FromStr for BitDepth {
    type Err = ClfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "8i" => Ok(BitDepth::Uint8),
            "10i" => Ok(BitDepth::Uint10),
            "12i" => Ok(BitDepth::Uint12),
            "16i" => Ok(BitDepth::Uint16),
            "16f" => Ok(BitDepth::Float16),
            "32f" => Ok(BitDepth::Float32),
            other => Err(ClfError::InvalidBitDepth(other.to_string())),
        }
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
