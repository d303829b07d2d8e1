//! Bit-pattern conversions between half, float and double values and their
//! integer / hex encodings.
//!
//! None of these functions fail: any bit pattern maps to some value,
//! including NaN and infinities.

use half::f16;
use std::fmt;
use std::str::FromStr;

/// Half-float value of a 16-bit pattern.
#[inline]
pub fn half_to_f32(bits: u16) -> f32 {
    f16::from_bits(bits).to_f32()
}

/// Nearest half-float bit pattern of `value`.
#[inline]
pub fn f32_to_half(value: f32) -> u16 {
    f16::from_f32(value).to_bits()
}

/// Float value of a 32-bit pattern.
#[inline]
pub fn bits_to_f32(bits: u32) -> f32 {
    f32::from_bits(bits)
}

/// 32-bit pattern of a float.
#[inline]
pub fn f32_to_bits(value: f32) -> u32 {
    value.to_bits()
}

/// Double value of a 64-bit pattern.
#[inline]
pub fn bits_to_f64(bits: u64) -> f64 {
    f64::from_bits(bits)
}

/// 64-bit pattern of a double.
#[inline]
pub fn f64_to_bits(value: f64) -> u64 {
    value.to_bits()
}

/// Lower-case, zero-padded hex of a half pattern (4 digits).
pub fn half_to_hex(bits: u16) -> String {
    format!("{:04x}", bits)
}

/// Lower-case, zero-padded hex of a float pattern (8 digits).
pub fn f32_to_hex(value: f32) -> String {
    format!("{:08x}", value.to_bits())
}

/// Lower-case, zero-padded hex of a double pattern (16 digits).
pub fn f64_to_hex(value: f64) -> String {
    format!("{:016x}", value.to_bits())
}

/// How Array samples are spelled in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FloatEncoding {
    /// Decimal text.
    #[default]
    Text,
    /// Half pattern as unsigned decimal integer.
    Integer16,
    /// Float pattern as unsigned decimal integer.
    Integer32,
    /// Double pattern as unsigned decimal integer.
    Integer64,
    /// Half pattern as hex.
    Hex16,
    /// Float pattern as hex.
    Hex32,
    /// Double pattern as hex.
    Hex64,
}

impl FloatEncoding {
    /// Every binary encoding, in attribute order.
    pub const BINARY: [FloatEncoding; 6] = [
        FloatEncoding::Integer16,
        FloatEncoding::Integer32,
        FloatEncoding::Integer64,
        FloatEncoding::Hex16,
        FloatEncoding::Hex32,
        FloatEncoding::Hex64,
    ];

    /// `floatEncoding` attribute value; `None` for plain text.
    pub fn attribute(&self) -> Option<&'static str> {
        match self {
            FloatEncoding::Text => None,
            FloatEncoding::Integer16 => Some("integer16bit"),
            FloatEncoding::Integer32 => Some("integer32bit"),
            FloatEncoding::Integer64 => Some("integer64bit"),
            FloatEncoding::Hex16 => Some("hex16bit"),
            FloatEncoding::Hex32 => Some("hex32bit"),
            FloatEncoding::Hex64 => Some("hex64bit"),
        }
    }

    /// Spells `value` in this encoding.
    ///
    /// Narrow encodings round to half or float first.
    pub fn encode(&self, value: f64) -> String {
        match self {
            FloatEncoding::Text => format!("{}", value),
            FloatEncoding::Integer16 => f32_to_half(value as f32).to_string(),
            FloatEncoding::Integer32 => f32_to_bits(value as f32).to_string(),
            FloatEncoding::Integer64 => f64_to_bits(value).to_string(),
            FloatEncoding::Hex16 => half_to_hex(f32_to_half(value as f32)),
            FloatEncoding::Hex32 => f32_to_hex(value as f32),
            FloatEncoding::Hex64 => f64_to_hex(value),
        }
    }

    /// Reads a token in this encoding. `None` if the token is malformed.
    pub fn decode(&self, token: &str) -> Option<f64> {
        match self {
            FloatEncoding::Text => token.parse::<f64>().ok(),
            FloatEncoding::Integer16 => token.parse::<u16>().ok().map(|b| half_to_f32(b) as f64),
            FloatEncoding::Integer32 => token.parse::<u32>().ok().map(|b| bits_to_f32(b) as f64),
            FloatEncoding::Integer64 => token.parse::<u64>().ok().map(bits_to_f64),
            FloatEncoding::Hex16 => u16::from_str_radix(token, 16)
                .ok()
                .map(|b| half_to_f32(b) as f64),
            FloatEncoding::Hex32 => u32::from_str_radix(token, 16)
                .ok()
                .map(|b| bits_to_f32(b) as f64),
            FloatEncoding::Hex64 => u64::from_str_radix(token, 16).ok().map(bits_to_f64),
        }
    }
}

impl FromStr for FloatEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" | "" => Ok(FloatEncoding::Text),
            "integer16bit" => Ok(FloatEncoding::Integer16),
            "integer32bit" => Ok(FloatEncoding::Integer32),
            "integer64bit" => Ok(FloatEncoding::Integer64),
            "hex16bit" => Ok(FloatEncoding::Hex16),
            "hex32bit" => Ok(FloatEncoding::Hex32),
            "hex64bit" => Ok(FloatEncoding::Hex64),
            other => Err(format!("unknown float encoding '{}'", other)),
        }
    }
}

impl fmt::Display for FloatEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute().unwrap_or("text"))
    }
}
