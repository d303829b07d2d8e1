//! # clf-lut
//!
//! Academy Common LUT Format (CLF) transform graphs: parse, evaluate and
//! write Process Lists.
//!
//! A [`ProcessList`] is an ordered sequence of typed [`ProcessNode`]s that
//! map RGB values from one bit-depth domain to another. Documents are XML,
//! optionally gzip-compressed.
//!
//! # Node Types
//!
//! | Element | Params | Extension |
//! |---------|--------|-----------|
//! | `Matrix` | [`MatrixParams`] | core |
//! | `Range` | [`RangeParams`] | core |
//! | `ASC_CDL` | [`CdlParams`] | core |
//! | `LUT1D` | [`Lut1DParams`] | core |
//! | `LUT3D` | [`Lut3DParams`] | core |
//! | `ColorCorrection` | [`CdlParams`] | Duiker Research |
//! | `Log` | [`LogParams`] | Duiker Research |
//! | `Gamma` | [`GammaParams`] | Duiker Research |
//! | `Group` | [`GroupParams`] | Duiker Research |
//! | `ExposureContrast` | [`ExposureContrastParams`] | Autodesk |
//! | `Reference` | [`ReferenceParams`] | Autodesk |
//!
//! Vendor extensions are accepted by default; [`ParseOptions::strict`]
//! rejects them with [`ClfError::UnsupportedFeature`].
//!
//! # Usage
//!
//! ```rust
//! use clf_lut::{ParseOptions, ProcessList, WriteOptions};
//!
//! let xml = r#"<ProcessList id="demo" compCLFversion="3.0">
//!     <Matrix inBitDepth="32f" outBitDepth="32f">
//!         <Array dim="3 3">2 0 0 0 1 0 0 0 0.5</Array>
//!     </Matrix>
//! </ProcessList>"#;
//!
//! let list = ProcessList::from_bytes(xml.as_bytes(), &ParseOptions::default()).unwrap();
//! assert_eq!(list.process(&[1.0, 1.0, 1.0], 3), vec![2.0, 1.0, 0.5]);
//!
//! let bytes = list.to_bytes(&WriteOptions::default()).unwrap();
//! assert!(bytes.starts_with(b"<?xml"));
//! ```
//!
//! # Numeric Domains
//!
//! Integer bit depths (8i, 10i, 12i, 16i) carry code values; float depths
//! (16f, 32f) carry normalized values. See [`BitDepth`].
//!
//! # Dependencies
//!
//! - [`quick-xml`] - Document reading and writing
//! - [`half`] - Binary16 conversion
//! - [`flate2`] - Gzip input and output
//! - [`thiserror`] - Error handling
//! - [`tracing`] - Diagnostics
//!
//! # Used By
//!
//! - `clf-cli` - Command line tool

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod array;
mod bit_depth;
pub mod codec;
mod document;
mod error;
mod index_map;
pub mod node;
mod options;
mod process_list;
pub mod registry;

pub use array::{Array, ArrayLayout};
pub use bit_depth::BitDepth;
pub use codec::FloatEncoding;
pub use document::Element;
pub use error::{ClfError, ClfResult};
pub use index_map::IndexMap;
pub use node::{
    CdlParams, CdlStyle, Channel, EcStyle, ExposureContrastParams, GammaChannelParams,
    GammaParams, GammaStyle, GroupParams, LogChannelParams, LogParams, LogStyle,
    Lut1DInterpolation, Lut1DParams, Lut3DInterpolation, Lut3DParams, MatrixParams, NodeCommon,
    NodeOp, ProcessNode, RangeParams, RangeStyle, ReferenceParams,
};
pub use options::{Extension, ExtensionSet, ParseOptions, WriteOptions, DEFAULT_MAX_REFERENCE_DEPTH};
pub use process_list::{ProcessList, CLF_VERSION};
