//! Element-name dispatch for process nodes.
//!
//! Every node element the parser understands has one entry in [`REGISTRY`]:
//! its element name, the vendor extension it belongs to (if any), and a
//! constructor for an empty [`NodeOp`] the reader then fills in.

use crate::node::{
    CdlParams, ExposureContrastParams, GammaParams, GroupParams, LogParams, Lut1DParams,
    Lut3DParams, MatrixParams, NodeOp, RangeParams, ReferenceParams,
};
use crate::options::Extension;

/// One registered node type.
#[derive(Debug)]
pub struct NodeEntry {
    /// Document element name.
    pub element: &'static str,
    /// Extension the node requires; `None` for core CLF.
    pub extension: Option<Extension>,
    /// Builds an empty variant.
    pub create: fn() -> NodeOp,
}

fn matrix() -> NodeOp {
    NodeOp::Matrix(MatrixParams::default())
}
fn range() -> NodeOp {
    NodeOp::Range(RangeParams::default())
}
fn asc_cdl() -> NodeOp {
    NodeOp::AscCdl(CdlParams::default())
}
fn color_correction() -> NodeOp {
    NodeOp::ColorCorrection(CdlParams::default())
}
fn lut1d() -> NodeOp {
    NodeOp::Lut1D(Lut1DParams::default())
}
fn lut3d() -> NodeOp {
    NodeOp::Lut3D(Lut3DParams::default())
}
fn log() -> NodeOp {
    NodeOp::Log(LogParams::default())
}
fn gamma() -> NodeOp {
    NodeOp::Gamma(GammaParams::default())
}
fn exposure_contrast() -> NodeOp {
    NodeOp::ExposureContrast(ExposureContrastParams::default())
}
fn group() -> NodeOp {
    NodeOp::Group(GroupParams::default())
}
fn reference() -> NodeOp {
    NodeOp::Reference(ReferenceParams::default())
}

/// All node types, in the order they are documented.
pub static REGISTRY: &[NodeEntry] = &[
    NodeEntry { element: "Matrix", extension: None, create: matrix },
    NodeEntry { element: "Range", extension: None, create: range },
    NodeEntry { element: "ASC_CDL", extension: None, create: asc_cdl },
    NodeEntry { element: "LUT1D", extension: None, create: lut1d },
    NodeEntry { element: "LUT3D", extension: None, create: lut3d },
    NodeEntry {
        element: "ColorCorrection",
        extension: Some(Extension::DuikerResearch),
        create: color_correction,
    },
    NodeEntry { element: "Log", extension: Some(Extension::DuikerResearch), create: log },
    NodeEntry { element: "Gamma", extension: Some(Extension::DuikerResearch), create: gamma },
    NodeEntry { element: "Group", extension: Some(Extension::DuikerResearch), create: group },
    NodeEntry {
        element: "ExposureContrast",
        extension: Some(Extension::Autodesk),
        create: exposure_contrast,
    },
    NodeEntry { element: "Reference", extension: Some(Extension::Autodesk), create: reference },
];

/// Finds the entry for an element name.
pub fn lookup(name: &str) -> Option<&'static NodeEntry> {
    REGISTRY.iter().find(|e| e.element == name)
}

/// Element names of every registered node.
pub fn element_names() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|e| e.element)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_match_variants() {
        for entry in REGISTRY {
            assert_eq!((entry.create)().element_name(), entry.element);
        }
        assert_eq!(element_names().count(), 11);
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("LUT3D").unwrap().extension, None);
        assert_eq!(lookup("Reference").unwrap().extension, Some(Extension::Autodesk));
        assert!(lookup("Description").is_none());
    }
}
