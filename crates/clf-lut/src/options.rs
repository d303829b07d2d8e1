//! Parse and write options.
//!
//! Vendor extension compatibility is an explicit value handed to the parser
//! instead of process-wide state. The default accepts every extension; use
//! [`ParseOptions::strict`] to accept only core CLF elements.
//!
//! # Example
//!
//! ```rust
//! use clf_lut::{Extension, ParseOptions};
//!
//! let opts = ParseOptions::strict()
//!     .with_extension(Extension::Autodesk)
//!     .cache_index_maps(true);
//! assert!(opts.extensions.contains(Extension::Autodesk));
//! assert!(!opts.extensions.contains(Extension::DuikerResearch));
//! ```

use crate::{ClfError, ClfResult};
use std::fmt;
use std::path::PathBuf;

/// Default limit for nested Reference resolution.
pub const DEFAULT_MAX_REFERENCE_DEPTH: usize = 16;

/// A vendor feature set layered on top of core CLF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    /// `DynamicParameter`, `ExposureContrast`, `Reference`, `IndexMap`,
    /// LUT1D `halfDomain` / `rawHalfs`.
    Autodesk,
    /// `Group`, `ColorCorrection`, `Log`, `Gamma`, binary float encodings.
    DuikerResearch,
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extension::Autodesk => f.write_str("Autodesk"),
            Extension::DuikerResearch => f.write_str("Duiker Research"),
        }
    }
}

/// Set of enabled extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionSet {
    autodesk: bool,
    duiker_research: bool,
}

impl Default for ExtensionSet {
    fn default() -> Self {
        Self::all()
    }
}

impl ExtensionSet {
    /// Every known extension enabled.
    pub const fn all() -> Self {
        Self {
            autodesk: true,
            duiker_research: true,
        }
    }

    /// Core CLF only.
    pub const fn none() -> Self {
        Self {
            autodesk: false,
            duiker_research: false,
        }
    }

    /// Returns true if `ext` is enabled.
    pub fn contains(&self, ext: Extension) -> bool {
        match ext {
            Extension::Autodesk => self.autodesk,
            Extension::DuikerResearch => self.duiker_research,
        }
    }

    /// Enables or disables `ext`.
    pub fn set(&mut self, ext: Extension, enabled: bool) {
        match ext {
            Extension::Autodesk => self.autodesk = enabled,
            Extension::DuikerResearch => self.duiker_research = enabled,
        }
    }
}

/// Options controlling how documents are parsed.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Accepted vendor extensions.
    pub extensions: ExtensionSet,
    /// Precompute the half-domain cache of every Index Map.
    pub cache_index_maps: bool,
    /// Maximum nesting of Reference nodes.
    pub max_reference_depth: usize,
    /// Directory used to resolve relative Reference paths when the document
    /// is not read from a file.
    pub base_path: Option<PathBuf>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            extensions: ExtensionSet::all(),
            cache_index_maps: false,
            max_reference_depth: DEFAULT_MAX_REFERENCE_DEPTH,
            base_path: None,
        }
    }
}

impl ParseOptions {
    /// Permissive options: every extension accepted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Core CLF only; vendor features raise [`ClfError::UnsupportedFeature`].
    pub fn strict() -> Self {
        Self {
            extensions: ExtensionSet::none(),
            ..Self::default()
        }
    }

    /// Enables an extension.
    pub fn with_extension(mut self, ext: Extension) -> Self {
        self.extensions.set(ext, true);
        self
    }

    /// Disables an extension.
    pub fn without_extension(mut self, ext: Extension) -> Self {
        self.extensions.set(ext, false);
        self
    }

    /// Enables or disables Index Map caching.
    pub fn cache_index_maps(mut self, enabled: bool) -> Self {
        self.cache_index_maps = enabled;
        self
    }

    /// Sets the Reference nesting limit.
    pub fn max_reference_depth(mut self, depth: usize) -> Self {
        self.max_reference_depth = depth;
        self
    }

    /// Sets the directory for relative Reference paths.
    pub fn base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Fails with [`ClfError::UnsupportedFeature`] unless `ext` is enabled.
    pub(crate) fn require(&self, ext: Extension, feature: &str) -> ClfResult<()> {
        if self.extensions.contains(ext) {
            Ok(())
        } else {
            Err(ClfError::UnsupportedFeature {
                feature: feature.to_string(),
                extension: ext,
            })
        }
    }
}

/// Options controlling how documents are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Inline the nodes of resolved Reference targets instead of writing the
    /// Reference element.
    pub self_contained: bool,
    /// Gzip the serialized document.
    pub gzip: bool,
}

impl WriteOptions {
    /// Plain, linked output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets self-contained output.
    pub fn self_contained(mut self, enabled: bool) -> Self {
        self.self_contained = enabled;
        self
    }

    /// Sets gzip output.
    pub fn gzip(mut self, enabled: bool) -> Self {
        self.gzip = enabled;
        self
    }
}

/// State threaded through a (possibly recursive) document read.
#[derive(Debug)]
pub(crate) struct ReadContext<'a> {
    pub options: &'a ParseOptions,
    /// Directory of the document being read.
    pub base_dir: Option<PathBuf>,
    /// Canonical paths of the documents currently being read, outermost first.
    pub chain: Vec<PathBuf>,
    /// Number of Reference nodes being resolved above this document.
    pub depth: usize,
}

impl<'a> ReadContext<'a> {
    pub fn new(options: &'a ParseOptions) -> Self {
        Self {
            options,
            base_dir: options.base_path.clone(),
            chain: Vec::new(),
            depth: 0,
        }
    }

    pub fn require(&self, ext: Extension, feature: &str) -> ClfResult<()> {
        self.options.require(ext, feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_permissive() {
        let opts = ParseOptions::default();
        assert!(opts.require(Extension::Autodesk, "Reference").is_ok());
        assert!(opts.require(Extension::DuikerResearch, "Group").is_ok());
    }

    #[test]
    fn test_strict_rejects() {
        let opts = ParseOptions::strict();
        let err = opts.require(Extension::Autodesk, "DynamicParameter").unwrap_err();
        assert!(err.is_unsupported());
        assert!(err.to_string().contains("DynamicParameter"));
    }

    #[test]
    fn test_toggle() {
        let opts = ParseOptions::new().without_extension(Extension::DuikerResearch);
        assert!(opts.extensions.contains(Extension::Autodesk));
        assert!(!opts.extensions.contains(Extension::DuikerResearch));
    }
}
