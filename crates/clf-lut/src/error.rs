//! CLF error types.
//!
//! Parse failures of the top-level document are fatal. Conditions that can be
//! recovered node-by-node (unknown elements, unresolved references) are not
//! errors at all: they are logged with `tracing` and parsing continues.

use crate::options::Extension;
use thiserror::Error;

/// Result type for CLF operations.
pub type ClfResult<T> = Result<T, ClfError>;

/// Errors that can occur while reading or writing CLF documents.
#[derive(Debug, Error)]
pub enum ClfError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed XML.
    #[error("XML error: {0}")]
    Xml(String),

    /// Structurally invalid document (bad numbers, dimensions, layout).
    #[error("parse error: {0}")]
    Parse(String),

    /// A required attribute is absent.
    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        /// Element name.
        element: String,
        /// Attribute name.
        attribute: &'static str,
    },

    /// Unknown bit depth token.
    #[error("invalid bit depth: '{0}'")]
    InvalidBitDepth(String),

    /// A vendor extension was used while the parse options exclude it.
    ///
    /// Distinct from [`ClfError::Parse`]: the document is well formed, the
    /// active compatibility profile just does not accept the feature.
    #[error("{feature} requires the {extension} extension")]
    UnsupportedFeature {
        /// Element or attribute that triggered the error.
        feature: String,
        /// Extension the feature belongs to.
        extension: Extension,
    },

    /// A chain of Reference nodes loops back onto itself.
    #[error("circular reference detected: {chain}")]
    CircularReference {
        /// Paths of the chain, outermost first.
        chain: String,
    },

    /// Reference nesting is deeper than the configured limit.
    #[error("reference nesting exceeds {depth} levels")]
    ReferenceDepth {
        /// Configured limit.
        depth: usize,
    },

    /// Serialization failure.
    #[error("write error: {0}")]
    Write(String),
}

impl ClfError {
    /// Shorthand for [`ClfError::Parse`].
    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        ClfError::Parse(msg.into())
    }

    /// Returns true for errors raised by the strict compatibility profile.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, ClfError::UnsupportedFeature { .. })
    }
}
