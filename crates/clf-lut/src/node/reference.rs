//! Reference node: another Process List loaded from disk.
//!
//! The target is resolved while the referencing document is read. A target
//! that cannot be found, read or parsed leaves the node unresolved, and an
//! unresolved Reference evaluates as identity. Cycles and nesting beyond
//! [`ParseOptions::max_reference_depth`] are hard errors.

use super::{NodeCommon, Operator};
use crate::document::Element;
use crate::options::{ParseOptions, ReadContext, WriteOptions};
use crate::process_list::ProcessList;
use crate::{ClfError, ClfResult};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Target path and, once resolved, the embedded list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReferenceParams {
    /// `path` attribute as written.
    pub path: String,
    /// `basePath` attribute.
    pub base_path: Option<String>,
    list: Option<Box<ProcessList>>,
}

impl ReferenceParams {
    /// Unresolved reference to `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Sets the `basePath` attribute.
    pub fn with_base_path(mut self, base: impl Into<String>) -> Self {
        self.base_path = Some(base.into());
        self
    }

    /// Reference to `path` already resolved to `list`.
    pub fn embedded(path: impl Into<String>, list: ProcessList) -> Self {
        Self {
            path: path.into(),
            base_path: None,
            list: Some(Box::new(list)),
        }
    }

    /// Resolves the target now, relative to `options.base_path`.
    pub fn load(&mut self, options: &ParseOptions) -> ClfResult<()> {
        let ctx = ReadContext::new(options);
        self.resolve(&ctx)
    }

    /// The referenced list, if resolved.
    pub fn list(&self) -> Option<&ProcessList> {
        self.list.as_deref()
    }

    /// Mutable access to the referenced list, if resolved.
    pub fn list_mut(&mut self) -> Option<&mut ProcessList> {
        self.list.as_deref_mut()
    }

    /// True once the target has been loaded.
    pub fn is_resolved(&self) -> bool {
        self.list.is_some()
    }

    /// Full path of the target before canonicalization.
    fn target(&self, base_dir: Option<&Path>) -> PathBuf {
        let path = Path::new(&self.path);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        let joined = match &self.base_path {
            Some(base) => Path::new(base).join(path),
            None => path.to_path_buf(),
        };
        match base_dir {
            Some(dir) if joined.is_relative() => dir.join(joined),
            _ => joined,
        }
    }

    fn resolve(&mut self, ctx: &ReadContext<'_>) -> ClfResult<()> {
        let target = self.target(ctx.base_dir.as_deref());
        let canonical = match target.canonicalize() {
            Ok(p) => p,
            Err(e) => {
                warn!(
                    path = %target.display(),
                    error = %e,
                    "reference target not found, treating as identity"
                );
                return Ok(());
            }
        };

        if ctx.chain.contains(&canonical) {
            let chain = ctx
                .chain
                .iter()
                .chain(std::iter::once(&canonical))
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(ClfError::CircularReference { chain });
        }
        let max = ctx.options.max_reference_depth;
        if ctx.depth >= max {
            return Err(ClfError::ReferenceDepth { depth: max });
        }

        let bytes = match std::fs::read(&canonical) {
            Ok(b) => b,
            Err(e) => {
                warn!(
                    path = %canonical.display(),
                    error = %e,
                    "cannot read reference target, treating as identity"
                );
                return Ok(());
            }
        };

        let mut chain = ctx.chain.clone();
        chain.push(canonical.clone());
        let child = ReadContext {
            options: ctx.options,
            base_dir: canonical.parent().map(Path::to_path_buf),
            chain,
            depth: ctx.depth + 1,
        };
        match ProcessList::from_bytes_with_context(&bytes, &child) {
            Ok(list) => {
                debug!(path = %canonical.display(), nodes = list.nodes.len(), "resolved reference");
                self.list = Some(Box::new(list));
                Ok(())
            }
            Err(e) if propagates(&e) => Err(e),
            Err(e) => {
                warn!(
                    path = %canonical.display(),
                    error = %e,
                    "cannot parse reference target, treating as identity"
                );
                Ok(())
            }
        }
    }
}

/// Errors that abort the referencing document instead of degrading the node.
fn propagates(err: &ClfError) -> bool {
    matches!(
        err,
        ClfError::CircularReference { .. }
            | ClfError::ReferenceDepth { .. }
            | ClfError::UnsupportedFeature { .. }
    )
}

impl Operator for ReferenceParams {
    fn attributes(&self) -> &'static [&'static str] {
        &["path", "basePath"]
    }

    fn read_attributes(&mut self, el: &Element, _ctx: &ReadContext<'_>) -> ClfResult<()> {
        self.path = el.required_attr("path")?.to_string();
        self.base_path = el.attr("basePath").map(str::to_string);
        Ok(())
    }

    fn finish_read(
        &mut self,
        _el: &Element,
        _common: &NodeCommon,
        ctx: &ReadContext<'_>,
    ) -> ClfResult<()> {
        self.resolve(ctx)
    }

    fn write_attributes(&self, el: &mut Element) {
        el.push_attr("path", self.path.as_str());
        if let Some(base) = &self.base_path {
            el.push_attr("basePath", base.as_str());
        }
    }

    fn process_pixel(&self, _common: &NodeCommon, pixel: &mut [f32]) {
        if let Some(list) = &self.list {
            list.process_pixel(pixel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{MatrixParams, NodeOp, ProcessNode};
    use std::fs;

    fn scale_list(id: &str, s: f64) -> ProcessList {
        let matrix = MatrixParams::scale([s; 3]);
        ProcessList::new(id).with_node(ProcessNode::new(NodeOp::Matrix(matrix)))
    }

    #[test]
    fn test_target_path() {
        let r = ReferenceParams::new("b.clf").with_base_path("luts");
        assert_eq!(r.target(Some(Path::new("/show"))), PathBuf::from("/show/luts/b.clf"));
        let r = ReferenceParams::new("/abs/b.clf").with_base_path("luts");
        assert_eq!(r.target(Some(Path::new("/show"))), PathBuf::from("/abs/b.clf"));
        assert_eq!(ReferenceParams::new("b.clf").target(None), PathBuf::from("b.clf"));
    }

    #[test]
    fn test_load_and_process() {
        let dir = tempfile::tempdir().unwrap();
        scale_list("child", 2.0)
            .write_to_path(dir.path().join("child.clf"), &WriteOptions::default())
            .unwrap();

        let mut r = ReferenceParams::new("child.clf");
        r.load(&ParseOptions::default().base_path(dir.path())).unwrap();
        assert!(r.is_resolved());
        let node = ProcessNode::new(NodeOp::Reference(r));
        assert_eq!(node.process(&[1.0, 2.0, 3.0], 3), vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_missing_is_identity() {
        let dir = tempfile::tempdir().unwrap();
        let mut r = ReferenceParams::new("nowhere.clf");
        r.load(&ParseOptions::default().base_path(dir.path())).unwrap();
        assert!(!r.is_resolved());
        let node = ProcessNode::new(NodeOp::Reference(r));
        assert_eq!(node.process(&[0.1, 0.2, 0.3], 3), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_unparsable_is_identity() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.clf"), "<ProcessList").unwrap();
        let mut r = ReferenceParams::new("bad.clf");
        r.load(&ParseOptions::default().base_path(dir.path())).unwrap();
        assert!(!r.is_resolved());
    }

    #[test]
    fn test_depth_limit() {
        let dir = tempfile::tempdir().unwrap();
        scale_list("child", 2.0)
            .write_to_path(dir.path().join("child.clf"), &WriteOptions::default())
            .unwrap();
        let mut r = ReferenceParams::new("child.clf");
        let opts = ParseOptions::default().base_path(dir.path()).max_reference_depth(0);
        assert!(matches!(r.load(&opts), Err(ClfError::ReferenceDepth { depth: 0 })));
    }
}
