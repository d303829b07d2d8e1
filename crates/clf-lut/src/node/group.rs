//! Group node: an ordered sub-pipeline.

use super::range::bit_depth_adapter;
use super::{NodeCommon, Operator, ProcessNode};
use crate::document::Element;
use crate::options::{ReadContext, WriteOptions};
use crate::registry;
use crate::ClfResult;

/// Child nodes of a Group.
///
/// Evaluation skips bypassed children. When one active child's output depth
/// differs from the next active child's input depth, a bit-depth-only Range
/// runs between them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupParams {
    /// Children in evaluation order.
    pub nodes: Vec<ProcessNode>,
}

impl GroupParams {
    /// Group over `nodes`.
    pub fn new(nodes: Vec<ProcessNode>) -> Self {
        Self { nodes }
    }

    /// Active children with the adapters evaluation inserts between them.
    pub fn evaluation_chain(&self) -> Vec<ProcessNode> {
        let mut chain = Vec::with_capacity(self.nodes.len());
        let mut prev = None;
        for node in self.nodes.iter().filter(|n| !n.is_bypassed()) {
            if let Some(out) = prev {
                if out != node.in_bit_depth() {
                    chain.push(bit_depth_adapter(out, node.in_bit_depth()));
                }
            }
            prev = Some(node.out_bit_depth());
            chain.push(node.clone());
        }
        chain
    }
}

impl Operator for GroupParams {
    fn read_child(
        &mut self,
        child: &Element,
        _common: &NodeCommon,
        ctx: &ReadContext<'_>,
    ) -> ClfResult<bool> {
        if registry::lookup(&child.name).is_none() {
            return Ok(false);
        }
        if let Some(node) = ProcessNode::read(child, ctx)? {
            self.nodes.push(node);
        }
        Ok(true)
    }

    fn write_payload(&self, el: &mut Element, opts: &WriteOptions) {
        for node in &self.nodes {
            node.write(el, opts);
        }
    }

    fn process_pixel(&self, _common: &NodeCommon, pixel: &mut [f32]) {
        let mut prev = None;
        for node in self.nodes.iter().filter(|n| !n.is_bypassed()) {
            if let Some(out) = prev {
                if out != node.in_bit_depth() {
                    bit_depth_adapter(out, node.in_bit_depth()).process_pixel(pixel);
                }
            }
            node.process_pixel(pixel);
            prev = Some(node.out_bit_depth());
        }
    }
}
