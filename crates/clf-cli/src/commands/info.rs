//! Document info command.
//!
//! Prints root attributes, descriptions, overall bit depths and the node tree.

use crate::InfoArgs;
use anyhow::Result;
use clf_lut::{NodeOp, ParseOptions, ProcessList, ProcessNode};
use tracing::debug;

/// Runs the info command.
///
/// With `-v`, Group children and resolved Reference targets are expanded.
pub fn run(args: InfoArgs, opts: &ParseOptions, verbose: u8) -> Result<()> {
    for path in &args.input {
        debug!(path = %path.display(), "info");
        let list = super::load_list(path, opts)?;
        println!("{}", path.display());
        print_list(&list, verbose > 0);
        if args.input.len() > 1 {
            println!();
        }
    }
    Ok(())
}

fn print_list(list: &ProcessList, expand: bool) {
    println!("  Id:         {}", list.id);
    if let Some(name) = &list.name {
        println!("  Name:       {}", name);
    }
    if let Some(version) = &list.version {
        println!("  Version:    {}", version);
    }
    if let Some(inverse_of) = &list.inverse_of {
        println!("  Inverse of: {}", inverse_of);
    }
    for desc in list.descriptions() {
        println!("  Desc:       {}", desc);
    }
    println!("  Bit depths: {} -> {}", list.in_bit_depth(), list.out_bit_depth());
    println!("  Nodes:      {}", list.nodes.len());
    for (i, node) in list.nodes.iter().enumerate() {
        print_node(i, node, 2, expand);
    }
}

fn print_node(index: usize, node: &ProcessNode, indent: usize, expand: bool) {
    let pad = " ".repeat(indent * 2);
    let mut line = format!(
        "{}[{}] {} {} -> {}",
        pad,
        index,
        node.element_name(),
        node.in_bit_depth(),
        node.out_bit_depth()
    );
    if let Some(id) = &node.common.id {
        line.push_str(&format!(" id={}", id));
    }
    if node.is_bypassed() {
        line.push_str(" (bypassed)");
    }
    match &node.op {
        NodeOp::Reference(r) => {
            let state = if r.is_resolved() { "resolved" } else { "unresolved" };
            line.push_str(&format!(" path={} ({})", r.path, state));
        }
        NodeOp::Lut1D(p) => line.push_str(&format!(" size={:?}", p.array.dims())),
        NodeOp::Lut3D(p) => line.push_str(&format!(" size={:?}", p.array.dims())),
        _ => {}
    }
    println!("{}", line);

    if !expand {
        return;
    }
    match &node.op {
        NodeOp::Group(g) => {
            for (i, child) in g.nodes.iter().enumerate() {
                print_node(i, child, indent + 1, expand);
            }
        }
        NodeOp::Reference(r) => {
            if let Some(list) = r.list() {
                for (i, child) in list.nodes.iter().enumerate() {
                    print_node(i, child, indent + 1, expand);
                }
            }
        }
        _ => {}
    }
}
