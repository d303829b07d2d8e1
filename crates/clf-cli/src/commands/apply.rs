//! Apply command: evaluate values through a process list.

use crate::ApplyArgs;
use anyhow::{bail, Context, Result};
use clf_lut::{ParseOptions, ProcessList};
use rayon::prelude::*;
use tracing::{debug, info};

/// Pixels per parallel work item.
const PIXELS_PER_CHUNK: usize = 4096;

pub fn run(args: ApplyArgs, opts: &ParseOptions) -> Result<()> {
    let list = super::load_list(&args.lut, opts)?;

    let mut values = match (&args.values, &args.input) {
        (Some(text), _) => super::parse_values(text)?,
        (None, Some(path)) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read: {}", path.display()))?;
            super::parse_values(&text)?
        }
        (None, None) => bail!("Nothing to apply: pass --values or --input"),
    };
    if args.stride > 0 && values.len() % args.stride != 0 {
        bail!(
            "{} values do not divide into pixels of {} channels",
            values.len(),
            args.stride
        );
    }

    info!(values = values.len(), stride = args.stride, lut = %args.lut.display(), "applying");
    process_parallel(&list, &mut values, args.stride);

    let text = format_values(&values, args.stride);
    match &args.output {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write: {}", path.display()))?;
            debug!(path = %path.display(), "wrote values");
        }
        None => print!("{}", text),
    }
    Ok(())
}

/// Evaluates `values` in parallel chunks of whole pixels.
fn process_parallel(list: &ProcessList, values: &mut [f32], stride: usize) {
    if stride == 0 {
        list.process_in_place(values, 0);
        return;
    }
    values
        .par_chunks_mut(stride * PIXELS_PER_CHUNK)
        .for_each(|chunk| list.process_in_place(chunk, stride));
}

/// One pixel per line.
fn format_values(values: &[f32], stride: usize) -> String {
    let width = if stride == 0 { values.len().max(1) } else { stride };
    values
        .chunks(width)
        .map(|pixel| {
            let line: Vec<String> = pixel.iter().map(|v| v.to_string()).collect();
            format!("{}\n", line.join(" "))
        })
        .collect()
}
