//! Convert command: re-serialize a document.

use crate::ConvertArgs;
use anyhow::{anyhow, Context, Result};
use clf_lut::{FloatEncoding, ParseOptions, WriteOptions};
use tracing::info;

pub fn run(args: ConvertArgs, opts: &ParseOptions) -> Result<()> {
    let mut list = super::load_list(&args.input, opts)?;

    if let Some(tag) = &args.encoding {
        let encoding: FloatEncoding = tag.parse().map_err(|e: String| anyhow!(e))?;
        list.set_float_encoding(encoding);
    }

    let write_opts = WriteOptions::new()
        .self_contained(args.self_contained)
        .gzip(args.gzip);
    list.write_to_path(&args.output, &write_opts)
        .with_context(|| format!("Failed to write: {}", args.output.display()))?;

    info!(
        input = %args.input.display(),
        output = %args.output.display(),
        self_contained = args.self_contained,
        gzip = args.gzip,
        "converted"
    );
    Ok(())
}
