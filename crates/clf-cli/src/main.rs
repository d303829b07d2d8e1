//! clf - Common LUT Format command line tool
//!
//! Inspects, evaluates and re-serializes CLF process lists.

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "clf")]
#[command(author, version, about = "Common LUT Format tool")]
#[command(long_about = "
Inspect, evaluate and convert Academy Common LUT Format (CLF) documents.

Examples:
  clf info look.clf                         # Show attributes and nodes
  clf apply look.clf -V 0.18,0.18,0.18      # Evaluate one RGB triple
  clf apply look.clf -i samples.txt -o out.txt
  clf convert look.clf flat.clf --self-contained
  clf convert look.clf packed.clf.gz --encoding hex16bit --gzip
  clf --strict info look.clf                # Reject vendor extensions
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Accept core CLF only (no vendor extensions)
    #[arg(long, global = true)]
    strict: bool,

    /// Number of threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Display document attributes and nodes
    #[command(visible_alias = "i")]
    Info(InfoArgs),

    /// Evaluate values through a process list
    #[command(visible_alias = "a")]
    Apply(ApplyArgs),

    /// Re-serialize a document
    #[command(visible_alias = "c")]
    Convert(ConvertArgs),
}

#[derive(Args)]
struct InfoArgs {
    /// Input document(s)
    #[arg(required = true)]
    input: Vec<PathBuf>,
}

#[derive(Args)]
struct ApplyArgs {
    /// Process list
    lut: PathBuf,

    /// Comma-separated values, e.g. 0.5,0.2,0.1
    #[arg(short = 'V', long, conflicts_with = "input")]
    values: Option<String>,

    /// Text file of whitespace-separated values
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Channels per pixel (0 = all values form one sample)
    #[arg(short, long, default_value = "3")]
    stride: usize,
}

#[derive(Args)]
struct ConvertArgs {
    /// Input document
    input: PathBuf,

    /// Output document
    output: PathBuf,

    /// Inline referenced process lists
    #[arg(long)]
    self_contained: bool,

    /// Array float encoding: text, integer16bit, integer32bit, integer64bit,
    /// hex16bit, hex32bit, hex64bit
    #[arg(short, long)]
    encoding: Option<String>,

    /// Gzip the output
    #[arg(short = 'z', long)]
    gzip: bool,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    let opts = commands::parse_options(cli.strict);
    match cli.command {
        Commands::Info(args) => commands::info::run(args, &opts, cli.verbose),
        Commands::Apply(args) => commands::apply::run(args, &opts),
        Commands::Convert(args) => commands::convert::run(args, &opts),
    }
}
