//! CLI command implementations

pub mod apply;
pub mod convert;
pub mod info;

use anyhow::{Context, Result};
use clf_lut::{ParseOptions, ProcessList};
use std::path::Path;

/// Parse options for the global flags.
pub fn parse_options(strict: bool) -> ParseOptions {
    if strict {
        ParseOptions::strict()
    } else {
        ParseOptions::default()
    }
}

/// Load a process list from path
pub fn load_list(path: &Path, opts: &ParseOptions) -> Result<ProcessList> {
    ProcessList::read_from_path(path, opts)
        .with_context(|| format!("Failed to load: {}", path.display()))
}

/// Parse whitespace- or comma-separated numbers
pub fn parse_values(text: &str) -> Result<Vec<f32>> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<f32>().with_context(|| format!("Invalid number: '{}'", t)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clf_lut::ExtensionSet;

    #[test]
    fn test_parse_values() {
        assert_eq!(parse_values("0.5,0.25, 1").unwrap(), vec![0.5, 0.25, 1.0]);
        assert_eq!(parse_values("1 2\n3\t4").unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
        assert!(parse_values("1,x").is_err());
        assert!(parse_values("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_options() {
        assert_eq!(parse_options(true).extensions, ExtensionSet::none());
        assert_eq!(parse_options(false).extensions, ExtensionSet::all());
    }
}
