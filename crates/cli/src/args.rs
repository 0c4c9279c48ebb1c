//! Command line arguments.

use clap::Parser;
use std::path::PathBuf;

use convertfun_core::Operation;

/// Convert images and documents locally, one output per input file.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "convertfun",
    version,
    about = "Convert HEIC, JPEG, PNG, WEBP, GIF, AVIF, SVG and PDF files",
    long_about = "
Converts every input file whose format allows the requested operation and
writes the results to the output directory. Without --to, prints the
operations available for each file and for the whole batch.

EXAMPLES:
    convertfun photo.HEIC --to png
    convertfun *.png *.jpg --to webp -o out/
    convertfun a.png b.gif
"
)]
pub struct CliArgs {
    /// Input files
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Operation to apply: JPG, PNG, WEBP, OPTIMIZE or COMPRESS
    #[arg(short = 't', long = "to", value_name = "OPERATION", value_parser = parse_operation)]
    pub operation: Option<Operation>,

    /// Configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output directory, overriding the configured one
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Replace existing output files instead of adding a numeric suffix
    #[arg(long)]
    pub overwrite: bool,

    /// Emit logs and the final summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Print Prometheus metrics to stderr before exiting
    #[arg(long)]
    pub metrics: bool,
}

fn parse_operation(s: &str) -> Result<Operation, String> {
    Operation::parse(s).ok_or_else(|| {
        let known: Vec<String> = Operation::ALL.iter().map(|op| op.to_string()).collect();
        format!("unknown operation {:?}, expected one of {}", s, known.join(", "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_operation() {
        assert_eq!(parse_operation("webp"), Ok(Operation::Webp));
        assert_eq!(parse_operation("JPEG"), Ok(Operation::Jpg));
        assert!(parse_operation("bmp").unwrap_err().contains("OPTIMIZE"));
    }

    #[test]
    fn test_parse_args() {
        let args = CliArgs::try_parse_from([
            "convertfun",
            "a.png",
            "b.jpg",
            "--to",
            "webp",
            "-o",
            "out",
            "--json",
        ])
        .unwrap();
        assert_eq!(args.files.len(), 2);
        assert_eq!(args.operation, Some(Operation::Webp));
        assert_eq!(args.output, Some(PathBuf::from("out")));
        assert!(args.json);
        assert!(!args.overwrite);
    }

    #[test]
    fn test_files_are_required() {
        assert!(CliArgs::try_parse_from(["convertfun", "--to", "png"]).is_err());
    }
}
