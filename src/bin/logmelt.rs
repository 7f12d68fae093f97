//! logmelt: Decompose timestamped JSON logs into table rows
//!
//! Usage:
//!   # Common fields + one row per event, from a file
//!   logmelt --mode combined --keys mid,os,ver events.log
//!
//!   # Read from stdin, JSON Lines output
//!   echo '1583612345678|{"cm":{"os":"ios"}}' \
//!     | logmelt --mode envelope-projection --keys os --format jsonl
//!
//!   # Settings from a TOML file, flags override it
//!   logmelt --config run.toml --header events.log

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use logmelt::config::RunConfig;
use logmelt::decompose::{Mode, OutputFormat, RowWriter};
use logmelt::filter::LogKind;
use logmelt::logging::init_cli_logger;
use std::fs::File;
use std::io::{stdin, stdout, BufRead, BufReader, BufWriter};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "logmelt")]
#[command(about = "Decompose timestamped JSON logs into table rows", long_about = None)]
struct Args {
    /// Input file, one record per line (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// TOML run configuration
    #[arg(long, short = 'c')]
    config: Option<String>,

    /// Decomposition mode
    #[arg(long, short = 'm', value_enum)]
    mode: Option<Mode>,

    /// Comma-separated keys to project (split pattern in split-explode mode)
    #[arg(long, short = 'k')]
    keys: Option<String>,

    /// Output format (default: tsv)
    #[arg(long, short = 'f', value_enum)]
    format: Option<OutputFormat>,

    /// Write a header line with the column names
    #[arg(long)]
    header: bool,

    /// Drop records failing the shape check instead of emitting blank rows
    #[arg(long)]
    drop_invalid: bool,

    /// Only process start or event logs
    #[arg(long, value_enum)]
    kind: Option<LogKind>,

    /// Remove this marker from every record before processing
    #[arg(long)]
    strip_marker: Option<String>,

    /// Prefix every record with the current epoch millis
    #[arg(long)]
    stamp: bool,

    /// Debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_cli_logger(args.verbose);

    let config = build_config(&args)?;
    let pipeline = config
        .build_pipeline()
        .context("Invalid pipeline configuration")?;
    let chain = config.build_chain();

    let reader: Box<dyn BufRead> = if let Some(file_path) = &args.input {
        Box::new(BufReader::new(
            File::open(file_path).with_context(|| format!("Failed to open input: {}", file_path))?,
        ))
    } else {
        Box::new(BufReader::new(stdin()))
    };

    let out = BufWriter::new(stdout().lock());
    let mut writer = RowWriter::new(out, config.output.format, pipeline.columns());
    if config.output.header {
        writer.write_header()?;
    }

    let summary = logmelt::decompose_lines(reader, &pipeline, &chain, &mut writer)?;

    info!(
        records = summary.records,
        rows = summary.rows,
        blank_rows = summary.blank_rows,
        dropped = summary.dropped,
        "decomposition finished"
    );

    Ok(())
}

/// Start from the config file (or defaults) and overlay command line flags
fn build_config(args: &Args) -> Result<RunConfig> {
    let mut config = match (&args.config, args.mode) {
        (Some(path), _) => RunConfig::from_file(path)?,
        (None, Some(mode)) => RunConfig::new(mode),
        (None, None) => bail!("either --mode or --config is required"),
    };

    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(keys_str) = &args.keys {
        let keys: Vec<&str> = if config.mode == Mode::SplitExplode {
            vec![keys_str.as_str()]
        } else {
            keys_str.split(',').collect()
        };
        config.set_keys(&keys);
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    if args.header {
        config.output.header = true;
    }
    if args.drop_invalid {
        config.filter.drop_invalid = true;
    }
    if let Some(kind) = args.kind {
        config.filter.kind = Some(kind);
    }
    if let Some(marker) = &args.strip_marker {
        config.filter.strip_marker = Some(marker.clone());
    }
    if args.stamp {
        config.filter.stamp = true;
    }

    Ok(config)
}
