// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use clap::{Parser, Subcommand};
use eyre::{bail, Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::subscriber::set_global_default;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

#[derive(Parser, Debug)]
#[command(name = "vcd2svg")]
#[command(author = "Kevin Laeufer <laeufer@cornell.edu>")]
#[command(version)]
#[command(about = "Renders VCD waveform traces as SVG images.", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a VCD (Value Change Dump) file to an SVG diagram.
    ///
    /// Example: vcd2svg convert -i input.vcd -o output.svg
    Convert {
        /// Input VCD file path
        #[arg(short, long, value_name = "VCD")]
        input: PathBuf,
        /// Output SVG file path, the SVG is printed to stdout if omitted
        #[arg(short, long, value_name = "SVG")]
        output: Option<PathBuf>,
        /// Overwrite the output file if it already exists
        #[arg(long)]
        force: bool,
    },
}

/// Logs go to stderr, stdout is reserved for the SVG.
fn start_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());
    let subscriber = Registry::default().with(
        fmt::layer()
            .without_time()
            .with_writer(std::io::stderr)
            .with_filter(filter),
    );
    set_global_default(subscriber).wrap_err("unable to set global subscriber")?;
    Ok(())
}

fn file_exists(filename: &Path) -> bool {
    filename.is_file()
}

fn check_paths(input: &Path, output: Option<&Path>, force: bool) -> Result<()> {
    if !file_exists(input) {
        bail!("File does not exist: {}", input.display());
    }
    if let Some(output) = output {
        if !force && output.exists() {
            bail!("File already exists: {}", output.display());
        }
    }
    Ok(())
}

fn convert(input: &Path, output: Option<&Path>, force: bool) -> Result<()> {
    check_paths(input, output, force)?;

    let svg = wavesvg::svg_from_file(input)
        .wrap_err_with(|| format!("Error generating SVG from {}", input.display()))?;

    match output {
        Some(output) => std::fs::write(output, &svg)
            .wrap_err_with(|| format!("Error writing to output file {}", output.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&svg)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    start_logging()?;
    let args = Args::parse();
    match args.command {
        Command::Convert {
            input,
            output,
            force,
        } => convert(&input, output.as_deref(), force),
    }
}
