// Copyright 2023-2024 The Regents of the University of California
// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

mod options;
mod render;
mod trace;
pub mod vcd;

/// Cargo.toml version of this library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name used for traces that do not come from a file.
pub const DEFAULT_TRACE_NAME: &str = "noname.vcd";

#[derive(Debug, thiserror::Error)]
pub enum WaveSvgError {
    #[error("failed to parse {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: vcd::VcdParseError,
    },
    #[error("io error")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WaveSvgError>;

pub use options::RenderOptions;
pub use render::{format_bus_value, render, render_with_options};
pub use trace::{
    SignalDeclarations, SignalKind, Snapshot, Time, Timeline, Trace, SCOPE_SEPARATOR,
};

/// Parses a VCD and reconstructs the value of every signal at every time step.
/// `name` identifies the input in error messages.
pub fn parse(input: &[u8], name: &str) -> Result<Trace> {
    let file = vcd::parse(input).map_err(|source| WaveSvgError::Parse {
        name: name.to_string(),
        source,
    })?;
    Ok(Trace::from_vcd(name, &file))
}

/// Parses a VCD and renders it as an SVG image.
pub fn convert(input: &[u8], name: &str) -> Result<Vec<u8>> {
    let trace = parse(input, name)?;
    Ok(render(&trace))
}

pub fn svg_from_bytes(input: &[u8]) -> Result<Vec<u8>> {
    convert(input, DEFAULT_TRACE_NAME)
}

/// Reads a VCD file and renders it as an SVG image.
pub fn svg_from_file<P: AsRef<std::path::Path>>(filename: P) -> Result<Vec<u8>> {
    let filename = filename.as_ref();
    let input_file = std::fs::File::open(filename)?;
    let mmap = unsafe { memmap2::Mmap::map(&input_file)? };
    convert(&mmap[..], &filename.to_string_lossy())
}
