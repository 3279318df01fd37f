//! # Stackform CLI
//!
//! This is the binary entry point for the `stackform` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Initializing logging from the global `--log-level` flag.
//! - Executing the appropriate command and translating failures into a
//!   non-zero exit with the wrapped error chain printed.
//!
//! The core application logic lives in the `stackform` library crate; the
//! binary is a thin wrapper around it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
