use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use gadget_util_rust::{copy_snapshot, count_by_type, report};
use log::info;

/// Reads a GADGET HDF5 snapshot and writes its header and particle groups to a new file.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input HDF5 snapshot
    input: PathBuf,

    /// Output HDF5 snapshot
    output: PathBuf,
}

fn run(cli: &Cli) -> Result<()> {
    let snapshot = copy_snapshot(&cli.input, &cli.output)?;
    for (part_type, count) in count_by_type(&snapshot)? {
        info!("{part_type}: {count} particles");
    }
    println!(
        "Snapshot copied from {} to {}.",
        cli.input.display(),
        cli.output.display()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    report(run(&cli))
}
