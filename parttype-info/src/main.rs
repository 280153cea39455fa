use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use gadget_util_rust::{report, write_part_type_info, Detail, PartType, Snapshot};
use log::debug;

/// Print information about a GADGET HDF5 snapshot for a specific PartType.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input HDF5 snapshot
    snapshot: PathBuf,

    /// Particle type: 0-4 or PartType0-PartType4
    part_type: String,

    /// Print shape and statistics instead of full dataset contents
    #[arg(short, long)]
    summary: bool,
}

fn run(cli: &Cli) -> Result<()> {
    let part_type = cli.part_type.parse::<PartType>()?;
    let snapshot = Snapshot::read(&cli.snapshot)?;
    debug!(
        "{}: {} header attributes, {} particle groups",
        cli.snapshot.display(),
        snapshot.header.len(),
        snapshot.groups.len()
    );
    let detail = if cli.summary {
        Detail::Summary
    } else {
        Detail::Full
    };
    let mut out = BufWriter::new(io::stdout().lock());
    write_part_type_info(&snapshot, part_type, detail, &mut out)?;
    out.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    report(run(&cli))
}
