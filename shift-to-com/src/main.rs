use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use gadget_util_rust::{check_output, report, Particles, Shift, Snapshot};
use log::info;

/// Reads a GADGET HDF5 snapshot, shifts all positions and velocities to the
/// center of mass, and writes the modified data to a new snapshot.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input HDF5 snapshot
    input: PathBuf,

    /// Output HDF5 snapshot
    output: PathBuf,
}

fn run(cli: &Cli) -> Result<()> {
    check_output(&cli.input, &cli.output)?;
    let mut snapshot = Snapshot::read(&cli.input)?;
    let particles = Particles::pooled(&snapshot)?;
    info!("pooled {} particles", particles.len());
    let shift = Shift::center_of_mass(&particles)?;
    shift.apply(&mut snapshot)?;
    snapshot.save(&cli.output)?;

    let (r, v) = (shift.position, shift.velocity);
    println!("com position: {} {} {}", r.x, r.y, r.z);
    println!("com velocity: {} {} {}", v.x, v.y, v.z);
    println!(
        "Snapshot data shifted and saved from {} to {}.",
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
