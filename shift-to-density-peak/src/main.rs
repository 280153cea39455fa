use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use gadget_util_rust::{
    check_output, find_density_peak, report, KnnDensity, Particles, Snapshot,
    DEFAULT_NEIGHBOURS, DEFAULT_N_DENSEST,
};
use log::info;
use rayon::ThreadPoolBuilder;

/// Reads a GADGET HDF5 snapshot, shifts positions and velocities to the
/// density peak, and writes the modified data to a new snapshot.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input HDF5 snapshot
    input: PathBuf,

    /// Output HDF5 snapshot
    output: PathBuf,

    /// Number of densest particles averaged into the peak
    #[arg(short, long, default_value_t = DEFAULT_N_DENSEST)]
    n_densest: usize,

    /// Neighbours used by the density estimate
    #[arg(short = 'k', long, default_value_t = DEFAULT_NEIGHBOURS)]
    neighbours: usize,

    /// Number of threads for the density estimate
    #[arg(short, long)]
    threads: Option<usize>,
}

fn run(cli: &Cli) -> Result<()> {
    check_output(&cli.input, &cli.output)?;
    let estimator = KnnDensity::new(cli.neighbours)?;
    let mut pool = ThreadPoolBuilder::new();
    if let Some(threads) = cli.threads {
        pool = pool.num_threads(threads);
    }
    let tp = pool.build()?;
    let mut snapshot = Snapshot::read(&cli.input)?;
    let particles = Particles::pooled(&snapshot)?;
    info!("pooled {} particles", particles.len());
    let peak = tp.install(|| find_density_peak(&particles, &estimator, cli.n_densest))?;
    peak.apply(&mut snapshot)?;
    snapshot.save(&cli.output)?;

    let (r, v) = (peak.position, peak.velocity);
    println!("peak position: {} {} {}", r.x, r.y, r.z);
    println!("peak velocity: {} {} {}", v.x, v.y, v.z);
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
