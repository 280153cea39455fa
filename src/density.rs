use std::f64::consts::PI;

use kd_tree::{KdPoint, KdTree};
use log::debug;
use rayon::prelude::*;

use crate::error::SnapshotError;

pub const DEFAULT_NEIGHBOURS: usize = 32;

/// Per-particle density from flattened particle-major f32 positions
/// (`x0 y0 z0 x1 ...`) and masses.
pub trait DensityEstimator {
    fn estimate(&self, positions: &[f32], masses: &[f64]) -> Result<Vec<f64>, SnapshotError>;
}

#[derive(Debug, Clone, Copy)]
struct Particle {
    xyz: [f32; 3],
    index: usize,
}

impl KdPoint for Particle {
    type Scalar = f32;
    type Dim = typenum::U3;
    fn at(&self, i: usize) -> f32 {
        self.xyz[i]
    }
}

/// SPH density over the k nearest neighbours with a Ferrers n=1 kernel,
/// the smoothing length being the distance to the k-th neighbour.
#[derive(Debug, Clone, Copy)]
pub struct KnnDensity {
    pub neighbours: usize,
}

impl Default for KnnDensity {
    fn default() -> Self {
        Self {
            neighbours: DEFAULT_NEIGHBOURS,
        }
    }
}

impl KnnDensity {
    /// The particle itself is its own nearest neighbour, so at least one
    /// more is needed for a finite smoothing length.
    pub fn new(neighbours: usize) -> Result<Self, SnapshotError> {
        check_neighbours(neighbours)?;
        Ok(Self { neighbours })
    }
}

fn check_neighbours(neighbours: usize) -> Result<(), SnapshotError> {
    if neighbours < 2 {
        return Err(SnapshotError::InvalidParameter(format!(
            "neighbour count must be at least 2, got {neighbours}"
        )));
    }
    Ok(())
}

fn ferrers_density(neighbours: &[(f64, f64)]) -> f64 {
    let h2 = neighbours.iter().map(|(r2, _)| *r2).fold(0.0, f64::max);
    if h2 == 0.0 {
        return f64::INFINITY;
    }
    let norm = 15.0 / (8.0 * PI * h2 * h2.sqrt());
    neighbours
        .iter()
        .map(|(r2, m)| m * norm * (1.0 - r2 / h2))
        .sum()
}

impl DensityEstimator for KnnDensity {
    fn estimate(&self, positions: &[f32], masses: &[f64]) -> Result<Vec<f64>, SnapshotError> {
        check_neighbours(self.neighbours)?;
        if positions.len() != masses.len() * 3 {
            return Err(SnapshotError::LengthMismatch {
                what: "density positions".to_string(),
                expected: masses.len(),
                got: positions.len() / 3,
            });
        }
        let particles = positions
            .chunks_exact(3)
            .enumerate()
            .map(|(index, c)| Particle {
                xyz: [c[0], c[1], c[2]],
                index,
            })
            .collect::<Vec<_>>();
        let k = self.neighbours.min(particles.len());
        debug!("density: {} particles, {k} neighbours", particles.len());
        let tree = KdTree::build_by_ordered_float(particles.clone());
        Ok(particles
            .par_iter()
            .map(|particle| {
                let neighbours = tree
                    .nearests(particle, k)
                    .into_iter()
                    .map(|n| (f64::from(n.squared_distance), masses[n.item.index]))
                    .collect::<Vec<_>>();
                ferrers_density(&neighbours)
            })
            .collect())
    }
}
