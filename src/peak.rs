use log::debug;

use crate::density::DensityEstimator;
use crate::error::SnapshotError;
use crate::math::IteratorAvg;
use crate::recenter::{Particles, Shift};

pub const DEFAULT_N_DENSEST: usize = 64;

/// Indices ordered by decreasing density; ties keep their original order.
fn densest_first(density: &[f64]) -> Vec<usize> {
    let mut order = (0..density.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| density[b].total_cmp(&density[a]));
    order
}

/// Locates the density peak as the plain (unweighted) mean position and
/// velocity of the `n_densest` densest particles, or of all of them when
/// there are fewer.
pub fn find_density_peak(
    particles: &Particles,
    estimator: &impl DensityEstimator,
    n_densest: usize,
) -> Result<Shift, SnapshotError> {
    particles.validate()?;
    if particles.is_empty() {
        return Err(SnapshotError::NoParticles);
    }
    if n_densest == 0 {
        return Err(SnapshotError::InvalidParameter(
            "number of densest particles must be at least 1".to_string(),
        ));
    }
    let positions = particles
        .positions
        .iter()
        .flat_map(|p| [p.x as f32, p.y as f32, p.z as f32])
        .collect::<Vec<_>>();
    let density = estimator.estimate(&positions, &particles.masses)?;
    if density.len() != particles.len() {
        return Err(SnapshotError::LengthMismatch {
            what: "density estimate".to_string(),
            expected: particles.len(),
            got: density.len(),
        });
    }

    let densest = densest_first(&density)
        .into_iter()
        .take(n_densest)
        .collect::<Vec<_>>();
    debug!(
        "averaging {} densest particles, peak density {}",
        densest.len(),
        density[densest[0]]
    );
    let avg = |values: &[nalgebra::Vector3<f64>]| {
        densest
            .iter()
            .map(|&i| values[i])
            .avg()
            .ok_or(SnapshotError::NoParticles)
    };
    Ok(Shift {
        position: avg(&particles.positions)?,
        velocity: avg(&particles.velocities)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::KnnDensity;
    use assert_float_eq::{assert_f64_near, assert_float_absolute_eq};
    use nalgebra::Vector3;

    /// Hands back fixed densities, one per particle.
    struct FixedDensity(Vec<f64>);

    impl DensityEstimator for FixedDensity {
        fn estimate(&self, positions: &[f32], masses: &[f64]) -> Result<Vec<f64>, SnapshotError> {
            assert_eq!(positions.len(), masses.len() * 3);
            Ok(self.0.clone())
        }
    }

    fn line(n: usize) -> Particles {
        Particles {
            positions: (0..n).map(|i| Vector3::new(i as f64, 0.0, 0.0)).collect(),
            velocities: (0..n).map(|i| Vector3::new(0.0, -(i as f64), 1.0)).collect(),
            masses: vec![1.0; n],
        }
    }

    #[test]
    fn test_selects_densest() {
        let particles = line(5);
        let density = FixedDensity(vec![1.0, 9.0, 3.0, 8.0, 0.5]);
        let peak = find_density_peak(&particles, &density, 2).unwrap();
        assert_eq!(peak.position, Vector3::new(2.0, 0.0, 0.0));
        assert_eq!(peak.velocity, Vector3::new(0.0, -2.0, 1.0));
    }

    #[test]
    fn test_fewer_particles_than_requested() {
        let particles = line(4);
        let density = FixedDensity(vec![1.0, 2.0, 3.0, 4.0]);
        let peak = find_density_peak(&particles, &density, DEFAULT_N_DENSEST).unwrap();
        assert_f64_near!(peak.position.x, 1.5);
        assert_f64_near!(peak.velocity.y, -1.5);
    }

    #[test]
    fn test_ties_keep_first_seen() {
        assert_eq!(densest_first(&[2.0, 5.0, 2.0, 5.0, 1.0]), vec![1, 3, 0, 2, 4]);
        let particles = line(3);
        let density = FixedDensity(vec![7.0, 7.0, 7.0]);
        let peak = find_density_peak(&particles, &density, 1).unwrap();
        assert_eq!(peak.position, Vector3::zeros());
    }

    #[test]
    fn test_invalid_input() {
        let mut particles = line(3);
        particles.velocities.pop();
        let density = FixedDensity(vec![1.0; 3]);
        assert!(matches!(
            find_density_peak(&particles, &density, 1),
            Err(SnapshotError::LengthMismatch { .. })
        ));
        assert!(matches!(
            find_density_peak(&line(3), &density, 0),
            Err(SnapshotError::InvalidParameter(_))
        ));
        assert_eq!(
            find_density_peak(&line(0), &FixedDensity(vec![]), 1),
            Err(SnapshotError::NoParticles)
        );
        assert!(matches!(
            find_density_peak(&line(3), &FixedDensity(vec![1.0]), 1),
            Err(SnapshotError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_peak_of_synthetic_cluster() {
        // 64 particles packed on a 4x4x4 lattice around (10, 10, 10)
        let cluster = (0..64).map(|i| {
            let offset = |c: usize| (c as f64 - 1.5) * 0.01;
            Vector3::new(
                10.0 + offset(i % 4),
                10.0 + offset((i / 4) % 4),
                10.0 + offset(i / 16),
            )
        });
        // 936 particles spread 50 apart, far from the cluster
        let field = (0..936).map(|i| {
            Vector3::new(
                200.0 + 50.0 * (i % 10) as f64,
                200.0 + 50.0 * ((i / 10) % 10) as f64,
                200.0 + 50.0 * (i / 100) as f64,
            )
        });
        let mut positions = field.collect::<Vec<_>>();
        positions.splice(300..300, cluster);
        let n = positions.len();
        let particles = Particles {
            velocities: positions.iter().map(|p| p * 0.1).collect(),
            positions,
            masses: vec![1.0; n],
        };
        assert_eq!(particles.len(), 1000);

        let peak =
            find_density_peak(&particles, &KnnDensity::default(), DEFAULT_N_DENSEST).unwrap();
        for c in peak.position.iter() {
            assert_float_absolute_eq!(*c, 10.0, 1e-4);
        }
        for c in peak.velocity.iter() {
            assert_float_absolute_eq!(*c, 1.0, 1e-5);
        }
    }
}
