use itertools::izip;
use log::{debug, info};
use nalgebra::Vector3;

use crate::error::SnapshotError;
use crate::part_type::PartType;
use crate::snapshot::{Snapshot, COORDINATES, MASSES, VELOCITIES};

/// Positions, velocities and masses pooled across every particle type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Particles {
    pub positions: Vec<Vector3<f64>>,
    pub velocities: Vec<Vector3<f64>>,
    pub masses: Vec<f64>,
}

impl Particles {
    /// Pools every group holding coordinates, velocities and a mass per
    /// particle. Without a `Masses` dataset a positive `MassTable` entry
    /// gives every particle of the type the same mass.
    pub fn pooled(snapshot: &Snapshot) -> Result<Self, SnapshotError> {
        let mass_table = snapshot.mass_table().unwrap_or_default();
        let mut particles = Self::default();
        for (part_type, group) in &snapshot.groups {
            let (Some(pos), Some(vel)) = (group.get(COORDINATES), group.get(VELOCITIES)) else {
                info!("{part_type}: no {COORDINATES} or {VELOCITIES}, left out");
                continue;
            };
            let what = |name: &str| format!("{part_type}/{name}");
            let pos = pos.to_vectors(&what(COORDINATES))?;
            let vel = vel.to_vectors(&what(VELOCITIES))?;
            let masses = match (group.get(MASSES), mass_table.get(part_type.index())) {
                (Some(masses), _) => masses.to_scalars(&what(MASSES))?,
                (None, Some(&mass)) if mass > 0.0 => vec![mass; pos.len()],
                _ => {
                    info!("{part_type}: no {MASSES} and no MassTable entry, left out");
                    continue;
                }
            };
            check_len(&what(VELOCITIES), pos.len(), vel.len())?;
            check_len(&what(MASSES), pos.len(), masses.len())?;
            debug!("{part_type}: pooled {} particles", pos.len());
            particles.positions.extend(pos);
            particles.velocities.extend(vel);
            particles.masses.extend(masses);
        }
        Ok(particles)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.masses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    pub fn validate(&self) -> Result<(), SnapshotError> {
        check_len("positions", self.masses.len(), self.positions.len())?;
        check_len("velocities", self.masses.len(), self.velocities.len())
    }
}

fn check_len(what: &str, expected: usize, got: usize) -> Result<(), SnapshotError> {
    if expected == got {
        Ok(())
    } else {
        Err(SnapshotError::LengthMismatch {
            what: what.to_string(),
            expected,
            got,
        })
    }
}

/// Mass-weighted mean, Σ(v·m) / Σm.
pub fn center_of_mass(values: &[Vector3<f64>], masses: &[f64]) -> Result<Vector3<f64>, SnapshotError> {
    check_len("center of mass values", masses.len(), values.len())?;
    let total = masses.iter().sum::<f64>();
    if total == 0.0 {
        return Err(SnapshotError::ZeroTotalMass);
    }
    let weighted = izip!(values, masses)
        .map(|(v, m)| v * *m)
        .sum::<Vector3<f64>>();
    Ok(weighted / total)
}

/// Offsets subtracted from every `Coordinates` and `Velocities` row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shift {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

impl Shift {
    pub fn center_of_mass(particles: &Particles) -> Result<Self, SnapshotError> {
        particles.validate()?;
        Ok(Self {
            position: center_of_mass(&particles.positions, &particles.masses)?,
            velocity: center_of_mass(&particles.velocities, &particles.masses)?,
        })
    }

    /// Every other dataset and the header stay untouched.
    pub fn apply(&self, snapshot: &mut Snapshot) -> Result<(), SnapshotError> {
        for (part_type, group) in &mut snapshot.groups {
            for (name, shift) in [(COORDINATES, &self.position), (VELOCITIES, &self.velocity)] {
                if let Some(values) = group.datasets.get_mut(name) {
                    values.sub_vector(&format!("{part_type}/{name}"), shift)?;
                }
            }
        }
        Ok(())
    }
}

pub fn count_by_type(snapshot: &Snapshot) -> Result<Vec<(PartType, usize)>, SnapshotError> {
    snapshot
        .groups
        .iter()
        .map(|(part_type, group)| group.particle_count().map(|n| (*part_type, n)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{copy_snapshot, fixtures, HEADER_MASS_TABLE};
    use crate::values::Values;
    use assert_float_eq::{assert_f64_near, assert_float_absolute_eq};
    use ndarray::arr1;
    use tempfile::tempdir;

    #[test]
    fn test_center_of_mass() {
        let values = [Vector3::new(0.0, 0.0, 0.0), Vector3::new(4.0, -8.0, 2.0)];
        let com = center_of_mass(&values, &[3.0, 1.0]).unwrap();
        assert_f64_near!(com.x, 1.0);
        assert_f64_near!(com.y, -2.0);
        assert_f64_near!(com.z, 0.5);
    }

    #[test]
    fn test_zero_total_mass() {
        let values = [Vector3::new(1.0, 1.0, 1.0), Vector3::new(2.0, 2.0, 2.0)];
        assert_eq!(
            center_of_mass(&values, &[1.0, -1.0]),
            Err(SnapshotError::ZeroTotalMass)
        );
        assert_eq!(center_of_mass(&[], &[]), Err(SnapshotError::ZeroTotalMass));
        assert!(matches!(
            center_of_mass(&values, &[1.0]),
            Err(SnapshotError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_pooled_uses_mass_table() {
        let particles = Particles::pooled(&fixtures::snapshot()).unwrap();
        assert_eq!(particles.len(), 9);
        // halo (type 1) sorts before disk (type 2)
        assert_eq!(&particles.masses[..3], &[2.0, 2.0, 2.0]);
        assert_eq!(&particles.masses[3..], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let mut snapshot = fixtures::snapshot();
        snapshot.header.insert(
            HEADER_MASS_TABLE.to_string(),
            Values::from(arr1(&[0.0f64; 6]).into_dyn()),
        );
        assert_eq!(Particles::pooled(&snapshot).unwrap().len(), 6);
    }

    #[test]
    fn test_shift_to_center_of_mass() {
        let mut snapshot = fixtures::snapshot();
        let before = snapshot.clone();
        let shift = Shift::center_of_mass(&Particles::pooled(&snapshot).unwrap()).unwrap();
        shift.apply(&mut snapshot).unwrap();

        let after = Particles::pooled(&snapshot).unwrap();
        let com = center_of_mass(&after.positions, &after.masses).unwrap();
        let vcom = center_of_mass(&after.velocities, &after.masses).unwrap();
        for c in com.iter().chain(vcom.iter()) {
            assert_float_absolute_eq!(*c, 0.0, 1e-4);
        }

        assert_eq!(snapshot.header, before.header);
        assert_eq!(count_by_type(&snapshot), count_by_type(&before));
        for (part_type, group) in &snapshot.groups {
            for (name, values) in &group.datasets {
                if name != COORDINATES && name != VELOCITIES {
                    assert_eq!(values, &before.groups[part_type].datasets[name], "{name}");
                }
            }
        }
    }

    #[test]
    fn test_shift_survives_disk() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.hdf5");
        let output = dir.path().join("output.hdf5");
        fixtures::snapshot().save(&input).unwrap();

        let mut snapshot = copy_snapshot(&input, &output).unwrap();
        let shift = Shift {
            position: Vector3::new(1.0, 2.0, 3.0),
            velocity: Vector3::zeros(),
        };
        shift.apply(&mut snapshot).unwrap();
        snapshot.save(&output).unwrap();

        let read = Snapshot::read(&output).unwrap();
        let pos = read.group(PartType::Disk).unwrap().get(COORDINATES).unwrap();
        assert_eq!(pos.type_name(), "f32");
        let pos = pos.to_vectors(COORDINATES).unwrap();
        assert_eq!(pos[0], Vector3::new(-1.0, -1.0, -1.0));
    }

    #[test]
    fn test_groups_without_velocities_are_tolerated() {
        let mut snapshot = fixtures::snapshot();
        snapshot
            .groups
            .get_mut(&PartType::Halo)
            .unwrap()
            .datasets
            .remove(VELOCITIES);
        let particles = Particles::pooled(&snapshot).unwrap();
        assert_eq!(particles.len(), 6);
        let shift = Shift::center_of_mass(&particles).unwrap();
        shift.apply(&mut snapshot).unwrap();
        assert!(snapshot.groups[&PartType::Halo].get(VELOCITIES).is_none());
    }
}
