use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hdf5::{File, Group};
use log::{debug, warn};

use crate::error::SnapshotError;
use crate::part_type::PartType;
use crate::values::Values;

pub const HEADER: &str = "Header";
pub const HEADER_TIME: &str = "Time";
pub const HEADER_NUM_PART_THIS_FILE: &str = "NumPart_ThisFile";
pub const HEADER_MASS_TABLE: &str = "MassTable";

pub const COORDINATES: &str = "Coordinates";
pub const VELOCITIES: &str = "Velocities";
pub const MASSES: &str = "Masses";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleGroup {
    pub datasets: BTreeMap<String, Values>,
}

impl ParticleGroup {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Values> {
        self.datasets.get(name)
    }

    /// Shared first dimension of every non-scalar dataset.
    pub fn particle_count(&self) -> Result<usize, SnapshotError> {
        let mut lens = self
            .datasets
            .iter()
            .filter_map(|(name, values)| values.len().map(|n| (name, n)));
        let Some((_, count)) = lens.next() else {
            return Ok(0);
        };
        match lens.find(|(_, n)| *n != count) {
            Some((name, n)) => Err(SnapshotError::LengthMismatch {
                what: name.clone(),
                expected: count,
                got: n,
            }),
            None => Ok(count),
        }
    }

    fn read(group: &Group) -> Result<Self> {
        let mut datasets = BTreeMap::new();
        for name in group.member_names()? {
            match group.dataset(&name) {
                Ok(dataset) => {
                    let values = Values::read(&dataset, &name)
                        .with_context(|| format!("Reading {}/{name}", group.name()))?;
                    datasets.insert(name, values);
                }
                Err(_) => warn!("skipping {}/{name}: not a dataset", group.name()),
            }
        }
        Ok(Self { datasets })
    }

    fn write(&self, group: &Group) -> Result<()> {
        self.datasets
            .iter()
            .try_for_each(|(name, values)| values.write_dataset(group, name))
    }
}

/// A GADGET snapshot held entirely in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub header: BTreeMap<String, Values>,
    pub groups: BTreeMap<PartType, ParticleGroup>,
}

impl Snapshot {
    /// Reads the header and the five particle-type groups. Other root
    /// members are skipped; every group is checked for equal dataset lengths.
    pub fn read(path: &Path) -> Result<Self> {
        let file = File::open(path).context(format!("Reading {}", path.to_string_lossy()))?;
        if !file.link_exists(HEADER) {
            return Err(SnapshotError::MissingHeader)
                .context(format!("Reading {}", path.to_string_lossy()));
        }
        let header_group = file.group(HEADER)?;
        let mut header = BTreeMap::new();
        for name in header_group.attr_names()? {
            let attr = header_group.attr(&name)?;
            let values = Values::read(&attr, &name).context(format!("Reading {HEADER}/{name}"))?;
            header.insert(name, values);
        }

        let mut groups = BTreeMap::new();
        for name in file.member_names()? {
            if name == HEADER {
                continue;
            }
            let Some(part_type) = PartType::from_group_name(&name) else {
                debug!("skipping unknown group {name}");
                continue;
            };
            let group = ParticleGroup::read(&file.group(&name)?)?;
            let count = group
                .particle_count()
                .context(format!("Reading {}", path.to_string_lossy()))?;
            debug!("{name}: {count} particles, {} datasets", group.datasets.len());
            groups.insert(part_type, group);
        }
        Ok(Self { header, groups })
    }

    /// Writes to a hidden sibling file and renames it onto `path` once
    /// everything is flushed, so `path` never holds a partial snapshot.
    pub fn save(&self, path: &Path) -> Result<()> {
        let partial = partial_path(path);
        if let Err(err) = self.write(&partial) {
            if partial.exists() {
                fs::remove_file(&partial).ok();
            }
            return Err(err.context(format!("Writing {}", path.to_string_lossy())));
        }
        fs::rename(&partial, path).context(format!(
            "Renaming {} to {}",
            partial.to_string_lossy(),
            path.to_string_lossy()
        ))
    }

    fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let header = file.create_group(HEADER)?;
        for (name, values) in &self.header {
            values
                .write_attr(&header, name)
                .context(format!("Writing {HEADER}/{name}"))?;
        }
        for (part_type, group) in &self.groups {
            let name = part_type.group_name();
            group
                .write(&file.create_group(&name)?)
                .context(format!("Writing {name}"))?;
        }
        file.flush()?;
        Ok(())
    }

    #[must_use]
    pub fn group(&self, part_type: PartType) -> Option<&ParticleGroup> {
        self.groups.get(&part_type)
    }

    #[must_use]
    pub fn time(&self) -> Option<f64> {
        self.header
            .get(HEADER_TIME)
            .and_then(Values::to_f64)
            .and_then(|v| v.first().copied())
    }

    #[must_use]
    pub fn num_part_this_file(&self) -> Option<Vec<u64>> {
        self.header
            .get(HEADER_NUM_PART_THIS_FILE)
            .and_then(Values::to_f64)
            .map(|v| v.into_iter().map(|n| n as u64).collect())
    }

    #[must_use]
    pub fn mass_table(&self) -> Option<Vec<f64>> {
        self.header.get(HEADER_MASS_TABLE).and_then(Values::to_f64)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    path.with_file_name(format!(
        ".{}.partial",
        path.file_name().unwrap_or_default().to_string_lossy()
    ))
}

/// Fails with `OutputIsInput` when both paths name the same file.
pub fn check_output(input: &Path, output: &Path) -> Result<(), SnapshotError> {
    match (fs::canonicalize(input), fs::canonicalize(output)) {
        (Ok(a), Ok(b)) if a == b => Err(SnapshotError::OutputIsInput),
        _ => Ok(()),
    }
}

/// Reads `input` and writes its header and particle groups to `output` unchanged.
pub fn copy_snapshot(input: &Path, output: &Path) -> Result<Snapshot> {
    check_output(input, output)?;
    let snapshot = Snapshot::read(input)?;
    snapshot.save(output)?;
    Ok(snapshot)
}
