use std::io::Write;

use anyhow::Result;
use itertools::Itertools;

use crate::error::SnapshotError;
use crate::math::IteratorStd;
use crate::part_type::PartType;
use crate::snapshot::{ParticleGroup, Snapshot};
use crate::values::Values;

const BANNER: &str = "=================================";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Detail {
    /// Every value of every dataset.
    #[default]
    Full,
    /// Shape and min/max/mean/std per dataset.
    Summary,
}

fn write_time(snapshot: &Snapshot, out: &mut impl Write) -> Result<()> {
    match snapshot.time() {
        Some(time) => writeln!(out, "time   = {time:.6}")?,
        None => writeln!(out, "time   = n/a")?,
    }
    Ok(())
}

fn write_summary(name: &str, values: &Values, out: &mut impl Write) -> Result<()> {
    let shape = values.shape().iter().join("x");
    let stats = values.to_f64().and_then(|v| {
        let min = v.iter().copied().reduce(f64::min)?;
        let max = v.iter().copied().reduce(f64::max)?;
        let (avg, std) = v.into_iter().avg_with_std()?;
        Some((min, max, avg, std))
    });
    match stats {
        Some((min, max, avg, std)) => writeln!(
            out,
            "{name:<16} {:<4} [{shape}] min {min:.6e} max {max:.6e} mean {avg:.6e} std {std:.6e}",
            values.type_name()
        )?,
        None => writeln!(out, "{name:<16} {:<4} [{shape}]", values.type_name())?,
    }
    Ok(())
}

fn write_group(group: &ParticleGroup, detail: Detail, out: &mut impl Write) -> Result<()> {
    for (name, values) in &group.datasets {
        match detail {
            Detail::Full => writeln!(out, "\n{name} = {values}")?,
            Detail::Summary => write_summary(name, values, out)?,
        }
    }
    Ok(())
}

/// Time, per-type counts, every present group's datasets and the total count.
pub fn write_snapshot_info(snapshot: &Snapshot, detail: Detail, out: &mut impl Write) -> Result<()> {
    write_time(snapshot, out)?;
    let counts = snapshot.num_part_this_file();
    if let Some(counts) = &counts {
        writeln!(out, "npart  = {}", counts.iter().join(" "))?;
    }
    for (part_type, group) in &snapshot.groups {
        writeln!(out, "\n{BANNER}\n{}\n{BANNER}", part_type.component())?;
        write_group(group, detail, out)?;
    }
    let total = match counts {
        Some(counts) => counts.iter().sum::<u64>(),
        None => snapshot
            .groups
            .values()
            .map(|g| g.particle_count().map(|n| n as u64))
            .sum::<Result<u64, SnapshotError>>()?,
    };
    writeln!(out, "NTOTAL = {total} ")?;
    Ok(())
}

pub fn write_part_type_info(
    snapshot: &Snapshot,
    part_type: PartType,
    detail: Detail,
    out: &mut impl Write,
) -> Result<()> {
    write_time(snapshot, out)?;
    let group = snapshot
        .group(part_type)
        .ok_or(SnapshotError::PartTypeNotFound(part_type))?;
    write_group(group, detail, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::fixtures;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_snapshot_info() {
        let snapshot = fixtures::snapshot();
        let text = render(|out| write_snapshot_info(&snapshot, Detail::Full, out));
        assert!(text.starts_with("time   = 0.250000\n"));
        assert!(text.contains("npart  = 0 3 6 0 0 0"));
        assert!(text.contains(&format!("{BANNER}\nHalo\n{BANNER}")));
        assert!(text.contains(&format!("{BANNER}\nDisk\n{BANNER}")));
        assert!(!text.contains("Gas"));
        assert!(text.contains("\nParticleIDs = [10, 11, 12, 13, 14, 15]"));
        assert!(text.ends_with("NTOTAL = 9 \n"));
        assert!(text.find("Halo").unwrap() < text.find("Disk").unwrap());
    }

    #[test]
    fn test_part_type_info() {
        let snapshot = fixtures::snapshot();
        let text = render(|out| write_part_type_info(&snapshot, PartType::Halo, Detail::Full, out));
        assert!(text.contains("\nParticleIDs = [0, 1, 2]"));
        assert!(!text.contains("Masses"));

        let mut out = Vec::new();
        let err = write_part_type_info(&snapshot, PartType::Stars, Detail::Full, &mut out)
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<SnapshotError>(),
            Some(&SnapshotError::PartTypeNotFound(PartType::Stars))
        );
    }

    #[test]
    fn test_summary() {
        let snapshot = fixtures::snapshot();
        let text = render(|out| write_part_type_info(&snapshot, PartType::Disk, Detail::Summary, out));
        let masses = text.lines().find(|l| l.starts_with("Masses")).unwrap();
        assert!(masses.contains("f32"));
        assert!(masses.contains("[6]"));
        assert!(masses.contains("min 1.000000e0"));
        assert!(masses.contains("max 6.000000e0"));
        assert!(masses.contains("mean 3.500000e0"));
    }

    #[test]
    fn test_total_without_header_counts() {
        let mut snapshot = fixtures::snapshot();
        snapshot.header.clear();
        let text = render(|out| write_snapshot_info(&snapshot, Detail::Summary, out));
        assert!(text.starts_with("time   = n/a\n"));
        assert!(text.ends_with("NTOTAL = 9 \n"));
    }
}
