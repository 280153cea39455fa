mod density;
mod error;
mod inspect;
mod math;
mod part_type;
mod peak;
mod raw;
mod recenter;
mod snapshot;
mod values;

pub use density::{DensityEstimator, KnnDensity, DEFAULT_NEIGHBOURS};
pub use error::{exit_code, report, ErrorKind, SnapshotError};
pub use inspect::{write_part_type_info, write_snapshot_info, Detail};
pub use math::{IteratorAvg, IteratorStd};
pub use part_type::PartType;
pub use peak::{find_density_peak, DEFAULT_N_DENSEST};
pub use raw::RawValues;
pub use recenter::{center_of_mass, count_by_type, Particles, Shift};
pub use snapshot::{
    check_output, copy_snapshot, ParticleGroup, Snapshot, COORDINATES, HEADER, MASSES,
    VELOCITIES,
};
pub use values::Values;
