use std::fmt;
use std::io::{self, Write};
use std::process::ExitCode;

use log::debug;

use crate::part_type::PartType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Degenerate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotError {
    LengthMismatch {
        what: String,
        expected: usize,
        got: usize,
    },
    InvalidShape {
        what: String,
        shape: Vec<usize>,
    },
    UnsupportedType {
        name: String,
        descriptor: String,
    },
    InvalidParameter(String),
    OutputIsInput,
    MissingHeader,
    PartTypeNotFound(PartType),
    UnknownPartType(String),
    ZeroTotalMass,
    NoParticles,
}

impl SnapshotError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LengthMismatch { .. }
            | Self::InvalidShape { .. }
            | Self::UnsupportedType { .. }
            | Self::InvalidParameter(_)
            | Self::OutputIsInput => ErrorKind::InvalidInput,
            Self::MissingHeader | Self::PartTypeNotFound(_) | Self::UnknownPartType(_) => {
                ErrorKind::NotFound
            }
            Self::ZeroTotalMass | Self::NoParticles => ErrorKind::Degenerate,
        }
    }
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch {
                what,
                expected,
                got,
            } => write!(f, "{what}: expected {expected} particles, got {got}"),
            Self::InvalidShape { what, shape } => {
                write!(f, "{what}: expected shape [N, 3], got {shape:?}")
            }
            Self::UnsupportedType { name, descriptor } => {
                write!(f, "{name}: unsupported HDF5 type {descriptor}")
            }
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            Self::OutputIsInput => write!(f, "output path refers to the input snapshot"),
            Self::MissingHeader => write!(f, "Header group not found in the snapshot"),
            Self::PartTypeNotFound(part_type) => {
                write!(f, "{} not found in the snapshot", part_type.group_name())
            }
            Self::UnknownPartType(name) => write!(
                f,
                "invalid PartType: {name}, choose from PartType0..PartType4 (or 0..4)"
            ),
            Self::ZeroTotalMass => write!(f, "total mass is zero, center of mass is undefined"),
            Self::NoParticles => write!(
                f,
                "no particle group has Coordinates, Velocities and masses"
            ),
        }
    }
}

impl std::error::Error for SnapshotError {}

/// Maps a failed run onto the process exit status.
///
/// 1 is I/O or anything not raised by this crate, 2 invalid input,
/// 3 not found, 4 degenerate input.
#[must_use]
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err
        .chain()
        .find_map(|e| e.downcast_ref::<SnapshotError>())
        .map(SnapshotError::kind)
    {
        Some(ErrorKind::InvalidInput) => 2,
        Some(ErrorKind::NotFound) => 3,
        Some(ErrorKind::Degenerate) => 4,
        None => 1,
    }
}

/// Prints the error chain to stderr and maps it to the process exit code.
pub fn report(result: anyhow::Result<()>) -> ExitCode {
    report_to(result, &mut io::stderr().lock())
}

fn report_to(result: anyhow::Result<()>, out: &mut impl Write) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = exit_code(&err);
            debug!("exiting with code {code}");
            // nowhere left to report a failing stderr
            let _ = writeln!(out, "Error: {err:?}");
            ExitCode::from(code)
        }
    }
}
