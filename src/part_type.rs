use std::fmt;
use std::str::FromStr;

use crate::error::SnapshotError;

const GROUP_PREFIX: &str = "PartType";

/// GADGET particle populations, stored as the `PartType0`..`PartType4` groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PartType {
    Gas,
    Halo,
    Disk,
    Bulge,
    Stars,
}

impl PartType {
    pub const ALL: [PartType; 5] = [
        PartType::Gas,
        PartType::Halo,
        PartType::Disk,
        PartType::Bulge,
        PartType::Stars,
    ];

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[must_use]
    pub fn group_name(self) -> String {
        format!("{GROUP_PREFIX}{}", self.index())
    }

    #[must_use]
    pub fn component(self) -> &'static str {
        match self {
            PartType::Gas => "Gas",
            PartType::Halo => "Halo",
            PartType::Disk => "Disk",
            PartType::Bulge => "Bulge",
            PartType::Stars => "Stars",
        }
    }

    /// `None` for any group that is not one of the five particle types.
    #[must_use]
    pub fn from_group_name(name: &str) -> Option<Self> {
        name.strip_prefix(GROUP_PREFIX)
            .filter(|i| i.len() == 1)
            .and_then(|i| i.parse::<usize>().ok())
            .and_then(Self::from_index)
    }
}

impl fmt::Display for PartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.group_name())
    }
}

impl FromStr for PartType {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let by_index = || {
            s.parse::<usize>()
                .ok()
                .filter(|_| s.len() == 1)
                .and_then(Self::from_index)
        };
        Self::from_group_name(s)
            .or_else(by_index)
            .ok_or_else(|| SnapshotError::UnknownPartType(s.to_string()))
    }
}
