use serde::{Deserialize, Serialize};
use std::fmt;

/// Shared status vocabulary for both machines and tasks.
///
/// Not every value is legal at every granularity (a machine is never `Retry`),
/// but one vocabulary keeps comparisons between the two levels uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Created but not yet submitted / not yet started
    Queued,
    /// Submitted and executing (or awaiting an external observation)
    Running,
    /// Finished successfully
    Complete,
    /// Flagged for resubmission by an external signal
    Retry,
    /// Failed; requires operator intervention before anything else happens
    Suspended,
    /// Parked for manual review
    Triage,
}

impl Status {
    /// Statuses the periodic driver considers worth advancing.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }

    /// Terminal for a task: the engine stops polling it.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Suspended)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Running => write!(f, "running"),
            Self::Complete => write!(f, "complete"),
            Self::Retry => write!(f, "retry"),
            Self::Suspended => write!(f, "suspended"),
            Self::Triage => write!(f, "triage"),
        }
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "complete" => Ok(Self::Complete),
            "retry" => Ok(Self::Retry),
            "suspended" => Ok(Self::Suspended),
            "triage" => Ok(Self::Triage),
            _ => Err(format!("Invalid status: {s}")),
        }
    }
}
