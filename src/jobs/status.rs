/// Job status definitions
///
/// This module defines the lifecycle a job moves through, from queueing to a
/// terminal outcome.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job has been created and waits for a worker
    Queued,

    /// A worker is fetching the job's URL
    InProgress,

    /// Fetch returned HTTP 200 and was analyzed
    Completed,

    /// Fetch failed or returned any other status
    Error,
}

impl JobStatus {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Returns true while the job is waiting or running
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if `next` is the single legal successor of this status
    ///
    /// The lifecycle is Queued → InProgress → {Completed, Error}. Skipping
    /// InProgress, staying in place, or moving backwards are all rejected.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::InProgress)
                | (Self::InProgress, Self::Completed)
                | (Self::InProgress, Self::Error)
        )
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Returns all possible statuses in lifecycle order
    pub fn all_statuses() -> [Self; 4] {
        [Self::Queued, Self::InProgress, Self::Completed, Self::Error]
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::InProgress.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Error.is_terminal());
    }

    #[test]
    fn test_forward_transitions_only() {
        use JobStatus::*;

        assert!(Queued.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Error));

        // Skipping InProgress
        assert!(!Queued.can_transition_to(Completed));
        assert!(!Queued.can_transition_to(Error));

        // Regressions and self-loops
        assert!(!InProgress.can_transition_to(Queued));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Error.can_transition_to(Completed));
        for status in JobStatus::all_statuses() {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn test_roundtrip_db_string() {
        for status in JobStatus::all_statuses() {
            let parsed = JobStatus::from_db_string(status.to_db_string());
            assert_eq!(Some(status), parsed, "Failed roundtrip for {:?}", status);
        }
        assert_eq!(JobStatus::from_db_string("fetching"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", JobStatus::InProgress), "in_progress");
        assert_eq!(format!("{}", JobStatus::Error), "error");
    }
}
