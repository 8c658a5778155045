//! Audit-trail entries.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryOperation {
    /// Task added.
    Created,
    /// Task fields edited.
    Updated,
    /// Task moved to `IN_PROGRESS`.
    Started,
    /// Task moved to `COMPLETED`.
    Completed,
    /// Task soft-deleted.
    Deleted,
    /// Task brought back from the deleted store.
    Recovered,
    /// Task brought back from an archive.
    Restored,
}

impl HistoryOperation {
    /// Lower-case wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Deleted => "deleted",
            Self::Recovered => "recovered",
            Self::Restored => "restored",
        }
    }
}

impl fmt::Display for HistoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "started" => Ok(Self::Started),
            "completed" => Ok(Self::Completed),
            "deleted" => Ok(Self::Deleted),
            "recovered" => Ok(Self::Recovered),
            "restored" => Ok(Self::Restored),
            other => Err(format!("unknown history operation '{other}'")),
        }
    }
}

/// One append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// When the operation happened.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub operation: HistoryOperation,
    /// Affected task.
    pub task_id: String,
    /// Task name at the time of the operation.
    pub task_name: String,
    /// Human-readable detail.
    #[serde(default)]
    pub details: String,
}
