//! Archive snapshot types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::{StatusCounts, Task};

/// Immutable snapshot of the whole task collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Archive {
    /// Archive identifier, also its file stem.
    pub id: String,
    /// Snapshot time.
    pub created_at: DateTime<Utc>,
    /// Caller-supplied label.
    pub description: String,
    /// Every live task at snapshot time.
    pub tasks: Vec<Task>,
    /// The initial request at snapshot time.
    #[serde(default)]
    pub initial_request: String,
    /// Task counts computed at snapshot time.
    pub stats: StatusCounts,
}

/// Archive listing entry without task bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveMeta {
    /// Archive identifier.
    pub id: String,
    /// File name under `archives/`.
    pub file_name: String,
    /// Snapshot time.
    pub created_at: DateTime<Utc>,
    /// Caller-supplied label.
    pub description: String,
    /// Task counts at snapshot time.
    pub stats: StatusCounts,
}

impl Archive {
    /// Metadata view of this archive.
    #[must_use]
    pub fn meta(&self) -> ArchiveMeta {
        ArchiveMeta {
            id: self.id.clone(),
            file_name: format!("{}.json", self.id),
            created_at: self.created_at,
            description: self.description.clone(),
            stats: self.stats,
        }
    }
}
