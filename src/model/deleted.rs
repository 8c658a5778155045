//! Soft-deleted task backup record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::Task;

/// A removed task kept for recovery, keyed by the task's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedTaskRecord {
    /// The task exactly as it was when deleted.
    pub task: Task,
    /// When it was deleted.
    pub deleted_at: DateTime<Utc>,
}
