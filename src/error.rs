//! Error taxonomy for store operations.
//!
//! Validation failures (`NotFound`, `InvalidInput`, `InvalidState`,
//! `Blocked`) are returned to the caller as-is. `Persistence` is the only
//! variant worth retrying; the store itself never retries.

/// What kind of record a `NotFound` error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A live task.
    Task,
    /// A soft-deleted task backup.
    DeletedTask,
    /// An archive snapshot.
    Archive,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Task => "task",
            Self::DeletedTask => "deleted task",
            Self::Archive => "archive",
        };
        f.write_str(label)
    }
}

/// Errors returned by the task store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// No record with the given id exists.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Which store was searched.
        kind: RecordKind,
        /// The id that was looked up.
        id: String,
    },

    /// Caller-supplied input failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The operation is not legal for the task's current status.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The task has dependencies that are not yet completed.
    #[error("task {task_id} is blocked by: {}", blocked_by.join(", "))]
    Blocked {
        /// The task that could not start.
        task_id: String,
        /// Dependencies that are not `COMPLETED`, in declaration order.
        blocked_by: Vec<String>,
    },

    /// Critical consistency issues exist and `force` was not given.
    #[error("{critical} critical consistency issue(s) require confirmation (re-run with force)")]
    ConflictRequiresConfirmation {
        /// Number of unresolved critical issues.
        critical: usize,
    },

    /// Underlying storage failed.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl Error {
    /// Shorthand for a missing live task.
    #[must_use]
    pub fn task_not_found(id: &str) -> Self {
        Self::NotFound { kind: RecordKind::Task, id: id.to_string() }
    }

    /// Returns `true` when the caller may reasonably retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
