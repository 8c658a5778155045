//! Task and task-collection types.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::completion::CompletionDetails;

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Not started.
    #[default]
    Pending,
    /// Execution has begun.
    InProgress,
    /// Verified and finished. Terminal for normal operations.
    Completed,
}

impl TaskStatus {
    /// Upper-case wire name, e.g. `IN_PROGRESS`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "PENDING" => Ok(Self::Pending),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            other => Err(format!("unknown status '{other}' (expected pending, in_progress or completed)")),
        }
    }
}

/// How a related file participates in a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelatedFileType {
    /// File the task will change.
    ToModify,
    /// File to read for context.
    Reference,
    /// File the task will create.
    Create,
    /// File the work depends on.
    Dependency,
    /// Anything else.
    #[default]
    Other,
}

/// A file associated with a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedFile {
    /// Path relative to the project root.
    pub path: String,
    /// Role of the file.
    #[serde(rename = "type", default)]
    pub file_type: RelatedFileType,
    /// Free-text note.
    #[serde(default)]
    pub description: String,
    /// First relevant line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_start: Option<u32>,
    /// Last relevant line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_end: Option<u32>,
}

/// A unit of work.
///
/// Every field defaults on load so that damaged records still deserialize
/// and can be reported by the consistency auditor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Stable unique identifier.
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    /// Short title.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// What needs to be done.
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Current lifecycle status.
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: TaskStatus,
    /// Ids of tasks that must complete first, in declaration order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub dependencies: Vec<String>,
    /// Creation time.
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: DateTime<Utc>,
    /// Last modification time; never earlier than `created_at` on a valid task.
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at: DateTime<Utc>,
    /// When the task reached `COMPLETED`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// What was done; set only at completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Structured completion record; set only at completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_details: Option<CompletionDetails>,
    /// Files involved in the task.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_files: Vec<RelatedFile>,
    /// How to approach the work.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation_guide: Option<String>,
    /// How the work will be judged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_criteria: Option<String>,
    /// Agent assigned to the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

impl Task {
    /// Creates a pending task with no dependencies, stamped at `now`.
    #[must_use]
    pub fn new(id: &str, name: &str, description: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            notes: None,
            status: TaskStatus::Pending,
            dependencies: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
            summary: None,
            completion_details: None,
            related_files: Vec::new(),
            implementation_guide: None,
            verification_criteria: None,
            agent: None,
        }
    }
}

/// Reads `null` as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Drops repeated ids, keeping the first occurrence of each.
#[must_use]
pub fn dedup_ids(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

/// Task counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    /// Number of tasks.
    pub total: usize,
    /// `PENDING` tasks.
    pub pending: usize,
    /// `IN_PROGRESS` tasks.
    pub in_progress: usize,
    /// `COMPLETED` tasks.
    pub completed: usize,
}

impl StatusCounts {
    /// Counts the given tasks by status.
    #[must_use]
    pub fn of(tasks: &[Task]) -> Self {
        tasks.iter().fold(Self::default(), |mut counts, task| {
            counts.total += 1;
            match task.status {
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::InProgress => counts.in_progress += 1,
                TaskStatus::Completed => counts.completed += 1,
            }
            counts
        })
    }
}

/// The live task set plus the planning prompt that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCollection {
    /// The original planning request.
    #[serde(default, deserialize_with = "null_as_default")]
    pub initial_request: String,
    /// Live tasks, in insertion order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tasks: Vec<Task>,
}

impl TaskCollection {
    /// Returns the first task with the given id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Returns a mutable reference to the first task with the given id.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Returns `true` if a task with the given id is live.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Counts live tasks by status.
    #[must_use]
    pub fn stats(&self) -> StatusCounts {
        StatusCounts::of(&self.tasks)
    }
}
