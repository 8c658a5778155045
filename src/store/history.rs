//! Append-only history log stored as JSON lines.

use chrono::{DateTime, Utc};
use tracing::warn;

use super::TaskStore;
use crate::error::{Error, Result};
use crate::model::{HistoryEntry, HistoryOperation, Task};

const HISTORY_FILE: &str = "history.jsonl";

/// Filter for reading history. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    /// Maximum entries to return; the store default applies when `None`.
    pub limit: Option<usize>,
    /// Only entries at or after this time.
    pub since: Option<DateTime<Utc>>,
    /// Only entries for this task.
    pub task_id: Option<String>,
    /// Only entries of this operation.
    pub operation: Option<HistoryOperation>,
}

impl HistoryQuery {
    fn matches(&self, entry: &HistoryEntry) -> bool {
        self.since.map_or(true, |since| entry.timestamp >= since)
            && self.task_id.as_deref().map_or(true, |id| entry.task_id == id)
            && self.operation.map_or(true, |op| entry.operation == op)
    }
}

impl TaskStore<'_> {
    /// Appends one history entry.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the entry cannot be serialized or appended.
    pub fn append_history(&self, entry: &HistoryEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)
            .map_err(|e| Error::Persistence(format!("Failed to serialize history entry: {e}")))?;
        line.push('\n');
        let path = self.root.join(HISTORY_FILE);
        self.ctx
            .fs
            .append(&path, &line)
            .map_err(|e| Error::Persistence(format!("Failed to append {}: {e}", path.display())))
    }

    /// Records `operation` on `task` at the current time.
    ///
    /// Called after the mutation it describes has been saved, so a failure
    /// here is logged rather than returned.
    pub fn record(&self, operation: HistoryOperation, task: &Task, details: impl Into<String>) {
        let entry = HistoryEntry {
            timestamp: self.now(),
            operation,
            task_id: task.id.clone(),
            task_name: task.name.clone(),
            details: details.into(),
        };
        if let Err(e) = self.append_history(&entry) {
            warn!(task_id = %task.id, %operation, error = %e, "failed to record history");
        }
    }

    /// Reads history newest first, filtered by `query` and capped at
    /// `query.limit` (or `default_limit`). Malformed lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the log exists but cannot be read.
    pub fn read_history(&self, query: &HistoryQuery, default_limit: usize) -> Result<Vec<HistoryEntry>> {
        let path = self.root.join(HISTORY_FILE);
        if !self.ctx.fs.exists(&path) {
            return Ok(Vec::new());
        }
        let contents = self
            .ctx
            .fs
            .read_to_string(&path)
            .map_err(|e| Error::Persistence(format!("Failed to read {}: {e}", path.display())))?;

        let limit = query.limit.unwrap_or(default_limit);
        let lines: Vec<&str> = contents.lines().collect();
        let mut entries = Vec::new();
        for (lineno, line) in lines.iter().copied().enumerate().rev() {
            if entries.len() >= limit {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryEntry>(line) {
                Ok(entry) if query.matches(&entry) => entries.push(entry),
                Ok(_) => {}
                Err(e) => warn!(line = lineno + 1, error = %e, "skipping malformed history line"),
            }
        }
        Ok(entries)
    }
}
