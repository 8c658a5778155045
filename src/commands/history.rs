//! `taskledger history` command.

use crate::error::Result;
use crate::model::{HistoryEntry, HistoryOperation};
use crate::service::TaskService;
use crate::store::HistoryQuery;

/// Execute `history`.
///
/// # Errors
///
/// Returns the store error if the log cannot be read.
pub fn run(
    service: &TaskService<'_>,
    task: Option<&str>,
    operation: Option<HistoryOperation>,
    limit: Option<usize>,
) -> Result<()> {
    let query = HistoryQuery { limit, since: None, task_id: task.map(str::to_string), operation };
    let entries = service.get_history(&query)?;
    if entries.is_empty() {
        println!("No history entries.");
        return Ok(());
    }
    for entry in &entries {
        println!("{}", entry_line(entry));
    }
    Ok(())
}

fn entry_line(entry: &HistoryEntry) -> String {
    let mut line = format!(
        "{}  {:<9}  {}  {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
        entry.operation.as_str(),
        entry.task_id,
        entry.task_name
    );
    if !entry.details.is_empty() {
        line.push_str(&format!(" ({})", entry.details));
    }
    line
}
