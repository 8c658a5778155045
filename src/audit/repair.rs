//! Automatic repairs for audit findings.

use std::collections::HashSet;

use tracing::{info, warn};

use super::{Issue, IssueKind};
use crate::model::{Task, TaskCollection};

/// Applies every eligible repair to `collection`.
///
/// Timestamp clamps are always eligible; dropping duplicate tasks and
/// dangling references needs `force`. Returns `(resolved, unresolved)`.
/// A repair that cannot be applied is logged and left unresolved.
pub(super) fn apply(
    collection: &mut TaskCollection,
    issues: Vec<Issue>,
    force: bool,
) -> (Vec<Issue>, Vec<Issue>) {
    let mut resolved = Vec::new();
    let mut unresolved = Vec::new();
    let mut duplicates = Vec::new();
    let mut clamped = HashSet::new();

    for issue in issues {
        let outcome = match &issue.kind {
            IssueKind::TimestampInconsistency { index } => {
                Some(task_at(collection, *index, &issue.task_id).map(|task| {
                    task.updated_at = task.created_at;
                }))
            }
            IssueKind::DependencyMismatch { index, dependency } if force => {
                Some(task_at(collection, *index, &issue.task_id).map(|task| {
                    task.dependencies.retain(|d| d != dependency);
                }))
            }
            _ => None,
        };
        let duplicate_at = match issue.kind {
            IssueKind::DuplicateId { index } => Some(index),
            _ => None,
        };
        match outcome {
            Some(Ok(())) => {
                if let IssueKind::TimestampInconsistency { index } = issue.kind {
                    clamped.insert(index);
                }
                resolved.push(issue);
            }
            Some(Err(reason)) => {
                warn!(code = issue.kind.code(), task_id = %issue.task_id, %reason, "repair skipped");
                unresolved.push(issue);
            }
            None => match duplicate_at {
                Some(index) if force => duplicates.push((index, issue)),
                _ => unresolved.push(issue),
            },
        }
    }

    // A clamp also fills in a missing updatedAt.
    let (filled, mut unresolved): (Vec<Issue>, Vec<Issue>) =
        unresolved.into_iter().partition(|issue| match &issue.kind {
            IssueKind::MissingField { index, field } => field == "updatedAt" && clamped.contains(index),
            _ => false,
        });
    resolved.extend(filled);

    // Remove from the back so earlier indices stay valid.
    duplicates.sort_by(|a, b| b.0.cmp(&a.0));
    for (index, issue) in duplicates {
        let located = task_at(collection, index, &issue.task_id).map(|_| ());
        match located {
            Ok(()) => {
                let removed = collection.tasks.remove(index);
                info!(task_id = %removed.id, name = %removed.name, "dropped duplicate task");
                resolved.push(issue);
            }
            Err(reason) => {
                warn!(code = issue.kind.code(), task_id = %issue.task_id, %reason, "repair skipped");
                unresolved.push(issue);
            }
        }
    }

    (resolved, unresolved)
}

fn task_at<'c>(
    collection: &'c mut TaskCollection,
    index: usize,
    expected_id: &str,
) -> Result<&'c mut Task, String> {
    match collection.tasks.get_mut(index) {
        Some(task) if task.id == expected_id => Ok(task),
        Some(task) => Err(format!("position {index} now holds {} instead of {expected_id}", task.id)),
        None => Err(format!("position {index} is out of range")),
    }
}
