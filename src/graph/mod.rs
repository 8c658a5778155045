//! Dependency graph queries over the live collection.
//!
//! Satisfaction checks treat a dependency that does not resolve to any
//! task as unsatisfied. Cycles are not an error here; they simply block
//! forever, and [`find_cycles`] lets the auditor report them.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Task, TaskCollection, TaskStatus};

/// Whether a task may start, and what is holding it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionCheck {
    /// `true` when every dependency is `COMPLETED`.
    pub can_execute: bool,
    /// Unsatisfied dependency ids in declaration order.
    pub blocked_by: Vec<String>,
}

/// Checks whether every dependency of task `id` is `COMPLETED`.
///
/// # Errors
///
/// Returns `NotFound` if `id` is not a live task.
pub fn check_dependencies(collection: &TaskCollection, id: &str) -> Result<ExecutionCheck> {
    let task = collection.get(id).ok_or_else(|| Error::task_not_found(id))?;
    let statuses = status_index(&collection.tasks);
    Ok(evaluate(task, &statuses))
}

/// Pending tasks whose dependencies are all completed, in collection order.
#[must_use]
pub fn ready_tasks(collection: &TaskCollection) -> Vec<&Task> {
    let statuses = status_index(&collection.tasks);
    collection
        .tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Pending && evaluate(t, &statuses).can_execute)
        .collect()
}

/// Maps each id to the status of its first occurrence.
fn status_index(tasks: &[Task]) -> HashMap<&str, TaskStatus> {
    let mut index = HashMap::with_capacity(tasks.len());
    for task in tasks {
        index.entry(task.id.as_str()).or_insert(task.status);
    }
    index
}

fn evaluate(task: &Task, statuses: &HashMap<&str, TaskStatus>) -> ExecutionCheck {
    let mut seen = HashSet::new();
    let blocked_by: Vec<String> = task
        .dependencies
        .iter()
        .filter(|dep| seen.insert(dep.as_str()))
        .filter(|dep| statuses.get(dep.as_str()) != Some(&TaskStatus::Completed))
        .cloned()
        .collect();
    ExecutionCheck { can_execute: blocked_by.is_empty(), blocked_by }
}

#[derive(Clone, Copy)]
enum Mark {
    Visiting,
    Done,
}

/// Finds dependency cycles among the given tasks.
///
/// Each cycle is returned once, rotated so its smallest id comes first.
/// A task depending on itself is a cycle of length one. Dependencies on
/// unknown ids are ignored.
#[must_use]
pub fn find_cycles(tasks: &[Task]) -> Vec<Vec<String>> {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::with_capacity(tasks.len());
    for task in tasks {
        adjacency.entry(task.id.as_str()).or_insert_with(|| {
            task.dependencies.iter().map(String::as_str).collect()
        });
    }
    let adjacency: HashMap<&str, Vec<&str>> = adjacency
        .iter()
        .map(|(id, deps)| (*id, deps.iter().copied().filter(|d| adjacency.contains_key(d)).collect()))
        .collect();

    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut cycles = Vec::new();

    for task in tasks {
        let start = task.id.as_str();
        if marks.contains_key(start) {
            continue;
        }
        marks.insert(start, Mark::Visiting);
        let mut stack: Vec<(&str, usize)> = vec![(start, 0)];

        while let Some(&(node, next)) = stack.last() {
            let deps = adjacency.get(node).map_or(&[][..], Vec::as_slice);
            let Some(&dep) = deps.get(next) else {
                marks.insert(node, Mark::Done);
                stack.pop();
                continue;
            };
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }
            match marks.get(dep) {
                None => {
                    marks.insert(dep, Mark::Visiting);
                    stack.push((dep, 0));
                }
                Some(Mark::Visiting) => {
                    let begin = stack.iter().position(|(n, _)| *n == dep).unwrap_or(0);
                    let cycle = canonical_cycle(stack[begin..].iter().map(|(n, _)| *n));
                    if seen.insert(cycle.clone()) {
                        cycles.push(cycle);
                    }
                }
                Some(Mark::Done) => {}
            }
        }
    }
    cycles
}

fn canonical_cycle<'a>(nodes: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut cycle: Vec<String> = nodes.map(str::to_string).collect();
    if let Some(min_at) = cycle.iter().enumerate().min_by(|a, b| a.1.cmp(b.1)).map(|(i, _)| i) {
        cycle.rotate_left(min_at);
    }
    cycle
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn task(id: &str, status: TaskStatus, deps: &[&str]) -> Task {
        let mut t = Task::new(id, id, id, Utc::now());
        t.status = status;
        t.dependencies = deps.iter().map(|d| (*d).to_string()).collect();
        t
    }

    fn collection(tasks: Vec<Task>) -> TaskCollection {
        TaskCollection { initial_request: String::new(), tasks }
    }

    #[test]
    fn no_dependencies_is_executable() {
        let c = collection(vec![task("a", TaskStatus::Pending, &[])]);
        let check = check_dependencies(&c, "a").unwrap();
        assert!(check.can_execute);
        assert!(check.blocked_by.is_empty());
    }

    #[test]
    fn blocked_by_lists_exactly_the_unfinished_dependencies() {
        let mut c = collection(vec![
            task("a", TaskStatus::Completed, &[]),
            task("b", TaskStatus::InProgress, &[]),
            task("t", TaskStatus::Pending, &["a", "b"]),
        ]);
        let check = check_dependencies(&c, "t").unwrap();
        assert_eq!(check, ExecutionCheck { can_execute: false, blocked_by: vec!["b".to_string()] });

        c.get_mut("b").unwrap().status = TaskStatus::Completed;
        let check = check_dependencies(&c, "t").unwrap();
        assert!(check.can_execute);
        assert!(check.blocked_by.is_empty());
    }

    #[test]
    fn dangling_dependency_blocks_without_error() {
        let c = collection(vec![task("t", TaskStatus::Pending, &["ghost", "ghost"])]);
        let check = check_dependencies(&c, "t").unwrap();
        assert_eq!(check.blocked_by, vec!["ghost"]);
    }

    #[test]
    fn unknown_task_is_not_found() {
        let c = collection(vec![]);
        assert!(matches!(check_dependencies(&c, "x"), Err(Error::NotFound { .. })));
    }

    #[test]
    fn ready_tasks_are_pending_and_unblocked() {
        let c = collection(vec![
            task("a", TaskStatus::Completed, &[]),
            task("b", TaskStatus::Pending, &["a"]),
            task("c", TaskStatus::Pending, &["b"]),
            task("d", TaskStatus::InProgress, &[]),
        ]);
        let ids: Vec<&str> = ready_tasks(&c).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn finds_each_cycle_once() {
        let tasks = vec![
            task("c", TaskStatus::Pending, &["a"]),
            task("a", TaskStatus::Pending, &["b"]),
            task("b", TaskStatus::Pending, &["c"]),
            task("self", TaskStatus::Pending, &["self"]),
            task("free", TaskStatus::Pending, &["a", "ghost"]),
        ];
        let cycles = find_cycles(&tasks);
        assert_eq!(cycles, vec![vec!["a", "b", "c"], vec!["self"]]);
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let tasks = vec![
            task("a", TaskStatus::Pending, &[]),
            task("b", TaskStatus::Pending, &["a"]),
            task("c", TaskStatus::Pending, &["a", "b"]),
        ];
        assert!(find_cycles(&tasks).is_empty());
    }
}
