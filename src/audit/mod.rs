//! Consistency auditor for the live collection.
//!
//! Checks run independently and accumulate issues:
//!
//! | check                     | severity | auto-repair            |
//! |---------------------------|----------|------------------------|
//! | duplicate id              | critical | with `force`: drop repeat |
//! | `updatedAt < createdAt`   | medium   | always: clamp to `createdAt` |
//! | dangling dependency       | high     | with `force`: drop reference |
//! | missing required field    | high     | never                  |
//! | dependency cycle          | high     | never                  |
//!
//! When a critical issue would remain unresolved the audit writes nothing
//! and flags the report as requiring confirmation.

mod repair;

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::graph;
use crate::model::Task;
use crate::store::TaskStore;

/// How serious an issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Cosmetic.
    Low,
    /// Wrong but harmless to the graph.
    Medium,
    /// Breaks dependency resolution or task display.
    High,
    /// Identity is ambiguous; data may be lost.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        })
    }
}

/// What is wrong, with enough location data to repair it.
///
/// `index` is the task's position in the collection at scan time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IssueKind {
    /// A task repeats an id already used earlier in the collection.
    DuplicateId {
        /// Position of the repeat.
        index: usize,
    },
    /// `updatedAt` is earlier than `createdAt`.
    TimestampInconsistency {
        /// Position of the task.
        index: usize,
    },
    /// A dependency id does not resolve to any task.
    DependencyMismatch {
        /// Position of the task holding the reference.
        index: usize,
        /// The unresolved id.
        dependency: String,
    },
    /// A required field is absent or empty.
    MissingField {
        /// Position of the task.
        index: usize,
        /// Wire name of the field.
        field: String,
    },
    /// Tasks that transitively depend on themselves.
    DependencyCycle {
        /// Ids around the cycle, smallest first.
        cycle: Vec<String>,
    },
}

impl IssueKind {
    /// Severity assigned to this kind of issue.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::DuplicateId { .. } => Severity::Critical,
            Self::TimestampInconsistency { .. } => Severity::Medium,
            Self::DependencyMismatch { .. }
            | Self::MissingField { .. }
            | Self::DependencyCycle { .. } => Severity::High,
        }
    }

    /// Stable short code, e.g. `duplicate_id`.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateId { .. } => "duplicate_id",
            Self::TimestampInconsistency { .. } => "timestamp_inconsistency",
            Self::DependencyMismatch { .. } => "dependency_mismatch",
            Self::MissingField { .. } => "missing_field",
            Self::DependencyCycle { .. } => "dependency_cycle",
        }
    }
}

/// One finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// What is wrong and where.
    #[serde(flatten)]
    pub kind: IssueKind,
    /// How serious it is.
    pub severity: Severity,
    /// Affected task id (may be empty when the id itself is missing).
    pub task_id: String,
    /// Human-readable description.
    pub message: String,
}

impl Issue {
    fn new(kind: IssueKind, task_id: &str, message: String) -> Self {
        Self { severity: kind.severity(), kind, task_id: task_id.to_string(), message }
    }
}

/// Audit mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditOptions {
    /// Report only; never write.
    pub check_only: bool,
    /// Allow repairs that remove data (duplicates, dangling references).
    pub force: bool,
}

/// Outcome of an audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Scan time.
    pub checked_at: DateTime<Utc>,
    /// Number of tasks scanned.
    pub tasks_checked: usize,
    /// Issues still present.
    pub issues: Vec<Issue>,
    /// Issues repaired and written.
    pub resolved: Vec<Issue>,
    /// `true` when critical issues remain and nothing was written.
    pub requires_confirmation: bool,
}

impl SyncReport {
    /// `true` when nothing is wrong.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of open issues at `severity`.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

const REQUIRED_FIELDS: [&str; 6] = ["id", "name", "description", "status", "createdAt", "updatedAt"];

/// Scans tasks for structural problems without changing anything.
///
/// `raw` holds the same records as untyped JSON, index-aligned with
/// `tasks`; when given, field presence is checked against it as well.
#[must_use]
pub fn scan(tasks: &[Task], raw: Option<&[serde_json::Value]>) -> Vec<Issue> {
    let mut issues = Vec::new();

    let mut seen = HashSet::new();
    for (index, task) in tasks.iter().enumerate() {
        if !task.id.is_empty() && !seen.insert(task.id.as_str()) {
            issues.push(Issue::new(
                IssueKind::DuplicateId { index },
                &task.id,
                format!("id {} is used by more than one task (repeat at position {index})", task.id),
            ));
        }
    }

    for (index, task) in tasks.iter().enumerate() {
        if task.updated_at < task.created_at {
            issues.push(Issue::new(
                IssueKind::TimestampInconsistency { index },
                &task.id,
                format!(
                    "updatedAt {} is earlier than createdAt {}",
                    task.updated_at.to_rfc3339(),
                    task.created_at.to_rfc3339()
                ),
            ));
        }
    }

    let ids: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    for (index, task) in tasks.iter().enumerate() {
        let mut reported = HashSet::new();
        for dep in &task.dependencies {
            if !ids.contains(dep.as_str()) && reported.insert(dep.as_str()) {
                issues.push(Issue::new(
                    IssueKind::DependencyMismatch { index, dependency: dep.clone() },
                    &task.id,
                    format!("dependency {dep} does not match any task"),
                ));
            }
        }
    }

    for (index, task) in tasks.iter().enumerate() {
        let record = raw.and_then(|r| r.get(index));
        for field in REQUIRED_FIELDS {
            if field_missing(task, record, field) {
                issues.push(Issue::new(
                    IssueKind::MissingField { index, field: field.to_string() },
                    &task.id,
                    format!("required field {field} is missing"),
                ));
            }
        }
    }

    for cycle in graph::find_cycles(tasks) {
        let head = cycle.first().cloned().unwrap_or_default();
        let message = format!("dependency cycle: {} -> {head}", cycle.join(" -> "));
        issues.push(Issue::new(IssueKind::DependencyCycle { cycle }, &head, message));
    }

    issues
}

fn field_missing(task: &Task, record: Option<&serde_json::Value>, field: &str) -> bool {
    let raw_missing = record.is_some_and(|r| match r.get(field) {
        None | Some(serde_json::Value::Null) => true,
        Some(serde_json::Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    });
    let epoch = DateTime::<Utc>::default();
    let typed_missing = match field {
        "id" => task.id.trim().is_empty(),
        "name" => task.name.trim().is_empty(),
        "description" => task.description.trim().is_empty(),
        "createdAt" => task.created_at == epoch,
        "updatedAt" => task.updated_at == epoch,
        _ => false,
    };
    raw_missing || typed_missing
}

/// Audits the live collection and, unless `check_only`, repairs what it can.
///
/// # Errors
///
/// Returns `Persistence` if the collection cannot be read or written.
pub fn audit_consistency(store: &TaskStore<'_>, options: AuditOptions) -> Result<SyncReport> {
    let checked_at = store.now();

    if options.check_only {
        let (collection, raw) = store.load_with_raw()?;
        let issues = scan(&collection.tasks, Some(&raw));
        info!(issues = issues.len(), "consistency check complete");
        return Ok(SyncReport {
            checked_at,
            tasks_checked: collection.tasks.len(),
            issues,
            resolved: Vec::new(),
            requires_confirmation: false,
        });
    }

    let report = store.mutate_with_raw(|collection, raw| {
        let issues = scan(&collection.tasks, Some(raw));
        let tasks_checked = collection.tasks.len();

        let critical = issues.iter().any(|i| i.severity == Severity::Critical);
        if critical && !options.force {
            return Ok(SyncReport {
                checked_at,
                tasks_checked,
                issues,
                resolved: Vec::new(),
                requires_confirmation: true,
            });
        }

        let (resolved, issues) = repair::apply(collection, issues, options.force);
        Ok(SyncReport { checked_at, tasks_checked, issues, resolved, requires_confirmation: false })
    })?;

    info!(
        open = report.issues.len(),
        resolved = report.resolved.len(),
        requires_confirmation = report.requires_confirmation,
        "consistency audit complete"
    );
    Ok(report)
}
