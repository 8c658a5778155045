//! `taskledger audit` command.

use crate::audit::{AuditOptions, Issue, Severity, SyncReport};
use crate::error::Result;
use crate::service::TaskService;

/// Execute `audit`.
///
/// # Errors
///
/// Returns the store error if the collection cannot be read or repaired.
pub fn run(service: &TaskService<'_>, check: bool, force: bool) -> Result<()> {
    let report = service.audit_consistency(AuditOptions { check_only: check, force })?;
    for line in render_report(&report) {
        println!("{line}");
    }
    Ok(())
}

fn render_report(report: &SyncReport) -> Vec<String> {
    let mut lines = vec![format!("Checked {} task(s).", report.tasks_checked)];

    if !report.resolved.is_empty() {
        lines.push(format!("Repaired {} issue(s):", report.resolved.len()));
        lines.extend(report.resolved.iter().map(issue_line));
    }

    if report.is_clean() {
        lines.push("No open issues.".to_string());
        return lines;
    }

    let counts: Vec<String> = [Severity::Critical, Severity::High, Severity::Medium, Severity::Low]
        .into_iter()
        .map(|s| (s, report.count(s)))
        .filter(|(_, n)| *n > 0)
        .map(|(s, n)| format!("{n} {s}"))
        .collect();
    lines.push(format!("{} open issue(s) ({}):", report.issues.len(), counts.join(", ")));
    lines.extend(report.issues.iter().map(issue_line));

    if report.requires_confirmation {
        lines.push("Critical issues found; nothing was changed. Re-run with --force to repair.".to_string());
    }
    lines
}

fn issue_line(issue: &Issue) -> String {
    let task = if issue.task_id.is_empty() { "-" } else { issue.task_id.as_str() };
    format!("  [{}] {} {task}: {}", issue.severity, issue.kind.code(), issue.message)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::context::ServiceContext;
    use crate::lifecycle::NewTask;

    #[test]
    fn clean_store_reports_no_issues() {
        let ctx = ServiceContext::in_memory();
        let service = TaskService::at(&ctx, Path::new("/store"));
        service
            .create_task(NewTask {
                name: "a".to_string(),
                description: "first".to_string(),
                ..NewTask::default()
            })
            .unwrap();

        let report = service.audit_consistency(AuditOptions::default()).unwrap();
        assert_eq!(render_report(&report), vec!["Checked 1 task(s).", "No open issues."]);
    }

    #[test]
    fn dangling_dependency_is_listed_by_severity() {
        let ctx = ServiceContext::in_memory();
        let service = TaskService::at(&ctx, Path::new("/store"));
        service
            .create_task(NewTask {
                name: "a".to_string(),
                description: "first".to_string(),
                dependencies: vec!["ghost".to_string()],
                ..NewTask::default()
            })
            .unwrap();

        let report = service.audit_consistency(AuditOptions { check_only: true, force: false }).unwrap();
        let lines = render_report(&report);
        assert_eq!(lines[1], "1 open issue(s) (1 high):");
        assert!(lines[2].starts_with("  [high] dependency_mismatch task-0001: "));
    }
}
