//! Scenario tests against the live filesystem.

use std::fs;

use taskledger::archive::RestoreOptions;
use taskledger::audit::{AuditOptions, IssueKind, Severity};
use taskledger::context::ServiceContext;
use taskledger::error::Error;
use taskledger::lifecycle::{NewTask, StartOutcome, VerifyOutcome};
use taskledger::model::{HistoryOperation, TaskStatus};
use taskledger::recovery::RecoverOptions;
use taskledger::service::{TaskFilter, TaskService};
use taskledger::store::HistoryQuery;
use tempfile::TempDir;

const SUMMARY: &str = "Implemented the login form with validation and tests.";

fn new_task(name: &str, deps: &[&str]) -> NewTask {
    NewTask {
        name: name.to_string(),
        description: format!("{name} description"),
        dependencies: deps.iter().map(ToString::to_string).collect(),
        ..NewTask::default()
    }
}

#[test]
fn login_form_walkthrough() {
    let dir = TempDir::new().unwrap();
    let ctx = ServiceContext::live();
    let service = TaskService::at(&ctx, dir.path());

    let t1 = service.create_task(new_task("Login form", &[])).unwrap();
    assert_eq!(t1.status, TaskStatus::Pending);

    let started = service.start_execution(&t1.id).unwrap();
    assert!(matches!(started, StartOutcome::Started(_)));

    let outcome = service.verify_and_maybe_complete(&t1.id, SUMMARY, 85, None).unwrap();
    let VerifyOutcome::Completed(done) = outcome else { panic!("expected completion") };
    assert_eq!(done.status, TaskStatus::Completed);
    let details = done.completion_details.unwrap();
    assert_eq!(details.verification_score, 85);
    assert!(!details.key_accomplishments.is_empty());
    assert!(!details.implementation_details.is_empty());
    assert!(!details.technical_challenges.is_empty());

    assert!(dir.path().join("tasks.json").exists());
    let reloaded = TaskService::at(&ctx, dir.path()).get_task(&t1.id).unwrap();
    assert_eq!(reloaded.status, TaskStatus::Completed);
}

#[test]
fn repeated_start_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let ctx = ServiceContext::live();
    let service = TaskService::at(&ctx, dir.path());
    let task = service.create_task(new_task("Task", &[])).unwrap();

    service.start_execution(&task.id).unwrap();
    let before = service.get_task(&task.id).unwrap();
    for _ in 0..2 {
        let again = service.start_execution(&task.id).unwrap();
        assert!(!again.changed());
        assert_eq!(again.task(), &before);
    }

    let starts = service
        .get_history(&HistoryQuery {
            operation: Some(HistoryOperation::Started),
            ..HistoryQuery::default()
        })
        .unwrap();
    assert_eq!(starts.len(), 1);
}

#[test]
fn blocked_by_lists_only_incomplete_dependencies() {
    let dir = TempDir::new().unwrap();
    let ctx = ServiceContext::live();
    let service = TaskService::at(&ctx, dir.path());
    let a = service.create_task(new_task("a", &[])).unwrap();
    let b = service.create_task(new_task("b", &[])).unwrap();
    let c = service.create_task(new_task("c", &[&a.id, &b.id])).unwrap();

    service.start_execution(&a.id).unwrap();
    service.verify_and_maybe_complete(&a.id, SUMMARY, 90, None).unwrap();

    let check = service.can_execute(&c.id).unwrap();
    assert!(!check.can_execute);
    assert_eq!(check.blocked_by, vec![b.id.clone()]);
    assert!(matches!(service.start_execution(&c.id), Err(Error::Blocked { .. })));

    service.start_execution(&b.id).unwrap();
    service.verify_and_maybe_complete(&b.id, SUMMARY, 80, None).unwrap();

    let check = service.can_execute(&c.id).unwrap();
    assert!(check.can_execute);
    assert!(check.blocked_by.is_empty());
}

#[test]
fn archive_replace_reproduces_task_set() {
    let dir = TempDir::new().unwrap();
    let ctx = ServiceContext::live();
    let service = TaskService::at(&ctx, dir.path());
    let a = service.create_task(new_task("a", &[])).unwrap();
    service.create_task(new_task("b", &[&a.id])).unwrap();
    service.start_execution(&a.id).unwrap();
    service.verify_and_maybe_complete(&a.id, SUMMARY, 95, None).unwrap();
    let original = service.list_tasks(&TaskFilter::default()).unwrap();

    let meta = service.create_archive("before cleanup").unwrap();
    for task in &original {
        service.delete_task(&task.id).unwrap();
    }
    assert!(service.list_tasks(&TaskFilter::default()).unwrap().is_empty());

    let report = service
        .restore_from_archive(&meta.id, RestoreOptions { merge: false, ..RestoreOptions::default() })
        .unwrap();
    assert_eq!(report.restored_count, original.len());
    assert_eq!(service.list_tasks(&TaskFilter::default()).unwrap(), original);
}

#[test]
fn delete_and_recover_restores_task() {
    let dir = TempDir::new().unwrap();
    let ctx = ServiceContext::live();
    let service = TaskService::at(&ctx, dir.path());
    let task = service.create_task(new_task("Keep me", &[])).unwrap();

    let record = service.delete_task(&task.id).unwrap();
    assert_eq!(record.task, task);
    assert!(dir.path().join("deleted").join(format!("{}.json", task.id)).exists());
    assert!(matches!(service.get_task(&task.id), Err(Error::NotFound { .. })));

    let mut recovered = service.recover_task(&task.id, RecoverOptions::default()).unwrap();
    assert!(recovered.updated_at >= task.updated_at);
    recovered.updated_at = task.updated_at;
    assert_eq!(recovered, task);
    assert!(service.list_deleted(None, None).unwrap().is_empty());
}

#[test]
fn duplicate_ids_are_reported_without_mutation() {
    let dir = TempDir::new().unwrap();
    let tasks_json = r#"{
  "initialRequest": "",
  "tasks": [
    {"id": "dup", "name": "one", "description": "first", "status": "PENDING",
     "dependencies": [], "createdAt": "2025-01-01T00:00:00Z", "updatedAt": "2025-01-01T00:00:00Z"},
    {"id": "dup", "name": "two", "description": "second", "status": "PENDING",
     "dependencies": [], "createdAt": "2025-01-01T00:00:00Z", "updatedAt": "2025-01-01T00:00:00Z"}
  ]
}"#;
    fs::write(dir.path().join("tasks.json"), tasks_json).unwrap();

    let ctx = ServiceContext::live();
    let service = TaskService::at(&ctx, dir.path());
    let report = service.audit_consistency(AuditOptions { check_only: true, force: false }).unwrap();

    let critical: Vec<_> = report.issues.iter().filter(|i| i.severity == Severity::Critical).collect();
    assert_eq!(critical.len(), 1);
    assert!(matches!(critical[0].kind, IssueKind::DuplicateId { index: 1 }));
    assert_eq!(fs::read_to_string(dir.path().join("tasks.json")).unwrap(), tasks_json);
}

#[test]
fn concurrent_completions_do_not_lose_updates() {
    let dir = TempDir::new().unwrap();
    let ctx = ServiceContext::live();
    let service = TaskService::at(&ctx, dir.path());
    let ids: Vec<String> = (0..8)
        .map(|n| {
            let task = service.create_task(new_task(&format!("t{n}"), &[])).unwrap();
            service.start_execution(&task.id).unwrap();
            task.id
        })
        .collect();

    std::thread::scope(|scope| {
        for id in &ids {
            let service = &service;
            scope.spawn(move || service.verify_and_maybe_complete(id, SUMMARY, 100, None).unwrap());
        }
    });

    let done = TaskFilter { status: Some(TaskStatus::Completed), ..TaskFilter::default() };
    assert_eq!(service.list_tasks(&done).unwrap().len(), ids.len());
}

#[test]
fn completions_through_separate_services_do_not_lose_updates() {
    for _ in 0..5 {
        let dir = TempDir::new().unwrap();
        let ctx = ServiceContext::live();
        let setup = TaskService::at(&ctx, dir.path());
        let ids: Vec<String> = (0..8)
            .map(|n| {
                let task = setup.create_task(new_task(&format!("t{n}"), &[])).unwrap();
                setup.start_execution(&task.id).unwrap();
                task.id
            })
            .collect();

        std::thread::scope(|scope| {
            for id in &ids {
                let (ctx, root) = (&ctx, dir.path());
                scope.spawn(move || {
                    let service = TaskService::at(ctx, root);
                    service.verify_and_maybe_complete(id, SUMMARY, 100, None).unwrap()
                });
            }
        });

        let done = TaskFilter { status: Some(TaskStatus::Completed), ..TaskFilter::default() };
        assert_eq!(setup.list_tasks(&done).unwrap().len(), ids.len());
    }
}
