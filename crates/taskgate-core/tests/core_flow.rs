use std::time::{Duration, Instant};

use chrono::{NaiveDate, TimeZone, Utc};
use tempfile::tempdir;

use taskgate_core::cli::Invocation;
use taskgate_core::commands::{App, Outcome};
use taskgate_core::config::Config;
use taskgate_core::form::TaskForm;
use taskgate_core::render::Renderer;
use taskgate_core::session::{Route, SessionGate};
use taskgate_core::storage::{FileStorage, Storage, TASKS_KEY};
use taskgate_core::store::{StoreError, TaskStore};
use taskgate_core::task::{Priority, TaskStatus};
use taskgate_core::view::{FilterMode, visible};

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

fn form(title: &str, start: Option<NaiveDate>, end: Option<NaiveDate>) -> TaskForm {
    TaskForm {
        title: title.to_string(),
        start_date: start,
        end_date: end,
        ..TaskForm::default()
    }
}

fn tokens(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

#[test]
fn created_tasks_survive_a_reload() {
    let temp = tempdir().expect("tempdir");
    let storage = FileStorage::open(temp.path()).expect("open storage");
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

    let created = {
        let mut store = TaskStore::load(&storage).expect("load");
        assert!(store.tasks().is_empty());
        store
            .create(
                TaskForm {
                    priority: Priority::Important,
                    description: "first draft".to_string(),
                    ..form("Write spec", date(2024, 1, 1), date(2024, 1, 3))
                },
                now,
            )
            .expect("create")
    };

    let reopened = FileStorage::open(temp.path()).expect("reopen storage");
    let store = TaskStore::load(&reopened).expect("reload");
    assert_eq!(store.tasks(), &[created.clone()]);
    assert_eq!(created.id, now.timestamp_millis());
    assert!(!created.completed);

    let raw = reopened.get(TASKS_KEY).unwrap().expect("payload written");
    assert!(raw.contains("\"startDate\":\"2024-01-01\""));
    assert!(raw.contains("\"priority\":\"important\""));
}

#[test]
fn status_toggle_and_delete_update_stats() {
    let temp = tempdir().expect("tempdir");
    let storage = FileStorage::open(temp.path()).expect("open storage");
    let mut store = TaskStore::load(&storage).expect("load");
    let now = Utc::now();

    let task = store
        .create(form("Write spec", date(2024, 1, 1), date(2024, 1, 3)), now)
        .unwrap();
    let stats = store.snapshot().stats;
    assert_eq!((stats.total, stats.completed, stats.pending), (1, 0, 1));

    store.set_status(task.id, TaskStatus::Completed).expect("set status");
    let snapshot = store.snapshot();
    assert_eq!(
        (snapshot.stats.completed, snapshot.stats.pending),
        (1, 0)
    );
    assert!(visible(&snapshot.tasks, FilterMode::Pending).is_empty());
    assert_eq!(visible(&snapshot.tasks, FilterMode::Completed).len(), 1);

    store.delete(task.id).expect("delete task");
    assert_eq!(store.snapshot().stats.total, 0);
    assert!(matches!(
        store.delete(task.id),
        Err(StoreError::NotFound(id)) if id == task.id
    ));
}

#[test]
fn end_before_start_is_rejected_without_writing() {
    let temp = tempdir().expect("tempdir");
    let storage = FileStorage::open(temp.path()).expect("open storage");
    let mut store = TaskStore::load(&storage).expect("load");

    let err = store
        .create(form("Backwards", date(2024, 1, 5), date(2024, 1, 1)), Utc::now())
        .unwrap_err();
    match err {
        StoreError::Validation(errors) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].message, "End date must be after start date");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(store.tasks().is_empty());
    assert_eq!(storage.get(TASKS_KEY).unwrap(), None);
}

#[test]
fn gate_follows_the_stored_identity() {
    let temp = tempdir().expect("tempdir");
    let storage = FileStorage::open(temp.path()).expect("open storage");
    let gate = SessionGate::new(&storage);

    assert_eq!(gate.guard(Route::Tasks).unwrap(), Route::Entry);
    assert_eq!(gate.guard(Route::Entry).unwrap(), Route::Entry);
    assert_eq!(gate.login("alice").expect("login"), Route::Dashboard);

    let fresh = SessionGate::new(FileStorage::open(temp.path()).expect("open storage"));
    assert_eq!(fresh.identity().unwrap().as_deref(), Some("alice"));
    assert_eq!(fresh.guard(Route::About).unwrap(), Route::About);
}

#[test]
fn commands_redirect_then_work_after_login() {
    let temp = tempdir().expect("tempdir");
    let storage = FileStorage::open(temp.path()).expect("open storage");
    let cfg = Config::default();
    let renderer = Renderer::new(&cfg, Vec::new(), false).expect("renderer");
    let mut app = App::new(&storage, renderer, Duration::from_secs(3)).expect("app");
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    let start = Instant::now();

    let run = |app: &mut App<FileStorage, Vec<u8>>, raw: &[&str], at: Instant| {
        let inv = Invocation::from_tokens(&cfg, &tokens(raw)).expect("parse invocation");
        app.dispatch(&inv, now, at).expect("dispatch")
    };

    assert_eq!(run(&mut app, &["list"], start), Outcome::Redirected);
    assert_eq!(run(&mut app, &["login", "  "], start), Outcome::Rejected);
    assert_eq!(run(&mut app, &["login", "alice"], start), Outcome::Done);
    assert_eq!(
        run(
            &mut app,
            &["add", "Write", "spec", "start:2024-01-01", "end:2024-01-03"],
            start
        ),
        Outcome::Done
    );
    assert_eq!(
        run(
            &mut app,
            &["add", "Backwards", "start:2024-01-05", "end:2024-01-01"],
            start
        ),
        Outcome::Rejected
    );

    let id = now.timestamp_millis().to_string();
    assert_eq!(run(&mut app, &["done", &id], start), Outcome::Done);
    assert_eq!(run(&mut app, &["delete", &id], start), Outcome::Done);
    assert_eq!(run(&mut app, &["about"], start + Duration::from_secs(1)), Outcome::Done);
    assert_eq!(run(&mut app, &["list"], start + Duration::from_secs(4)), Outcome::Done);

    let out = String::from_utf8(app.into_renderer().into_inner()).expect("utf8 output");
    assert!(out.contains("Not logged in."));
    assert!(out.contains("Please enter a username"));
    assert!(out.contains("Welcome back, alice!"));
    assert!(out.contains("endDate: End date must be after start date"));
    assert!(out.contains(&format!("Marked task {id} completed.")));
    assert_eq!(out.matches("* Task deleted successfully!").count(), 2);
    assert!(out.contains("No tasks found. Create your first task!"));
}

#[test]
fn add_reports_end_before_start_in_either_order() {
    let temp = tempdir().expect("tempdir");
    let storage = FileStorage::open(temp.path()).expect("open storage");
    let cfg = Config::default();
    let renderer = Renderer::new(&cfg, Vec::new(), false).expect("renderer");
    let mut app = App::new(&storage, renderer, Duration::from_secs(3)).expect("app");
    let now = Utc::now();

    for raw in [
        ["login", "alice"].as_slice(),
        &["add", "Backwards", "end:2024-01-01", "start:2024-01-05"],
    ] {
        let inv = Invocation::from_tokens(&cfg, &tokens(raw)).expect("parse invocation");
        let outcome = app.dispatch(&inv, now, Instant::now()).expect("dispatch");
        if raw[0] == "add" {
            assert_eq!(outcome, Outcome::Rejected);
        }
    }

    let out = String::from_utf8(app.into_renderer().into_inner()).expect("utf8 output");
    assert!(out.contains("endDate: End date must be after start date"));
    assert!(!out.contains("End date is required"));
    assert_eq!(storage.get(TASKS_KEY).expect("read key"), None);
}
